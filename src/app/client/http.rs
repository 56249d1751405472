//! Streaming HTTP downloads
//!
//! Used for the non-versioned bulk archives (CNES, Firebird). The body is
//! written chunk by chunk as it arrives; nothing buffers the whole payload.

use std::path::Path;
use std::time::Duration;

use futures::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::app::client::config::ClientConfig;
use crate::app::client::download;
use crate::app::client::ProgressFn;
use crate::errors::{NetworkError, NetworkResult};

/// HTTP operations handler
#[derive(Debug, Clone)]
pub struct HttpHandler {
    client: Client,
    idle_timeout: Duration,
}

impl HttpHandler {
    /// Creates a handler from the shared client configuration
    ///
    /// # Errors
    ///
    /// Returns `NetworkError::Http` if the underlying client cannot be built
    pub fn new(config: &ClientConfig) -> NetworkResult<Self> {
        Ok(Self {
            client: config.build_http_client()?,
            idle_timeout: config.transfer_timeout,
        })
    }

    /// Downloads `url` into `destination` through a temporary sibling file
    ///
    /// # Errors
    ///
    /// Returns `NetworkError` if the URL is invalid, the server answers with a
    /// non-success status, the stream stalls past the idle timeout, or the
    /// local write fails.
    pub async fn fetch(
        &self,
        url: &str,
        destination: &Path,
        progress: ProgressFn,
    ) -> NetworkResult<u64> {
        let parsed = Url::parse(url).map_err(|e| NetworkError::InvalidUrl {
            url: url.to_string(),
            error: e.to_string(),
        })?;

        let temp_path = download::prepare_destination(destination).await?;
        tracing::info!("Starting HTTP download of {}", parsed);

        match self.stream_to_file(parsed, &temp_path, &progress).await {
            Ok(bytes) => {
                download::commit(&temp_path, destination).await?;
                Ok(bytes)
            }
            Err(e) => {
                download::discard(&temp_path).await;
                Err(e)
            }
        }
    }

    async fn stream_to_file(
        &self,
        url: Url,
        temp_path: &Path,
        progress: &ProgressFn,
    ) -> NetworkResult<u64> {
        let response = tokio::time::timeout(self.idle_timeout, self.client.get(url).send())
            .await
            .map_err(|_| self.timeout_error())??;

        if !response.status().is_success() {
            return Err(NetworkError::ServerError {
                status: response.status().as_u16(),
            });
        }

        let total = response.content_length();
        let mut file = File::create(temp_path).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;

        loop {
            let next = tokio::time::timeout(self.idle_timeout, stream.next())
                .await
                .map_err(|_| self.timeout_error())?;
            let Some(chunk) = next else {
                break;
            };
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
            progress(written, total);
        }

        file.flush().await?;
        Ok(written)
    }

    fn timeout_error(&self) -> NetworkError {
        NetworkError::Timeout {
            after: self.idle_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn handler(idle: Duration) -> HttpHandler {
        let config = ClientConfig {
            transfer_timeout: idle,
            ..Default::default()
        };
        HttpHandler::new(&config).unwrap()
    }

    fn no_progress() -> ProgressFn {
        Arc::new(|_, _| {})
    }

    #[tokio::test]
    async fn test_download_writes_body_and_reports_progress() {
        let server = MockServer::start().await;
        let body = vec![7u8; 20_000];
        Mock::given(method("GET"))
            .and(path("/SCNES4700-COMPLETA.ZIP"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let destination = dir.path().join("CNES").join("SCNES4700-COMPLETA.ZIP");
        let last_seen = Arc::new(AtomicU64::new(0));
        let progress: ProgressFn = {
            let last_seen = Arc::clone(&last_seen);
            Arc::new(move |bytes, _total| last_seen.store(bytes, Ordering::Relaxed))
        };

        let url = format!("{}/SCNES4700-COMPLETA.ZIP", server.uri());
        let bytes = handler(Duration::from_secs(5))
            .fetch(&url, &destination, progress)
            .await
            .unwrap();

        assert_eq!(bytes, 20_000);
        assert_eq!(last_seen.load(Ordering::Relaxed), 20_000);
        assert_eq!(tokio::fs::read(&destination).await.unwrap(), body);
        assert!(!download::temp_path_for(&destination).exists());
    }

    #[tokio::test]
    async fn test_server_error_leaves_no_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let destination = dir.path().join("missing.zip");
        let url = format!("{}/missing.zip", server.uri());

        let result = handler(Duration::from_secs(5))
            .fetch(&url, &destination, no_progress())
            .await;

        match result {
            Err(NetworkError::ServerError { status }) => assert_eq!(status, 404),
            other => panic!("Expected ServerError, got {:?}", other),
        }
        assert!(!destination.exists());
        assert!(!download::temp_path_for(&destination).exists());
    }

    #[tokio::test]
    async fn test_slow_server_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let destination = dir.path().join("slow.zip");
        let url = format!("{}/slow.zip", server.uri());

        let result = handler(Duration::from_millis(200))
            .fetch(&url, &destination, no_progress())
            .await;

        assert!(matches!(result, Err(NetworkError::Timeout { .. })));
        assert!(!destination.exists());
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let dir = tempdir().unwrap();
        let result = handler(Duration::from_secs(1))
            .fetch("not-a-url", &dir.path().join("x.zip"), no_progress())
            .await;
        assert!(matches!(result, Err(NetworkError::InvalidUrl { .. })));
    }
}
