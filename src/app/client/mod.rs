//! Remote listing and transfer client
//!
//! The engine talks to the DATASUS servers only through [`RemoteSource`], so
//! checks and downloads can run against a fake source in tests.
//!
//! The module is organized into specialized components:
//! - `config`: transport configuration and HTTP client building
//! - `ftp`: anonymous FTP listing and retrieval
//! - `http`: streaming HTTP downloads
//! - `download`: atomic temp-file-then-rename helpers

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::app::models::SourceLocator;
use crate::errors::NetworkResult;

// Module declarations
pub mod config;
pub mod download;
pub mod ftp;
pub mod http;

pub use config::ClientConfig;
pub use ftp::FtpHandler;
pub use http::HttpHandler;

/// Transfer progress callback: `(bytes_received, total_if_known)`
pub type ProgressFn = Arc<dyn Fn(u64, Option<u64>) + Send + Sync>;

/// Listing and transfer operations the engine depends on
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// File names in a remote directory, in unspecified order
    async fn list_files(&self, directory: &str) -> NetworkResult<Vec<String>>;

    /// Transfer `source` to `destination`, returning the byte count
    ///
    /// On error the destination is left untouched.
    async fn fetch(
        &self,
        source: &SourceLocator,
        destination: &Path,
        progress: ProgressFn,
    ) -> NetworkResult<u64>;
}

/// Production source: FTP for listings and installers, HTTP for archives
#[derive(Debug, Clone)]
pub struct RemoteClient {
    ftp: FtpHandler,
    http: HttpHandler,
}

impl RemoteClient {
    /// Creates a client for the configured host
    ///
    /// # Errors
    ///
    /// Returns `NetworkError::Http` if the HTTP client cannot be built
    pub fn new(config: &ClientConfig) -> NetworkResult<Self> {
        let client = Self {
            ftp: FtpHandler::new(config),
            http: HttpHandler::new(config)?,
        };
        tracing::debug!("Created remote client for {}", config.ftp_host);
        Ok(client)
    }
}

#[async_trait]
impl RemoteSource for RemoteClient {
    async fn list_files(&self, directory: &str) -> NetworkResult<Vec<String>> {
        self.ftp.list_files(directory).await
    }

    async fn fetch(
        &self,
        source: &SourceLocator,
        destination: &Path,
        progress: ProgressFn,
    ) -> NetworkResult<u64> {
        match source {
            SourceLocator::Ftp {
                directory,
                filename,
            } => {
                self.ftp
                    .fetch(directory, filename, destination, progress)
                    .await
            }
            SourceLocator::Http { url } => self.http.fetch(url, destination, progress).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_client_creation() {
        let client = RemoteClient::new(&ClientConfig::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_remote_source_is_object_safe() {
        let client = RemoteClient::new(&ClientConfig::default()).unwrap();
        let _shared: Arc<dyn RemoteSource> = Arc::new(client);
    }
}
