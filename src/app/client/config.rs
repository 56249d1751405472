//! Transfer client configuration and building logic
//!
//! This module handles the configuration shared by the FTP and HTTP
//! transports and the construction of the HTTP client.

use std::time::Duration;

use reqwest::redirect::Policy;
use reqwest::Client;

use crate::config::AppConfig;
use crate::constants::{files, http, limits, server};
use crate::errors::{NetworkError, NetworkResult};

/// Configuration for both transports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Anonymous FTP host
    pub ftp_host: String,
    /// FTP control port
    pub ftp_port: u16,
    /// Deadline for a whole listing (connect, login, change directory, list)
    pub listing_timeout: Duration,
    /// A transfer fails after this long without receiving data
    pub transfer_timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Read buffer size for FTP transfers
    pub chunk_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            ftp_host: server::FTP_HOST.to_string(),
            ftp_port: server::FTP_PORT,
            listing_timeout: limits::LISTING_TIMEOUT,
            transfer_timeout: limits::TRANSFER_IDLE_TIMEOUT,
            connect_timeout: http::CONNECT_TIMEOUT,
            chunk_size: files::DOWNLOAD_CHUNK_SIZE,
        }
    }
}

impl ClientConfig {
    /// Runtime settings from the loaded configuration
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            ftp_host: config.server.ftp_host.clone(),
            ftp_port: config.server.ftp_port,
            listing_timeout: config.listing_timeout(),
            transfer_timeout: config.transfer_timeout(),
            connect_timeout: config.connect_timeout(),
            chunk_size: config.client.chunk_size,
        }
    }

    /// Builds the HTTP client
    ///
    /// No whole-request timeout is set: large archives are bounded by the
    /// per-chunk idle timeout in the HTTP transport instead.
    pub fn build_http_client(&self) -> NetworkResult<Client> {
        Client::builder()
            .connect_timeout(self.connect_timeout)
            .user_agent(http::USER_AGENT)
            .redirect(Policy::limited(http::MAX_REDIRECTS))
            .build()
            .map_err(NetworkError::Http)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.ftp_host, "arpoador.datasus.gov.br");
        assert_eq!(config.ftp_port, 21);
        assert_eq!(config.listing_timeout, Duration::from_secs(20));
        assert_eq!(config.transfer_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_from_app_config() {
        let mut app = AppConfig::default();
        app.server.ftp_host = "127.0.0.1".to_string();
        app.client.listing_timeout_secs = 3;

        let config = ClientConfig::from_app_config(&app);
        assert_eq!(config.ftp_host, "127.0.0.1");
        assert_eq!(config.listing_timeout, Duration::from_secs(3));
        assert_eq!(config.transfer_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_http_client_creation() {
        let config = ClientConfig::default();
        assert!(config.build_http_client().is_ok());
    }
}
