//! Configuration management for the DATASUS updater
//!
//! Zero-config defaults reproduce the standard DATASUS layout; a TOML file can
//! override server locations, installation roots, timeouts and logging.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::constants::{coordinator, files, http, layout, limits, server};
use crate::errors::{ConfigError, ConfigResult};

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Remote locations
    pub server: ServerConfig,
    /// Local installation roots
    pub directories: DirectoriesConfig,
    /// Transfer client settings
    pub client: ClientConfigToml,
    /// Coordinator settings
    pub coordinator: CoordinatorConfigToml,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Remote host and directories
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Anonymous FTP host
    pub ftp_host: String,
    /// FTP control port
    pub ftp_port: u16,
    /// BPA installer directory
    pub bpa_path: String,
    /// SIA installer and BDSIA directory
    pub sia_path: String,
    /// FPO installer and update directory
    pub fpo_path: String,
    /// CNES archive URL
    pub cnes_url: String,
    /// Firebird installer archive URL
    pub firebird_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ftp_host: server::FTP_HOST.to_string(),
            ftp_port: server::FTP_PORT,
            bpa_path: server::BPA_PATH.to_string(),
            sia_path: server::SIA_PATH.to_string(),
            fpo_path: server::FPO_PATH.to_string(),
            cnes_url: server::CNES_URL.to_string(),
            firebird_url: server::FIREBIRD_URL.to_string(),
        }
    }
}

/// Local installation roots
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DirectoriesConfig {
    pub bpa: PathBuf,
    pub sia: PathBuf,
    pub fpo: PathBuf,
    pub cnes: PathBuf,
}

impl Default for DirectoriesConfig {
    fn default() -> Self {
        Self {
            bpa: PathBuf::from(layout::BPA_DIR),
            sia: PathBuf::from(layout::SIA_DIR),
            fpo: PathBuf::from(layout::FPO_DIR),
            cnes: PathBuf::from(layout::CNES_DIR),
        }
    }
}

impl DirectoriesConfig {
    /// Standard folder names placed under a custom root
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            bpa: root.join("BPA"),
            sia: root.join("INSTSIA"),
            fpo: root.join("FPO"),
            cnes: root.join("CNES"),
        }
    }
}

/// TOML-friendly client configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfigToml {
    /// Deadline for a whole directory listing, in seconds
    pub listing_timeout_secs: u64,
    /// Transfer fails after this many seconds without data
    pub transfer_timeout_secs: u64,
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Streaming chunk size in bytes
    pub chunk_size: usize,
}

impl Default for ClientConfigToml {
    fn default() -> Self {
        Self {
            listing_timeout_secs: limits::LISTING_TIMEOUT.as_secs(),
            transfer_timeout_secs: limits::TRANSFER_IDLE_TIMEOUT.as_secs(),
            connect_timeout_secs: http::CONNECT_TIMEOUT.as_secs(),
            chunk_size: files::DOWNLOAD_CHUNK_SIZE,
        }
    }
}

/// TOML-friendly coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CoordinatorConfigToml {
    /// Task queue drain interval in milliseconds
    pub drain_interval_ms: u64,
    /// Number of BDSIA rows offered
    pub bulk_rows: usize,
}

impl Default for CoordinatorConfigToml {
    fn default() -> Self {
        Self {
            drain_interval_ms: coordinator::DRAIN_INTERVAL.as_millis() as u64,
            bulk_rows: coordinator::BULK_TABLE_ROWS,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level for the application
    pub level: String,
    /// Activity log file, in addition to the terminal
    pub log_file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_file: None,
        }
    }
}

impl AppConfig {
    /// Listing deadline as a duration
    pub fn listing_timeout(&self) -> Duration {
        Duration::from_secs(self.client.listing_timeout_secs)
    }

    /// Transfer idle deadline as a duration
    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_secs(self.client.transfer_timeout_secs)
    }

    /// Connect deadline as a duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.client.connect_timeout_secs)
    }

    /// Coordinator drain interval as a duration
    pub fn drain_interval(&self) -> Duration {
        Duration::from_millis(self.coordinator.drain_interval_ms)
    }

    /// Reject values that would make remote calls unbounded or the queue spin
    pub fn validate(&self) -> ConfigResult<()> {
        let positive = [
            ("client.listing_timeout_secs", self.client.listing_timeout_secs),
            ("client.transfer_timeout_secs", self.client.transfer_timeout_secs),
            ("client.connect_timeout_secs", self.client.connect_timeout_secs),
            ("coordinator.drain_interval_ms", self.coordinator.drain_interval_ms),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: value.to_string(),
                    reason: "Must be greater than 0".to_string(),
                });
            }
        }

        if self.client.chunk_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "client.chunk_size".to_string(),
                value: "0".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.server.ftp_host.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "server.ftp_host".to_string(),
                value: String::new(),
                reason: "A host name is required".to_string(),
            });
        }

        Ok(())
    }

    /// Load configuration with precedence:
    /// 1. Default values
    /// 2. Explicit config file (must exist)
    /// 3. First config file found in the standard locations
    pub async fn load(config_file_override: Option<PathBuf>) -> ConfigResult<Self> {
        let config_path = match config_file_override {
            Some(path) if path.exists() => Some(path),
            Some(path) => return Err(ConfigError::NotFound { path }),
            None => Self::find_config_file(),
        };

        let config = match config_path {
            Some(path) => Self::load_from_file(&path).await?,
            None => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Write a commented default configuration file
    ///
    /// Returns the written path, or `None` when a file is already there.
    pub async fn initialize(path: Option<PathBuf>) -> ConfigResult<Option<PathBuf>> {
        let config_path = match path {
            Some(path) => path,
            None => Self::default_config_path().ok_or_else(|| ConfigError::InvalidValue {
                field: "config path".to_string(),
                value: String::new(),
                reason: "Could not determine user config directory".to_string(),
            })?,
        };

        if config_path.exists() {
            return Ok(None);
        }

        if let Some(parent) = config_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| ConfigError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let content = Self::generate_default_config_content()?;
        tokio::fs::write(&config_path, content)
            .await
            .map_err(|source| ConfigError::Io {
                path: config_path.clone(),
                source,
            })?;

        info!("Created default configuration at {}", config_path.display());
        Ok(Some(config_path))
    }

    /// Render this configuration as TOML
    pub fn to_toml(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![PathBuf::from("./datasus-updater.toml")];
        if let Some(path) = Self::default_config_path() {
            search_paths.push(path);
        }

        let found = search_paths.into_iter().find(|path| path.exists());
        if let Some(path) = &found {
            debug!("Found config file: {}", path.display());
        }
        found
    }

    /// Default config file path for the current user
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("datasus-updater").join("config.toml"))
    }

    /// Load configuration from a TOML file
    async fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let config: AppConfig = toml::from_str(&content)?;
        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    fn generate_default_config_content() -> ConfigResult<String> {
        let body = Self::default().to_toml()?;
        Ok(format!(
            "# DATASUS Updater Configuration\n\
             # Installation roots default to the standard DATASUS folders on C:\\.\n\
             # Each product root keeps its installed version in {}.\n\
             # transfer_timeout_secs is an idle timeout: a download fails only\n\
             # when no data arrives for that long.\n\n{}",
            layout::VERSION_FILE_NAME,
            body
        ))
    }
}
