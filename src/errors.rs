//! Error types for the DATASUS updater
//!
//! Every I/O boundary returns one of these explicitly. Reconciliation and
//! download steps map them into terminal outcomes at their own boundary, so
//! nothing here is ever allowed to escape into the coordinator loop.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Listing and transfer failures, for both FTP and HTTP
///
/// Callers treat every variant the same way ("the remote side failed");
/// the variants exist so the displayed cause stays readable.
#[derive(Error, Debug)]
pub enum NetworkError {
    /// Could not resolve or reach the remote host
    #[error("Could not connect to {host}: {reason}")]
    Connect { host: String, reason: String },

    /// FTP command rejected or protocol failure
    #[error("FTP {operation} failed: {reason}")]
    Ftp { operation: String, reason: String },

    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("Server error: HTTP {status}")]
    ServerError { status: u16 },

    /// Operation exceeded its deadline
    #[error("Operation timed out after {after:?}")]
    Timeout { after: Duration },

    /// Invalid URL provided
    #[error("Invalid URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },

    /// Local write failed while receiving the payload
    #[error("File I/O error during transfer: {0}")]
    Io(#[from] std::io::Error),

    /// Could not move the finished temporary file into place
    #[error("Atomic file operation failed: could not rename {temp_path} to {final_path}: {source}")]
    AtomicOperationFailed {
        temp_path: PathBuf,
        final_path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Background worker died before reporting
    #[error("Transfer worker terminated unexpectedly: {reason}")]
    Worker { reason: String },
}

/// Why a product check could not produce a version comparison
#[derive(Error, Debug)]
pub enum CheckError {
    /// Listing failed
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// Listing succeeded but nothing matched the naming rule
    #[error("Nothing found on the server matching {expected}")]
    NotFound { expected: String },

    /// Unexpected failure inside the check itself
    #[error("Unexpected error during check: {message}")]
    Internal { message: String },
}

/// Local version marker failures
///
/// Only writes can fail; reads normalise every problem to "unknown version".
#[derive(Error, Debug)]
pub enum StoreError {
    /// Marker could not be written
    #[error("Failed to write version marker {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Product folder creation errors
#[derive(Error, Debug)]
pub enum LayoutError {
    /// Not allowed to create a required folder
    #[error("Permission denied creating {path}. Run the program as Administrator")]
    PermissionDenied { path: PathBuf },

    /// Any other I/O failure while creating folders
    #[error("Failed to create {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Archive extraction errors
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Archive could not be opened
    #[error("Failed to open archive {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Archive contents could not be extracted
    #[error("Failed to extract archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Extraction worker died before reporting
    #[error("Extraction worker terminated unexpectedly: {reason}")]
    Worker { reason: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Invalid configuration format
    #[error("Invalid configuration format: {0}")]
    InvalidFormat(#[from] toml::de::Error),

    /// Configuration could not be serialised
    #[error("Failed to serialise configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// Could not read or write the configuration file
    #[error("Configuration file I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Network error
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// Check error
    #[error(transparent)]
    Check(#[from] CheckError),

    /// Version marker error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Folder layout error
    #[error(transparent)]
    Layout(#[from] LayoutError),

    /// Archive error
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Check if re-triggering the same action later may succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::Network(_)
                | AppError::Check(CheckError::Network(_))
                | AppError::Check(CheckError::Internal { .. })
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Network(_) => "network",
            AppError::Check(_) => "check",
            AppError::Store(_) => "store",
            AppError::Layout(_) => "layout",
            AppError::Archive(_) => "archive",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Network result type alias
pub type NetworkResult<T> = std::result::Result<T, NetworkError>;

/// Check result type alias
pub type CheckResult<T> = std::result::Result<T, CheckError>;

/// Store result type alias
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Layout result type alias
pub type LayoutResult<T> = std::result::Result<T, LayoutError>;

/// Archive result type alias
pub type ArchiveResult<T> = std::result::Result<T, ArchiveError>;

/// Config result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        let err = AppError::Network(NetworkError::Timeout {
            after: Duration::from_secs(20),
        });
        assert_eq!(err.category(), "network");
        assert!(err.is_recoverable());

        let err = AppError::Check(CheckError::NotFound {
            expected: "bpamag*.exe".to_string(),
        });
        assert_eq!(err.category(), "check");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_check_error_wraps_network_cause() {
        let err = CheckError::from(NetworkError::Timeout {
            after: Duration::from_secs(20),
        });
        assert!(matches!(err, CheckError::Network(NetworkError::Timeout { .. })));
        assert_eq!(err.to_string(), "Operation timed out after 20s");
    }

    #[test]
    fn test_sub_second_timeout_message() {
        let err = NetworkError::Timeout {
            after: Duration::from_millis(300),
        };
        assert_eq!(err.to_string(), "Operation timed out after 300ms");
    }

    #[test]
    fn test_layout_permission_message() {
        let err = LayoutError::PermissionDenied {
            path: PathBuf::from("C:\\BPA"),
        };
        assert!(err.to_string().contains("Administrator"));
    }
}
