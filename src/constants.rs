//! Application constants for the DATASUS updater
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain.

use std::time::Duration;

/// DATASUS server locations
pub mod server {
    /// Anonymous FTP host holding the installers
    pub const FTP_HOST: &str = "arpoador.datasus.gov.br";

    /// FTP control port
    pub const FTP_PORT: u16 = 21;

    /// Remote directory with BPA installers
    pub const BPA_PATH: &str = "/siasus/BPA/";

    /// Remote directory with SIA installers and BDSIA tables
    pub const SIA_PATH: &str = "/siasus/sia/";

    /// Remote directory with FPO installers and updates
    pub const FPO_PATH: &str = "/siasus/fpo/";

    /// Full CNES database archive
    pub const CNES_URL: &str =
        "https://cnes.datasus.gov.br/EstatisticasServlet?path=SCNES4700-COMPLETA.ZIP";

    /// File name the CNES archive is saved under
    pub const CNES_FILE_NAME: &str = "SCNES4700-COMPLETA.ZIP";

    /// Firebird 1.5.5 installer archive
    pub const FIREBIRD_URL: &str =
        "https://cnes.datasus.gov.br/EstatisticasServlet?path=INSTALADORFIREBIRD-155.ZIP";

    /// File name the Firebird archive is saved under
    pub const FIREBIRD_FILE_NAME: &str = "INSTALADORFIREBIRD-155.ZIP";
}

/// Local installation layout
pub mod layout {
    /// Default BPA root
    pub const BPA_DIR: &str = "C:\\BPA";

    /// Default SIA root
    pub const SIA_DIR: &str = "C:\\INSTSIA";

    /// Default FPO root
    pub const FPO_DIR: &str = "C:\\FPO";

    /// Default CNES root
    pub const CNES_DIR: &str = "C:\\CNES";

    /// Version marker file name inside each product root
    pub const VERSION_FILE_NAME: &str = "versao.txt";

    /// Export subfolder expected by BPA and FPO
    pub const EXPORT_DIR: &str = "EXPORTA";

    /// Import subfolder expected by SIA
    pub const IMPORT_DIR: &str = "IMPORTA";
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = "DATASUS-Updater/0.1.0";

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(20);

    /// Maximum number of redirects to follow
    pub const MAX_REDIRECTS: usize = 10;
}

/// Remote operation deadlines
pub mod limits {
    use super::Duration;

    /// Whole-operation deadline for a directory listing
    pub const LISTING_TIMEOUT: Duration = Duration::from_secs(20);

    /// A transfer fails when no bytes arrive for this long
    pub const TRANSFER_IDLE_TIMEOUT: Duration = Duration::from_secs(30);
}

/// File operation constants
pub mod files {
    /// Temporary file suffix for atomic operations
    pub const TEMP_FILE_SUFFIX: &str = ".part";

    /// Download chunk size for streaming (8KB)
    pub const DOWNLOAD_CHUNK_SIZE: usize = 8 * 1024;

    /// Extension that marks an artifact as an archive
    pub const ARCHIVE_EXTENSION: &str = "zip";
}

/// Coordinator and orchestration constants
pub mod coordinator {
    use super::Duration;

    /// How often the coordinator drains its task queue
    pub const DRAIN_INTERVAL: Duration = Duration::from_millis(100);

    /// Number of bulk-table rows offered for download
    pub const BULK_TABLE_ROWS: usize = 3;
}

// Re-export commonly used constants for convenience
pub use coordinator::{BULK_TABLE_ROWS, DRAIN_INTERVAL};
pub use files::TEMP_FILE_SUFFIX;
pub use http::USER_AGENT;
pub use layout::VERSION_FILE_NAME;
pub use server::FTP_HOST;
