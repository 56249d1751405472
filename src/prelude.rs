//! Prelude module for the DATASUS Updater Library
//!
//! Re-exports the items most integrations need, so a single
//! `use datasus_updater::prelude::*;` is enough to run checks and downloads.
//!
//! # Usage
//!
//! ```rust,no_run
//! use datasus_updater::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = AppConfig::default();
//!     let client = RemoteClient::new(&ClientConfig::from_app_config(&config))?;
//!     let catalog = Arc::new(ProductCatalog::from_config(&config));
//!     let reconciler = Reconciler::new(Arc::new(client), catalog);
//!
//!     for product in Product::ALL {
//!         let result = reconciler.reconcile(product).await;
//!         println!("{}: {:?}", product, result.target());
//!     }
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, Result};

pub use crate::app::{
    ClientConfig,
    // Core orchestration
    Coordinator,
    CoordinatorConfig,
    DownloadOutcome,
    DownloadTask,
    Presenter,
    // Data types
    Product,
    ProductCatalog,
    Reconciler,
    Reconciliation,
    ReconciliationStatus,
    RemoteClient,
    RemoteSource,
    Severity,
    StatusView,
};

pub use crate::config::AppConfig;

// Commonly used constants
pub use crate::constants::{BULK_TABLE_ROWS, FTP_HOST, VERSION_FILE_NAME};

// Standard library re-exports that are commonly needed
pub use std::path::{Path, PathBuf};
pub use std::sync::Arc;

pub use tokio;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_imports() {
        let _coordinator_config = CoordinatorConfig::default();
        let _client_config = ClientConfig::default();
        let app_config = AppConfig::default();

        let catalog = ProductCatalog::from_config(&app_config);
        assert_eq!(catalog.required_folders().len(), 7);
        assert_eq!(BULK_TABLE_ROWS, 3);
    }

    #[test]
    fn test_std_reexports() {
        let _path = PathBuf::from("/tmp/test");
        let data = Arc::new(42);
        assert_eq!(*data, 42);
    }
}
