//! Core engine of the DATASUS updater
//!
//! This module contains the version reconciliation and download
//! orchestration logic: the remote client, product naming rules, local
//! version markers, check results, download tasks and the coordinator that
//! ties them to a presenter.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use datasus_updater::app::{ClientConfig, Product, ProductCatalog, Reconciler, RemoteClient};
//! use datasus_updater::config::AppConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! let client = RemoteClient::new(&ClientConfig::from_app_config(&config))?;
//! let catalog = Arc::new(ProductCatalog::from_config(&config));
//!
//! let reconciler = Reconciler::new(Arc::new(client), catalog);
//! let result = reconciler.reconcile(Product::Bpa).await;
//! println!("{:?}", result.status);
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod client;
pub mod coordinator;
pub mod layout;
pub mod models;
pub mod reconcile;
pub mod selector;
pub mod store;
pub mod task;

// Re-export main public API
pub use client::{ClientConfig, ProgressFn, RemoteClient, RemoteSource};
pub use coordinator::{
    Coordinator, CoordinatorConfig, LoopExit, Presenter, SessionStats, Severity, StatusView,
};
pub use models::{ArtifactKind, Product, ProductCatalog, ProductLocation, SourceLocator};
pub use reconcile::{Reconciler, Reconciliation, ReconciliationStatus};
pub use selector::{select_latest, select_top_n, version_of, MatchRule, SelectionPlan};
pub use task::{Completion, DownloadOutcome, DownloadTask, MarkerUpdate, TaskId, TaskState};
