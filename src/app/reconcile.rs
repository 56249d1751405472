//! Version reconciliation
//!
//! Compares what the server offers against the locally recorded version and
//! decides what, if anything, the user should download. Every check ends in
//! exactly one [`Reconciliation`]; failures become
//! [`ReconciliationStatus::CheckFailed`] instead of propagating.
//!
//! FPO is a two-phase product: until a base install is recorded the target is
//! the installer, afterwards it is the latest incremental update.
//!
//! ```text
//! Uninstalled --install--> Installed(v) --update--> Installed(v')
//!                              ^   |
//!                              +---+ up to date
//! ```

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::app::client::RemoteSource;
use crate::app::models::{Product, ProductCatalog, ProductLocation};
use crate::app::selector::{select_latest, select_top_n, version_of, MatchRule, SelectionPlan};
use crate::app::store;
use crate::constants::coordinator;
use crate::errors::{CheckError, CheckResult};

/// Outcome of one product check
#[derive(Debug)]
pub enum ReconciliationStatus {
    /// Local marker equals the latest remote identifier
    UpToDate { version: String },
    /// A newer (or unrecorded) remote file exists
    UpdateAvailable {
        local: Option<String>,
        remote: String,
        target: String,
    },
    /// Base installer required before updates apply
    NotInstalled { target: String },
    /// Listing failed or nothing matched
    CheckFailed(CheckError),
}

/// One product's check result, replacing any previous one wholesale
#[derive(Debug)]
pub struct Reconciliation {
    pub product: Product,
    pub status: ReconciliationStatus,
    /// Extra downloadable candidates, newest first (BDSIA table rows)
    pub bulk_rows: Vec<String>,
}

impl Reconciliation {
    /// Result for a check that could not complete
    pub fn failed(product: Product, error: CheckError) -> Self {
        Self {
            product,
            status: ReconciliationStatus::CheckFailed(error),
            bulk_rows: Vec::new(),
        }
    }

    fn with_status(product: Product, status: ReconciliationStatus) -> Self {
        Self {
            product,
            status,
            bulk_rows: Vec::new(),
        }
    }

    /// Remote file the user should fetch, if any
    pub fn target(&self) -> Option<&str> {
        match &self.status {
            ReconciliationStatus::UpdateAvailable { target, .. }
            | ReconciliationStatus::NotInstalled { target } => Some(target),
            _ => None,
        }
    }

    /// Whether the action button is enabled
    pub fn is_actionable(&self) -> bool {
        self.target().is_some()
    }
}

/// Runs product checks against a remote source and the local markers
pub struct Reconciler {
    source: Arc<dyn RemoteSource>,
    catalog: Arc<ProductCatalog>,
    bulk_rows: usize,
}

impl Reconciler {
    /// Create a reconciler offering the default number of bulk rows
    pub fn new(source: Arc<dyn RemoteSource>, catalog: Arc<ProductCatalog>) -> Self {
        Self {
            source,
            catalog,
            bulk_rows: coordinator::BULK_TABLE_ROWS,
        }
    }

    /// Override how many BDSIA rows are offered
    pub fn with_bulk_rows(mut self, bulk_rows: usize) -> Self {
        self.bulk_rows = bulk_rows;
        self
    }

    /// Check one product; never fails
    pub async fn reconcile(&self, product: Product) -> Reconciliation {
        debug!("Checking {} on the server", product);

        match self.try_reconcile(product).await {
            Ok(result) => {
                info!("{} check finished: {:?}", product, result.status);
                result
            }
            Err(e) => {
                warn!("{} check failed: {}", product, e);
                Reconciliation::failed(product, e)
            }
        }
    }

    async fn try_reconcile(&self, product: Product) -> CheckResult<Reconciliation> {
        let location = self.catalog.location(product);
        let files = self.source.list_files(&location.remote_dir).await?;

        match SelectionPlan::for_product(product, self.bulk_rows) {
            SelectionPlan::Latest(rule) => {
                let latest = select_latest(&files, rule).ok_or_else(|| not_found(rule))?;
                let local = local_version(location).await;
                Ok(Reconciliation::with_status(product, compare(local, latest)))
            }
            SelectionPlan::InstallerSplit { installer, update } => {
                let installer_file = select_latest(&files, installer);
                let update_file = select_latest(&files, update);
                if installer_file.is_none() && update_file.is_none() {
                    return Err(CheckError::NotFound {
                        expected: format!("{} or {}", installer.describe(), update.describe()),
                    });
                }

                let local = local_version(location).await;
                let status = if !is_installed(location, local.as_deref()).await {
                    let target = installer_file.ok_or_else(|| not_found(installer))?;
                    ReconciliationStatus::NotInstalled { target }
                } else {
                    let latest = update_file.ok_or_else(|| not_found(update))?;
                    compare(local, latest)
                };
                Ok(Reconciliation::with_status(product, status))
            }
            SelectionPlan::Top(rule, n) => {
                let rows = select_top_n(&files, rule, n);
                let newest = rows.first().cloned().ok_or_else(|| not_found(rule))?;
                let status = ReconciliationStatus::UpdateAvailable {
                    local: None,
                    remote: version_of(&newest),
                    target: newest,
                };
                Ok(Reconciliation {
                    product,
                    status,
                    bulk_rows: rows,
                })
            }
        }
    }
}

/// Exact string comparison between the marker and the remote identifier
fn compare(local: Option<String>, latest_file: String) -> ReconciliationStatus {
    let remote = version_of(&latest_file);
    match local {
        Some(version) if version == remote => ReconciliationStatus::UpToDate { version },
        local => ReconciliationStatus::UpdateAvailable {
            local,
            remote,
            target: latest_file,
        },
    }
}

async fn local_version(location: &ProductLocation) -> Option<String> {
    match &location.version_file {
        Some(path) => store::read_marker(path).await,
        None => None,
    }
}

async fn is_installed(location: &ProductLocation, local: Option<&str>) -> bool {
    local.is_some() && dir_exists(&location.install_dir).await
}

async fn dir_exists(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false)
}

fn not_found(rule: &MatchRule) -> CheckError {
    CheckError::NotFound {
        expected: rule.describe(),
    }
}
