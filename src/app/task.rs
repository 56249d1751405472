//! Download tasks and their lifecycle
//!
//! A [`DownloadTask`] is one confirmed, single-attempt transfer plus the
//! post-actions that run when it succeeds. Tasks are built from a check
//! result or for one of the bulk HTTP artifacts; they are never retried.
//!
//! ```text
//! Pending --confirmed--> Running --success/failure--> Done
//!    |
//!    +--declined--> Done(Cancelled)
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use crate::app::models::{ArtifactKind, Product, ProductCatalog, SourceLocator};
use crate::app::reconcile::Reconciliation;
use crate::app::selector::version_of;
use crate::constants::server;

/// Identifier of a task within one coordinator session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Version marker to persist once the bytes are on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerUpdate {
    pub path: PathBuf,
    pub value: String,
}

/// Follow-up scheduled after a successful download
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Run the product check again so the dashboard reflects the new marker
    Recheck(Product),
}

/// One transfer and its success post-actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    /// Product the download belongs to, if any
    pub product: Option<Product>,
    pub source: SourceLocator,
    pub destination: PathBuf,
    pub marker: Option<MarkerUpdate>,
    pub on_complete: Option<Completion>,
}

impl DownloadTask {
    /// Task for the action a check result offers, if it offers one
    ///
    /// Installers of marked products carry the target's identifier as the new
    /// marker value and recheck the product afterwards. BDSIA has no marker.
    pub fn for_reconciliation(result: &Reconciliation, catalog: &ProductCatalog) -> Option<Self> {
        let target = result.target()?;
        Some(Self::product_file(result.product, target, catalog))
    }

    /// Task for one row of the BDSIA table
    pub fn for_bulk_row(filename: &str, catalog: &ProductCatalog) -> Self {
        Self::product_file(Product::Bdsia, filename, catalog)
    }

    fn product_file(product: Product, filename: &str, catalog: &ProductCatalog) -> Self {
        let location = catalog.location(product);
        let marker = location.version_file.as_ref().map(|path| MarkerUpdate {
            path: path.clone(),
            value: version_of(filename),
        });
        let on_complete = product
            .has_version_marker()
            .then_some(Completion::Recheck(product));

        Self {
            product: Some(product),
            source: SourceLocator::Ftp {
                directory: location.remote_dir.clone(),
                filename: filename.to_string(),
            },
            destination: location.install_dir.join(filename),
            marker,
            on_complete,
        }
    }

    /// CNES full database archive, saved into the CNES root
    pub fn cnes(catalog: &ProductCatalog) -> Self {
        Self::archive(
            catalog.cnes_url(),
            catalog.cnes_dir().join(server::CNES_FILE_NAME),
        )
    }

    /// Firebird installer archive, saved into a user-chosen directory
    pub fn firebird(catalog: &ProductCatalog, directory: &Path) -> Self {
        Self::archive(
            catalog.firebird_url(),
            directory.join(server::FIREBIRD_FILE_NAME),
        )
    }

    fn archive(url: &str, destination: PathBuf) -> Self {
        Self {
            product: None,
            source: SourceLocator::Http {
                url: url.to_string(),
            },
            destination,
            marker: None,
            on_complete: None,
        }
    }

    /// File name the user sees in prompts
    pub fn filename(&self) -> String {
        self.destination
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Directory the file is saved into
    pub fn destination_dir(&self) -> &Path {
        self.destination.parent().unwrap_or(Path::new(""))
    }

    /// What the downloaded file is
    pub fn artifact_kind(&self) -> ArtifactKind {
        ArtifactKind::from_filename(&self.filename())
    }
}

/// Terminal outcome of a task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Bytes fully on disk
    Completed { bytes: u64 },
    /// Transfer failed; nothing was recorded
    Failed { reason: String },
    /// User declined the confirmation
    Cancelled,
}

/// Where a task is in its lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Running,
    Done(DownloadOutcome),
}

impl TaskState {
    /// Whether the task has ended
    pub fn is_done(&self) -> bool {
        matches!(self, TaskState::Done(_))
    }
}
