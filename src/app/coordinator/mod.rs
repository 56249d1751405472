//! Check and download coordination
//!
//! The coordinator is the single logical thread that owns everything the
//! user sees. Checks, downloads, folder creation and extraction each run on
//! their own short-lived worker; workers report back only by posting a
//! [`UiEvent`] onto the [`TaskQueue`], which the coordinator drains on a
//! fixed interval and applies in order.
//!
//! # Architecture
//!
//! - [`config`] - Drain interval and bulk-table size
//! - [`events`] - Worker events and the task queue
//! - [`presenter`] - The presentation boundary and status rendering
//! - [`signals`] - Early exit on CTRL-C
//! - [`stats`] - Session counters
//!
//! Every spawned worker posts exactly one terminal event, even if it panics,
//! so the coordinator always knows when it is idle.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use datasus_updater::app::{
//!     ClientConfig, Coordinator, CoordinatorConfig, ProductCatalog, RemoteClient,
//! };
//! use datasus_updater::cli::ConsolePresenter;
//! use datasus_updater::config::AppConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! let client = RemoteClient::new(&ClientConfig::from_app_config(&config))?;
//! let catalog = Arc::new(ProductCatalog::from_config(&config));
//!
//! let mut coordinator = Coordinator::new(
//!     CoordinatorConfig::from_app_config(&config),
//!     Arc::new(client),
//!     catalog,
//!     ConsolePresenter::new(false),
//! );
//! coordinator.start_layout();
//! coordinator.start_check_all();
//! coordinator.run_until_idle().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod events;
pub mod presenter;
pub mod signals;
pub mod stats;

#[cfg(test)]
pub mod tests;

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::app::archive;
use crate::app::client::{ProgressFn, RemoteSource};
use crate::app::layout;
use crate::app::models::{ArtifactKind, Product, ProductCatalog};
use crate::app::reconcile::{Reconciler, Reconciliation, ReconciliationStatus};
use crate::app::store;
use crate::app::task::{Completion, DownloadOutcome, DownloadTask, TaskId, TaskState};
use crate::errors::{ArchiveError, ArchiveResult, CheckError, LayoutError, LayoutResult};
use crate::errors::{NetworkError, NetworkResult};

pub use config::CoordinatorConfig;
pub use events::{TaskQueue, UiEvent};
pub use presenter::{Presenter, Severity, StatusView};
pub use stats::SessionStats;

/// How a wait on the coordinator loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// No worker is running
    Idle,
    /// Interrupted by a signal with workers still running
    Interrupted,
}

#[derive(Debug)]
struct TrackedTask {
    task: DownloadTask,
    state: TaskState,
}

/// Owner of check results, download tasks and the presenter
pub struct Coordinator<P: Presenter> {
    config: CoordinatorConfig,
    presenter: P,
    source: Arc<dyn RemoteSource>,
    catalog: Arc<ProductCatalog>,
    reconciler: Arc<Reconciler>,
    queue: TaskQueue,
    inbox: mpsc::UnboundedReceiver<UiEvent>,
    results: HashMap<Product, Reconciliation>,
    tasks: HashMap<TaskId, TrackedTask>,
    next_task: u64,
    in_flight: usize,
    stats: SessionStats,
}

impl<P: Presenter> Coordinator<P> {
    /// Create a coordinator; workers are spawned on the current Tokio runtime
    pub fn new(
        config: CoordinatorConfig,
        source: Arc<dyn RemoteSource>,
        catalog: Arc<ProductCatalog>,
        presenter: P,
    ) -> Self {
        let reconciler = Reconciler::new(Arc::clone(&source), Arc::clone(&catalog))
            .with_bulk_rows(config.bulk_rows);
        let (queue, inbox) = TaskQueue::channel();

        Self {
            config,
            presenter,
            source,
            catalog,
            reconciler: Arc::new(reconciler),
            queue,
            inbox,
            results: HashMap::new(),
            tasks: HashMap::new(),
            next_task: 1,
            in_flight: 0,
            stats: SessionStats::default(),
        }
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    pub fn catalog(&self) -> &ProductCatalog {
        &self.catalog
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Latest check result for a product
    pub fn result(&self, product: Product) -> Option<&Reconciliation> {
        self.results.get(&product)
    }

    /// Lifecycle state of a requested download
    pub fn task_state(&self, id: TaskId) -> Option<&TaskState> {
        self.tasks.get(&id).map(|tracked| &tracked.state)
    }

    /// Number of workers that have not reported yet
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Create the product folder layout in the background
    pub fn start_layout(&mut self) {
        let folders = self.catalog.required_folders();
        let first = folders.first().cloned().unwrap_or_default();

        self.spawn_worker(
            async move { UiEvent::LayoutFinished(layout::ensure_layout(&folders).await) },
            move |reason| {
                UiEvent::LayoutFinished(Err(LayoutError::Io {
                    path: first,
                    source: std::io::Error::other(reason),
                }))
            },
        );
    }

    /// Check every product; each check replaces that product's result
    pub fn start_check_all(&mut self) {
        self.presenter
            .log(Severity::Info, "Starting general check of all systems...");
        for product in Product::ALL {
            self.start_check(product);
        }
    }

    /// Check one product in the background
    pub fn start_check(&mut self, product: Product) {
        self.presenter
            .log(Severity::Info, &format!("Checking {} on the server...", product));
        let reconciler = Arc::clone(&self.reconciler);

        self.spawn_worker(
            async move { UiEvent::CheckCompleted(reconciler.reconcile(product).await) },
            move |message| {
                UiEvent::CheckCompleted(Reconciliation::failed(
                    product,
                    CheckError::Internal { message },
                ))
            },
        );
    }

    /// Request the download a product's last check offered
    pub fn trigger_action(&mut self, product: Product) -> Option<TaskId> {
        let Some(result) = self.results.get(&product) else {
            self.presenter.alert(
                Severity::Error,
                "Error",
                &format!("{} has not been checked yet. Run the check first.", product),
            );
            return None;
        };

        let Some(task) = DownloadTask::for_reconciliation(result, &self.catalog) else {
            self.presenter
                .log(Severity::Warning, &format!("{} has nothing to download.", product));
            return None;
        };

        Some(self.request_download(task))
    }

    /// Request the download of one BDSIA table row (0-based)
    pub fn trigger_bulk_download(&mut self, index: usize) -> Option<TaskId> {
        let row = self
            .results
            .get(&Product::Bdsia)
            .and_then(|result| result.bulk_rows.get(index))
            .cloned();

        match row {
            Some(filename) => {
                let task = DownloadTask::for_bulk_row(&filename, &self.catalog);
                Some(self.request_download(task))
            }
            None => {
                self.presenter.log(
                    Severity::Warning,
                    &format!("No BDSIA table in row {}.", index + 1),
                );
                None
            }
        }
    }

    /// Request the CNES database archive
    pub fn download_cnes(&mut self) -> TaskId {
        let task = DownloadTask::cnes(&self.catalog);
        self.request_download(task)
    }

    /// Request the Firebird installer archive, prompting for a folder if needed
    pub fn download_firebird(&mut self, directory: Option<PathBuf>) -> Option<TaskId> {
        let directory = directory.or_else(|| {
            self.presenter
                .choose_directory("Select a folder to save the Firebird installer")
        });

        let Some(directory) = directory else {
            self.presenter
                .log(Severity::Warning, "Firebird download cancelled.");
            return None;
        };

        let task = DownloadTask::firebird(&self.catalog, &directory);
        Some(self.request_download(task))
    }

    /// Confirm a task with the user and start it
    ///
    /// A declined task ends as [`DownloadOutcome::Cancelled`] without touching
    /// the filesystem.
    pub fn request_download(&mut self, task: DownloadTask) -> TaskId {
        let id = TaskId(self.next_task);
        self.next_task += 1;

        let filename = task.filename();
        let prompt = format!(
            "The file '{}' will be saved to:\n'{}'\n\nContinue?",
            filename,
            task.destination_dir().display()
        );
        self.tasks.insert(
            id,
            TrackedTask {
                task,
                state: TaskState::Pending,
            },
        );

        if !self.presenter.confirm("Confirm download", &prompt) {
            info!("Download {} of {} declined", id, filename);
            self.presenter.log(
                Severity::Warning,
                &format!("Download of {} cancelled by the user.", filename),
            );
            self.stats.downloads_cancelled += 1;
            self.set_state(id, TaskState::Done(DownloadOutcome::Cancelled));
            return id;
        }

        self.set_state(id, TaskState::Running);
        self.presenter
            .log(Severity::Info, &format!("Starting download of {}...", filename));

        let Some(tracked) = self.tasks.get(&id) else {
            return id;
        };
        let source = Arc::clone(&self.source);
        let locator = tracked.task.source.clone();
        let destination = tracked.task.destination.clone();
        debug!("Download {}: {} -> {}", id, locator.describe(), destination.display());

        let progress: ProgressFn = {
            let queue = self.queue.clone();
            Arc::new(move |bytes, total| {
                queue.post(UiEvent::DownloadProgress { id, bytes, total })
            })
        };

        self.spawn_worker(
            async move {
                let result = source.fetch(&locator, &destination, progress).await;
                UiEvent::DownloadFinished { id, result }
            },
            move |reason| UiEvent::DownloadFinished {
                id,
                result: Err(NetworkError::Worker { reason }),
            },
        );
        id
    }

    /// Drain the queue on the configured interval until no worker is left
    pub async fn run_until_idle(&mut self) -> LoopExit {
        let mut ticker = tokio::time::interval(self.config.drain_interval);
        let interrupt = signals::interrupted();
        tokio::pin!(interrupt);

        loop {
            self.drain().await;
            if self.in_flight == 0 {
                return LoopExit::Idle;
            }

            tokio::select! {
                _ = ticker.tick() => {}
                _ = &mut interrupt => {
                    warn!("Interrupted with {} operations still running", self.in_flight);
                    self.presenter.log(
                        Severity::Warning,
                        &format!("Interrupted; {} operations abandoned.", self.in_flight),
                    );
                    return LoopExit::Interrupted;
                }
            }
        }
    }

    /// Apply every queued event, returning how many were handled
    pub async fn drain(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.inbox.try_recv() {
            self.handle(event).await;
            handled += 1;
        }
        handled
    }

    async fn handle(&mut self, event: UiEvent) {
        if event.is_terminal() {
            self.in_flight = self.in_flight.saturating_sub(1);
        }

        match event {
            UiEvent::LayoutFinished(result) => self.on_layout(result),
            UiEvent::CheckCompleted(result) => self.on_check(result),
            UiEvent::DownloadProgress { id, bytes, total } => {
                // Progress can trail the terminal event of a transfer
                if let Some(tracked) = self.tasks.get(&id).filter(|t| !t.state.is_done()) {
                    let filename = tracked.task.filename();
                    self.presenter.transfer_progress(id, &filename, bytes, total);
                }
            }
            UiEvent::DownloadFinished { id, result } => self.on_download(id, result).await,
            UiEvent::ExtractionFinished {
                archive,
                destination,
                result,
            } => self.on_extraction(archive, destination, result),
        }
    }

    fn on_layout(&mut self, result: LayoutResult<Vec<PathBuf>>) {
        match result {
            Ok(created) => {
                for path in created {
                    self.presenter
                        .log(Severity::Info, &format!("Folder created: {}", path.display()));
                }
            }
            Err(e @ LayoutError::PermissionDenied { .. }) => {
                error!("Folder layout failed: {}", e);
                self.presenter.log(Severity::Error, &e.to_string());
                self.presenter
                    .alert(Severity::Error, "Permission error", &e.to_string());
            }
            Err(e) => {
                error!("Folder layout failed: {}", e);
                self.presenter.log(
                    Severity::Error,
                    &format!("Unexpected error creating folders: {}", e),
                );
            }
        }
    }

    fn on_check(&mut self, result: Reconciliation) {
        let product = result.product;
        let view = StatusView::from(&result);
        self.presenter.render_status(product, &view);
        if product == Product::Bdsia {
            self.presenter.render_bulk_rows(&result.bulk_rows);
        }

        match &result.status {
            ReconciliationStatus::CheckFailed(e) => {
                self.stats.checks_failed += 1;
                self.presenter
                    .log(Severity::Error, &format!("Error checking {}: {}", product, e));
            }
            ReconciliationStatus::UpToDate { version } => {
                self.stats.checks_completed += 1;
                self.presenter.log(
                    Severity::Info,
                    &format!("{} check finished. Online version: {}", product, version),
                );
            }
            ReconciliationStatus::UpdateAvailable { .. } if product == Product::Bdsia => {
                self.stats.checks_completed += 1;
                self.presenter.log(
                    Severity::Info,
                    &format!("{} recent BDSIA tables found.", result.bulk_rows.len()),
                );
            }
            ReconciliationStatus::UpdateAvailable { remote, .. } => {
                self.stats.checks_completed += 1;
                self.presenter.log(
                    Severity::Info,
                    &format!("{} check finished. Online version: {}", product, remote),
                );
            }
            ReconciliationStatus::NotInstalled { .. } => {
                self.stats.checks_completed += 1;
                self.presenter
                    .log(Severity::Info, &format!("{} check finished.", product));
            }
        }

        self.results.insert(product, result);
    }

    async fn on_download(&mut self, id: TaskId, result: NetworkResult<u64>) {
        self.presenter.transfer_finished(id);

        let Some(tracked) = self.tasks.get_mut(&id) else {
            warn!("Result for unknown download {}", id);
            return;
        };
        let filename = tracked.task.filename();

        match result {
            Ok(bytes) => {
                tracked.state = TaskState::Done(DownloadOutcome::Completed { bytes });
                let task = tracked.task.clone();
                self.stats.downloads_completed += 1;
                self.stats.bytes_downloaded += bytes;
                self.presenter.log(
                    Severity::Success,
                    &format!("Download of {} finished successfully.", filename),
                );
                self.after_download(task).await;
            }
            Err(e) => {
                tracked.state = TaskState::Done(DownloadOutcome::Failed {
                    reason: e.to_string(),
                });
                self.stats.downloads_failed += 1;
                self.presenter.log(
                    Severity::Error,
                    &format!("Download of {} failed: {}", filename, e),
                );
                self.presenter.alert(
                    Severity::Error,
                    "Download error",
                    &format!("The download of {} failed: {}", filename, e),
                );
            }
        }
    }

    /// Post-actions for a task whose bytes are fully on disk
    async fn after_download(&mut self, task: DownloadTask) {
        let filename = task.filename();

        match task.artifact_kind() {
            ArtifactKind::Archive => {
                let extract = self.presenter.confirm(
                    "Download finished",
                    &format!(
                        "{} downloaded successfully.\nExtract its contents now?",
                        filename
                    ),
                );
                if extract {
                    self.offer_extraction(task.destination.clone());
                }
            }
            ArtifactKind::Installer => {
                self.presenter.alert(
                    Severity::Success,
                    "Download finished",
                    &format!(
                        "Installer '{}' downloaded successfully.\n\nRun it to install or update the program.",
                        filename
                    ),
                );
                if let Some(marker) = &task.marker {
                    match store::write_marker(&marker.path, &marker.value).await {
                        Ok(()) => self.presenter.log(
                            Severity::Info,
                            &format!("Local version updated to {}.", marker.value),
                        ),
                        Err(e) => {
                            error!("{}", e);
                            self.stats.marker_failures += 1;
                            self.presenter.log(Severity::Error, &e.to_string());
                            self.presenter.alert(
                                Severity::Error,
                                "Version not recorded",
                                &format!(
                                    "{} was downloaded but the installed version could not be recorded: {}",
                                    filename, e
                                ),
                            );
                        }
                    }
                }
            }
        }

        if let Some(completion) = task.on_complete {
            self.run_completion(completion);
        }
    }

    fn run_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Recheck(product) => self.start_check(product),
        }
    }

    fn offer_extraction(&mut self, archive_path: PathBuf) {
        let name = archive_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.presenter.log(
            Severity::Info,
            &format!("Choose where to extract {}...", name),
        );

        let Some(destination) = self
            .presenter
            .choose_directory(&format!("Choose where to extract {}", name))
        else {
            self.presenter.log(Severity::Warning, "Extraction cancelled.");
            return;
        };

        self.presenter.log(
            Severity::Info,
            &format!("Extracting to {}...", destination.display()),
        );

        let (fallback_archive, fallback_destination) = (archive_path.clone(), destination.clone());
        self.spawn_worker(
            async move {
                let result = archive::extract_zip(&archive_path, &destination).await;
                UiEvent::ExtractionFinished {
                    archive: archive_path,
                    destination,
                    result,
                }
            },
            move |reason| UiEvent::ExtractionFinished {
                archive: fallback_archive,
                destination: fallback_destination,
                result: Err(ArchiveError::Worker { reason }),
            },
        );
    }

    fn on_extraction(
        &mut self,
        archive_path: PathBuf,
        destination: PathBuf,
        result: ArchiveResult<usize>,
    ) {
        match result {
            Ok(entries) => {
                self.presenter.log(
                    Severity::Success,
                    &format!(
                        "Extraction of {} finished ({} entries).",
                        archive_path.display(),
                        entries
                    ),
                );
                self.presenter.alert(
                    Severity::Success,
                    "Extraction finished",
                    &format!("Files extracted to:\n{}", destination.display()),
                );
            }
            Err(e) => {
                error!("Extraction of {} failed: {}", archive_path.display(), e);
                self.presenter
                    .log(Severity::Error, &format!("Failed to extract archive: {}", e));
                self.presenter.alert(
                    Severity::Error,
                    "Extraction error",
                    &format!("Could not extract the archive: {}", e),
                );
            }
        }
    }

    fn set_state(&mut self, id: TaskId, state: TaskState) {
        if let Some(tracked) = self.tasks.get_mut(&id) {
            tracked.state = state;
        }
    }

    /// Run `work` on its own task and post its event
    ///
    /// If the worker panics, `on_abort` builds the terminal event instead.
    fn spawn_worker<F, A>(&mut self, work: F, on_abort: A)
    where
        F: Future<Output = UiEvent> + Send + 'static,
        A: FnOnce(String) -> UiEvent + Send + 'static,
    {
        self.in_flight += 1;
        let queue = self.queue.clone();
        let handle = tokio::spawn(work);

        tokio::spawn(async move {
            let event = match handle.await {
                Ok(event) => event,
                Err(e) => {
                    error!("Background worker ended abnormally: {}", e);
                    on_abort(e.to_string())
                }
            };
            queue.post(event);
        });
    }
}
