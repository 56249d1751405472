//! Shared fixtures for the integration tests
//!
//! A scripted remote source and a recording presenter, wired to a coordinator
//! rooted in a temporary directory.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::Semaphore;

use datasus_updater::app::task::TaskId;
use datasus_updater::app::{
    Coordinator, CoordinatorConfig, Presenter, Product, ProductCatalog, ProgressFn, RemoteSource,
    Severity, SourceLocator, StatusView,
};
use datasus_updater::config::{AppConfig, DirectoriesConfig};
use datasus_updater::errors::{NetworkError, NetworkResult};

/// Remote source serving in-memory listings and payloads
///
/// Unknown directories time out. With a gate, every fetch writes its bytes
/// and then waits for a permit before reporting success.
#[derive(Default)]
pub struct ScriptedSource {
    listings: HashMap<String, Vec<String>>,
    payloads: HashMap<String, Vec<u8>>,
    gate: Option<Arc<Semaphore>>,
    fetched: Mutex<Vec<String>>,
}

impl ScriptedSource {
    pub fn with_listing(mut self, directory: &str, files: &[&str]) -> Self {
        self.listings.insert(
            directory.to_string(),
            files.iter().map(|f| f.to_string()).collect(),
        );
        self
    }

    pub fn with_payload(mut self, key: &str, bytes: &[u8]) -> Self {
        self.payloads.insert(key.to_string(), bytes.to_vec());
        self
    }

    pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteSource for ScriptedSource {
    async fn list_files(&self, directory: &str) -> NetworkResult<Vec<String>> {
        self.listings
            .get(directory)
            .cloned()
            .ok_or(NetworkError::Timeout {
                after: Duration::from_secs(20),
            })
    }

    async fn fetch(
        &self,
        source: &SourceLocator,
        destination: &Path,
        progress: ProgressFn,
    ) -> NetworkResult<u64> {
        let key = match source {
            SourceLocator::Ftp { filename, .. } => filename.clone(),
            SourceLocator::Http { url } => url.clone(),
        };
        self.fetched.lock().unwrap().push(key.clone());

        let bytes = self
            .payloads
            .get(&key)
            .ok_or(NetworkError::ServerError { status: 550 })?;
        tokio::fs::create_dir_all(destination.parent().unwrap()).await?;
        tokio::fs::write(destination, bytes).await?;
        progress(bytes.len() as u64, Some(bytes.len() as u64));

        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await.unwrap();
        }
        Ok(bytes.len() as u64)
    }
}

/// Presenter that records what it was shown and answers from a script
#[derive(Default)]
pub struct RecordingPresenter {
    pub confirmations: VecDeque<bool>,
    pub directories: VecDeque<Option<PathBuf>>,
    pub statuses: HashMap<Product, StatusView>,
    pub bulk_rows: Option<Vec<String>>,
    pub prompts: Vec<String>,
    pub alerts: Vec<(Severity, String)>,
    pub logs: Vec<String>,
}

impl RecordingPresenter {
    pub fn confirming(answers: &[bool]) -> Self {
        Self {
            confirmations: answers.iter().copied().collect(),
            ..Default::default()
        }
    }
}

impl Presenter for RecordingPresenter {
    fn render_status(&mut self, product: Product, view: &StatusView) {
        self.statuses.insert(product, view.clone());
    }

    fn render_bulk_rows(&mut self, rows: &[String]) {
        self.bulk_rows = Some(rows.to_vec());
    }

    fn confirm(&mut self, _title: &str, message: &str) -> bool {
        self.prompts.push(message.to_string());
        self.confirmations.pop_front().unwrap_or(false)
    }

    fn choose_directory(&mut self, _title: &str) -> Option<PathBuf> {
        self.directories.pop_front().flatten()
    }

    fn alert(&mut self, severity: Severity, title: &str, _message: &str) {
        self.alerts.push((severity, title.to_string()));
    }

    fn log(&mut self, _severity: Severity, message: &str) {
        self.logs.push(message.to_string());
    }

    fn transfer_progress(&mut self, _id: TaskId, _filename: &str, _bytes: u64, _total: Option<u64>) {}
}

/// Coordinator over a temporary installation root
pub struct Harness {
    pub coordinator: Coordinator<RecordingPresenter>,
    pub source: Arc<ScriptedSource>,
    pub root: TempDir,
}

impl Harness {
    pub fn new(source: ScriptedSource, presenter: RecordingPresenter) -> Self {
        let root = TempDir::new().unwrap();
        let app_config = AppConfig {
            directories: DirectoriesConfig::rooted_at(root.path()),
            ..Default::default()
        };
        let catalog = Arc::new(ProductCatalog::from_config(&app_config));
        let source = Arc::new(source);

        let coordinator = Coordinator::new(
            CoordinatorConfig::default().with_drain_interval(Duration::from_millis(5)),
            Arc::clone(&source) as Arc<dyn RemoteSource>,
            catalog,
            presenter,
        );
        Self {
            coordinator,
            source,
            root,
        }
    }

    /// Version marker of a product
    pub fn marker_path(&self, product: Product) -> PathBuf {
        self.coordinator
            .catalog()
            .location(product)
            .version_file
            .clone()
            .unwrap()
    }

    pub fn marker(&self, product: Product) -> Option<String> {
        std::fs::read_to_string(self.marker_path(product)).ok()
    }

    pub fn write_marker(&self, product: Product, value: &str) {
        let path = self.marker_path(product);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, value).unwrap();
    }
}
