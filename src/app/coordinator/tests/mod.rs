//! Unit tests for the coordinator loop
//!
//! End-to-end properties of checks and downloads live in the top-level
//! tests directory; these cover the coordinator's own bookkeeping.

use std::collections::{HashMap, VecDeque};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::app::client::{ProgressFn, RemoteSource};
use crate::app::models::SourceLocator;
use crate::config::{AppConfig, DirectoriesConfig};
use crate::errors::{NetworkError, NetworkResult};

use super::*;

/// Remote source backed by in-memory listings and payloads
#[derive(Default)]
pub struct FakeSource {
    listings: HashMap<String, Vec<String>>,
    payloads: HashMap<String, Vec<u8>>,
    panic_on_list: bool,
    fetched: Mutex<Vec<SourceLocator>>,
}

impl FakeSource {
    fn with_listing(mut self, directory: &str, files: &[&str]) -> Self {
        self.listings.insert(
            directory.to_string(),
            files.iter().map(|f| f.to_string()).collect(),
        );
        self
    }

    fn with_payload(mut self, key: &str, bytes: Vec<u8>) -> Self {
        self.payloads.insert(key.to_string(), bytes);
        self
    }

    fn fetch_count(&self) -> usize {
        self.fetched.lock().unwrap().len()
    }
}

#[async_trait]
impl RemoteSource for FakeSource {
    async fn list_files(&self, directory: &str) -> NetworkResult<Vec<String>> {
        if self.panic_on_list {
            panic!("listing exploded");
        }
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
        self.fetched.lock().unwrap().push(source.clone());
        let key = match source {
            SourceLocator::Ftp { filename, .. } => filename,
            SourceLocator::Http { url } => url,
        };
        let bytes = self
            .payloads
            .get(key)
            .ok_or(NetworkError::ServerError { status: 404 })?;

        tokio::fs::create_dir_all(destination.parent().unwrap()).await?;
        tokio::fs::write(destination, bytes).await?;
        progress(bytes.len() as u64, Some(bytes.len() as u64));
        Ok(bytes.len() as u64)
    }
}

/// Presenter that records every call and answers prompts from scripts
#[derive(Default)]
pub struct RecordingPresenter {
    pub confirmations: VecDeque<bool>,
    pub directories: VecDeque<Option<PathBuf>>,
    pub statuses: HashMap<Product, StatusView>,
    pub bulk_rows: Option<Vec<String>>,
    pub alerts: Vec<(Severity, String)>,
    pub logs: Vec<(Severity, String)>,
    pub progress_updates: usize,
}

impl Presenter for RecordingPresenter {
    fn render_status(&mut self, product: Product, view: &StatusView) {
        self.statuses.insert(product, view.clone());
    }

    fn render_bulk_rows(&mut self, rows: &[String]) {
        self.bulk_rows = Some(rows.to_vec());
    }

    fn confirm(&mut self, _title: &str, _message: &str) -> bool {
        self.confirmations.pop_front().unwrap_or(false)
    }

    fn choose_directory(&mut self, _title: &str) -> Option<PathBuf> {
        self.directories.pop_front().flatten()
    }

    fn alert(&mut self, severity: Severity, title: &str, _message: &str) {
        self.alerts.push((severity, title.to_string()));
    }

    fn log(&mut self, severity: Severity, message: &str) {
        self.logs.push((severity, message.to_string()));
    }

    fn transfer_progress(&mut self, _id: TaskId, _filename: &str, _bytes: u64, _total: Option<u64>) {
        self.progress_updates += 1;
    }
}

impl RecordingPresenter {
    fn logged(&self, needle: &str) -> bool {
        self.logs.iter().any(|(_, line)| line.contains(needle))
    }
}

/// Create a coordinator over a temporary installation root
pub fn create_test_coordinator(
    source: FakeSource,
    presenter: RecordingPresenter,
) -> (Coordinator<RecordingPresenter>, Arc<FakeSource>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let app_config = AppConfig {
        directories: DirectoriesConfig::rooted_at(temp_dir.path()),
        ..Default::default()
    };
    let catalog = Arc::new(ProductCatalog::from_config(&app_config));
    let source = Arc::new(source);
    let config = CoordinatorConfig::default().with_drain_interval(Duration::from_millis(5));

    let coordinator = Coordinator::new(
        config,
        Arc::clone(&source) as Arc<dyn RemoteSource>,
        catalog,
        presenter,
    );
    (coordinator, source, temp_dir)
}

fn zip_bytes(name: &str, content: &[u8]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer.start_file(name, SimpleFileOptions::default()).unwrap();
    writer.write_all(content).unwrap();
    writer.finish().unwrap().into_inner()
}

#[tokio::test]
async fn test_check_all_renders_every_product() {
    let source = FakeSource::default()
        .with_listing("/siasus/BPA/", &["bpamag202403.exe"])
        .with_listing("/siasus/sia/", &["instsia2403.exe", "BDSIA202403a.exe"])
        .with_listing("/siasus/fpo/", &["FPO_Instalador.exe", "fpo202403.exe"]);
    let (mut coordinator, _source, _tmp) =
        create_test_coordinator(source, RecordingPresenter::default());

    coordinator.start_check_all();
    assert_eq!(coordinator.in_flight(), 4);
    assert_eq!(coordinator.run_until_idle().await, LoopExit::Idle);

    let presenter = coordinator.presenter();
    assert_eq!(presenter.statuses.len(), 4);
    assert_eq!(
        presenter.bulk_rows.as_deref(),
        Some(&["BDSIA202403a.exe".to_string()][..])
    );
    assert_eq!(coordinator.stats().checks_completed, 4);
    assert!(coordinator.result(Product::Fpo).unwrap().is_actionable());
}

#[tokio::test]
async fn test_new_cycle_replaces_previous_result() {
    let source = FakeSource::default().with_listing("/siasus/BPA/", &["bpamag202403.exe"]);
    let (mut coordinator, _source, _tmp) =
        create_test_coordinator(source, RecordingPresenter::default());

    coordinator.start_check(Product::Bpa);
    coordinator.start_check(Product::Bpa);
    coordinator.run_until_idle().await;

    assert_eq!(coordinator.stats().checks_completed, 2);
    assert!(coordinator.result(Product::Bpa).is_some());
    assert!(coordinator.result(Product::Sia).is_none());
}

#[tokio::test]
async fn test_panicking_check_still_reports() {
    let source = FakeSource {
        panic_on_list: true,
        ..Default::default()
    };
    let (mut coordinator, _source, _tmp) =
        create_test_coordinator(source, RecordingPresenter::default());

    coordinator.start_check(Product::Sia);
    assert_eq!(coordinator.run_until_idle().await, LoopExit::Idle);

    let result = coordinator.result(Product::Sia).unwrap();
    assert!(matches!(
        result.status,
        ReconciliationStatus::CheckFailed(CheckError::Internal { .. })
    ));
    assert_eq!(
        coordinator.presenter().statuses[&Product::Sia].severity,
        Severity::Error
    );
}

#[tokio::test]
async fn test_layout_reports_created_folders() {
    let (mut coordinator, _source, tmp) =
        create_test_coordinator(FakeSource::default(), RecordingPresenter::default());

    coordinator.start_layout();
    coordinator.run_until_idle().await;

    assert!(tmp.path().join("BPA").join("EXPORTA").is_dir());
    assert!(tmp.path().join("INSTSIA").join("IMPORTA").is_dir());
    assert!(coordinator.presenter().logged("Folder created"));
    assert!(coordinator.presenter().alerts.is_empty());
}

#[tokio::test]
async fn test_trigger_before_check_alerts() {
    let (mut coordinator, source, _tmp) =
        create_test_coordinator(FakeSource::default(), RecordingPresenter::default());

    assert!(coordinator.trigger_action(Product::Bpa).is_none());
    assert_eq!(coordinator.presenter().alerts.len(), 1);
    assert_eq!(source.fetch_count(), 0);
}

#[tokio::test]
async fn test_up_to_date_product_has_no_action() {
    let source = FakeSource::default().with_listing("/siasus/BPA/", &["bpamag202403.exe"]);
    let (mut coordinator, source, _tmp) =
        create_test_coordinator(source, RecordingPresenter::default());
    let marker = coordinator
        .catalog()
        .location(Product::Bpa)
        .version_file
        .clone()
        .unwrap();
    crate::app::store::write_marker(&marker, "bpamag202403")
        .await
        .unwrap();

    coordinator.start_check(Product::Bpa);
    coordinator.run_until_idle().await;

    assert!(!coordinator.presenter().statuses[&Product::Bpa].action_enabled());
    assert!(coordinator.trigger_action(Product::Bpa).is_none());
    assert_eq!(source.fetch_count(), 0);
}

#[tokio::test]
async fn test_failed_download_mutates_nothing() {
    let source = FakeSource::default().with_listing("/siasus/BPA/", &["bpamag202403.exe"]);
    let presenter = RecordingPresenter {
        confirmations: VecDeque::from([true]),
        ..Default::default()
    };
    let (mut coordinator, _source, tmp) = create_test_coordinator(source, presenter);

    coordinator.start_check(Product::Bpa);
    coordinator.run_until_idle().await;
    let id = coordinator.trigger_action(Product::Bpa).unwrap();
    coordinator.run_until_idle().await;

    assert!(matches!(
        coordinator.task_state(id),
        Some(TaskState::Done(DownloadOutcome::Failed { .. }))
    ));
    assert!(!tmp.path().join("BPA").join("versao.txt").exists());
    assert!(!tmp.path().join("BPA").join("bpamag202403.exe").exists());
    assert_eq!(coordinator.stats().downloads_failed, 1);
    assert_eq!(
        coordinator.presenter().alerts,
        vec![(Severity::Error, "Download error".to_string())]
    );
    // No recheck was scheduled
    assert_eq!(coordinator.stats().checks_completed, 1);
}

#[tokio::test]
async fn test_progress_after_completion_is_ignored() {
    let source = FakeSource::default().with_listing("/siasus/BPA/", &["bpamag202403.exe"]);
    let presenter = RecordingPresenter {
        confirmations: VecDeque::from([true]),
        ..Default::default()
    };
    let (mut coordinator, _source, _tmp) = create_test_coordinator(source, presenter);

    coordinator.start_check(Product::Bpa);
    coordinator.run_until_idle().await;
    let id = coordinator.trigger_action(Product::Bpa).unwrap();
    coordinator.run_until_idle().await;
    assert!(coordinator.task_state(id).is_some_and(TaskState::is_done));
    let shown = coordinator.presenter().progress_updates;

    // A timed-out transfer thread reporting late
    coordinator.queue.post(UiEvent::DownloadProgress {
        id,
        bytes: 4096,
        total: Some(8192),
    });
    coordinator.drain().await;

    assert_eq!(coordinator.presenter().progress_updates, shown);
}

#[tokio::test]
async fn test_archive_download_offers_extraction() {
    let tmp_out = TempDir::new().unwrap();
    let source = FakeSource::default().with_payload(
        crate::constants::server::CNES_URL,
        zip_bytes("CNES.GDB", b"database"),
    );
    let presenter = RecordingPresenter {
        confirmations: VecDeque::from([true, true]),
        directories: VecDeque::from([Some(tmp_out.path().to_path_buf())]),
        ..Default::default()
    };
    let (mut coordinator, _source, tmp) = create_test_coordinator(source, presenter);

    let id = coordinator.download_cnes();
    coordinator.run_until_idle().await;

    assert!(matches!(
        coordinator.task_state(id),
        Some(TaskState::Done(DownloadOutcome::Completed { .. }))
    ));
    assert!(tmp.path().join("CNES").join("SCNES4700-COMPLETA.ZIP").is_file());
    assert_eq!(
        std::fs::read(tmp_out.path().join("CNES.GDB")).unwrap(),
        b"database"
    );
    assert!(coordinator
        .presenter()
        .alerts
        .contains(&(Severity::Success, "Extraction finished".to_string())));
    assert!(coordinator.presenter().progress_updates > 0);
}

#[tokio::test]
async fn test_extraction_cancelled_without_directory() {
    let source = FakeSource::default().with_payload(
        crate::constants::server::CNES_URL,
        zip_bytes("CNES.GDB", b"database"),
    );
    let presenter = RecordingPresenter {
        confirmations: VecDeque::from([true, true]),
        directories: VecDeque::from([None]),
        ..Default::default()
    };
    let (mut coordinator, _source, _tmp) = create_test_coordinator(source, presenter);

    coordinator.download_cnes();
    coordinator.run_until_idle().await;

    assert!(coordinator.presenter().logged("Extraction cancelled"));
    assert_eq!(coordinator.in_flight(), 0);
}

#[tokio::test]
async fn test_firebird_needs_a_directory() {
    let (mut coordinator, source, _tmp) =
        create_test_coordinator(FakeSource::default(), RecordingPresenter::default());

    assert!(coordinator.download_firebird(None).is_none());
    assert!(coordinator.presenter().logged("Firebird download cancelled"));
    assert_eq!(source.fetch_count(), 0);
}

#[tokio::test]
async fn test_firebird_with_directory_saves_there() {
    let dest = TempDir::new().unwrap();
    let source = FakeSource::default()
        .with_payload(crate::constants::server::FIREBIRD_URL, zip_bytes("setup.exe", b"x"));
    let presenter = RecordingPresenter {
        // Confirm the download, decline extraction
        confirmations: VecDeque::from([true, false]),
        ..Default::default()
    };
    let (mut coordinator, _source, _tmp) = create_test_coordinator(source, presenter);

    coordinator.download_firebird(Some(dest.path().to_path_buf()));
    coordinator.run_until_idle().await;

    assert!(dest.path().join("INSTALADORFIREBIRD-155.ZIP").is_file());
    assert!(!dest.path().join("setup.exe").exists());
}
