//! Zip extraction for downloaded archives
//!
//! The zip library is blocking, so extraction runs on the blocking pool.
//! Entry paths are sanitised by the library; nothing escapes `destination`.

use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::info;
use zip::ZipArchive;

use crate::errors::{ArchiveError, ArchiveResult};

/// Extract `archive` into `destination`, returning the number of entries
pub async fn extract_zip(archive: &Path, destination: &Path) -> ArchiveResult<usize> {
    let archive = archive.to_path_buf();
    let destination = destination.to_path_buf();

    tokio::task::spawn_blocking(move || extract_blocking(&archive, &destination))
        .await
        .map_err(|e| ArchiveError::Worker {
            reason: e.to_string(),
        })?
}

fn extract_blocking(archive: &PathBuf, destination: &Path) -> ArchiveResult<usize> {
    let file = File::open(archive).map_err(|source| ArchiveError::Open {
        path: archive.clone(),
        source,
    })?;
    let mut zip = ZipArchive::new(file)?;
    let entries = zip.len();

    std::fs::create_dir_all(destination).map_err(|source| ArchiveError::Open {
        path: destination.to_path_buf(),
        source,
    })?;
    zip.extract(destination)?;

    info!(
        "Extracted {} entries from {} into {}",
        entries,
        archive.display(),
        destination.display()
    );
    Ok(entries)
}
