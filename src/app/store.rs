//! Local version markers
//!
//! Each product root holds a one-line `versao.txt` naming the last installer
//! downloaded through this tool. A missing or unreadable marker is a normal
//! state ("nothing known to be installed"), so reads never fail; writes do,
//! because a lost write makes a finished download look unrecorded.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::errors::{StoreError, StoreResult};

/// Read the recorded version, trimmed
///
/// Missing files, permission problems, invalid UTF-8 and blank files all
/// yield `None`.
pub async fn read_marker(path: &Path) -> Option<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => {
            let version = content.trim();
            if version.is_empty() {
                debug!("Version marker {} is empty", path.display());
                None
            } else {
                Some(version.to_string())
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No version marker at {}", path.display());
            None
        }
        Err(e) => {
            warn!("Could not read version marker {}: {}", path.display(), e);
            None
        }
    }
}

/// Overwrite the marker with exactly `value`
pub async fn write_marker(path: &Path, value: &str) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| StoreError::Write {
                path: path.to_path_buf(),
                source,
            })?;
    }

    tokio::fs::write(path, value.as_bytes())
        .await
        .map_err(|source| StoreError::Write {
            path: path.to_path_buf(),
            source,
        })?;

    info!("Recorded version {} in {}", value, path.display());
    Ok(())
}
