//! Product folder layout
//!
//! The installed systems expect their roots plus a few exchange subfolders
//! to exist. Creation is idempotent: existing folders are left alone.

use std::io::ErrorKind;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::errors::{LayoutError, LayoutResult};

/// Create every missing folder, in order, returning the ones created
///
/// Stops at the first failure. A permission failure is reported as
/// [`LayoutError::PermissionDenied`].
pub async fn ensure_layout(folders: &[PathBuf]) -> LayoutResult<Vec<PathBuf>> {
    let mut created = Vec::new();

    for folder in folders {
        if tokio::fs::metadata(folder).await.is_ok() {
            debug!("Folder already present: {}", folder.display());
            continue;
        }

        tokio::fs::create_dir_all(folder)
            .await
            .map_err(|source| match source.kind() {
                ErrorKind::PermissionDenied => LayoutError::PermissionDenied {
                    path: folder.clone(),
                },
                _ => LayoutError::Io {
                    path: folder.clone(),
                    source,
                },
            })?;

        info!("Created folder {}", folder.display());
        created.push(folder.clone());
    }

    Ok(created)
}
