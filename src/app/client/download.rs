//! Atomic destination handling shared by both transports
//!
//! Bytes are written to a sibling temporary file and renamed over the final
//! path only after the transport reports success, so a failed transfer never
//! leaves a truncated installer where the user would run it.

use std::path::{Path, PathBuf};

use crate::constants::files;
use crate::errors::{NetworkError, NetworkResult};

/// Sibling temporary path for a destination (`setup.exe` -> `setup.exe.part`)
pub fn temp_path_for(destination: &Path) -> PathBuf {
    let mut name = destination.file_name().unwrap_or_default().to_os_string();
    name.push(files::TEMP_FILE_SUFFIX);
    destination.with_file_name(name)
}

/// Create the destination's parent directory and return the temporary path
pub async fn prepare_destination(destination: &Path) -> NetworkResult<PathBuf> {
    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(temp_path_for(destination))
}

/// Move a finished temporary file into place
pub async fn commit(temp_path: &Path, destination: &Path) -> NetworkResult<()> {
    tokio::fs::rename(temp_path, destination)
        .await
        .map_err(|source| NetworkError::AtomicOperationFailed {
            temp_path: temp_path.to_path_buf(),
            final_path: destination.to_path_buf(),
            source,
        })?;
    tracing::info!("Successfully downloaded: {}", destination.display());
    Ok(())
}

/// Remove a temporary file left by a failed transfer
pub async fn discard(temp_path: &Path) {
    if let Err(e) = tokio::fs::remove_file(temp_path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(
                "Could not remove partial download {}: {}",
                temp_path.display(),
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_temp_file_path_generation() {
        let temp_path = temp_path_for(Path::new("/tmp/bpamag202403.exe"));
        assert!(temp_path.to_string_lossy().ends_with("bpamag202403.exe.part"));
    }

    #[test]
    fn test_temp_file_path_no_extension() {
        let temp_path = temp_path_for(Path::new("/tmp/testfile"));
        assert!(temp_path.to_string_lossy().ends_with("testfile.part"));
    }

    #[tokio::test]
    async fn test_commit_moves_file() {
        let dir = tempdir().unwrap();
        let destination = dir.path().join("sub").join("setup.exe");

        let temp = prepare_destination(&destination).await.unwrap();
        tokio::fs::write(&temp, b"payload").await.unwrap();
        commit(&temp, &destination).await.unwrap();

        assert!(!temp.exists());
        assert_eq!(tokio::fs::read(&destination).await.unwrap(), b"payload");
    }

    #[tokio::test]
    async fn test_commit_failure_keeps_io_source() {
        let dir = tempdir().unwrap();
        let destination = dir.path().join("setup.exe");
        let temp = temp_path_for(&destination);

        let err = commit(&temp, &destination).await.unwrap_err();
        assert!(matches!(err, NetworkError::AtomicOperationFailed { .. }));
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.downcast_ref::<std::io::Error>().is_some());
        assert!(!destination.exists());
    }

    #[tokio::test]
    async fn test_discard_tolerates_missing_file() {
        let dir = tempdir().unwrap();
        let temp = dir.path().join("never-written.part");
        discard(&temp).await;
        assert!(!temp.exists());
    }
}
