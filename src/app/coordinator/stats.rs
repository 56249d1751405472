//! Session counters
//!
//! Tallies what one run of the coordinator did, for the closing summary and
//! the process exit status.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Counters for one coordinator session
#[derive(Debug, Clone)]
pub struct SessionStats {
    /// Checks that produced a version comparison
    pub checks_completed: usize,
    /// Checks that ended in a failure
    pub checks_failed: usize,
    /// Downloads with all bytes on disk
    pub downloads_completed: usize,
    /// Downloads that failed in transit
    pub downloads_failed: usize,
    /// Downloads the user declined
    pub downloads_cancelled: usize,
    /// Bytes written by completed downloads
    pub bytes_downloaded: u64,
    /// Marker writes that failed after a successful download
    pub marker_failures: usize,
    /// Start of the session
    pub session_start: DateTime<Utc>,
}

impl Default for SessionStats {
    fn default() -> Self {
        Self {
            checks_completed: 0,
            checks_failed: 0,
            downloads_completed: 0,
            downloads_failed: 0,
            downloads_cancelled: 0,
            bytes_downloaded: 0,
            marker_failures: 0,
            session_start: Utc::now(),
        }
    }
}

impl SessionStats {
    /// Whether anything in the session went wrong
    pub fn has_failures(&self) -> bool {
        self.checks_failed > 0 || self.downloads_failed > 0 || self.marker_failures > 0
    }

    /// Time since the session started
    pub fn elapsed(&self) -> Duration {
        (Utc::now() - self.session_start)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// One-line summary for the closing log
    pub fn summary(&self) -> String {
        format!(
            "{} checks ({} failed), {} downloads ({} failed, {} cancelled), {} bytes in {:.1}s",
            self.checks_completed + self.checks_failed,
            self.checks_failed,
            self.downloads_completed + self.downloads_failed,
            self.downloads_failed,
            self.downloads_cancelled,
            self.bytes_downloaded,
            self.elapsed().as_secs_f64()
        )
    }
}
