//! Presentation boundary
//!
//! The coordinator drives whatever draws the dashboard through
//! [`Presenter`]. Every call happens on the coordinator's loop, never from a
//! worker. Prompts block that loop until answered; workers keep running.

use std::path::PathBuf;

use crate::app::models::Product;
use crate::app::reconcile::{Reconciliation, ReconciliationStatus};
use crate::app::task::TaskId;

/// Colour class of a status line or notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// What one product row shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusView {
    pub message: String,
    pub severity: Severity,
    /// Action button label; `None` means the button is disabled
    pub action: Option<String>,
}

impl StatusView {
    /// Whether the action button is enabled
    pub fn action_enabled(&self) -> bool {
        self.action.is_some()
    }
}

impl From<&Reconciliation> for StatusView {
    fn from(result: &Reconciliation) -> Self {
        let product = result.product;
        match &result.status {
            ReconciliationStatus::UpToDate { version } => StatusView {
                message: format!("Installed: {} (up to date)", version),
                severity: Severity::Success,
                action: None,
            },
            ReconciliationStatus::UpdateAvailable { remote, .. } if product == Product::Bdsia => {
                StatusView {
                    message: format!(
                        "{} recent tables on the server, newest {}",
                        result.bulk_rows.len(),
                        remote
                    ),
                    severity: Severity::Info,
                    action: Some(format!("Download {}", product)),
                }
            }
            ReconciliationStatus::UpdateAvailable { local, remote, .. } => StatusView {
                message: format!(
                    "Installed: {}. Available: {}",
                    local.as_deref().unwrap_or("none"),
                    remote
                ),
                severity: Severity::Warning,
                action: Some(format!("Download {}", product)),
            },
            ReconciliationStatus::NotInstalled { .. } => StatusView {
                message: "Not installed. The base installer must be downloaded first.".to_string(),
                severity: Severity::Error,
                action: Some(format!("Download {} installer", product)),
            },
            ReconciliationStatus::CheckFailed(e) => StatusView {
                message: format!("Check failed: {}", e),
                severity: Severity::Error,
                action: None,
            },
        }
    }
}

/// Drawing and prompting primitives the coordinator needs
pub trait Presenter {
    /// Replace a product's status row
    fn render_status(&mut self, product: Product, view: &StatusView);

    /// Replace the bulk-table rows; an empty slice disables every row
    fn render_bulk_rows(&mut self, rows: &[String]);

    /// Ask a yes/no question
    fn confirm(&mut self, title: &str, message: &str) -> bool;

    /// Ask for a directory; `None` when the user cancels
    fn choose_directory(&mut self, title: &str) -> Option<PathBuf>;

    /// Show a message the user must acknowledge
    fn alert(&mut self, severity: Severity, title: &str, message: &str);

    /// Append a line to the notification log
    fn log(&mut self, severity: Severity, message: &str);

    /// Bytes received so far for a running download
    fn transfer_progress(&mut self, _id: TaskId, _filename: &str, _bytes: u64, _total: Option<u64>) {
    }

    /// A running download ended, successfully or not
    fn transfer_finished(&mut self, _id: TaskId) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{CheckError, NetworkError};

    fn view(product: Product, status: ReconciliationStatus) -> StatusView {
        StatusView::from(&Reconciliation {
            product,
            status,
            bulk_rows: Vec::new(),
        })
    }

    #[test]
    fn test_up_to_date_disables_action() {
        let view = view(
            Product::Bpa,
            ReconciliationStatus::UpToDate {
                version: "bpamag202403".to_string(),
            },
        );
        assert_eq!(view.severity, Severity::Success);
        assert!(!view.action_enabled());
        assert!(view.message.contains("bpamag202403"));
    }

    #[test]
    fn test_update_available_enables_action() {
        let view = view(
            Product::Sia,
            ReconciliationStatus::UpdateAvailable {
                local: None,
                remote: "instsia2403".to_string(),
                target: "instsia2403.exe".to_string(),
            },
        );
        assert_eq!(view.severity, Severity::Warning);
        assert_eq!(view.action.as_deref(), Some("Download SIA"));
        assert_eq!(view.message, "Installed: none. Available: instsia2403");
    }

    #[test]
    fn test_not_installed_offers_installer() {
        let view = view(
            Product::Fpo,
            ReconciliationStatus::NotInstalled {
                target: "FPO_Instalador.exe".to_string(),
            },
        );
        assert_eq!(view.severity, Severity::Error);
        assert_eq!(view.action.as_deref(), Some("Download FPO installer"));
    }

    #[test]
    fn test_failure_is_error_without_action() {
        let view = view(
            Product::Bpa,
            ReconciliationStatus::CheckFailed(CheckError::Network(NetworkError::Timeout {
                after: std::time::Duration::from_secs(20),
            })),
        );
        assert_eq!(view.severity, Severity::Error);
        assert!(!view.action_enabled());
        assert!(view.message.contains("timed out"));
    }
}
