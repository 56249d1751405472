//! Signal handling for an early exit
//!
//! In-flight transfers cannot be cancelled, so an interrupt only stops the
//! coordinator from waiting for them. Partial downloads stay in their
//! temporary files and markers are never written.

use tokio::signal;
use tracing::{info, warn};

/// Resolve when CTRL-C or SIGTERM arrives
///
/// If a handler cannot be installed the corresponding branch never resolves.
pub async fn interrupted() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Ctrl+C signal received"),
            Err(e) => {
                warn!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("SIGTERM signal received");
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
