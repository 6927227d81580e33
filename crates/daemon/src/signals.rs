//! Shutdown signal handling for the HTTP receiver.
//!
//! Resolves on SIGTERM (Unix) or Ctrl+C so the server can drain in-flight
//! invocations before exiting.

use std::future::pending;

use tracing::{info, warn};

/// Wait for a shutdown signal (SIGTERM or Ctrl+C).
///
/// If a handler cannot be installed, that signal source is ignored and the
/// other one still works.
pub async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for Ctrl+C");
            pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
                pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("received SIGINT (Ctrl+C), shutting down");
        }
        _ = terminate => {
            info!("received SIGTERM, shutting down");
        }
    }
}
