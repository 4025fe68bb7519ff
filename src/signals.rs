//! Host shutdown signals translated into job cancellation.

use crate::job::CancelSource;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Listen for Ctrl-C (and SIGTERM on Unix) and cancel `source` on the first
/// one. Later signals are logged and otherwise ignored.
pub fn spawn_shutdown_listener(source: CancelSource) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let Some(signal) = wait_for_shutdown().await else {
                return;
            };
            if source.cancel() {
                info!(signal, "shutdown requested, cancelling job");
            } else {
                info!(signal, "shutdown already in progress");
            }
        }
    })
}

#[cfg(unix)]
async fn wait_for_shutdown() -> Option<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            warn!(error = %e, "failed to listen for SIGTERM; only Ctrl-C will cancel");
            return ctrl_c().await;
        }
    };

    tokio::select! {
        signal = ctrl_c() => signal,
        _ = terminate.recv() => Some("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown() -> Option<&'static str> {
    ctrl_c().await
}

async fn ctrl_c() -> Option<&'static str> {
    match tokio::signal::ctrl_c().await {
        Ok(()) => Some("SIGINT"),
        Err(e) => {
            warn!(error = %e, "failed to listen for Ctrl-C");
            None
        }
    }
}
