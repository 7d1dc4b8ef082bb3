//! Process signal handling

use std::future::Future;
use std::io;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Cancel `shutdown` on SIGINT or SIGTERM
pub async fn cancel_on_signal(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    ctrl_c().await;

    info!("Shutdown signal received");
    shutdown.cancel();
}

async fn ctrl_c() {
    await_signal("SIGINT", tokio::signal::ctrl_c()).await
}

/// Resolve when `signal` fires
///
/// A handler that cannot be installed is logged and never resolves, so it
/// cannot be mistaken for a received signal.
pub async fn await_signal<F>(name: &'static str, signal: F)
where
    F: Future<Output = io::Result<()>>,
{
    if let Err(e) = signal.await {
        warn!(signal = name, error = %e, "Failed to install signal handler");
        std::future::pending::<()>().await;
    }
}
