//! Signal handling for graceful shutdown

use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook_tokio::Signals;
use futures::stream::StreamExt;
use tracing::{info, warn};

/// Wait for SIGTERM or SIGINT, falling back to Ctrl-C when signal
/// registration is unavailable
pub async fn shutdown_signal() {
    let mut signals = match Signals::new([SIGTERM, SIGINT]) {
        Ok(signals) => signals,
        Err(e) => {
            warn!("Failed to register signal handler: {}, waiting for Ctrl-C", e);
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl-C: {}", e);
            }
            return;
        }
    };

    if let Some(signal) = signals.next().await {
        info!("Received signal: {}", signal);
    }
}
