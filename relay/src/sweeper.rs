//! Background task that evicts registrations whose heartbeat has gone
//! stale.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::registry::{Registry, HEARTBEAT_INTERVAL, HEARTBEAT_TIMEOUT};

pub async fn run(registry: Arc<Registry>, shutdown: CancellationToken) {
    let mut ticker = tokio::time::interval(HEARTBEAT_INTERVAL);
    ticker.tick().await; // first tick fires immediately; skip it so we don't sweep at t=0

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                for host in registry.sweep(HEARTBEAT_TIMEOUT) {
                    info!(%host, "heartbeat timed out, evicting registration");
                }
            }
        }
    }
}
