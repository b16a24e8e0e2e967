use std::sync::Arc;
use std::time::Duration;

use crate::ws::manager::WsManager;

/// A connection is considered stale after missing this many heartbeat
/// intervals without a Pong.
const STALE_AFTER_INTERVALS: i64 = 3;

/// Spawn a background task that sends periodic Ping frames to all connected
/// WebSocket clients and prunes connections that stopped answering.
///
/// The task runs until aborted via the returned `JoinHandle` (which happens
/// during shutdown).
pub fn start_heartbeat(
    ws_manager: Arc<WsManager>,
    interval_secs: u64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        let max_idle = chrono::Duration::seconds(interval_secs as i64 * STALE_AFTER_INTERVALS);

        loop {
            interval.tick().await;

            let pruned = ws_manager.prune_stale(max_idle).await;
            if pruned > 0 {
                tracing::info!(pruned, "Dropped stale WebSocket connections");
            }

            let count = ws_manager.connection_count().await;
            tracing::debug!(count, "WebSocket heartbeat ping");
            ws_manager.ping_all().await;
        }
    })
}
