use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::realtime::ConnectionRegistry;

/// Log the live connection count every `every` until the task is aborted.
pub fn spawn_connection_reporter(registry: Arc<ConnectionRegistry>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(every);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick fires immediately
        tick.tick().await;

        loop {
            tick.tick().await;
            tracing::info!(connections = registry.total_connections(), "number of connections");
        }
    })
}
