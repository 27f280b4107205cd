use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::ws::registry::ConnectionRegistry;

pub const HEARTBEAT_PERIOD: Duration = Duration::from_secs(30);

/// Ping every open connection once per `period`, first after one full
/// period. Pinging also prunes connections whose socket task has exited.
///
/// Runs until the handle is aborted.
pub fn spawn_heartbeat(registry: Arc<ConnectionRegistry>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if registry.is_empty().await {
                continue;
            }
            let reached = registry.ping().await;
            tracing::trace!(reached, "Heartbeat");
        }
    })
}
