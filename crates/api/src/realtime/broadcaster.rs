//! Event-bus to WebSocket fan-out.

use std::sync::Arc;

use axum::extract::ws::Message;
use ctrack_events::RealtimeEvent;
use tokio::sync::broadcast;

use crate::ws::ConnectionRegistry;

/// Forwards every [`RealtimeEvent`] on the bus to all WebSocket clients.
///
/// There is no per-user filtering and no replay: a client that is not
/// connected when an event is published never sees it.
pub struct Broadcaster {
    connections: Arc<ConnectionRegistry>,
}

impl Broadcaster {
    pub fn new(connections: Arc<ConnectionRegistry>) -> Self {
        Self { connections }
    }

    /// Run the forwarding loop until the bus is dropped.
    pub async fn run(self, mut receiver: broadcast::Receiver<RealtimeEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => self.deliver(&event).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Realtime broadcaster lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, realtime broadcaster shutting down");
                    break;
                }
            }
        }
    }

    /// Push one event to every connection.
    pub async fn deliver(&self, event: &RealtimeEvent) {
        let text = event.to_message();
        let delivered = self.connections.push(Message::Text(text.into())).await;
        tracing::debug!(
            event = %event.event,
            project_id = ?event.project_id,
            delivered,
            "Realtime event broadcast"
        );
    }
}
