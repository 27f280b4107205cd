//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the fan-out point between request handlers and the
//! realtime channel. It is shared via `Arc<EventBus>` across the application.
//! Delivery is fire-and-forget: there is no acknowledgement and no replay.

use chrono::{DateTime, Utc};
use ctrack_core::notification::REALTIME_EVENT_NOTIFICATION;
use ctrack_core::types::DbId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// RealtimeEvent
// ---------------------------------------------------------------------------

/// A named event pushed to connected realtime clients.
///
/// Only `event` and `data` go over the wire (see [`RealtimeEvent::to_message`]);
/// the remaining fields are for logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeEvent {
    /// Event name, e.g. `"notification"`.
    pub event: String,

    /// Full JSON payload.
    pub data: serde_json::Value,

    /// Project the event is about, if any.
    pub project_id: Option<DbId>,

    /// Id of the user whose request produced the event.
    pub actor_user_id: Option<DbId>,

    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

/// Wire envelope sent to clients.
#[derive(Serialize)]
struct WireMessage<'a> {
    event: &'a str,
    data: &'a serde_json::Value,
}

impl RealtimeEvent {
    /// Create an event with an empty payload.
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            data: serde_json::Value::Object(Default::default()),
            project_id: None,
            actor_user_id: None,
            timestamp: Utc::now(),
        }
    }

    /// A `notification` event carrying the serialized notification.
    pub fn notification<T: Serialize>(notification: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::new(REALTIME_EVENT_NOTIFICATION).with_data(serde_json::to_value(notification)?))
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    pub fn with_project(mut self, project_id: DbId) -> Self {
        self.project_id = Some(project_id);
        self
    }

    pub fn with_actor(mut self, user_id: DbId) -> Self {
        self.actor_user_id = Some(user_id);
        self
    }

    /// JSON text frame for clients: `{"event": ..., "data": ...}`.
    pub fn to_message(&self) -> String {
        serde_json::to_string(&WireMessage {
            event: &self.event,
            data: &self.data,
        })
        .unwrap_or_else(|_| String::from("{}"))
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// ```rust
/// use ctrack_events::bus::{EventBus, RealtimeEvent};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(RealtimeEvent::new("notification"));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<RealtimeEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest un-consumed events are dropped and
    /// slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// With no subscribers the event is dropped.
    pub fn publish(&self, event: RealtimeEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("Realtime event dropped: no subscribers");
        }
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<RealtimeEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        let event = RealtimeEvent::new("notification")
            .with_project(42)
            .with_actor(7)
            .with_data(serde_json::json!({"id": 1}));

        bus.publish(event);

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.event, "notification");
        assert_eq!(received.project_id, Some(42));
        assert_eq!(received.actor_user_id, Some(7));
        assert_eq!(received.data["id"], 1);
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(RealtimeEvent::new("notification"));

        let e1 = rx1.recv().await.expect("subscriber 1 should receive");
        let e2 = rx2.recv().await.expect("subscriber 2 should receive");

        assert_eq!(e1.event, "notification");
        assert_eq!(e2.event, "notification");
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        bus.publish(RealtimeEvent::new("notification"));
    }

    #[test]
    fn wire_message_has_only_event_and_data() {
        let event = RealtimeEvent::new("notification")
            .with_actor(3)
            .with_data(serde_json::json!({"message": "x"}));
        let value: serde_json::Value = serde_json::from_str(&event.to_message()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"event": "notification", "data": {"message": "x"}})
        );
    }

    #[test]
    fn notification_constructor_serializes_payload() {
        #[derive(Serialize)]
        struct Payload {
            id: i64,
        }
        let event = RealtimeEvent::notification(&Payload { id: 9 }).unwrap();
        assert_eq!(event.event, REALTIME_EVENT_NOTIFICATION);
        assert_eq!(event.data["id"], 9);
    }
}
