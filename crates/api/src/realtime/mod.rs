//! Realtime fan-out.
//!
//! Handlers publish notifications onto the event bus after their transaction
//! commits; the [`Broadcaster`] subscribes to the bus and pushes every event
//! to all connected WebSocket clients.

pub mod broadcaster;

pub use broadcaster::Broadcaster;

use ctrack_core::types::DbId;
use ctrack_db::models::notification::Notification;
use ctrack_events::{EventBus, RealtimeEvent};

/// Publish each notification as a `notification` event. Call only after the
/// transaction that wrote them has committed.
pub fn publish_notifications(bus: &EventBus, actor_user_id: DbId, notifications: &[Notification]) {
    for notification in notifications {
        let event = match RealtimeEvent::notification(notification) {
            Ok(event) => event.with_actor(actor_user_id),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    notification_id = notification.id,
                    "Failed to serialize notification for broadcast"
                );
                continue;
            }
        };
        let event = match notification.project_id {
            Some(project_id) => event.with_project(project_id),
            None => event,
        };
        bus.publish(event);
    }
}
