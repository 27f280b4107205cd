//! Realtime WebSocket channel: `/api/ws` upgrade, the connection registry
//! and the heartbeat.

mod handler;
mod heartbeat;
pub mod registry;

pub use handler::ws_handler;
pub use heartbeat::{spawn_heartbeat, HEARTBEAT_PERIOD};
pub use registry::{ConnectionId, ConnectionRegistry};
