//! In-process realtime event bus.
//!
//! - [`EventBus`] -- publish/subscribe hub backed by `tokio::sync::broadcast`.
//! - [`RealtimeEvent`] -- a named event with a JSON payload, published after
//!   the database transaction that produced it has committed.

pub mod bus;

pub use bus::{EventBus, RealtimeEvent};
