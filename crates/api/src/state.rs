use std::sync::Arc;

use crate::config::ServerConfig;
use crate::ws::ConnectionRegistry;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: ctrack_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Open realtime connections.
    pub connections: Arc<ConnectionRegistry>,
    /// Realtime event bus; handlers publish here after commit.
    pub event_bus: Arc<ctrack_events::EventBus>,
}
