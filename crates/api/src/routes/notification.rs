//! Route definitions for the `/notifications` resource.

use axum::routing::{get, patch};
use axum::Router;

use crate::handlers::notification;
use crate::state::AppState;

/// Routes mounted at `/notifications`.
///
/// ```text
/// GET    /        -> list_notifications (?status=&limit=&offset=)
/// PATCH  /{id}    -> update_notification
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(notification::list_notifications))
        .route("/{id}", patch(notification::update_notification))
}
