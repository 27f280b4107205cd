//! Route definitions for the `/users` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::user;
use crate::state::AppState;

/// Routes mounted at `/users`. Admin only.
///
/// ```text
/// GET    /        -> list_users
/// POST   /        -> create_user
/// GET    /{id}    -> get_user
/// PATCH  /{id}    -> update_user
/// DELETE /{id}    -> delete_user
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(user::list_users).post(user::create_user))
        .route(
            "/{id}",
            get(user::get_user)
                .patch(user::update_user)
                .delete(user::delete_user),
        )
}
