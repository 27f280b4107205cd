//! Route definitions shared by the reference vocabularies.

use axum::routing::get;
use axum::Router;

use crate::handlers::reference::{self, Vocabulary};
use crate::state::AppState;

/// Routes mounted at `/allocated-units`, `/construction-units` and
/// `/allocation-waves`.
///
/// ```text
/// GET    /        -> list
/// POST   /        -> create
/// GET    /{id}    -> get
/// PATCH  /{id}    -> rename
/// DELETE /{id}    -> delete
/// ```
pub fn router<V: Vocabulary>() -> Router<AppState> {
    Router::new()
        .route("/", get(reference::list::<V>).post(reference::create::<V>))
        .route(
            "/{id}",
            get(reference::get::<V>)
                .patch(reference::rename::<V>)
                .delete(reference::delete::<V>),
        )
}
