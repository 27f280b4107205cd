//! Route definitions for the `/projects` resource.

use axum::routing::{get, patch};
use axum::Router;

use crate::handlers::project;
use crate::state::AppState;

/// Routes mounted at `/projects`.
///
/// ```text
/// GET    /                      -> list_projects
/// POST   /                      -> create_project
/// GET    /{id}                  -> get_project
/// PATCH  /{id}                  -> update_project
/// DELETE /{id}                  -> delete_project
/// PATCH  /{id}/approve          -> approve
/// PATCH  /{id}/reject           -> reject
/// PATCH  /{id}/allocate         -> allocate
/// PATCH  /{id}/assign           -> assign
/// PATCH  /{id}/approve-edit     -> approve_edit
/// PATCH  /{id}/reject-edit      -> reject_edit
/// PATCH  /{id}/approve-delete   -> approve_delete
/// PATCH  /{id}/reject-delete    -> reject_delete
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(project::list_projects).post(project::create_project),
        )
        .route(
            "/{id}",
            get(project::get_project)
                .patch(project::update_project)
                .delete(project::delete_project),
        )
        .route("/{id}/approve", patch(project::approve))
        .route("/{id}/reject", patch(project::reject))
        .route("/{id}/allocate", patch(project::allocate))
        .route("/{id}/assign", patch(project::assign))
        .route("/{id}/approve-edit", patch(project::approve_edit))
        .route("/{id}/reject-edit", patch(project::reject_edit))
        .route("/{id}/approve-delete", patch(project::approve_delete))
        .route("/{id}/reject-delete", patch(project::reject_delete))
}
