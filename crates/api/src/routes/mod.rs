pub mod health;
pub mod notification;
pub mod project;
pub mod reference;
pub mod user;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::auth;
use crate::handlers::reference::{AllocatedUnits, AllocationWaves, ConstructionUnits};
use crate::state::AppState;
use crate::ws;

/// Build the `/api` route tree.
///
/// ```text
/// /ws                                  WebSocket (?token=)
///
/// /login                               login (public)
/// /me                                  caller identity
///
/// /users                               list, create (admin only)
/// /users/{id}                          get, update, delete (admin only)
///
/// /allocated-units(/{id})              reference CRUD
/// /construction-units(/{id})           reference CRUD
/// /allocation-waves(/{id})             reference CRUD
///
/// /notifications                       list (?status=)
/// /notifications/{id}                  mark processed
///
/// /projects                            list, create
/// /projects/{id}                       get, update, delete
/// /projects/{id}/<transition>          approve, reject, allocate, assign,
///                                      approve-edit, reject-edit,
///                                      approve-delete, reject-delete
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me))
        .nest("/users", user::router())
        .nest("/allocated-units", reference::router::<AllocatedUnits>())
        .nest("/construction-units", reference::router::<ConstructionUnits>())
        .nest("/allocation-waves", reference::router::<AllocationWaves>())
        .nest("/notifications", notification::router())
        .nest("/projects", project::router())
}
