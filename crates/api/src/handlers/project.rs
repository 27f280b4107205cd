//! Handlers for the `/projects` resource.
//!
//! Reads go straight to the repository; every write goes through
//! [`ProjectWorkflow`], which owns locking, notifications and broadcast.
//! Capability checks happen in the extractors, before any state is read.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ctrack_core::error::CoreError;
use ctrack_core::project::{NewProject, ProjectChanges, ProjectType};
use ctrack_core::types::DbId;
use ctrack_db::models::project::ProjectResponse;
use ctrack_db::repositories::ProjectRepo;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::extract::{Json, Path, Query};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{
    CanAdd, CanAllocate, CanApprove, CanAssign, CanDelete, CanEdit, RequireCapability,
};
use crate::query::ProjectListParams;
use crate::response::{DeleteResponse, ProjectPage};
use crate::state::AppState;
use crate::workflow::{DeleteOutcome, ProjectWorkflow, UpdateOutcome};

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request body for `PATCH /projects/{id}`: any subset of the editable
/// fields. `type` may be echoed back but must not change.
#[derive(Debug, Deserialize)]
pub struct UpdateProjectRequest {
    #[serde(rename = "type")]
    pub project_type: Option<ProjectType>,
    #[serde(flatten)]
    pub changes: ProjectChanges,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocateRequest {
    pub allocation_wave: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    pub assigned_to: String,
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// GET /api/projects?type=&status=&pending=&page=&limit=
pub async fn list_projects(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(params): Query<ProjectListParams>,
) -> AppResult<Json<ProjectPage>> {
    let filter = params.filter();
    let page = params.page_request();

    let total = ProjectRepo::count(&state.pool, &filter).await?;
    let projects = ProjectRepo::list(&state.pool, &filter, page.limit, page.offset()).await?;

    Ok(Json(ProjectPage {
        projects: projects.into_iter().map(ProjectResponse::from).collect(),
        total,
        page: page.page,
        pages: page.total_pages(total),
    }))
}

/// GET /api/projects/{id}
pub async fn get_project(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<ProjectResponse>> {
    let project = ProjectRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Project",
            id,
        }))?;
    Ok(Json(project.into()))
}

// ---------------------------------------------------------------------------
// Create / update / delete
// ---------------------------------------------------------------------------

/// POST /api/projects
pub async fn create_project(
    State(state): State<AppState>,
    RequireCapability(user, _): RequireCapability<CanAdd>,
    Json(input): Json<NewProject>,
) -> AppResult<(StatusCode, Json<ProjectResponse>)> {
    let project = ProjectWorkflow::from_state(&state)
        .create(&user, input)
        .await?;
    Ok((StatusCode::CREATED, Json(project.into())))
}

/// PATCH /api/projects/{id}
///
/// 200 when the change was applied, 202 when it was staged for approval.
pub async fn update_project(
    State(state): State<AppState>,
    RequireCapability(user, _): RequireCapability<CanEdit>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateProjectRequest>,
) -> AppResult<(StatusCode, Json<ProjectResponse>)> {
    let outcome = ProjectWorkflow::from_state(&state)
        .update(&user, id, input.project_type, input.changes)
        .await?;
    Ok(match outcome {
        UpdateOutcome::Applied(project) => (StatusCode::OK, Json(project.into())),
        UpdateOutcome::Staged(project) => (StatusCode::ACCEPTED, Json(project.into())),
    })
}

/// DELETE /api/projects/{id}
///
/// 200 with the renumber count when removed, 202 with the project when the
/// deletion was staged for approval.
pub async fn delete_project(
    State(state): State<AppState>,
    RequireCapability(user, _): RequireCapability<CanDelete>,
    Path(id): Path<DbId>,
) -> AppResult<Response> {
    let outcome = ProjectWorkflow::from_state(&state).delete(&user, id).await?;
    Ok(match outcome {
        DeleteOutcome::Removed { renumbered } => Json(DeleteResponse {
            message: "Project deleted".into(),
            renumbered,
        })
        .into_response(),
        DeleteOutcome::Staged(project) => {
            (StatusCode::ACCEPTED, Json(ProjectResponse::from(project))).into_response()
        }
    })
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

/// PATCH /api/projects/{id}/approve
pub async fn approve(
    State(state): State<AppState>,
    RequireCapability(user, _): RequireCapability<CanApprove>,
    Path(id): Path<DbId>,
) -> AppResult<Json<ProjectResponse>> {
    let project = ProjectWorkflow::from_state(&state).approve(&user, id).await?;
    Ok(Json(project.into()))
}

/// PATCH /api/projects/{id}/reject
pub async fn reject(
    State(state): State<AppState>,
    RequireCapability(user, _): RequireCapability<CanApprove>,
    Path(id): Path<DbId>,
) -> AppResult<Json<ProjectResponse>> {
    let project = ProjectWorkflow::from_state(&state).reject(&user, id).await?;
    Ok(Json(project.into()))
}

/// PATCH /api/projects/{id}/approve-edit
pub async fn approve_edit(
    State(state): State<AppState>,
    RequireCapability(user, _): RequireCapability<CanApprove>,
    Path(id): Path<DbId>,
) -> AppResult<Json<ProjectResponse>> {
    let project = ProjectWorkflow::from_state(&state)
        .approve_edit(&user, id)
        .await?;
    Ok(Json(project.into()))
}

/// PATCH /api/projects/{id}/reject-edit
pub async fn reject_edit(
    State(state): State<AppState>,
    RequireCapability(user, _): RequireCapability<CanApprove>,
    Path(id): Path<DbId>,
) -> AppResult<Json<ProjectResponse>> {
    let project = ProjectWorkflow::from_state(&state)
        .reject_edit(&user, id)
        .await?;
    Ok(Json(project.into()))
}

/// PATCH /api/projects/{id}/approve-delete
pub async fn approve_delete(
    State(state): State<AppState>,
    RequireCapability(user, _): RequireCapability<CanApprove>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DeleteResponse>> {
    let renumbered = ProjectWorkflow::from_state(&state)
        .approve_delete(&user, id)
        .await?;
    Ok(Json(DeleteResponse {
        message: "Project deleted".into(),
        renumbered,
    }))
}

/// PATCH /api/projects/{id}/reject-delete
pub async fn reject_delete(
    State(state): State<AppState>,
    RequireCapability(user, _): RequireCapability<CanApprove>,
    Path(id): Path<DbId>,
) -> AppResult<Json<ProjectResponse>> {
    let project = ProjectWorkflow::from_state(&state)
        .reject_delete(&user, id)
        .await?;
    Ok(Json(project.into()))
}

/// PATCH /api/projects/{id}/allocate
pub async fn allocate(
    State(state): State<AppState>,
    RequireCapability(user, _): RequireCapability<CanAllocate>,
    Path(id): Path<DbId>,
    Json(input): Json<AllocateRequest>,
) -> AppResult<Json<ProjectResponse>> {
    let project = ProjectWorkflow::from_state(&state)
        .allocate(&user, id, &input.allocation_wave)
        .await?;
    Ok(Json(project.into()))
}

/// PATCH /api/projects/{id}/assign
pub async fn assign(
    State(state): State<AppState>,
    RequireCapability(user, _): RequireCapability<CanAssign>,
    Path(id): Path<DbId>,
    Json(input): Json<AssignRequest>,
) -> AppResult<Json<ProjectResponse>> {
    let project = ProjectWorkflow::from_state(&state)
        .assign(&user, id, &input.assigned_to)
        .await?;
    Ok(Json(project.into()))
}
