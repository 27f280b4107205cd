//! Handlers for the `/users` resource.
//!
//! All handlers require the `admin` role via [`RequireAdmin`].

use axum::extract::State;
use axum::http::StatusCode;
use ctrack_core::capability::{CapabilitySet, PermissionFlags, PermissionPatch};
use ctrack_core::error::CoreError;
use ctrack_core::roles::Role;
use ctrack_core::types::DbId;
use ctrack_db::models::user::{CreateUser, UpdateUser, UserResponse};
use ctrack_db::repositories::UserRepo;
use serde::Deserialize;

use crate::auth::password;
use crate::error::{AppError, AppResult};
use crate::extract::{Json, Path};
use crate::middleware::rbac::RequireAdmin;
use crate::response::MessageResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request body for `POST /users`.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub permissions: PermissionFlags,
}

/// Request body for `PATCH /users/{id}`. Absent fields are left unchanged,
/// including individual permission flags.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub permissions: Option<PermissionPatch>,
}

fn user_not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound { entity: "User", id })
}

fn normalize_username(raw: &str) -> Result<String, CoreError> {
    let username = raw.trim();
    if username.is_empty() {
        return Err(CoreError::Validation("username is required".into()));
    }
    Ok(username.to_string())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/users
pub async fn create_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let username = normalize_username(&input.username)?;
    let password_hash = password::hash_new(input.password).await?;

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            username,
            password_hash,
            role: input.role,
            permissions: CapabilitySet::from(input.permissions),
        },
    )
    .await?;

    tracing::info!(
        user_id = user.id,
        role = %user.role,
        admin_id = admin.user_id,
        "User created"
    );
    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

/// GET /api/users
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> AppResult<Json<Vec<UserResponse>>> {
    let users = UserRepo::list(&state.pool).await?;
    Ok(Json(users.iter().map(UserResponse::from).collect()))
}

/// GET /api/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<Json<UserResponse>> {
    let user = UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| user_not_found(id))?;
    Ok(Json(UserResponse::from(&user)))
}

/// PATCH /api/users/{id}
///
/// Re-hashes the password when one is supplied.
pub async fn update_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateUserRequest>,
) -> AppResult<Json<UserResponse>> {
    let current = UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| user_not_found(id))?;

    let username = input.username.as_deref().map(normalize_username).transpose()?;
    let password_hash = match input.password {
        Some(password) => Some(password::hash_new(password).await?),
        None => None,
    };
    let update = UpdateUser {
        username,
        password_hash,
        role: input.role,
        permissions: input.permissions.map(|patch| patch.apply(current.permissions)),
    };

    let user = UserRepo::update(&state.pool, id, &update)
        .await?
        .ok_or_else(|| user_not_found(id))?;

    tracing::info!(user_id = id, admin_id = admin.user_id, "User updated");
    Ok(Json(UserResponse::from(&user)))
}

/// DELETE /api/users/{id}
///
/// Admin accounts cannot be deleted through the API.
pub async fn delete_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<Json<MessageResponse>> {
    let target = UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| user_not_found(id))?;
    if target.role.is_admin() {
        return Err(AppError::Core(CoreError::Forbidden(
            "Admin accounts cannot be deleted".into(),
        )));
    }

    if !UserRepo::delete(&state.pool, id).await? {
        return Err(user_not_found(id));
    }

    tracing::info!(user_id = id, admin_id = admin.user_id, "User deleted");
    Ok(Json(MessageResponse::new("User deleted")))
}
