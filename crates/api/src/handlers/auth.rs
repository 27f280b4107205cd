//! Handlers for login and the caller's own identity.

use axum::extract::State;
use ctrack_core::capability::CapabilitySet;
use ctrack_core::error::CoreError;
use ctrack_core::roles::Role;
use ctrack_core::types::DbId;
use ctrack_db::models::user::UserResponse;
use ctrack_db::repositories::UserRepo;
use serde::{Deserialize, Serialize};

use crate::auth::jwt::TokenSubject;
use crate::auth::password;
use crate::error::{AppError, AppResult};
use crate::extract::Json;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /api/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Successful login response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    /// Token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserResponse,
}

/// Identity decoded from the caller's token.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: DbId,
    pub username: String,
    pub role: Role,
    /// Effective permissions (admins hold all).
    pub permissions: CapabilitySet,
}

fn invalid_credentials() -> AppError {
    AppError::Core(CoreError::Unauthorized(
        "Invalid username or password".into(),
    ))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/login
///
/// Verify username + password and issue a signed token embedding the role
/// and permission flags.
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let user = UserRepo::find_by_username(&state.pool, input.username.trim())
        .await?
        .ok_or_else(invalid_credentials)?;

    let valid = password::verify(input.password, user.password_hash.clone()).await?;
    if !valid {
        tracing::warn!(user_id = user.id, "Failed login attempt");
        return Err(invalid_credentials());
    }

    let issued = state
        .config
        .jwt
        .issue(&TokenSubject {
            user_id: user.id,
            username: &user.username,
            role: user.role,
            permissions: user.permissions,
        })
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    tracing::info!(user_id = user.id, role = %user.role, "User logged in");

    Ok(Json(LoginResponse {
        token: issued.token,
        expires_in: issued.expires_in,
        user: UserResponse::from(&user),
    }))
}

/// GET /api/me
pub async fn me(user: AuthUser) -> Json<MeResponse> {
    Json(MeResponse {
        id: user.user_id,
        username: user.username,
        role: user.role,
        permissions: user.capabilities,
    })
}
