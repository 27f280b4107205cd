//! Bearer-token authentication.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use ctrack_core::capability::CapabilitySet;
use ctrack_core::error::CoreError;
use ctrack_core::roles::Role;
use ctrack_core::types::DbId;

use crate::auth::jwt::{Claims, JwtConfig};
use crate::error::AppError;
use crate::state::AppState;

/// The caller, decoded from `Authorization: Bearer <token>`.
///
/// `capabilities` is already widened for admins, so it can go straight into
/// the approval state machine.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: DbId,
    pub username: String,
    pub role: Role,
    pub capabilities: CapabilitySet,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            username: claims.username,
            role: claims.role,
            capabilities: CapabilitySet::effective(claims.role, claims.permissions.into()),
        }
    }
}

fn unauthorized(message: &str) -> AppError {
    AppError::Core(CoreError::Unauthorized(message.to_string()))
}

impl AuthUser {
    /// Decode a raw token. Any failure (bad signature, expiry, malformed)
    /// is the same 401.
    pub fn from_token(token: &str, config: &JwtConfig) -> Result<Self, AppError> {
        config
            .verify(token)
            .map(AuthUser::from)
            .map_err(|_| unauthorized("Invalid or expired token"))
    }
}

/// The token part of an `Authorization` header. The scheme is matched
/// case-insensitively.
fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| unauthorized("Missing Authorization header"))?;

    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(token.trim())
        }
        _ => Err(unauthorized(
            "Invalid Authorization format. Expected: Bearer <token>",
        )),
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        AuthUser::from_token(token, &state.config.jwt)
    }
}
