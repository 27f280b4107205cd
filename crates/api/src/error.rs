use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ctrack_core::error::CoreError;
use serde::Serialize;

/// PostgreSQL SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

const SANITIZED: &str = "An internal error occurred";

/// Error returned by every handler.
///
/// Domain failures arrive as [`CoreError`]; database failures as
/// [`sqlx::Error`]. The response body is always `{"error", "code"}`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Malformed input that never reached the domain layer.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Failure outside the database (hashing, token signing). The message is
    /// logged, never returned.
    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

/// Status, machine-readable code and client-facing message.
struct Classified {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl Classified {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", SANITIZED)
    }
}

impl AppError {
    fn classify(&self) -> Classified {
        match self {
            AppError::Core(core) => classify_core(core),
            AppError::Database(err) => classify_sqlx(err),
            AppError::BadRequest(msg) => {
                Classified::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.as_str())
            }
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Request failed");
                Classified::internal()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let Classified {
            status,
            code,
            message,
        } = self.classify();
        (status, Json(ErrorBody { error: message, code })).into_response()
    }
}

fn classify_core(err: &CoreError) -> Classified {
    match err {
        CoreError::NotFound { entity, id } => Classified::new(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} with id {id} not found"),
        ),
        CoreError::Validation(msg) => {
            Classified::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.as_str())
        }
        // A transition the current approval state does not allow.
        CoreError::Conflict(msg) => Classified::new(StatusCode::BAD_REQUEST, "CONFLICT", msg.as_str()),
        CoreError::Unauthorized(msg) => {
            Classified::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.as_str())
        }
        CoreError::Forbidden(msg) => {
            Classified::new(StatusCode::FORBIDDEN, "FORBIDDEN", msg.as_str())
        }
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Domain invariant violated");
            Classified::internal()
        }
    }
}

/// `RowNotFound` is 404; a unique violation on one of our `uq_*` constraints
/// is 400 DUPLICATE; anything else is a sanitized 500.
fn classify_sqlx(err: &sqlx::Error) -> Classified {
    if let sqlx::Error::RowNotFound = err {
        return Classified::new(StatusCode::NOT_FOUND, "NOT_FOUND", "Resource not found");
    }
    if let sqlx::Error::Database(db_err) = err {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            if let Some(message) = db_err.constraint().and_then(duplicate_message) {
                return Classified::new(StatusCode::BAD_REQUEST, "DUPLICATE", message);
            }
        }
    }
    tracing::error!(error = %err, "Database error");
    Classified::internal()
}

/// Client-facing message for a unique constraint, `None` for constraints that
/// are not ours to report.
fn duplicate_message(constraint: &str) -> Option<String> {
    match constraint {
        "uq_users_username" => Some("Username already exists".to_string()),
        // Serials are allocated under the per-type lock; a clash here is a
        // bug, not user input.
        "uq_projects_type_serial" => None,
        other if other.starts_with("uq_") && other.ends_with("_name") => {
            Some("Name already exists".to_string())
        }
        other if other.starts_with("uq_") => {
            Some(format!("Duplicate value violates unique constraint: {other}"))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_clash_has_a_readable_message() {
        assert_eq!(
            duplicate_message("uq_users_username").as_deref(),
            Some("Username already exists")
        );
    }

    #[test]
    fn reference_name_clash_has_a_readable_message() {
        for constraint in [
            "uq_allocated_units_name",
            "uq_construction_units_name",
            "uq_allocation_waves_name",
        ] {
            assert_eq!(
                duplicate_message(constraint).as_deref(),
                Some("Name already exists")
            );
        }
    }

    #[test]
    fn serial_clash_is_not_reported_as_duplicate() {
        assert!(duplicate_message("uq_projects_type_serial").is_none());
        assert!(duplicate_message("users_pkey").is_none());
    }
}
