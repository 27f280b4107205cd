//! Handlers for the `/notifications` resource.

use axum::extract::State;
use ctrack_core::error::CoreError;
use ctrack_core::notification::NotificationStatus;
use ctrack_core::types::DbId;
use ctrack_db::models::notification::Notification;
use ctrack_db::repositories::NotificationRepo;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::extract::{Json, Path, Query};
use crate::middleware::auth::AuthUser;
use crate::query::NotificationQuery;
use crate::realtime::publish_notifications;
use crate::state::AppState;

/// Request body for `PATCH /notifications/{id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateNotificationRequest {
    pub status: NotificationStatus,
}

/// GET /api/notifications?status=
///
/// Newest first.
pub async fn list_notifications(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(params): Query<NotificationQuery>,
) -> AppResult<Json<Vec<Notification>>> {
    let (limit, offset) = params.clamped();
    let notifications = NotificationRepo::list(&state.pool, params.status, limit, offset).await?;
    Ok(Json(notifications))
}

/// PATCH /api/notifications/{id}
///
/// Notifications only move forward: the one accepted status is
/// `processed`, and repeating it is a no-op.
pub async fn update_notification(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateNotificationRequest>,
) -> AppResult<Json<Notification>> {
    if input.status != NotificationStatus::Processed {
        return Err(AppError::Core(CoreError::Validation(
            "Notifications can only be marked processed".into(),
        )));
    }

    let notification = NotificationRepo::mark_processed(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Notification",
            id,
        }))?;

    tracing::info!(notification_id = id, user_id = user.user_id, "Notification processed");
    publish_notifications(
        &state.event_bus,
        user.user_id,
        std::slice::from_ref(&notification),
    );
    Ok(Json(notification))
}
