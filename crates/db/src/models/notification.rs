//! Notification entity model.

use ctrack_core::notification::{NotificationKind, NotificationStatus};
use ctrack_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};

use crate::models::decode_text;

/// A row from the `notifications` table. Serialized as-is to the API and
/// to realtime subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: DbId,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub project_id: Option<DbId>,
    pub status: NotificationStatus,
    pub created_at: Timestamp,
    pub processed_at: Option<Timestamp>,
}

impl<'r> FromRow<'r, PgRow> for Notification {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            message: row.try_get("message")?,
            kind: decode_text(row, "notification_type")?,
            project_id: row.try_get("project_id")?,
            status: decode_text(row, "status")?,
            created_at: row.try_get("created_at")?,
            processed_at: row.try_get("processed_at")?,
        })
    }
}

/// DTO for appending a notification.
#[derive(Debug, Clone)]
pub struct CreateNotification {
    pub kind: NotificationKind,
    pub project_id: DbId,
    pub message: String,
}

impl CreateNotification {
    /// Build the notification announcing `kind` for the named project.
    pub fn for_project(kind: NotificationKind, project_id: DbId, project_name: &str) -> Self {
        Self {
            kind,
            project_id,
            message: kind.message(project_name),
        }
    }
}
