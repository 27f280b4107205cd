//! Repository for the `notifications` table.

use ctrack_core::notification::{NotificationKind, NotificationStatus};
use ctrack_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::notification::{CreateNotification, Notification};

/// Column list for `notifications` queries.
const COLUMNS: &str =
    "id, message, notification_type, project_id, status, created_at, processed_at";

/// Provides append and status operations for notifications.
pub struct NotificationRepo;

impl NotificationRepo {
    /// Append a notification, returning the stored row.
    ///
    /// Takes a connection so the insert shares the transaction of the
    /// project change it announces.
    pub async fn create(
        conn: &mut PgConnection,
        input: &CreateNotification,
    ) -> Result<Notification, sqlx::Error> {
        let query = format!(
            "INSERT INTO notifications (message, notification_type, project_id) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(&input.message)
            .bind(input.kind.as_str())
            .bind(input.project_id)
            .fetch_one(conn)
            .await
    }

    /// List notifications newest-first, optionally only those in `status`.
    pub async fn list(
        pool: &PgPool,
        status: Option<NotificationStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notifications \
             WHERE ($1::text IS NULL OR status = $1) \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(status.map(NotificationStatus::as_str))
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Flip a notification to `processed`.
    ///
    /// Idempotent: an already-processed notification keeps its original
    /// `processed_at`. Returns `None` if no row with the given `id` exists.
    pub async fn mark_processed(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<Notification>, sqlx::Error> {
        let query = format!(
            "UPDATE notifications \
             SET status = 'processed', processed_at = COALESCE(processed_at, NOW()) \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Mark the still-pending notifications of a project as processed,
    /// restricted to `kind` when given. Returns the rows that flipped.
    pub async fn mark_processed_for_project(
        conn: &mut PgConnection,
        project_id: DbId,
        kind: Option<NotificationKind>,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let query = format!(
            "UPDATE notifications \
             SET status = 'processed', processed_at = NOW() \
             WHERE project_id = $1 AND status = 'pending' \
               AND ($2::text IS NULL OR notification_type = $2) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(project_id)
            .bind(kind.map(NotificationKind::as_str))
            .fetch_all(conn)
            .await
    }
}
