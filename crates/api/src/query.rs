//! Shared query parameter types for API handlers.

use ctrack_core::notification::NotificationStatus;
use ctrack_core::pagination::PageRequest;
use ctrack_core::project::{ApprovalStatus, ProjectType};
use ctrack_db::models::project::ProjectFilter;
use serde::Deserialize;

/// Query string of `GET /api/projects`
/// (`?type=&status=&pending=&page=&limit=`).
#[derive(Debug, Default, Deserialize)]
pub struct ProjectListParams {
    #[serde(rename = "type")]
    pub project_type: Option<ProjectType>,
    pub status: Option<ApprovalStatus>,
    pub pending: Option<bool>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl ProjectListParams {
    pub fn filter(&self) -> ProjectFilter {
        ProjectFilter {
            project_type: self.project_type,
            status: self.status,
            pending_only: self.pending.unwrap_or(false),
        }
    }

    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }
}

/// Notification listing parameters (`?status=&limit=&offset=`).
///
/// Values are clamped by [`NotificationQuery::clamped`].
#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    pub status: Option<NotificationStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Default number of notifications returned per request.
pub const DEFAULT_NOTIFICATION_LIMIT: i64 = 50;

/// Upper bound on notifications returned per request.
pub const MAX_NOTIFICATION_LIMIT: i64 = 200;

impl NotificationQuery {
    /// `(limit, offset)` with the limit clamped to `1..=MAX_NOTIFICATION_LIMIT`
    /// and the offset to `>= 0`.
    pub fn clamped(&self) -> (i64, i64) {
        let limit = self
            .limit
            .unwrap_or(DEFAULT_NOTIFICATION_LIMIT)
            .clamp(1, MAX_NOTIFICATION_LIMIT);
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_defaults_to_all_projects() {
        let params = ProjectListParams::default();
        assert!(!params.filter().pending_only);
        assert_eq!(params.page_request().page, 1);
    }

    #[test]
    fn notification_limits_are_clamped() {
        let query = NotificationQuery {
            status: None,
            limit: Some(10_000),
            offset: Some(-5),
        };
        assert_eq!(query.clamped(), (MAX_NOTIFICATION_LIMIT, 0));
        assert_eq!(NotificationQuery::default().clamped(), (DEFAULT_NOTIFICATION_LIMIT, 0));
    }
}
