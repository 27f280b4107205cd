//! Shared response body types for API handlers.

use ctrack_db::models::project::ProjectResponse;
use serde::Serialize;

/// Body of `GET /api/projects`.
#[derive(Debug, Serialize)]
pub struct ProjectPage {
    pub projects: Vec<ProjectResponse>,
    pub total: i64,
    pub page: i64,
    pub pages: i64,
}

/// Plain `{ "message": ... }` acknowledgement.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Body returned when a project was actually removed.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: String,
    /// How many projects of the same type received a new serial number.
    pub renumbered: usize,
}
