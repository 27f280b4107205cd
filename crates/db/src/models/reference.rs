//! Reference vocabulary entry model (allocated units, construction units,
//! allocation waves share one shape).

use ctrack_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from any of the reference vocabulary tables.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceEntry {
    pub id: DbId,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Request body for creating or renaming an entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ReferenceInput {
    pub name: String,
}
