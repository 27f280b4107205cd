//! User entity model and DTOs.

use ctrack_core::capability::{CapabilitySet, PermissionFlags};
use ctrack_core::roles::Role;
use ctrack_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};

use crate::models::decode_text;

/// Full user row from the `users` table.
///
/// Contains the password hash -- NEVER serialize this to API responses directly.
/// Use [`UserResponse`] for external-facing output.
#[derive(Debug, Clone)]
pub struct User {
    pub id: DbId,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    /// Capabilities granted through the `can_*` columns.
    pub permissions: CapabilitySet,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    /// Capabilities the user actually holds (admins hold all).
    pub fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::effective(self.role, self.permissions)
    }
}

impl<'r> FromRow<'r, PgRow> for User {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let flags = PermissionFlags {
            add: row.try_get("can_add")?,
            edit: row.try_get("can_edit")?,
            delete: row.try_get("can_delete")?,
            approve: row.try_get("can_approve")?,
            assign: row.try_get("can_assign")?,
            allocate: row.try_get("can_allocate")?,
        };
        Ok(Self {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            password_hash: row.try_get("password_hash")?,
            role: decode_text(row, "role")?,
            permissions: flags.into(),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Safe user representation for API responses (no password hash).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: DbId,
    pub username: String,
    pub role: Role,
    pub permissions: CapabilitySet,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            role: user.role,
            permissions: user.permissions,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// DTO for creating a new user.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub permissions: CapabilitySet,
}

/// DTO for updating an existing user. All fields are optional.
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
    pub permissions: Option<CapabilitySet>,
}
