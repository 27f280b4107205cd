//! Repository for the `users` table.

use ctrack_core::capability::{Capability, CapabilitySet};
use ctrack_core::types::DbId;
use sqlx::PgPool;

use crate::models::user::{CreateUser, UpdateUser, User};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, username, password_hash, role, can_add, can_edit, can_delete, \
                        can_approve, can_assign, can_allocate, created_at, updated_at";

/// Provides CRUD operations for users.
pub struct UserRepo;

impl UserRepo {
    /// Insert a new user, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (username, password_hash, role, can_add, can_edit, \
                can_delete, can_approve, can_assign, can_allocate)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        let p = input.permissions;
        sqlx::query_as::<_, User>(&query)
            .bind(&input.username)
            .bind(&input.password_hash)
            .bind(input.role.as_str())
            .bind(p.contains(Capability::Add))
            .bind(p.contains(Capability::Edit))
            .bind(p.contains(Capability::Delete))
            .bind(p.contains(Capability::Approve))
            .bind(p.contains(Capability::Assign))
            .bind(p.contains(Capability::Allocate))
            .fetch_one(pool)
            .await
    }

    /// Find a user by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by username (case-sensitive).
    pub async fn find_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE username = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(pool)
            .await
    }

    /// List all users ordered by username.
    pub async fn list(pool: &PgPool) -> Result<Vec<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users ORDER BY username");
        sqlx::query_as::<_, User>(&query).fetch_all(pool).await
    }

    /// Update a user. Only non-`None` fields in `input` are applied; a
    /// permission set, when given, replaces all six flags.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateUser,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET
                username = COALESCE($2, username),
                password_hash = COALESCE($3, password_hash),
                role = COALESCE($4, role),
                can_add = COALESCE($5, can_add),
                can_edit = COALESCE($6, can_edit),
                can_delete = COALESCE($7, can_delete),
                can_approve = COALESCE($8, can_approve),
                can_assign = COALESCE($9, can_assign),
                can_allocate = COALESCE($10, can_allocate)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let flag = |cap: Capability| input.permissions.map(|p: CapabilitySet| p.contains(cap));
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(&input.username)
            .bind(&input.password_hash)
            .bind(input.role.map(|r| r.as_str()))
            .bind(flag(Capability::Add))
            .bind(flag(Capability::Edit))
            .bind(flag(Capability::Delete))
            .bind(flag(Capability::Approve))
            .bind(flag(Capability::Assign))
            .bind(flag(Capability::Allocate))
            .fetch_optional(pool)
            .await
    }

    /// Delete a user by ID. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
