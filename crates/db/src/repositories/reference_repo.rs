//! Repository for the three reference vocabulary tables.
//!
//! The tables share one shape, so a single repository serves all of them,
//! parameterized by [`ReferenceKind`]. Table names come from that closed
//! enum and are never taken from user input.

use ctrack_core::reference::ReferenceKind;
use ctrack_core::types::DbId;
use sqlx::PgPool;

use crate::models::reference::ReferenceEntry;

const COLUMNS: &str = "id, name, created_at, updated_at";

/// Provides CRUD operations for reference vocabulary entries.
pub struct ReferenceRepo;

impl ReferenceRepo {
    pub async fn create(
        pool: &PgPool,
        kind: ReferenceKind,
        name: &str,
    ) -> Result<ReferenceEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO {} (name) VALUES ($1) RETURNING {COLUMNS}",
            kind.table()
        );
        sqlx::query_as::<_, ReferenceEntry>(&query)
            .bind(name)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        kind: ReferenceKind,
        id: DbId,
    ) -> Result<Option<ReferenceEntry>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM {} WHERE id = $1", kind.table());
        sqlx::query_as::<_, ReferenceEntry>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All entries of a vocabulary, alphabetically.
    pub async fn list(
        pool: &PgPool,
        kind: ReferenceKind,
    ) -> Result<Vec<ReferenceEntry>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM {} ORDER BY name", kind.table());
        sqlx::query_as::<_, ReferenceEntry>(&query)
            .fetch_all(pool)
            .await
    }

    /// Rename an entry. Returns `None` if no row with the given `id` exists.
    pub async fn rename(
        pool: &PgPool,
        kind: ReferenceKind,
        id: DbId,
        name: &str,
    ) -> Result<Option<ReferenceEntry>, sqlx::Error> {
        let query = format!(
            "UPDATE {} SET name = $2 WHERE id = $1 RETURNING {COLUMNS}",
            kind.table()
        );
        sqlx::query_as::<_, ReferenceEntry>(&query)
            .bind(id)
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    /// Delete an entry. Returns `true` if a row was removed.
    ///
    /// Projects keep their copy of the name; there is no foreign key.
    pub async fn delete(pool: &PgPool, kind: ReferenceKind, id: DbId) -> Result<bool, sqlx::Error> {
        let query = format!("DELETE FROM {} WHERE id = $1", kind.table());
        let result = sqlx::query(&query).bind(id).execute(pool).await?;
        Ok(result.rows_affected() > 0)
    }
}
