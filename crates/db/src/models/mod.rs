//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` entity struct matching the database row
//! - Insert / update DTOs where the repository needs them
//! - A camelCase `Serialize` response shape for the API

use std::str::FromStr;

use ctrack_core::error::CoreError;
use sqlx::postgres::PgRow;
use sqlx::Row;

pub mod notification;
pub mod project;
pub mod reference;
pub mod user;

/// Decode a TEXT column into one of the core string-backed enums.
pub(crate) fn decode_text<T>(row: &PgRow, column: &str) -> Result<T, sqlx::Error>
where
    T: FromStr<Err = CoreError>,
{
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(|e: CoreError| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}
