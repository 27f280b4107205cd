//! Repository for the `projects` table.
//!
//! Reads that serve plain listings take `&PgPool`. Everything that is part of
//! a state transition takes a `&mut PgConnection` so the caller can run it
//! inside one transaction together with the notification write.

use ctrack_core::project::{ApprovalStatus, NewProject, PendingAction, ProjectChanges, ProjectType};
use ctrack_core::serial::{self, SerialAssignment};
use ctrack_core::types::DbId;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};

use crate::models::project::{Project, ProjectFilter};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, project_type, serial_number, name, allocated_unit, \
    construction_unit, allocation_wave, location, scale, supervisor, start_date, \
    completion_date, initial_value, progress, feasibility, notes, entered_by, \
    assigned_to, status, pending_action, pending_edit, created_at, updated_at";

/// Filter clause shared by `list` and `count`. `$1` type, `$2` status,
/// `$3` pending-only.
const FILTER: &str = "($1::text IS NULL OR project_type = $1) \
    AND ($2::text IS NULL OR status = $2) \
    AND (NOT $3 OR pending_action IS NOT NULL)";

/// First key of the advisory lock serializing serial allocation. The second
/// key is [`ProjectType::lock_key`].
pub const SERIAL_LOCK_NAMESPACE: i32 = 0x5345_5249;

/// Provides project queries and the write steps of the approval workflow.
pub struct ProjectRepo;

impl ProjectRepo {
    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Find a project by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects WHERE id = $1");
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Look up only the type of a project. The type never changes, so this
    /// can be read before the per-type lock is taken.
    pub async fn find_type(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<ProjectType>, sqlx::Error> {
        let raw: Option<String> =
            sqlx::query_scalar("SELECT project_type FROM projects WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;
        raw.map(|value| {
            value.parse().map_err(|e: ctrack_core::error::CoreError| {
                sqlx::Error::Decode(Box::new(e))
            })
        })
        .transpose()
    }

    /// Load a project and hold its row lock until the transaction ends.
    pub async fn find_for_update(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// One page of projects matching `filter`, in display order (type, then
    /// serial number).
    pub async fn list(
        pool: &PgPool,
        filter: &ProjectFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Project>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM projects WHERE {FILTER} \
             ORDER BY project_type, serial_number \
             LIMIT $4 OFFSET $5"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(filter.project_type.map(ProjectType::as_str))
            .bind(filter.status.map(ApprovalStatus::as_str))
            .bind(filter.pending_only)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Total number of projects matching `filter`.
    pub async fn count(pool: &PgPool, filter: &ProjectFilter) -> Result<i64, sqlx::Error> {
        let query = format!("SELECT COUNT(*) FROM projects WHERE {FILTER}");
        sqlx::query_scalar(&query)
            .bind(filter.project_type.map(ProjectType::as_str))
            .bind(filter.status.map(ApprovalStatus::as_str))
            .bind(filter.pending_only)
            .fetch_one(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Serial numbers
    // -----------------------------------------------------------------------

    /// Take the transaction-scoped lock guarding serial numbers of one type.
    ///
    /// Every create and every delete of that type must hold it before it
    /// reads or rewrites serials.
    pub async fn lock_serials(
        conn: &mut PgConnection,
        project_type: ProjectType,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT pg_advisory_xact_lock($1, $2)")
            .bind(SERIAL_LOCK_NAMESPACE)
            .bind(project_type.lock_key())
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Current highest serial of a type, `None` when the type has no projects.
    pub async fn max_serial(
        conn: &mut PgConnection,
        project_type: ProjectType,
    ) -> Result<Option<i32>, sqlx::Error> {
        sqlx::query_scalar("SELECT MAX(serial_number) FROM projects WHERE project_type = $1")
            .bind(project_type.as_str())
            .fetch_one(conn)
            .await
    }

    /// `(id, serial)` pairs of a type, ordered by serial ascending.
    pub async fn ordered_serials(
        conn: &mut PgConnection,
        project_type: ProjectType,
    ) -> Result<Vec<(DbId, i32)>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, serial_number FROM projects \
             WHERE project_type = $1 ORDER BY serial_number, id",
        )
        .bind(project_type.as_str())
        .fetch_all(conn)
        .await
    }

    /// Rewrite the serials of a type to their 1-based position.
    ///
    /// Must run under [`Self::lock_serials`]. Returns the assignments that
    /// actually changed.
    pub async fn renumber(
        conn: &mut PgConnection,
        project_type: ProjectType,
    ) -> Result<Vec<SerialAssignment>, sqlx::Error> {
        let ordered = Self::ordered_serials(&mut *conn, project_type).await?;
        let plan = serial::renumber(&ordered);
        for assignment in &plan {
            sqlx::query("UPDATE projects SET serial_number = $2 WHERE id = $1")
                .bind(assignment.project_id)
                .bind(assignment.serial_number)
                .execute(&mut *conn)
                .await?;
        }
        if !plan.is_empty() {
            tracing::debug!(
                project_type = %project_type,
                renumbered = plan.len(),
                "Renumbered project serials"
            );
        }
        Ok(plan)
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Insert a new project with an already-allocated serial number.
    pub async fn insert(
        conn: &mut PgConnection,
        input: &NewProject,
        serial_number: i32,
        status: ApprovalStatus,
        entered_by: &str,
    ) -> Result<Project, sqlx::Error> {
        let query = format!(
            "INSERT INTO projects (project_type, serial_number, name, allocated_unit, \
                construction_unit, allocation_wave, location, scale, supervisor, \
                start_date, completion_date, initial_value, progress, feasibility, \
                notes, entered_by, assigned_to, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(input.project_type.as_str())
            .bind(serial_number)
            .bind(&input.name)
            .bind(&input.allocated_unit)
            .bind(&input.construction_unit)
            .bind(&input.allocation_wave)
            .bind(&input.location)
            .bind(&input.scale)
            .bind(&input.supervisor)
            .bind(input.start_date)
            .bind(input.completion_date)
            .bind(input.initial_value)
            .bind(&input.progress)
            .bind(&input.feasibility)
            .bind(&input.notes)
            .bind(entered_by)
            .bind(&input.assigned_to)
            .bind(status.as_str())
            .fetch_one(conn)
            .await
    }

    /// Merge a change set into the project. Only `Some` fields are written.
    pub async fn apply_changes(
        conn: &mut PgConnection,
        id: DbId,
        changes: &ProjectChanges,
    ) -> Result<Project, sqlx::Error> {
        let query = format!(
            "UPDATE projects SET
                name = COALESCE($2, name),
                allocated_unit = COALESCE($3, allocated_unit),
                construction_unit = COALESCE($4, construction_unit),
                location = COALESCE($5, location),
                scale = COALESCE($6, scale),
                supervisor = COALESCE($7, supervisor),
                start_date = COALESCE($8, start_date),
                completion_date = COALESCE($9, completion_date),
                initial_value = COALESCE($10, initial_value),
                progress = COALESCE($11, progress),
                feasibility = COALESCE($12, feasibility),
                notes = COALESCE($13, notes)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(&changes.name)
            .bind(&changes.allocated_unit)
            .bind(&changes.construction_unit)
            .bind(&changes.location)
            .bind(&changes.scale)
            .bind(&changes.supervisor)
            .bind(changes.start_date)
            .bind(changes.completion_date)
            .bind(changes.initial_value)
            .bind(&changes.progress)
            .bind(&changes.feasibility)
            .bind(&changes.notes)
            .fetch_one(conn)
            .await
    }

    /// Replace the staged action (or clear it with [`PendingAction::None`]).
    pub async fn set_pending(
        conn: &mut PgConnection,
        id: DbId,
        pending: &PendingAction,
    ) -> Result<Project, sqlx::Error> {
        let query = format!(
            "UPDATE projects SET pending_action = $2, pending_edit = $3 \
             WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(pending.kind().map(|k| k.as_str()))
            .bind(pending.edit().map(Json))
            .fetch_one(conn)
            .await
    }

    pub async fn set_status(
        conn: &mut PgConnection,
        id: DbId,
        status: ApprovalStatus,
    ) -> Result<Project, sqlx::Error> {
        let query = format!("UPDATE projects SET status = $2 WHERE id = $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(status.as_str())
            .fetch_one(conn)
            .await
    }

    pub async fn set_allocation_wave(
        conn: &mut PgConnection,
        id: DbId,
        allocation_wave: &str,
    ) -> Result<Project, sqlx::Error> {
        let query =
            format!("UPDATE projects SET allocation_wave = $2 WHERE id = $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(allocation_wave)
            .fetch_one(conn)
            .await
    }

    pub async fn set_assigned_to(
        conn: &mut PgConnection,
        id: DbId,
        assigned_to: &str,
    ) -> Result<Project, sqlx::Error> {
        let query =
            format!("UPDATE projects SET assigned_to = $2 WHERE id = $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(assigned_to)
            .fetch_one(conn)
            .await
    }

    /// Permanently delete a project. Returns `true` if a row was removed.
    ///
    /// The caller renumbers the type afterwards, under the same lock.
    pub async fn delete(conn: &mut PgConnection, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
