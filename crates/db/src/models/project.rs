//! Project entity model and response shape.

use chrono::NaiveDate;
use ctrack_core::error::CoreError;
use ctrack_core::project::{ApprovalStatus, PendingAction, ProjectChanges, ProjectType};
use ctrack_core::serial::SerialNumbers;
use ctrack_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{FromRow, Row};

use crate::models::decode_text;

/// A project row from the `projects` table.
///
/// The two pending columns are folded into a single [`PendingAction`].
#[derive(Debug, Clone)]
pub struct Project {
    pub id: DbId,
    pub project_type: ProjectType,
    pub serial_number: i32,
    pub name: String,
    pub allocated_unit: String,
    pub construction_unit: Option<String>,
    pub allocation_wave: Option<String>,
    pub location: String,
    pub scale: Option<String>,
    pub supervisor: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub completion_date: Option<NaiveDate>,
    pub initial_value: Option<i64>,
    pub progress: Option<String>,
    pub feasibility: Option<String>,
    pub notes: Option<String>,
    pub entered_by: String,
    pub assigned_to: Option<String>,
    pub status: ApprovalStatus,
    pub pending: PendingAction,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl<'r> FromRow<'r, PgRow> for Project {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let pending_kind: Option<String> = row.try_get("pending_action")?;
        let pending_edit: Option<Json<ProjectChanges>> = row.try_get("pending_edit")?;
        let pending = PendingAction::from_columns(
            pending_kind.as_deref(),
            pending_edit.map(|json| json.0),
        )
        .map_err(|e: CoreError| sqlx::Error::ColumnDecode {
            index: "pending_action".to_string(),
            source: Box::new(e),
        })?;

        Ok(Self {
            id: row.try_get("id")?,
            project_type: decode_text(row, "project_type")?,
            serial_number: row.try_get("serial_number")?,
            name: row.try_get("name")?,
            allocated_unit: row.try_get("allocated_unit")?,
            construction_unit: row.try_get("construction_unit")?,
            allocation_wave: row.try_get("allocation_wave")?,
            location: row.try_get("location")?,
            scale: row.try_get("scale")?,
            supervisor: row.try_get("supervisor")?,
            start_date: row.try_get("start_date")?,
            completion_date: row.try_get("completion_date")?,
            initial_value: row.try_get("initial_value")?,
            progress: row.try_get("progress")?,
            feasibility: row.try_get("feasibility")?,
            notes: row.try_get("notes")?,
            entered_by: row.try_get("entered_by")?,
            assigned_to: row.try_get("assigned_to")?,
            status: decode_text(row, "status")?,
            pending,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Filters for the paginated project listing.
#[derive(Debug, Clone, Default)]
pub struct ProjectFilter {
    pub project_type: Option<ProjectType>,
    pub status: Option<ApprovalStatus>,
    /// Only projects with a staged edit or delete.
    pub pending_only: bool,
}

/// API representation of a project.
///
/// Exposes exactly one of `categorySerialNumber` / `minorRepairSerialNumber`
/// and the pending state as `pendingEdit` (object or null) plus
/// `pendingDelete` (bool).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResponse {
    pub id: DbId,
    #[serde(rename = "type")]
    pub project_type: ProjectType,
    #[serde(flatten)]
    pub serials: SerialNumbers,
    pub name: String,
    pub allocated_unit: String,
    pub construction_unit: Option<String>,
    pub allocation_wave: Option<String>,
    pub location: String,
    pub scale: Option<String>,
    pub supervisor: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub completion_date: Option<NaiveDate>,
    pub initial_value: Option<i64>,
    pub progress: Option<String>,
    pub feasibility: Option<String>,
    pub notes: Option<String>,
    pub entered_by: String,
    pub assigned_to: Option<String>,
    pub status: ApprovalStatus,
    pub pending_edit: Option<ProjectChanges>,
    pub pending_delete: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<Project> for ProjectResponse {
    fn from(p: Project) -> Self {
        let pending_delete = p.pending.is_delete();
        let pending_edit = match p.pending {
            PendingAction::Edit(changes) => Some(changes),
            _ => None,
        };
        Self {
            id: p.id,
            project_type: p.project_type,
            serials: SerialNumbers::for_type(p.project_type, p.serial_number),
            name: p.name,
            allocated_unit: p.allocated_unit,
            construction_unit: p.construction_unit,
            allocation_wave: p.allocation_wave,
            location: p.location,
            scale: p.scale,
            supervisor: p.supervisor,
            start_date: p.start_date,
            completion_date: p.completion_date,
            initial_value: p.initial_value,
            progress: p.progress,
            feasibility: p.feasibility,
            notes: p.notes,
            entered_by: p.entered_by,
            assigned_to: p.assigned_to,
            status: p.status,
            pending_edit,
            pending_delete,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(pending: PendingAction) -> Project {
        let now = chrono::Utc::now();
        Project {
            id: 7,
            project_type: ProjectType::MinorRepair,
            serial_number: 3,
            name: "Sửa chữa tuyến cáp".into(),
            allocated_unit: "Điện lực Đống Đa".into(),
            construction_unit: None,
            allocation_wave: Some("Đợt 2".into()),
            location: "Ô Chợ Dừa".into(),
            scale: None,
            supervisor: None,
            start_date: None,
            completion_date: None,
            initial_value: None,
            progress: None,
            feasibility: None,
            notes: None,
            entered_by: "nhanvien01".into(),
            assigned_to: None,
            status: ApprovalStatus::Approved,
            pending,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn response_exposes_only_the_matching_serial_field() {
        let json = serde_json::to_value(ProjectResponse::from(sample(PendingAction::None))).unwrap();
        assert_eq!(json["type"], "minor_repair");
        assert_eq!(json["minorRepairSerialNumber"], 3);
        assert!(json["categorySerialNumber"].is_null());
        assert_eq!(json["status"], "Đã duyệt");
    }

    #[test]
    fn response_splits_pending_edit() {
        let changes = ProjectChanges {
            location: Some("Láng Hạ".into()),
            ..Default::default()
        };
        let json =
            serde_json::to_value(ProjectResponse::from(sample(PendingAction::Edit(changes))))
                .unwrap();
        assert_eq!(json["pendingEdit"]["location"], "Láng Hạ");
        assert_eq!(json["pendingDelete"], false);
    }

    #[test]
    fn response_splits_pending_delete() {
        let json = serde_json::to_value(ProjectResponse::from(sample(PendingAction::Delete))).unwrap();
        assert!(json["pendingEdit"].is_null());
        assert_eq!(json["pendingDelete"], true);
    }
}
