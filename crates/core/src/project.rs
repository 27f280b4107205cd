//! Project vocabulary: type, approval status, editable change sets and the
//! pending-action envelope.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// ProjectType
// ---------------------------------------------------------------------------

/// Project category. Immutable after creation; selects the serial counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
    Category,
    MinorRepair,
}

impl ProjectType {
    pub const ALL: [ProjectType; 2] = [ProjectType::Category, ProjectType::MinorRepair];

    pub fn as_str(self) -> &'static str {
        match self {
            ProjectType::Category => "category",
            ProjectType::MinorRepair => "minor_repair",
        }
    }

    /// Second key of the per-type advisory lock guarding serial numbers.
    pub fn lock_key(self) -> i32 {
        match self {
            ProjectType::Category => 1,
            ProjectType::MinorRepair => 2,
        }
    }

    /// Whether the `scale` field applies to (and is required for) this type.
    pub fn requires_scale(self) -> bool {
        self == ProjectType::Category
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProjectType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown project type '{s}'")))
    }
}

impl TryFrom<String> for ProjectType {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ---------------------------------------------------------------------------
// ApprovalStatus
// ---------------------------------------------------------------------------

/// Label stored for a newly created, unapproved project.
pub const STATUS_PENDING: &str = "Chờ duyệt";
/// Label stored once a manager approves the project.
pub const STATUS_APPROVED: &str = "Đã duyệt";
/// Label stored once a manager rejects the project.
pub const STATUS_REJECTED: &str = "Từ chối";

/// Approval status of a project, persisted and serialized as its
/// Vietnamese display label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApprovalStatus {
    #[serde(rename = "Chờ duyệt")]
    Pending,
    #[serde(rename = "Đã duyệt")]
    Approved,
    #[serde(rename = "Từ chối")]
    Rejected,
}

impl ApprovalStatus {
    pub const ALL: [ApprovalStatus; 3] = [
        ApprovalStatus::Pending,
        ApprovalStatus::Approved,
        ApprovalStatus::Rejected,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ApprovalStatus::Pending => STATUS_PENDING,
            ApprovalStatus::Approved => STATUS_APPROVED,
            ApprovalStatus::Rejected => STATUS_REJECTED,
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApprovalStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ApprovalStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown approval status '{s}'")))
    }
}

impl TryFrom<String> for ApprovalStatus {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ---------------------------------------------------------------------------
// ProjectChanges
// ---------------------------------------------------------------------------

/// A set of field changes: only the fields present in the submitted
/// payload are `Some`. Applied directly, or staged as a pending edit and
/// applied field-by-field on approval.
///
/// `type`, approval status, serial numbers, `enteredBy`, `allocationWave`
/// and `assignedTo` are deliberately absent; they change only through their
/// own transitions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocated_unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub construction_unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supervisor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_value: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feasibility: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ProjectChanges {
    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        *self == ProjectChanges::default()
    }

    /// Names of the fields this change set touches, in wire form.
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        let mut mark = |present: bool, name: &'static str| {
            if present {
                fields.push(name);
            }
        };
        mark(self.name.is_some(), "name");
        mark(self.allocated_unit.is_some(), "allocatedUnit");
        mark(self.construction_unit.is_some(), "constructionUnit");
        mark(self.location.is_some(), "location");
        mark(self.scale.is_some(), "scale");
        mark(self.supervisor.is_some(), "supervisor");
        mark(self.start_date.is_some(), "startDate");
        mark(self.completion_date.is_some(), "completionDate");
        mark(self.initial_value.is_some(), "initialValue");
        mark(self.progress.is_some(), "progress");
        mark(self.feasibility.is_some(), "feasibility");
        mark(self.notes.is_some(), "notes");
        fields
    }

    /// Trim every text field. A blank value stays `Some("")` so that it still
    /// clears an optional field; blank required fields fail [`validate_for`].
    ///
    /// [`validate_for`]: ProjectChanges::validate_for
    pub fn normalize(mut self) -> Self {
        for field in [
            &mut self.name,
            &mut self.allocated_unit,
            &mut self.construction_unit,
            &mut self.location,
            &mut self.scale,
            &mut self.supervisor,
            &mut self.progress,
            &mut self.feasibility,
            &mut self.notes,
        ] {
            if let Some(value) = field {
                let trimmed = value.trim();
                if trimmed.len() != value.len() {
                    *value = trimmed.to_string();
                }
            }
        }
        self
    }

    /// Validate the change set against the (immutable) project type.
    ///
    /// Required text fields may not be blanked, `scale` only applies to
    /// category projects, and values must be non-negative.
    pub fn validate_for(&self, project_type: ProjectType) -> Result<(), CoreError> {
        if self.is_empty() {
            return Err(CoreError::Validation("No fields to update".into()));
        }
        for (field, value) in [
            ("name", &self.name),
            ("allocatedUnit", &self.allocated_unit),
            ("location", &self.location),
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(CoreError::Validation(format!("{field} must not be empty")));
            }
        }
        if let Some(scale) = &self.scale {
            if !project_type.requires_scale() {
                return Err(CoreError::Validation(
                    "scale only applies to category projects".into(),
                ));
            }
            if scale.trim().is_empty() {
                return Err(CoreError::Validation("scale must not be empty".into()));
            }
        }
        if self.initial_value.is_some_and(|v| v < 0) {
            return Err(CoreError::Validation(
                "initialValue must not be negative".into(),
            ));
        }
        validate_date_order(self.start_date, self.completion_date)
    }
}

fn validate_date_order(
    start: Option<NaiveDate>,
    completion: Option<NaiveDate>,
) -> Result<(), CoreError> {
    match (start, completion) {
        (Some(s), Some(c)) if c < s => Err(CoreError::Validation(
            "completionDate must not be before startDate".into(),
        )),
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// PendingAction
// ---------------------------------------------------------------------------

/// Discriminant of a staged action, as stored in `projects.pending_action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingKind {
    Edit,
    Delete,
}

impl PendingKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PendingKind::Edit => "edit",
            PendingKind::Delete => "delete",
        }
    }
}

impl FromStr for PendingKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "edit" => Ok(PendingKind::Edit),
            "delete" => Ok(PendingKind::Delete),
            other => Err(CoreError::Internal(format!(
                "Unknown pending action '{other}'"
            ))),
        }
    }
}

/// The single outstanding action awaiting an approver, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PendingAction {
    #[default]
    None,
    Edit(ProjectChanges),
    Delete,
}

impl PendingAction {
    /// Rebuild from the two storage columns. The database CHECK constraint
    /// keeps them consistent; a mismatch here means corrupted data.
    pub fn from_columns(
        kind: Option<&str>,
        edit: Option<ProjectChanges>,
    ) -> Result<Self, CoreError> {
        match (kind.map(str::parse::<PendingKind>).transpose()?, edit) {
            (None, None) => Ok(PendingAction::None),
            (Some(PendingKind::Edit), Some(changes)) => Ok(PendingAction::Edit(changes)),
            (Some(PendingKind::Delete), None) => Ok(PendingAction::Delete),
            (kind, edit) => Err(CoreError::Internal(format!(
                "Inconsistent pending state: kind={kind:?}, edit present={}",
                edit.is_some()
            ))),
        }
    }

    pub fn kind(&self) -> Option<PendingKind> {
        match self {
            PendingAction::None => None,
            PendingAction::Edit(_) => Some(PendingKind::Edit),
            PendingAction::Delete => Some(PendingKind::Delete),
        }
    }

    /// The staged change set, when an edit is pending.
    pub fn edit(&self) -> Option<&ProjectChanges> {
        match self {
            PendingAction::Edit(changes) => Some(changes),
            _ => None,
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, PendingAction::Delete)
    }

    pub fn is_none(&self) -> bool {
        matches!(self, PendingAction::None)
    }
}

// ---------------------------------------------------------------------------
// NewProject
// ---------------------------------------------------------------------------

/// Request body for creating a project.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    #[serde(rename = "type")]
    pub project_type: ProjectType,
    #[validate(length(min = 1, max = 500, message = "name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 200, message = "allocatedUnit is required"))]
    pub allocated_unit: String,
    pub construction_unit: Option<String>,
    pub allocation_wave: Option<String>,
    #[validate(length(min = 1, max = 500, message = "location is required"))]
    pub location: String,
    pub scale: Option<String>,
    pub supervisor: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub completion_date: Option<NaiveDate>,
    #[validate(range(min = 0, message = "initialValue must not be negative"))]
    pub initial_value: Option<i64>,
    pub progress: Option<String>,
    pub feasibility: Option<String>,
    pub notes: Option<String>,
    pub assigned_to: Option<String>,
}

impl NewProject {
    /// Trim text fields, turning blank optional ones into `None`.
    pub fn normalize(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.allocated_unit = self.allocated_unit.trim().to_string();
        self.location = self.location.trim().to_string();
        for field in [
            &mut self.construction_unit,
            &mut self.allocation_wave,
            &mut self.scale,
            &mut self.supervisor,
            &mut self.progress,
            &mut self.feasibility,
            &mut self.notes,
            &mut self.assigned_to,
        ] {
            *field = field
                .take()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty());
        }
        self
    }

    /// Field-level validation plus the type-dependent `scale` rule.
    pub fn validate_new(&self) -> Result<(), CoreError> {
        self.validate()?;
        match (self.project_type.requires_scale(), &self.scale) {
            (true, None) => Err(CoreError::Validation(
                "scale is required for category projects".into(),
            )),
            (false, Some(_)) => Err(CoreError::Validation(
                "scale only applies to category projects".into(),
            )),
            _ => validate_date_order(self.start_date, self.completion_date),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_project(project_type: ProjectType, scale: Option<&str>) -> NewProject {
        NewProject {
            project_type,
            name: "  Cải tạo lưới điện  ".into(),
            allocated_unit: "Điện lực Ba Đình".into(),
            construction_unit: Some("  ".into()),
            allocation_wave: None,
            location: "Phường Kim Mã".into(),
            scale: scale.map(str::to_string),
            supervisor: None,
            start_date: None,
            completion_date: None,
            initial_value: Some(1_500_000_000),
            progress: None,
            feasibility: None,
            notes: None,
            assigned_to: None,
        }
    }

    #[test]
    fn project_type_parses_wire_names() {
        assert_eq!(
            "minor_repair".parse::<ProjectType>().unwrap(),
            ProjectType::MinorRepair
        );
        assert!("repair".parse::<ProjectType>().is_err());
    }

    #[test]
    fn lock_keys_are_distinct() {
        assert_ne!(
            ProjectType::Category.lock_key(),
            ProjectType::MinorRepair.lock_key()
        );
    }

    #[test]
    fn approval_status_serializes_as_label() {
        let json = serde_json::to_string(&ApprovalStatus::Pending).unwrap();
        assert_eq!(json, "\"Chờ duyệt\"");
        assert_eq!(
            STATUS_APPROVED.parse::<ApprovalStatus>().unwrap(),
            ApprovalStatus::Approved
        );
    }

    #[test]
    fn changes_serialize_only_present_fields() {
        let changes = ProjectChanges {
            location: Some("Hoàn Kiếm".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(&changes).unwrap();
        assert_eq!(json, serde_json::json!({ "location": "Hoàn Kiếm" }));
        assert_eq!(changes.changed_fields(), vec!["location"]);
    }

    #[test]
    fn empty_changes_are_rejected() {
        let err = ProjectChanges::default()
            .validate_for(ProjectType::Category)
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn scale_change_rejected_for_minor_repair() {
        let changes = ProjectChanges {
            scale: Some("2 km".into()),
            ..Default::default()
        };
        assert!(changes.validate_for(ProjectType::MinorRepair).is_err());
        assert!(changes.validate_for(ProjectType::Category).is_ok());
    }

    #[test]
    fn blank_required_field_change_rejected() {
        let changes = ProjectChanges {
            name: Some("   ".into()),
            ..Default::default()
        };
        assert!(changes.validate_for(ProjectType::Category).is_err());
    }

    #[test]
    fn change_normalize_trims_but_keeps_blank_clears() {
        let changes = ProjectChanges {
            name: Some("  Trạm biến áp  ".into()),
            location: Some("Hàng Bài ".into()),
            notes: Some("   ".into()),
            ..Default::default()
        }
        .normalize();

        assert_eq!(changes.name.as_deref(), Some("Trạm biến áp"));
        assert_eq!(changes.location.as_deref(), Some("Hàng Bài"));
        assert_eq!(changes.notes.as_deref(), Some(""));
        assert_eq!(changes.supervisor, None);
        assert!(changes.validate_for(ProjectType::Category).is_ok());
    }

    #[test]
    fn completion_before_start_rejected() {
        let changes = ProjectChanges {
            start_date: NaiveDate::from_ymd_opt(2026, 5, 1),
            completion_date: NaiveDate::from_ymd_opt(2026, 4, 1),
            ..Default::default()
        };
        assert!(changes.validate_for(ProjectType::Category).is_err());
    }

    #[test]
    fn pending_action_from_columns() {
        assert_eq!(
            PendingAction::from_columns(None, None).unwrap(),
            PendingAction::None
        );
        assert_eq!(
            PendingAction::from_columns(Some("delete"), None).unwrap(),
            PendingAction::Delete
        );
        let changes = ProjectChanges {
            name: Some("X".into()),
            ..Default::default()
        };
        assert_eq!(
            PendingAction::from_columns(Some("edit"), Some(changes.clone())).unwrap(),
            PendingAction::Edit(changes)
        );
    }

    #[test]
    fn inconsistent_pending_columns_are_internal_errors() {
        let err = PendingAction::from_columns(Some("edit"), None).unwrap_err();
        assert!(matches!(err, CoreError::Internal(_)));
        let err = PendingAction::from_columns(None, Some(ProjectChanges::default())).unwrap_err();
        assert!(matches!(err, CoreError::Internal(_)));
    }

    #[test]
    fn new_category_requires_scale() {
        let input = new_project(ProjectType::Category, None).normalize();
        assert!(input.validate_new().is_err());

        let input = new_project(ProjectType::Category, Some("0.4 km")).normalize();
        assert!(input.validate_new().is_ok());
    }

    #[test]
    fn new_minor_repair_rejects_scale_but_tolerates_blank() {
        let input = new_project(ProjectType::MinorRepair, Some("1 km")).normalize();
        assert!(input.validate_new().is_err());

        let input = new_project(ProjectType::MinorRepair, Some("  ")).normalize();
        assert!(input.validate_new().is_ok());
    }

    #[test]
    fn normalize_trims_and_drops_blank_optionals() {
        let input = new_project(ProjectType::MinorRepair, None).normalize();
        assert_eq!(input.name, "Cải tạo lưới điện");
        assert!(input.construction_unit.is_none());
    }

    #[test]
    fn new_project_missing_name_fails_validation() {
        let mut input = new_project(ProjectType::MinorRepair, None);
        input.name = "   ".into();
        let input = input.normalize();
        assert!(matches!(
            input.validate_new(),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn new_project_deserializes_type_field() {
        let input: NewProject = serde_json::from_value(serde_json::json!({
            "type": "category",
            "name": "A",
            "allocatedUnit": "U",
            "location": "L",
            "scale": "S"
        }))
        .unwrap();
        assert_eq!(input.project_type, ProjectType::Category);
        assert_eq!(input.allocated_unit, "U");
    }
}
