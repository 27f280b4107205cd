//! Notification vocabulary: kinds, statuses and message text.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::project::PendingKind;

/// Name of the realtime event carrying a notification payload.
pub const REALTIME_EVENT_NOTIFICATION: &str = "notification";

/// What the notification asks an approver to look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    New,
    Edit,
    Delete,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::New => "new",
            NotificationKind::Edit => "edit",
            NotificationKind::Delete => "delete",
        }
    }

    /// Message shown to approvers for a project named `project_name`.
    pub fn message(self, project_name: &str) -> String {
        match self {
            NotificationKind::New => format!("Công trình mới cần duyệt: {project_name}"),
            NotificationKind::Edit => format!("Yêu cầu sửa công trình: {project_name}"),
            NotificationKind::Delete => format!("Yêu cầu xóa công trình: {project_name}"),
        }
    }
}

impl From<PendingKind> for NotificationKind {
    fn from(kind: PendingKind) -> Self {
        match kind {
            PendingKind::Edit => NotificationKind::Edit,
            PendingKind::Delete => NotificationKind::Delete,
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(NotificationKind::New),
            "edit" => Ok(NotificationKind::Edit),
            "delete" => Ok(NotificationKind::Delete),
            other => Err(CoreError::Validation(format!(
                "Unknown notification type '{other}'"
            ))),
        }
    }
}

impl TryFrom<String> for NotificationKind {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Processing state of a notification. The only transition is
/// `Pending -> Processed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Pending,
    Processed,
}

impl NotificationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationStatus::Pending => "pending",
            NotificationStatus::Processed => "processed",
        }
    }
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(NotificationStatus::Pending),
            "processed" => Ok(NotificationStatus::Processed),
            other => Err(CoreError::Validation(format!(
                "Unknown notification status '{other}'"
            ))),
        }
    }
}

impl TryFrom<String> for NotificationStatus {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
