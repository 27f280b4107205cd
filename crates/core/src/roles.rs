//! User roles.
//!
//! The role set is closed and must match the `CHECK` constraint on
//! `users.role` in `20260301000001_create_users.sql`. Only `admin` carries
//! implicit privileges; every other role is descriptive and relies on the
//! per-user capability flags.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub const ROLE_ADMIN: &str = "admin";

/// Organisational role of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Director,
    DeputyDirector,
    DepartmentHead,
    DeputyDepartmentHead,
    TeamLeader,
    Engineer,
    Specialist,
    Staff,
    Viewer,
}

impl Role {
    pub const ALL: [Role; 10] = [
        Role::Admin,
        Role::Director,
        Role::DeputyDirector,
        Role::DepartmentHead,
        Role::DeputyDepartmentHead,
        Role::TeamLeader,
        Role::Engineer,
        Role::Specialist,
        Role::Staff,
        Role::Viewer,
    ];

    /// The database / wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => ROLE_ADMIN,
            Role::Director => "director",
            Role::DeputyDirector => "deputy_director",
            Role::DepartmentHead => "department_head",
            Role::DeputyDepartmentHead => "deputy_department_head",
            Role::TeamLeader => "team_leader",
            Role::Engineer => "engineer",
            Role::Specialist => "specialist",
            Role::Staff => "staff",
            Role::Viewer => "viewer",
        }
    }

    pub fn is_admin(self) -> bool {
        self == Role::Admin
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown role '{s}'")))
    }
}

impl TryFrom<String> for Role {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_role_round_trips_through_its_string_form() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn unknown_role_is_a_validation_error() {
        let err = "superuser".parse::<Role>().unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn only_admin_is_admin() {
        assert!(Role::Admin.is_admin());
        assert_eq!(Role::ALL.iter().filter(|r| r.is_admin()).count(), 1);
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&Role::DeputyDepartmentHead).unwrap();
        assert_eq!(json, "\"deputy_department_head\"");
    }
}
