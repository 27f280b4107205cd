//! Capability model.
//!
//! A user's permissions are a [`CapabilitySet`]: a small bit set over the
//! named [`Capability`] variants. On the wire and in the database it is
//! exposed as a flat object of booleans (`{"add": true, "approve": false,
//! ...}`) via [`PermissionFlags`].

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::roles::Role;

/// A named permission gating specific state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Add,
    Edit,
    Delete,
    Approve,
    Assign,
    Allocate,
}

impl Capability {
    pub const ALL: [Capability; 6] = [
        Capability::Add,
        Capability::Edit,
        Capability::Delete,
        Capability::Approve,
        Capability::Assign,
        Capability::Allocate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Capability::Add => "add",
            Capability::Edit => "edit",
            Capability::Delete => "delete",
            Capability::Approve => "approve",
            Capability::Assign => "assign",
            Capability::Allocate => "allocate",
        }
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// A set of granted capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "PermissionFlags", into = "PermissionFlags")]
pub struct CapabilitySet(u8);

impl CapabilitySet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn all() -> Self {
        Capability::ALL.into_iter().collect()
    }

    /// Capabilities a user effectively holds: admins hold everything,
    /// everyone else holds exactly what was granted.
    pub fn effective(role: Role, granted: CapabilitySet) -> Self {
        if role.is_admin() {
            Self::all()
        } else {
            granted
        }
    }

    pub fn with(mut self, cap: Capability) -> Self {
        self.insert(cap);
        self
    }

    pub fn insert(&mut self, cap: Capability) {
        self.0 |= cap.bit();
    }

    pub fn remove(&mut self, cap: Capability) {
        self.0 &= !cap.bit();
    }

    pub fn set(&mut self, cap: Capability, granted: bool) {
        if granted {
            self.insert(cap);
        } else {
            self.remove(cap);
        }
    }

    pub fn contains(self, cap: Capability) -> bool {
        self.0 & cap.bit() != 0
    }

    /// True when at least one of `caps` is held.
    pub fn contains_any(self, caps: &[Capability]) -> bool {
        caps.iter().any(|c| self.contains(*c))
    }

    pub fn iter(self) -> impl Iterator<Item = Capability> {
        Capability::ALL.into_iter().filter(move |c| self.contains(*c))
    }

    /// Fail with `Forbidden` unless `cap` is held.
    pub fn require(self, cap: Capability) -> Result<(), CoreError> {
        if self.contains(cap) {
            Ok(())
        } else {
            Err(CoreError::Forbidden(format!(
                "Missing '{}' permission",
                cap.as_str()
            )))
        }
    }

    /// Fail with `Forbidden` unless at least one of `caps` is held.
    pub fn require_any(self, caps: &[Capability]) -> Result<(), CoreError> {
        if self.contains_any(caps) {
            return Ok(());
        }
        let names: Vec<&str> = caps.iter().map(|c| c.as_str()).collect();
        Err(CoreError::Forbidden(format!(
            "Missing permission (one of: {})",
            names.join(", ")
        )))
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        let mut set = Self::empty();
        for cap in iter {
            set.insert(cap);
        }
        set
    }
}

/// Boolean-per-capability representation used by JSON payloads and the
/// `users.can_*` columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PermissionFlags {
    #[serde(default)]
    pub add: bool,
    #[serde(default)]
    pub edit: bool,
    #[serde(default)]
    pub delete: bool,
    #[serde(default)]
    pub approve: bool,
    #[serde(default)]
    pub assign: bool,
    #[serde(default)]
    pub allocate: bool,
}

impl From<PermissionFlags> for CapabilitySet {
    fn from(flags: PermissionFlags) -> Self {
        let mut set = CapabilitySet::empty();
        set.set(Capability::Add, flags.add);
        set.set(Capability::Edit, flags.edit);
        set.set(Capability::Delete, flags.delete);
        set.set(Capability::Approve, flags.approve);
        set.set(Capability::Assign, flags.assign);
        set.set(Capability::Allocate, flags.allocate);
        set
    }
}

impl From<CapabilitySet> for PermissionFlags {
    fn from(set: CapabilitySet) -> Self {
        PermissionFlags {
            add: set.contains(Capability::Add),
            edit: set.contains(Capability::Edit),
            delete: set.contains(Capability::Delete),
            approve: set.contains(Capability::Approve),
            assign: set.contains(Capability::Assign),
            allocate: set.contains(Capability::Allocate),
        }
    }
}

/// Partial permission update used by the admin user patch endpoint.
/// Absent flags keep their current value.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PermissionPatch {
    pub add: Option<bool>,
    pub edit: Option<bool>,
    pub delete: Option<bool>,
    pub approve: Option<bool>,
    pub assign: Option<bool>,
    pub allocate: Option<bool>,
}

impl PermissionPatch {
    pub fn apply(&self, mut current: CapabilitySet) -> CapabilitySet {
        let pairs = [
            (Capability::Add, self.add),
            (Capability::Edit, self.edit),
            (Capability::Delete, self.delete),
            (Capability::Approve, self.approve),
            (Capability::Assign, self.assign),
            (Capability::Allocate, self.allocate),
        ];
        for (cap, value) in pairs {
            if let Some(granted) = value {
                current.set(cap, granted);
            }
        }
        current
    }
}
