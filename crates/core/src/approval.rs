//! Approval state machine.
//!
//! A project is `Pending`, `Approved` or `Rejected`, and may additionally
//! carry one staged [`PendingAction`]. The functions here decide, from the
//! current state and the caller's capabilities, what a request is allowed to
//! do. They never perform I/O: the workflow layer loads the row under lock,
//! asks for a plan, and then executes it inside the same transaction.

use crate::capability::{Capability, CapabilitySet};
use crate::error::CoreError;
use crate::project::{ApprovalStatus, PendingAction, ProjectChanges};

/// Snapshot of the state-machine-relevant parts of a project.
#[derive(Debug, Clone, Copy)]
pub struct ApprovalState<'a> {
    pub status: ApprovalStatus,
    pub pending: &'a PendingAction,
}

impl<'a> ApprovalState<'a> {
    pub fn new(status: ApprovalStatus, pending: &'a PendingAction) -> Self {
        Self { status, pending }
    }

    /// Direct writes by non-approvers are only allowed before approval.
    fn requires_staging(&self, caps: CapabilitySet) -> bool {
        self.status == ApprovalStatus::Approved && !caps.contains(Capability::Approve)
    }
}

// ---------------------------------------------------------------------------
// Plans
// ---------------------------------------------------------------------------

/// What an update request resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePlan {
    /// Merge the submitted fields into the project now.
    Apply,
    /// Store the submitted fields as the pending edit. `supersedes` is true
    /// when an earlier pending edit is being replaced.
    Stage { supersedes: bool },
}

/// What a delete request resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletePlan {
    /// Delete the project and renumber its type.
    Remove,
    /// Flag the project as pending deletion.
    Stage,
}

/// Outcome of resolving a staged action (reject-edit / reject-delete).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discard {
    /// The pending action after the discard.
    pub remaining: PendingAction,
    /// Whether a matching staged action was actually discarded.
    pub discarded: bool,
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

/// Create: requires `add`. New projects always start `Pending`.
pub fn plan_create(caps: CapabilitySet) -> Result<ApprovalStatus, CoreError> {
    caps.require(Capability::Add)?;
    Ok(ApprovalStatus::Pending)
}

/// Update: requires `edit` or `approve`.
///
/// Non-approvers editing an approved project get their change staged.
/// Staging over a pending delete is a conflict; staging over a pending edit
/// replaces it.
pub fn plan_update(state: ApprovalState<'_>, caps: CapabilitySet) -> Result<UpdatePlan, CoreError> {
    caps.require_any(&[Capability::Edit, Capability::Approve])?;

    if !state.requires_staging(caps) {
        return Ok(UpdatePlan::Apply);
    }

    match state.pending {
        PendingAction::None => Ok(UpdatePlan::Stage { supersedes: false }),
        PendingAction::Edit(_) => Ok(UpdatePlan::Stage { supersedes: true }),
        PendingAction::Delete => Err(CoreError::Conflict(
            "Project already has a pending delete request".into(),
        )),
    }
}

/// Delete: requires `delete` or `approve`.
///
/// Non-approvers deleting an approved project get the deletion staged; only
/// one staged action may exist at a time.
pub fn plan_delete(state: ApprovalState<'_>, caps: CapabilitySet) -> Result<DeletePlan, CoreError> {
    caps.require_any(&[Capability::Delete, Capability::Approve])?;

    if !state.requires_staging(caps) {
        return Ok(DeletePlan::Remove);
    }

    match state.pending {
        PendingAction::None => Ok(DeletePlan::Stage),
        PendingAction::Delete => Err(CoreError::Conflict(
            "Project already has a pending delete request".into(),
        )),
        PendingAction::Edit(_) => Err(CoreError::Conflict(
            "Project has a pending edit request; resolve it first".into(),
        )),
    }
}

/// Approve: requires `approve`.
///
/// With `strict` unset any status may be approved. With `strict` set only
/// `Pending` projects may be approved.
pub fn approve(
    status: ApprovalStatus,
    caps: CapabilitySet,
    strict: bool,
) -> Result<ApprovalStatus, CoreError> {
    caps.require(Capability::Approve)?;
    if strict && status != ApprovalStatus::Pending {
        return Err(CoreError::Validation(format!(
            "Only projects in status '{}' can be approved (current: '{}')",
            ApprovalStatus::Pending,
            status
        )));
    }
    Ok(ApprovalStatus::Approved)
}

/// Reject: requires `approve`; unconditional.
pub fn reject(caps: CapabilitySet) -> Result<ApprovalStatus, CoreError> {
    caps.require(Capability::Approve)?;
    Ok(ApprovalStatus::Rejected)
}

/// Approve-edit: requires `approve` and a staged edit, whose change set is
/// returned for application.
pub fn approve_edit(
    pending: &PendingAction,
    caps: CapabilitySet,
) -> Result<ProjectChanges, CoreError> {
    caps.require(Capability::Approve)?;
    pending
        .edit()
        .cloned()
        .ok_or_else(|| CoreError::Validation("No pending edit for this project".into()))
}

/// Reject-edit: requires `approve`. Clears a staged edit if there is one;
/// never fails on a missing stage and leaves a staged delete untouched.
pub fn reject_edit(pending: &PendingAction, caps: CapabilitySet) -> Result<Discard, CoreError> {
    caps.require(Capability::Approve)?;
    Ok(match pending {
        PendingAction::Edit(_) => Discard {
            remaining: PendingAction::None,
            discarded: true,
        },
        other => Discard {
            remaining: other.clone(),
            discarded: false,
        },
    })
}

/// Approve-delete: requires `approve` and a staged delete.
pub fn approve_delete(pending: &PendingAction, caps: CapabilitySet) -> Result<(), CoreError> {
    caps.require(Capability::Approve)?;
    if pending.is_delete() {
        Ok(())
    } else {
        Err(CoreError::Validation(
            "No pending delete for this project".into(),
        ))
    }
}

/// Reject-delete: requires `approve`. Clears a staged delete if there is
/// one; never fails on a missing stage and leaves a staged edit untouched.
pub fn reject_delete(pending: &PendingAction, caps: CapabilitySet) -> Result<Discard, CoreError> {
    caps.require(Capability::Approve)?;
    Ok(match pending {
        PendingAction::Delete => Discard {
            remaining: PendingAction::None,
            discarded: true,
        },
        other => Discard {
            remaining: other.clone(),
            discarded: false,
        },
    })
}

/// Allocate: set the allocation wave. Requires `allocate`.
pub fn allocate(caps: CapabilitySet) -> Result<(), CoreError> {
    caps.require(Capability::Allocate)
}

/// Assign: set the assignee. Requires `assign`.
pub fn assign(caps: CapabilitySet) -> Result<(), CoreError> {
    caps.require(Capability::Assign)
}
