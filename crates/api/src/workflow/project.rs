//! Transaction orchestration for project state transitions.
//!
//! Every transition follows the same shape:
//!
//! 1. open a transaction and lock what the transition touches (the per-type
//!    serial lock first when serials may change, then the project row);
//! 2. ask [`ctrack_core::approval`] for a plan given the locked state and the
//!    caller's capabilities;
//! 3. execute the plan, writing project changes and notifications in the
//!    same transaction;
//! 4. commit, then publish every notification written or closed.
//!
//! Publishing happens strictly after commit, so a client never sees a
//! notification for a change that was rolled back. A failed publish never
//! undoes the commit.

use std::sync::Arc;

use ctrack_core::approval::{self, ApprovalState, DeletePlan, UpdatePlan};
use ctrack_core::error::CoreError;
use ctrack_core::notification::NotificationKind;
use ctrack_core::project::{
    ApprovalStatus, NewProject, PendingAction, PendingKind, ProjectChanges, ProjectType,
};
use ctrack_core::serial::next_serial;
use ctrack_core::types::DbId;
use ctrack_db::models::notification::{CreateNotification, Notification};
use ctrack_db::models::project::Project;
use ctrack_db::repositories::{NotificationRepo, ProjectRepo};
use ctrack_db::DbPool;
use ctrack_events::EventBus;
use sqlx::PgConnection;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::realtime::publish_notifications;
use crate::state::AppState;

/// Result of an update request.
#[derive(Debug)]
pub enum UpdateOutcome {
    /// Fields were merged into the project.
    Applied(Project),
    /// Fields were staged as the pending edit.
    Staged(Project),
}

/// Result of a delete request.
#[derive(Debug)]
pub enum DeleteOutcome {
    /// The project is gone; `renumbered` other projects got a new serial.
    Removed { renumbered: usize },
    /// The deletion was staged for approval.
    Staged(Project),
}

/// Runs project state transitions against the database and event bus.
#[derive(Clone)]
pub struct ProjectWorkflow {
    pool: DbPool,
    event_bus: Arc<EventBus>,
    strict_approval: bool,
}

impl ProjectWorkflow {
    pub fn new(pool: DbPool, event_bus: Arc<EventBus>, strict_approval: bool) -> Self {
        Self {
            pool,
            event_bus,
            strict_approval,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            state.pool.clone(),
            Arc::clone(&state.event_bus),
            state.config.strict_approval,
        )
    }

    // -----------------------------------------------------------------------
    // Create / update / delete
    // -----------------------------------------------------------------------

    /// Create a project: allocate the next serial of its type under the
    /// per-type lock and announce it with a `new` notification.
    pub async fn create(&self, user: &AuthUser, input: NewProject) -> AppResult<Project> {
        let status = approval::plan_create(user.capabilities)?;
        let input = input.normalize();
        input.validate_new()?;

        let mut tx = self.pool.begin().await?;
        ProjectRepo::lock_serials(&mut tx, input.project_type).await?;
        let max = ProjectRepo::max_serial(&mut tx, input.project_type).await?;
        let serial_number = next_serial(max);
        let project =
            ProjectRepo::insert(&mut tx, &input, serial_number, status, &user.username).await?;
        let notification = notify(&mut tx, NotificationKind::New, &project).await?;
        tx.commit().await?;

        tracing::info!(
            project_id = project.id,
            project_type = %project.project_type,
            serial_number,
            user_id = user.user_id,
            "Project created"
        );
        self.publish(user, &[notification]);
        Ok(project)
    }

    /// Update a project, or stage the change when the project is approved
    /// and the caller cannot approve.
    ///
    /// `project_type` is the type echoed by the client, if any; it must match
    /// the stored type, which never changes.
    pub async fn update(
        &self,
        user: &AuthUser,
        id: DbId,
        project_type: Option<ProjectType>,
        changes: ProjectChanges,
    ) -> AppResult<UpdateOutcome> {
        let mut tx = self.pool.begin().await?;
        let project = lock_project(&mut tx, id).await?;
        if project_type.is_some_and(|t| t != project.project_type) {
            return Err(CoreError::Validation("Project type cannot be changed".into()).into());
        }
        let changes = changes.normalize();
        changes.validate_for(project.project_type)?;

        let state = ApprovalState::new(project.status, &project.pending);
        match approval::plan_update(state, user.capabilities)? {
            UpdatePlan::Apply => {
                let updated = ProjectRepo::apply_changes(&mut tx, id, &changes).await?;
                tx.commit().await?;
                tracing::info!(
                    project_id = id,
                    user_id = user.user_id,
                    fields = ?changes.changed_fields(),
                    "Project updated"
                );
                Ok(UpdateOutcome::Applied(updated))
            }
            UpdatePlan::Stage { supersedes } => {
                let mut notifications = Vec::new();
                if supersedes {
                    notifications.extend(
                        NotificationRepo::mark_processed_for_project(
                            &mut tx,
                            id,
                            Some(NotificationKind::Edit),
                        )
                        .await?,
                    );
                }
                let fields = changes.changed_fields();
                let staged =
                    ProjectRepo::set_pending(&mut tx, id, &PendingAction::Edit(changes)).await?;
                notifications.push(notify(&mut tx, NotificationKind::Edit, &staged).await?);
                tx.commit().await?;

                tracing::info!(
                    project_id = id,
                    user_id = user.user_id,
                    ?fields,
                    supersedes,
                    "Project edit staged for approval"
                );
                self.publish(user, &notifications);
                Ok(UpdateOutcome::Staged(staged))
            }
        }
    }

    /// Delete a project and renumber its type, or stage the deletion when
    /// the project is approved and the caller cannot approve.
    pub async fn delete(&self, user: &AuthUser, id: DbId) -> AppResult<DeleteOutcome> {
        let mut tx = self.pool.begin().await?;
        let project = lock_project_and_serials(&mut tx, id).await?;

        let state = ApprovalState::new(project.status, &project.pending);
        match approval::plan_delete(state, user.capabilities)? {
            DeletePlan::Remove => {
                let (renumbered, closed) = remove(&mut tx, &project).await?;
                tx.commit().await?;

                tracing::info!(
                    project_id = id,
                    project_type = %project.project_type,
                    renumbered,
                    user_id = user.user_id,
                    "Project deleted"
                );
                self.publish(user, &closed);
                Ok(DeleteOutcome::Removed { renumbered })
            }
            DeletePlan::Stage => {
                let staged = ProjectRepo::set_pending(&mut tx, id, &PendingAction::Delete).await?;
                let notification = notify(&mut tx, NotificationKind::Delete, &staged).await?;
                tx.commit().await?;

                tracing::info!(
                    project_id = id,
                    user_id = user.user_id,
                    "Project deletion staged for approval"
                );
                self.publish(user, &[notification]);
                Ok(DeleteOutcome::Staged(staged))
            }
        }
    }

    // -----------------------------------------------------------------------
    // Approval status
    // -----------------------------------------------------------------------

    /// Set the project to `Approved`. Closes the pending `new` notification.
    pub async fn approve(&self, user: &AuthUser, id: DbId) -> AppResult<Project> {
        let mut tx = self.pool.begin().await?;
        let project = lock_project(&mut tx, id).await?;

        let status = approval::approve(project.status, user.capabilities, self.strict_approval)?;
        if project.status != ApprovalStatus::Pending {
            tracing::warn!(
                project_id = id,
                current_status = %project.status,
                user_id = user.user_id,
                "Approving a project that is not awaiting approval"
            );
        }
        self.set_status(tx, user, project, status).await
    }

    /// Set the project to `Rejected`. Closes the pending `new` notification.
    pub async fn reject(&self, user: &AuthUser, id: DbId) -> AppResult<Project> {
        let status = approval::reject(user.capabilities)?;
        let mut tx = self.pool.begin().await?;
        let project = lock_project(&mut tx, id).await?;
        self.set_status(tx, user, project, status).await
    }

    async fn set_status(
        &self,
        mut tx: sqlx::Transaction<'static, sqlx::Postgres>,
        user: &AuthUser,
        project: Project,
        status: ApprovalStatus,
    ) -> AppResult<Project> {
        let updated = ProjectRepo::set_status(&mut tx, project.id, status).await?;
        let closed = NotificationRepo::mark_processed_for_project(
            &mut tx,
            project.id,
            Some(NotificationKind::New),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            project_id = project.id,
            from = %project.status,
            to = %status,
            user_id = user.user_id,
            "Project status changed"
        );
        self.publish(user, &closed);
        Ok(updated)
    }

    // -----------------------------------------------------------------------
    // Staged edits
    // -----------------------------------------------------------------------

    /// Apply the staged edit field by field and clear it.
    pub async fn approve_edit(&self, user: &AuthUser, id: DbId) -> AppResult<Project> {
        let mut tx = self.pool.begin().await?;
        let project = lock_project(&mut tx, id).await?;

        let changes = approval::approve_edit(&project.pending, user.capabilities)?;
        ProjectRepo::apply_changes(&mut tx, id, &changes).await?;
        let updated = ProjectRepo::set_pending(&mut tx, id, &PendingAction::None).await?;
        let closed = close_notifications(&mut tx, id, PendingKind::Edit).await?;
        tx.commit().await?;

        tracing::info!(
            project_id = id,
            user_id = user.user_id,
            fields = ?changes.changed_fields(),
            "Staged edit approved"
        );
        self.publish(user, &closed);
        Ok(updated)
    }

    /// Discard the staged edit, if any.
    pub async fn reject_edit(&self, user: &AuthUser, id: DbId) -> AppResult<Project> {
        let mut tx = self.pool.begin().await?;
        let project = lock_project(&mut tx, id).await?;

        let discard = approval::reject_edit(&project.pending, user.capabilities)?;
        self.finish_discard(tx, user, project, discard, PendingKind::Edit)
            .await
    }

    // -----------------------------------------------------------------------
    // Staged deletes
    // -----------------------------------------------------------------------

    /// Carry out the staged deletion and renumber the type.
    pub async fn approve_delete(&self, user: &AuthUser, id: DbId) -> AppResult<usize> {
        let mut tx = self.pool.begin().await?;
        let project = lock_project_and_serials(&mut tx, id).await?;

        approval::approve_delete(&project.pending, user.capabilities)?;
        let (renumbered, closed) = remove(&mut tx, &project).await?;
        tx.commit().await?;

        tracing::info!(
            project_id = id,
            project_type = %project.project_type,
            renumbered,
            user_id = user.user_id,
            "Staged deletion approved"
        );
        self.publish(user, &closed);
        Ok(renumbered)
    }

    /// Clear the staged deletion, if any. The project stays.
    pub async fn reject_delete(&self, user: &AuthUser, id: DbId) -> AppResult<Project> {
        let mut tx = self.pool.begin().await?;
        let project = lock_project(&mut tx, id).await?;

        let discard = approval::reject_delete(&project.pending, user.capabilities)?;
        self.finish_discard(tx, user, project, discard, PendingKind::Delete)
            .await
    }

    async fn finish_discard(
        &self,
        mut tx: sqlx::Transaction<'static, sqlx::Postgres>,
        user: &AuthUser,
        project: Project,
        discard: approval::Discard,
        kind: PendingKind,
    ) -> AppResult<Project> {
        let updated = if discard.discarded {
            ProjectRepo::set_pending(&mut tx, project.id, &discard.remaining).await?
        } else {
            project
        };
        let closed = close_notifications(&mut tx, updated.id, kind).await?;
        tx.commit().await?;

        tracing::info!(
            project_id = updated.id,
            action = kind.as_str(),
            discarded = discard.discarded,
            user_id = user.user_id,
            "Staged action rejected"
        );
        self.publish(user, &closed);
        Ok(updated)
    }

    // -----------------------------------------------------------------------
    // Allocate / assign
    // -----------------------------------------------------------------------

    pub async fn allocate(
        &self,
        user: &AuthUser,
        id: DbId,
        allocation_wave: &str,
    ) -> AppResult<Project> {
        approval::allocate(user.capabilities)?;
        let wave = required_text("allocationWave", allocation_wave)?;

        let mut tx = self.pool.begin().await?;
        lock_project(&mut tx, id).await?;
        let updated = ProjectRepo::set_allocation_wave(&mut tx, id, wave).await?;
        tx.commit().await?;

        tracing::info!(
            project_id = id,
            allocation_wave = wave,
            user_id = user.user_id,
            "Project allocated"
        );
        Ok(updated)
    }

    pub async fn assign(&self, user: &AuthUser, id: DbId, assigned_to: &str) -> AppResult<Project> {
        approval::assign(user.capabilities)?;
        let assignee = required_text("assignedTo", assigned_to)?;

        let mut tx = self.pool.begin().await?;
        lock_project(&mut tx, id).await?;
        let updated = ProjectRepo::set_assigned_to(&mut tx, id, assignee).await?;
        tx.commit().await?;

        tracing::info!(
            project_id = id,
            assigned_to = assignee,
            user_id = user.user_id,
            "Project assigned"
        );
        Ok(updated)
    }

    /// Push notifications to realtime subscribers. Call only after commit.
    fn publish(&self, user: &AuthUser, notifications: &[Notification]) {
        publish_notifications(&self.event_bus, user.user_id, notifications);
    }
}

// ---------------------------------------------------------------------------
// Transaction steps
// ---------------------------------------------------------------------------

fn not_found(id: DbId) -> CoreError {
    CoreError::NotFound {
        entity: "Project",
        id,
    }
}

/// Row-lock a project.
async fn lock_project(conn: &mut PgConnection, id: DbId) -> AppResult<Project> {
    Ok(ProjectRepo::find_for_update(conn, id)
        .await?
        .ok_or_else(|| not_found(id))?)
}

/// Take the serial lock of the project's type, then row-lock the project.
///
/// Always in this order, matching create, so concurrent deletes and creates
/// of one type queue on the advisory lock instead of deadlocking on rows.
async fn lock_project_and_serials(conn: &mut PgConnection, id: DbId) -> AppResult<Project> {
    let project_type = ProjectRepo::find_type(&mut *conn, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    ProjectRepo::lock_serials(&mut *conn, project_type).await?;
    lock_project(conn, id).await
}

/// Delete a locked project, renumber its type and close its notifications.
async fn remove(
    conn: &mut PgConnection,
    project: &Project,
) -> AppResult<(usize, Vec<Notification>)> {
    ProjectRepo::delete(&mut *conn, project.id).await?;
    let renumbered = ProjectRepo::renumber(&mut *conn, project.project_type).await?;
    let closed = NotificationRepo::mark_processed_for_project(&mut *conn, project.id, None).await?;
    Ok((renumbered.len(), closed))
}

async fn notify(
    conn: &mut PgConnection,
    kind: NotificationKind,
    project: &Project,
) -> AppResult<Notification> {
    let input = CreateNotification::for_project(kind, project.id, &project.name);
    Ok(NotificationRepo::create(conn, &input).await?)
}

async fn close_notifications(
    conn: &mut PgConnection,
    project_id: DbId,
    kind: PendingKind,
) -> AppResult<Vec<Notification>> {
    Ok(NotificationRepo::mark_processed_for_project(conn, project_id, Some(kind.into())).await?)
}

fn required_text<'a>(field: &str, value: &'a str) -> Result<&'a str, CoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(format!("{field} is required")));
    }
    Ok(trimmed)
}
