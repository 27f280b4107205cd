//! Startup seeding of the first admin account.

use ctrack_core::capability::CapabilitySet;
use ctrack_core::roles::Role;
use ctrack_db::models::user::{CreateUser, User};
use ctrack_db::repositories::UserRepo;
use ctrack_db::DbPool;

use crate::auth::password;
use crate::config::BootstrapAdmin;
use crate::error::{AppError, AppResult};

/// Create the configured admin if no user with that username exists.
///
/// Returns the created user, or `None` when the account was already there.
/// An existing account is never modified.
pub async fn ensure_admin(pool: &DbPool, admin: &BootstrapAdmin) -> AppResult<Option<User>> {
    if UserRepo::find_by_username(pool, &admin.username)
        .await?
        .is_some()
    {
        tracing::debug!(username = %admin.username, "Bootstrap admin already exists");
        return Ok(None);
    }

    password::check_length(&admin.password)
        .map_err(|e| AppError::BadRequest(format!("BOOTSTRAP_ADMIN_PASSWORD: {e}")))?;
    let password_hash = password::hash(admin.password.clone()).await?;

    let user = UserRepo::create(
        pool,
        &CreateUser {
            username: admin.username.clone(),
            password_hash,
            role: Role::Admin,
            permissions: CapabilitySet::all(),
        },
    )
    .await?;

    tracing::info!(user_id = user.id, username = %user.username, "Bootstrap admin created");
    Ok(Some(user))
}
