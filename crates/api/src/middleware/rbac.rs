//! Role- and capability-based access control extractors.
//!
//! Each extractor wraps [`AuthUser`] and rejects the request with 403 before
//! the handler runs, so no state is read or touched on a forbidden call.

use std::marker::PhantomData;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use ctrack_core::capability::Capability;
use ctrack_core::error::CoreError;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Requires the `admin` role. Rejects with 403 Forbidden otherwise.
///
/// ```ignore
/// async fn admin_only(RequireAdmin(user): RequireAdmin) -> AppResult<Json<()>> {
///     // user is guaranteed to be an admin here
///     Ok(Json(()))
/// }
/// ```
pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.role.is_admin() {
            return Err(AppError::Core(CoreError::Forbidden(
                "Admin role required".into(),
            )));
        }
        Ok(RequireAdmin(user))
    }
}

/// A capability requirement: the caller must hold at least one of `ANY_OF`.
pub trait CapabilityRule {
    const ANY_OF: &'static [Capability];
}

macro_rules! capability_rule {
    ($(#[$doc:meta])* $name:ident => [$($cap:ident),+]) => {
        $(#[$doc])*
        pub struct $name;

        impl CapabilityRule for $name {
            const ANY_OF: &'static [Capability] = &[$(Capability::$cap),+];
        }
    };
}

capability_rule!(
    /// Create projects.
    CanAdd => [Add]
);
capability_rule!(
    /// Update (or stage an update to) projects.
    CanEdit => [Edit, Approve]
);
capability_rule!(
    /// Delete (or stage a deletion of) projects.
    CanDelete => [Delete, Approve]
);
capability_rule!(
    /// Approve, reject and resolve staged actions.
    CanApprove => [Approve]
);
capability_rule!(
    /// Set the allocation wave.
    CanAllocate => [Allocate]
);
capability_rule!(
    /// Set the assignee.
    CanAssign => [Assign]
);

/// Requires the capability rule `R`. Rejects with 403 Forbidden otherwise.
///
/// ```ignore
/// async fn approve(RequireCapability(user, _): RequireCapability<CanApprove>) -> AppResult<()> {
///     Ok(())
/// }
/// ```
pub struct RequireCapability<R: CapabilityRule>(pub AuthUser, pub PhantomData<R>);

impl<R: CapabilityRule> RequireCapability<R> {
    pub fn into_user(self) -> AuthUser {
        self.0
    }
}

impl<R> FromRequestParts<AppState> for RequireCapability<R>
where
    R: CapabilityRule + Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        user.capabilities.require_any(R::ANY_OF)?;
        Ok(RequireCapability(user, PhantomData))
    }
}
