//! The role guard run at the start of every protected operation

use super::identity::UserAccount;
use super::policy::{can_access, Role, RoleRequirement};
use super::session::SessionContext;
use super::users::UserStorage;
use crate::ApplicationResult;
use tracing::debug;

/// Why a guarded operation was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("Please log in first")]
    NotAuthenticated,

    #[error("User {user_id} no longer exists")]
    UserNotFound { user_id: i64 },

    #[error("You do not have permission to access this area")]
    Forbidden { required: String },

    #[error("Please select the {required} role first")]
    RoleNotSelected { required: String },
}

impl AccessError {
    /// Whether the caller should be sent back to the login page
    pub fn requires_login(&self) -> bool {
        matches!(self, Self::NotAuthenticated | Self::UserNotFound { .. })
    }
}

/// A user that passed the guard, and the role it is operating in
#[derive(Debug, Clone)]
pub struct Authorized {
    pub user: UserAccount,
    pub role: Role,
}

/// Entitlement then selection, for an already resolved user.
///
/// Returns the selected role when both checks pass.
pub fn check_access(
    user: &UserAccount,
    selected: Option<Role>,
    requirement: &RoleRequirement,
) -> Result<Role, AccessError> {
    let entitled = requirement
        .roles()
        .iter()
        .any(|role| can_access(user.account_kind, *role));
    if !entitled {
        return Err(AccessError::Forbidden {
            required: requirement.describe(),
        });
    }

    match selected {
        Some(role) if requirement.contains(role) => Ok(role),
        _ => Err(AccessError::RoleNotSelected {
            required: requirement.describe(),
        }),
    }
}

/// Resolve the session's user and check it against `requirement`
pub async fn require_role(
    ctx: &SessionContext,
    users: &dyn UserStorage,
    requirement: &RoleRequirement,
) -> ApplicationResult<Authorized> {
    let user = require_authenticated(ctx, users).await?;

    match check_access(&user, ctx.selected_role, requirement) {
        Ok(role) => Ok(Authorized { user, role }),
        Err(e) => {
            debug!(user_id = user.id, required = %requirement.describe(), "Access refused: {}", e);
            Err(e.into())
        }
    }
}

/// Resolve the session's user without any role requirement
pub async fn require_authenticated(
    ctx: &SessionContext,
    users: &dyn UserStorage,
) -> ApplicationResult<UserAccount> {
    let user_id = ctx.user_id.ok_or(AccessError::NotAuthenticated)?;

    match users.find_by_id(user_id).await? {
        Some(user) => Ok(user),
        None => {
            debug!(user_id, "Session refers to a deleted user");
            Err(AccessError::UserNotFound { user_id }.into())
        }
    }
}
