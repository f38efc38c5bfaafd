//! Authentication and role-gated access
//!
//! - [`policy`]: the account kind / role entitlement table
//! - [`identity`] and [`users`]: the credential store
//! - [`session`]: session context and its stores
//! - [`guard`]: `require_role`

pub mod guard;
pub mod identity;
pub mod policy;
pub mod session;
pub mod users;

pub use guard::{check_access, require_authenticated, require_role, AccessError, Authorized};
pub use identity::{hash_password, UserAccount, UserSummary};
pub use policy::{available_roles, can_access, AccountKind, Role, RoleRequirement};
pub use session::{
    MemorySessionStorage, Session, SessionContext, SessionStorage, SqliteSessionStorage,
};
pub use users::{
    ensure_bootstrap_admin, verify_credentials, NewUser, SqliteUserStorage, UserChanges,
    UserForm, UserStorage,
};
