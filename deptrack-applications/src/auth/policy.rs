//! Access Policy
//!
//! Two account kinds and three roles. The whole policy is the entitlement
//! table in [`can_access`]; there is no rule composition or dynamic loading.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of account
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountKind {
    /// May select any role
    #[serde(rename = "admin")]
    Administrator,
    /// May select the operational roles only
    #[serde(rename = "user")]
    Member,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountKind::Administrator => "admin",
            AccountKind::Member => "user",
        }
    }
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(AccountKind::Administrator),
            "user" => Ok(AccountKind::Member),
            _ => Err(format!("Unknown account kind: {}", s)),
        }
    }
}

/// A department role a session can operate in
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// TVET operational department
    Tvet,
    /// LPAF operational department
    Lpaf,
    /// Administrative role
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Tvet, Role::Lpaf, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Tvet => "tvet",
            Role::Lpaf => "lpaf",
            Role::Admin => "admin",
        }
    }

    /// Upper-cased tag used in audit entries and department-scoped records
    pub fn department_tag(&self) -> &'static str {
        match self {
            Role::Tvet => "TVET",
            Role::Lpaf => "LPAF",
            Role::Admin => "ADMIN",
        }
    }

    /// Where a client should go after selecting this role
    pub fn landing_path(&self) -> &'static str {
        match self {
            Role::Tvet => "/tvet/inventory",
            Role::Lpaf => "/lpaf/inventory",
            Role::Admin => "/admin/logs",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tvet" => Ok(Role::Tvet),
            "lpaf" => Ok(Role::Lpaf),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// Whether an account kind may ever select a role
pub fn can_access(kind: AccountKind, role: Role) -> bool {
    match (kind, role) {
        (AccountKind::Administrator, _) => true,
        (AccountKind::Member, Role::Tvet | Role::Lpaf) => true,
        (AccountKind::Member, Role::Admin) => false,
    }
}

/// Roles an account kind is entitled to, in display order
pub fn available_roles(kind: AccountKind) -> Vec<Role> {
    Role::ALL
        .into_iter()
        .filter(|role| can_access(kind, *role))
        .collect()
}

/// What a guarded operation demands of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleRequirement {
    One(Role),
    /// Shared by several departments; the selected one keys the data
    AnyOf(&'static [Role]),
}

impl RoleRequirement {
    /// Personnel and finance records, shared by both operational departments
    pub const OPERATIONAL: RoleRequirement = RoleRequirement::AnyOf(&[Role::Tvet, Role::Lpaf]);

    pub fn roles(&self) -> &[Role] {
        match self {
            RoleRequirement::One(role) => std::slice::from_ref(role),
            RoleRequirement::AnyOf(roles) => roles,
        }
    }

    pub fn contains(&self, role: Role) -> bool {
        self.roles().contains(&role)
    }

    /// Human readable form, e.g. `tvet or lpaf`
    pub fn describe(&self) -> String {
        self.roles()
            .iter()
            .map(Role::as_str)
            .collect::<Vec<_>>()
            .join(" or ")
    }
}

impl From<Role> for RoleRequirement {
    fn from(role: Role) -> Self {
        RoleRequirement::One(role)
    }
}
