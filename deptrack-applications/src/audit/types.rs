//! Activity log data types

use crate::auth::{Role, UserAccount};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum number of entries returned by one log query
pub const LOG_PAGE_SIZE: usize = 100;

/// Kind of session event recorded in the log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityAction {
    Login,
    Logout,
    Access,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::Login => "login",
            ActivityAction::Logout => "logout",
            ActivityAction::Access => "access",
        }
    }
}

impl fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "login" => Ok(ActivityAction::Login),
            "logout" => Ok(ActivityAction::Logout),
            "access" => Ok(ActivityAction::Access),
            _ => Err(format!("Unknown activity action: {}", s)),
        }
    }
}

/// The user's display fields, copied at event time.
///
/// Log rows hold these values rather than a reference, so later renames or
/// deletions never rewrite history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivitySnapshot {
    pub user_id: i64,
    pub username: String,
    pub name: String,
    /// Empty when the user has no position
    pub position: String,
}

impl ActivitySnapshot {
    pub fn capture(user: &UserAccount) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            name: user.name.clone(),
            position: user.position.clone().unwrap_or_default(),
        }
    }
}

/// An entry about to be appended
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub snapshot: ActivitySnapshot,
    pub action: ActivityAction,
    pub department: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// A stored log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityLogEntry {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub name: String,
    pub position: String,
    pub action: ActivityAction,
    pub department: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Department restriction for log queries
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DepartmentFilter {
    #[default]
    All,
    /// Upper-cased department tag
    Only(String),
}

impl DepartmentFilter {
    /// `None`, blank and `all` (any case) mean no filter; anything else is
    /// compared upper-cased.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") => Self::All,
            Some(v) if v.eq_ignore_ascii_case("all") => Self::All,
            Some(v) => Self::Only(v.to_uppercase()),
        }
    }

    pub fn role(role: Role) -> Self {
        Self::Only(role.department_tag().to_string())
    }

    pub fn department(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::Only(tag) => Some(tag),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AccountKind;

    #[test]
    fn test_filter_parsing() {
        assert_eq!(DepartmentFilter::parse(None), DepartmentFilter::All);
        assert_eq!(DepartmentFilter::parse(Some("")), DepartmentFilter::All);
        assert_eq!(DepartmentFilter::parse(Some("ALL")), DepartmentFilter::All);
        assert_eq!(
            DepartmentFilter::parse(Some("tvet")),
            DepartmentFilter::Only("TVET".to_string())
        );
        assert_eq!(DepartmentFilter::role(Role::Lpaf).department(), Some("LPAF"));
    }

    #[test]
    fn test_snapshot_copies_values() {
        let mut user = UserAccount {
            id: 9,
            username: "staff1".to_string(),
            name: "Staff One".to_string(),
            position: None,
            account_kind: AccountKind::Member,
            password_hash: String::new(),
            created_at: Utc::now(),
        };
        let snapshot = ActivitySnapshot::capture(&user);
        user.name = "Renamed".to_string();

        assert_eq!(snapshot.name, "Staff One");
        assert_eq!(snapshot.position, "");
    }

    #[test]
    fn test_action_names() {
        assert_eq!(ActivityAction::Access.to_string(), "access");
        assert_eq!("logout".parse::<ActivityAction>().unwrap(), ActivityAction::Logout);
        assert!("delete".parse::<ActivityAction>().is_err());
    }
}
