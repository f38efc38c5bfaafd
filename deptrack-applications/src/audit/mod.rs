//! Append-only activity audit log
//!
//! Entries record logins, logouts and role selections with a by-value
//! snapshot of the user's display fields.

pub mod logger;
pub mod storage;
pub mod types;

pub use logger::AuditLogger;
pub use storage::{AuditLogStorage, SqliteAuditLogStorage};
pub use types::{
    ActivityAction, ActivityLogEntry, ActivitySnapshot, DepartmentFilter, NewActivity,
    LOG_PAGE_SIZE,
};
