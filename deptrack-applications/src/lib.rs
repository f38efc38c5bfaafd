//! deptrack applications - access control, audit trail and department records
//!
//! This crate holds everything between the HTTP surface and the database:
//!
//! - **auth**: account kinds, roles, the entitlement table, sessions and the
//!   `require_role` guard
//! - **audit**: the append-only activity log and its best-effort writer
//! - **records**: personnel, student, finance, inventory and study library
//!   stores
//! - **application**: [`DeptrackApplication`], the facade every handler calls
//!
//! ## Architecture
//!
//! Storage sits behind `#[async_trait]` traits so the guard and audit logic
//! can be exercised against any backend. SQLite implementations are provided
//! for everything; sessions also have an in-memory store.

pub mod application;
pub mod audit;
pub mod auth;
pub mod database;
pub mod records;

pub use application::{DeptrackApplication, LoginOutcome, RecordStores};
pub use audit::{
    ActivityAction, ActivityLogEntry, ActivitySnapshot, AuditLogStorage, AuditLogger,
    DepartmentFilter, SqliteAuditLogStorage, LOG_PAGE_SIZE,
};
pub use auth::{
    can_access, check_access, require_role, AccessError, AccountKind, Authorized,
    MemorySessionStorage, Role, RoleRequirement, Session, SessionContext, SessionStorage,
    SqliteSessionStorage, SqliteUserStorage, UserAccount, UserForm, UserStorage, UserSummary,
};
pub use records::{
    Catalog, CatalogEntry, CatalogForm, CatalogStorage, Employee, EmployeeForm, EmployeeStorage,
    FinanceLedger, FinanceQuery, FinanceStorage, FinanceTotals, FinanceTransaction,
    LpafInventory, LpafMaterial, LpafMaterialForm, LpafMaterialStorage, SqliteCatalogStorage,
    SqliteEmployeeStorage, SqliteFinanceStorage, SqliteLpafMaterialStorage,
    SqliteStudentStorage, SqliteStudyFolderStorage, SqliteTvetMaterialStorage, Student,
    StudentForm, StudentStorage, StudyFolder, StudyFolderForm, StudyFolderQuery,
    StudyFolderStorage, TransactionForm, TransactionType, TvetInventory, TvetMaterial,
    TvetMaterialForm, TvetMaterialStorage, TypeFilter,
};

/// Application-level error type
#[derive(Debug, thiserror::Error)]
pub enum ApplicationError {
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Deliberately silent about whether the username exists
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("{message}")]
    Validation { message: String },

    #[error("{message}")]
    NotFound { message: String },

    #[error("{message}")]
    Conflict { message: String },

    #[error("Cannot delete the last admin user")]
    LastAdministrator,

    #[error("Cannot remove admin rights from the last admin user")]
    LastAdministratorDemotion,

    #[error("Credential error: {message}")]
    Credential { message: String },

    #[error("Corrupt record: {message}")]
    CorruptRecord { message: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Core error: {0}")]
    Core(#[from] deptrack_core::DeptrackError),
}

pub type ApplicationResult<T> = Result<T, ApplicationError>;

impl ApplicationError {
    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a conflict error
    pub fn conflict<S: Into<String>>(message: S) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Create a corrupt record error
    pub fn corrupt<S: Into<String>>(message: S) -> Self {
        Self::CorruptRecord {
            message: message.into(),
        }
    }

    /// The access-control failure behind this error, if any
    pub fn access(&self) -> Option<&AccessError> {
        match self {
            Self::Access(access) => Some(access),
            _ => None,
        }
    }

    /// Whether the message is safe to show to the end user as-is
    pub fn is_user_facing(&self) -> bool {
        !matches!(
            self,
            Self::Database(_) | Self::Core(_) | Self::Credential { .. } | Self::CorruptRecord { .. }
        )
    }
}
