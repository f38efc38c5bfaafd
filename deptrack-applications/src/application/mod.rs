//! The application facade
//!
//! [`DeptrackApplication`] owns every store and exposes the session
//! lifecycle (login, role selection, logout) plus the guarded record
//! operations. Each operation takes the caller's [`SessionContext`]
//! explicitly.

mod inventory;
mod records;
mod users;

use crate::audit::{
    ActivityAction, ActivityLogEntry, AuditLogStorage, AuditLogger, DepartmentFilter,
    SqliteAuditLogStorage,
};
use crate::auth::{
    available_roles, can_access, ensure_bootstrap_admin, require_authenticated, require_role,
    verify_credentials, AccessError, Authorized, MemorySessionStorage, Role, RoleRequirement,
    Session, SessionContext, SessionStorage, SqliteSessionStorage, SqliteUserStorage,
    UserStorage, UserSummary,
};
use crate::database;
use crate::records::{
    CatalogStorage, EmployeeStorage, FinanceStorage, LpafMaterialStorage, SqliteCatalogStorage,
    SqliteEmployeeStorage, SqliteFinanceStorage, SqliteLpafMaterialStorage,
    SqliteStudentStorage, SqliteStudyFolderStorage, SqliteTvetMaterialStorage, StudentStorage,
    StudyFolderStorage, TvetMaterialStorage,
};
use crate::{ApplicationError, ApplicationResult};
use chrono::Duration;
use deptrack_core::{BootstrapConfig, DeptrackConfig, SessionBackend, SessionConfig};
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, info};

/// Result of a successful login
#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub session: Session,
    pub user: UserSummary,
}

impl LoginOutcome {
    /// Context for the freshly created session
    pub fn context(&self) -> SessionContext {
        SessionContext::from_session(&self.session)
    }
}

/// Department record stores
#[derive(Clone)]
pub struct RecordStores {
    pub employees: Arc<dyn EmployeeStorage>,
    pub students: Arc<dyn StudentStorage>,
    pub finance: Arc<dyn FinanceStorage>,
    pub catalogs: Arc<dyn CatalogStorage>,
    pub tvet_materials: Arc<dyn TvetMaterialStorage>,
    pub lpaf_materials: Arc<dyn LpafMaterialStorage>,
    pub study_folders: Arc<dyn StudyFolderStorage>,
}

impl RecordStores {
    /// Every record store on one SQLite pool
    pub async fn sqlite(pool: SqlitePool) -> ApplicationResult<Self> {
        Ok(Self {
            employees: Arc::new(SqliteEmployeeStorage::new(pool.clone()).await?),
            students: Arc::new(SqliteStudentStorage::new(pool.clone()).await?),
            finance: Arc::new(SqliteFinanceStorage::new(pool.clone()).await?),
            catalogs: Arc::new(SqliteCatalogStorage::new(pool.clone()).await?),
            tvet_materials: Arc::new(SqliteTvetMaterialStorage::new(pool.clone()).await?),
            lpaf_materials: Arc::new(SqliteLpafMaterialStorage::new(pool.clone()).await?),
            study_folders: Arc::new(SqliteStudyFolderStorage::new(pool).await?),
        })
    }
}

/// Every store the application needs
#[derive(Clone)]
pub struct DeptrackApplication {
    users: Arc<dyn UserStorage>,
    sessions: Arc<dyn SessionStorage>,
    audit: AuditLogger,
    records: RecordStores,
}

impl std::fmt::Debug for DeptrackApplication {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeptrackApplication").finish_non_exhaustive()
    }
}

impl DeptrackApplication {
    pub fn new(
        users: Arc<dyn UserStorage>,
        sessions: Arc<dyn SessionStorage>,
        audit: Arc<dyn AuditLogStorage>,
        records: RecordStores,
    ) -> Self {
        Self {
            users,
            sessions,
            audit: AuditLogger::new(audit),
            records,
        }
    }

    /// SQLite stores on one pool; sessions per `backend` with the default lifetime
    pub async fn sqlite(pool: SqlitePool, backend: SessionBackend) -> ApplicationResult<Self> {
        let config = SessionConfig {
            backend,
            ..SessionConfig::default()
        };
        Self::sqlite_with_sessions(pool, &config).await
    }

    /// SQLite stores on one pool; sessions per `config`
    pub async fn sqlite_with_sessions(
        pool: SqlitePool,
        config: &SessionConfig,
    ) -> ApplicationResult<Self> {
        let max_age = Duration::seconds(config.max_age_secs());
        let sessions: Arc<dyn SessionStorage> = match config.backend {
            SessionBackend::Memory => Arc::new(MemorySessionStorage::with_max_age(max_age)),
            SessionBackend::Database => {
                Arc::new(SqliteSessionStorage::with_max_age(pool.clone(), max_age).await?)
            }
        };

        Ok(Self::new(
            Arc::new(SqliteUserStorage::new(pool.clone()).await?),
            sessions,
            Arc::new(SqliteAuditLogStorage::new(pool.clone()).await?),
            RecordStores::sqlite(pool).await?,
        ))
    }

    /// Connect, create tables and make sure the bootstrap admin exists
    pub async fn from_config(config: &DeptrackConfig) -> ApplicationResult<Self> {
        let pool = database::connect(&config.database).await?;
        let app = Self::sqlite_with_sessions(pool, &config.session).await?;
        app.ensure_bootstrap_admin(&config.bootstrap).await?;
        Ok(app)
    }

    pub async fn ensure_bootstrap_admin(
        &self,
        bootstrap: &BootstrapConfig,
    ) -> ApplicationResult<bool> {
        ensure_bootstrap_admin(self.users.as_ref(), bootstrap).await
    }

    pub fn users(&self) -> &dyn UserStorage {
        self.users.as_ref()
    }

    pub fn audit(&self) -> &AuditLogger {
        &self.audit
    }

    /// Verify credentials and open a session with no role selected
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> ApplicationResult<LoginOutcome> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(ApplicationError::validation(
                "Username and password are required",
            ));
        }

        let user = verify_credentials(self.users.as_ref(), username, password)
            .await?
            .ok_or(ApplicationError::InvalidCredentials)?;

        let session = Session::new(user.id);
        self.sessions.create(&session).await?;
        self.audit
            .log_activity(&user, ActivityAction::Login, None)
            .await;

        info!(user_id = user.id, username = %user.username, "User logged in");
        Ok(LoginOutcome {
            session,
            user: user.to_summary(),
        })
    }

    /// Build the context for a request carrying `token`.
    ///
    /// Unknown or missing tokens give an anonymous context.
    pub async fn session_context(
        &self,
        token: Option<&str>,
    ) -> ApplicationResult<SessionContext> {
        let Some(token) = token else {
            return Ok(SessionContext::anonymous());
        };

        Ok(match self.sessions.load(token).await? {
            Some(session) => SessionContext::from_session(&session),
            None => {
                debug!("Unknown session token");
                SessionContext::anonymous()
            }
        })
    }

    /// Roles the session's user may select
    pub async fn list_available_roles(
        &self,
        ctx: &SessionContext,
    ) -> ApplicationResult<Vec<Role>> {
        let user = require_authenticated(ctx, self.users.as_ref()).await?;
        Ok(available_roles(user.account_kind))
    }

    /// Switch the session into `role` and return where the client should go.
    ///
    /// A refused selection leaves the session untouched and writes no log entry.
    pub async fn select_role(
        &self,
        ctx: &mut SessionContext,
        role: Role,
    ) -> ApplicationResult<&'static str> {
        let user = require_authenticated(ctx, self.users.as_ref()).await?;

        if !can_access(user.account_kind, role) {
            info!(user_id = user.id, role = %role, "Role selection refused");
            return Err(AccessError::Forbidden {
                required: role.to_string(),
            }
            .into());
        }

        let token = ctx.token.as_deref().ok_or(AccessError::NotAuthenticated)?;
        if !self.sessions.set_role(token, role).await? {
            return Err(AccessError::NotAuthenticated.into());
        }
        ctx.selected_role = Some(role);

        self.audit
            .log_activity(
                &user,
                ActivityAction::Access,
                Some(role.department_tag().to_string()),
            )
            .await;

        info!(user_id = user.id, role = %role, "Role selected");
        Ok(role.landing_path())
    }

    /// Drop every expired session from the store
    pub async fn purge_expired_sessions(&self) -> ApplicationResult<usize> {
        self.sessions.cleanup_expired().await
    }

    /// Destroy the session. Writes a logout entry when a user was signed in.
    pub async fn end_session(&self, ctx: &mut SessionContext) -> ApplicationResult<()> {
        let stored = match ctx.token.as_deref() {
            Some(token) => self.sessions.remove(token).await?,
            None => None,
        };

        let user_id = stored.as_ref().map(|s| s.user_id).or(ctx.user_id);
        let last_role = stored
            .as_ref()
            .and_then(|s| s.selected_role)
            .or(ctx.selected_role);

        if let Some(user_id) = user_id {
            if let Some(user) = self.users.find_by_id(user_id).await? {
                let department = last_role
                    .map(|role| role.department_tag().to_string())
                    .unwrap_or_default();
                self.audit
                    .log_activity(&user, ActivityAction::Logout, Some(department))
                    .await;
                info!(user_id, "User logged out");
            }
        }

        ctx.clear();
        Ok(())
    }

    /// Guard any operation on the session's user and active role
    pub async fn require_role(
        &self,
        ctx: &SessionContext,
        requirement: &RoleRequirement,
    ) -> ApplicationResult<Authorized> {
        require_role(ctx, self.users.as_ref(), requirement).await
    }

    /// Activity log for administrators, newest first
    pub async fn query_audit_log(
        &self,
        ctx: &SessionContext,
        filter: &DepartmentFilter,
    ) -> ApplicationResult<Vec<ActivityLogEntry>> {
        self.require_role(ctx, &RoleRequirement::One(Role::Admin))
            .await?;
        self.audit.list_logs(filter).await
    }
}
