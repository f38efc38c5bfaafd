//! Best-effort activity logger

use super::storage::AuditLogStorage;
use super::types::{
    ActivityAction, ActivityLogEntry, ActivitySnapshot, DepartmentFilter, NewActivity,
    LOG_PAGE_SIZE,
};
use crate::auth::UserAccount;
use crate::ApplicationResult;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error};

/// Writes and reads the activity log.
///
/// Writes never fail the caller: a storage error is reported through
/// `tracing` and turned into `None`.
#[derive(Clone)]
pub struct AuditLogger {
    storage: Arc<dyn AuditLogStorage>,
}

impl std::fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLogger").finish_non_exhaustive()
    }
}

impl AuditLogger {
    pub fn new(storage: Arc<dyn AuditLogStorage>) -> Self {
        Self { storage }
    }

    /// Record an event for `user`, snapshotting its display fields now
    pub async fn log_activity(
        &self,
        user: &UserAccount,
        action: ActivityAction,
        department: Option<String>,
    ) -> Option<ActivityLogEntry> {
        let entry = NewActivity {
            snapshot: ActivitySnapshot::capture(user),
            action,
            department,
            timestamp: Utc::now(),
        };

        match self.storage.append(entry).await {
            Ok(stored) => {
                debug!(
                    user_id = stored.user_id,
                    action = %stored.action,
                    department = stored.department.as_deref().unwrap_or(""),
                    "Activity logged"
                );
                Some(stored)
            }
            Err(e) => {
                error!(user_id = user.id, action = %action, "Error logging activity: {}", e);
                None
            }
        }
    }

    /// Newest entries first, capped at [`LOG_PAGE_SIZE`]
    pub async fn list_logs(
        &self,
        filter: &DepartmentFilter,
    ) -> ApplicationResult<Vec<ActivityLogEntry>> {
        self.storage.recent(filter, LOG_PAGE_SIZE).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::SqliteAuditLogStorage;
    use crate::auth::AccountKind;
    use crate::database::connect_in_memory;
    use crate::ApplicationError;
    use async_trait::async_trait;

    struct FailingAuditLogStorage;

    #[async_trait]
    impl AuditLogStorage for FailingAuditLogStorage {
        async fn append(&self, _entry: NewActivity) -> ApplicationResult<ActivityLogEntry> {
            Err(ApplicationError::Database(sqlx::Error::PoolClosed))
        }

        async fn recent(
            &self,
            _filter: &DepartmentFilter,
            _limit: usize,
        ) -> ApplicationResult<Vec<ActivityLogEntry>> {
            Err(ApplicationError::Database(sqlx::Error::PoolClosed))
        }
    }

    fn user(id: i64, username: &str) -> UserAccount {
        UserAccount {
            id,
            username: username.to_string(),
            name: format!("{} name", username),
            position: Some("Clerk".to_string()),
            account_kind: AccountKind::Member,
            password_hash: String::new(),
            created_at: Utc::now(),
        }
    }

    async fn sqlite_logger() -> AuditLogger {
        let pool = connect_in_memory().await.unwrap();
        AuditLogger::new(Arc::new(SqliteAuditLogStorage::new(pool).await.unwrap()))
    }

    #[tokio::test]
    async fn test_write_failure_is_swallowed() {
        let logger = AuditLogger::new(Arc::new(FailingAuditLogStorage));
        let entry = logger
            .log_activity(&user(1, "a"), ActivityAction::Login, None)
            .await;
        assert!(entry.is_none());
    }

    #[tokio::test]
    async fn test_entry_carries_snapshot() {
        let logger = sqlite_logger().await;
        let entry = logger
            .log_activity(&user(4, "staff1"), ActivityAction::Access, Some("TVET".into()))
            .await
            .unwrap();

        assert_eq!(entry.user_id, 4);
        assert_eq!(entry.username, "staff1");
        assert_eq!(entry.position, "Clerk");
        assert_eq!(entry.department.as_deref(), Some("TVET"));
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_capped() {
        let logger = sqlite_logger().await;
        let u = user(1, "busy");
        for _ in 0..(LOG_PAGE_SIZE + 20) {
            logger.log_activity(&u, ActivityAction::Access, Some("LPAF".into())).await;
        }
        let last = logger
            .log_activity(&u, ActivityAction::Logout, Some("LPAF".into()))
            .await
            .unwrap();

        let logs = logger.list_logs(&DepartmentFilter::All).await.unwrap();
        assert_eq!(logs.len(), LOG_PAGE_SIZE);
        assert_eq!(logs[0].id, last.id);
        assert!(logs.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
    }

    #[tokio::test]
    async fn test_department_filter() {
        let logger = sqlite_logger().await;
        let u = user(1, "u");
        logger.log_activity(&u, ActivityAction::Login, None).await;
        logger.log_activity(&u, ActivityAction::Access, Some("TVET".into())).await;
        logger.log_activity(&u, ActivityAction::Access, Some("ADMIN".into())).await;
        logger.log_activity(&u, ActivityAction::Logout, Some("ADMIN".into())).await;

        let admin = logger
            .list_logs(&DepartmentFilter::parse(Some("admin")))
            .await
            .unwrap();
        assert_eq!(admin.len(), 2);
        assert!(admin.iter().all(|e| e.department.as_deref() == Some("ADMIN")));
        assert_eq!(admin[0].action, ActivityAction::Logout);

        let all = logger.list_logs(&DepartmentFilter::parse(Some("all"))).await.unwrap();
        assert_eq!(all.len(), 4);
    }
}
