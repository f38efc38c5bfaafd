//! Append-only storage for activity log entries

use super::types::{ActivityLogEntry, DepartmentFilter, NewActivity};
use crate::database::{format_timestamp, parse_timestamp};
use crate::{ApplicationError, ApplicationResult};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use tracing::debug;

/// Storage for the activity log.
///
/// There is deliberately no update or delete operation.
#[async_trait]
pub trait AuditLogStorage: Send + Sync {
    /// Append one entry as a single commit-or-rollback unit
    async fn append(&self, entry: NewActivity) -> ApplicationResult<ActivityLogEntry>;

    /// Newest entries first, at most `limit`
    async fn recent(
        &self,
        filter: &DepartmentFilter,
        limit: usize,
    ) -> ApplicationResult<Vec<ActivityLogEntry>>;
}

/// SQLite activity log
#[derive(Debug, Clone)]
pub struct SqliteAuditLogStorage {
    pool: SqlitePool,
}

impl SqliteAuditLogStorage {
    pub async fn new(pool: SqlitePool) -> ApplicationResult<Self> {
        // user_id carries no foreign key: deleting a user keeps its history
        sqlx::raw_sql(
            r#"
            CREATE TABLE IF NOT EXISTS activity_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                username TEXT NOT NULL,
                name TEXT NOT NULL,
                position TEXT,
                action TEXT NOT NULL,
                department TEXT,
                timestamp TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_activity_logs_timestamp ON activity_logs(timestamp);
            CREATE INDEX IF NOT EXISTS idx_activity_logs_department ON activity_logs(department);
            "#,
        )
        .execute(&pool)
        .await?;

        debug!("Activity log table ready");
        Ok(Self { pool })
    }

    fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> ApplicationResult<ActivityLogEntry> {
        let action: String = row.try_get("action")?;
        let timestamp: String = row.try_get("timestamp")?;
        let position: Option<String> = row.try_get("position")?;

        Ok(ActivityLogEntry {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            username: row.try_get("username")?,
            name: row.try_get("name")?,
            position: position.unwrap_or_default(),
            action: action.parse().map_err(ApplicationError::corrupt)?,
            department: row.try_get("department")?,
            timestamp: parse_timestamp(&timestamp)?,
        })
    }
}

#[async_trait]
impl AuditLogStorage for SqliteAuditLogStorage {
    async fn append(&self, entry: NewActivity) -> ApplicationResult<ActivityLogEntry> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query(
            r#"
            INSERT INTO activity_logs (user_id, username, name, position, action, department, timestamp)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.snapshot.user_id)
        .bind(&entry.snapshot.username)
        .bind(&entry.snapshot.name)
        .bind(&entry.snapshot.position)
        .bind(entry.action.as_str())
        .bind(&entry.department)
        .bind(format_timestamp(&entry.timestamp))
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        tx.commit().await?;

        Ok(ActivityLogEntry {
            id,
            user_id: entry.snapshot.user_id,
            username: entry.snapshot.username,
            name: entry.snapshot.name,
            position: entry.snapshot.position,
            action: entry.action,
            department: entry.department,
            timestamp: entry.timestamp,
        })
    }

    async fn recent(
        &self,
        filter: &DepartmentFilter,
        limit: usize,
    ) -> ApplicationResult<Vec<ActivityLogEntry>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let rows = match filter.department() {
            Some(department) => {
                sqlx::query(
                    r#"
                    SELECT id, user_id, username, name, position, action, department, timestamp
                    FROM activity_logs
                    WHERE department = ?
                    ORDER BY timestamp DESC, id DESC
                    LIMIT ?
                    "#,
                )
                .bind(department)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT id, user_id, username, name, position, action, department, timestamp
                    FROM activity_logs
                    ORDER BY timestamp DESC, id DESC
                    LIMIT ?
                    "#,
                )
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter().map(Self::row_to_entry).collect()
    }
}
