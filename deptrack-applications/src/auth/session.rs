//! Session context and session stores
//!
//! A session is keyed by an opaque token held by the client. Guarded
//! operations never read a global; they receive a [`SessionContext`] built
//! from the store for the current request.
//!
//! Sessions expire a fixed time after login. Expired sessions load as absent
//! and are purged by [`SessionStorage::cleanup_expired`].

use super::policy::Role;
use crate::database::{format_timestamp, parse_timestamp};
use crate::{ApplicationError, ApplicationResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// A stored session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub token: String,
    pub user_id: i64,
    pub selected_role: Option<Role>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// A fresh session with a random token and no role
    pub fn new(user_id: i64) -> Self {
        Self {
            token: Uuid::new_v4().to_string(),
            user_id,
            selected_role: None,
            created_at: Utc::now(),
        }
    }

    /// Whether the session is older than `max_age` at `now`
    pub fn is_expired(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        now - self.created_at >= max_age
    }
}

/// Session lifetime used when a store is built without one
pub const DEFAULT_SESSION_MAX_AGE_HOURS: i64 = 24;

fn default_max_age() -> Duration {
    Duration::hours(DEFAULT_SESSION_MAX_AGE_HOURS)
}

/// Per-request view of the caller's session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub token: Option<String>,
    pub user_id: Option<i64>,
    pub selected_role: Option<Role>,
}

impl SessionContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn from_session(session: &Session) -> Self {
        Self {
            token: Some(session.token.clone()),
            user_id: Some(session.user_id),
            selected_role: session.selected_role,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    /// Forget everything; the context becomes anonymous
    pub fn clear(&mut self) {
        *self = Self::anonymous();
    }
}

/// Storage for sessions
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn create(&self, session: &Session) -> ApplicationResult<()>;

    /// `None` for unknown and expired tokens alike
    async fn load(&self, token: &str) -> ApplicationResult<Option<Session>>;

    /// Set the selected role; returns `false` if the session does not exist
    async fn set_role(&self, token: &str, role: Role) -> ApplicationResult<bool>;

    /// Remove a session, returning what was stored
    async fn remove(&self, token: &str) -> ApplicationResult<Option<Session>>;

    /// Delete every expired session, returning how many were removed
    async fn cleanup_expired(&self) -> ApplicationResult<usize>;
}

/// Process-local session store
#[derive(Debug, Clone)]
pub struct MemorySessionStorage {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    max_age: Duration,
}

impl Default for MemorySessionStorage {
    fn default() -> Self {
        Self::with_max_age(default_max_age())
    }
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_age(max_age: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            max_age,
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStorage for MemorySessionStorage {
    async fn create(&self, session: &Session) -> ApplicationResult<()> {
        self.sessions
            .write()
            .await
            .insert(session.token.clone(), session.clone());
        Ok(())
    }

    async fn load(&self, token: &str) -> ApplicationResult<Option<Session>> {
        let now = Utc::now();
        Ok(self
            .sessions
            .read()
            .await
            .get(token)
            .filter(|session| !session.is_expired(self.max_age, now))
            .cloned())
    }

    async fn set_role(&self, token: &str, role: Role) -> ApplicationResult<bool> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(token) {
            Some(session) => {
                session.selected_role = Some(role);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove(&self, token: &str) -> ApplicationResult<Option<Session>> {
        Ok(self.sessions.write().await.remove(token))
    }

    async fn cleanup_expired(&self) -> ApplicationResult<usize> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(self.max_age, now));

        let removed = before - sessions.len();
        if removed > 0 {
            info!(removed, "Expired sessions purged");
        }
        Ok(removed)
    }
}

/// Session store in the application database, shared across processes
#[derive(Debug, Clone)]
pub struct SqliteSessionStorage {
    pool: SqlitePool,
    max_age: Duration,
}

impl SqliteSessionStorage {
    pub async fn new(pool: SqlitePool) -> ApplicationResult<Self> {
        Self::with_max_age(pool, default_max_age()).await
    }

    pub async fn with_max_age(pool: SqlitePool, max_age: Duration) -> ApplicationResult<Self> {
        sqlx::raw_sql(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                token TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL,
                selected_role TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_created_at ON sessions(created_at);
            "#,
        )
        .execute(&pool)
        .await?;

        debug!("Sessions table ready");
        Ok(Self { pool, max_age })
    }

    /// Sessions created at or before this instant have expired
    fn cutoff(&self) -> String {
        format_timestamp(&(Utc::now() - self.max_age))
    }

    fn row_to_session(row: &sqlx::sqlite::SqliteRow) -> ApplicationResult<Session> {
        let selected_role: Option<String> = row.try_get("selected_role")?;
        let created_at: String = row.try_get("created_at")?;

        Ok(Session {
            token: row.try_get("token")?,
            user_id: row.try_get("user_id")?,
            selected_role: selected_role
                .map(|r| r.parse::<Role>())
                .transpose()
                .map_err(ApplicationError::corrupt)?,
            created_at: parse_timestamp(&created_at)?,
        })
    }
}

#[async_trait]
impl SessionStorage for SqliteSessionStorage {
    async fn create(&self, session: &Session) -> ApplicationResult<()> {
        sqlx::query(
            "INSERT INTO sessions (token, user_id, selected_role, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&session.token)
        .bind(session.user_id)
        .bind(session.selected_role.map(|r| r.as_str()))
        .bind(format_timestamp(&session.created_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load(&self, token: &str) -> ApplicationResult<Option<Session>> {
        let row = sqlx::query(
            "SELECT token, user_id, selected_role, created_at FROM sessions
             WHERE token = ?1 AND created_at > ?2",
        )
        .bind(token)
        .bind(self.cutoff())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_session).transpose()
    }

    async fn set_role(&self, token: &str, role: Role) -> ApplicationResult<bool> {
        let result = sqlx::query("UPDATE sessions SET selected_role = ? WHERE token = ?")
            .bind(role.as_str())
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove(&self, token: &str) -> ApplicationResult<Option<Session>> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query(
            "SELECT token, user_id, selected_role, created_at FROM sessions WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&mut *tx)
        .await?;

        let session = row.as_ref().map(Self::row_to_session).transpose()?;
        if session.is_some() {
            sqlx::query("DELETE FROM sessions WHERE token = ?")
                .bind(token)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(session)
    }

    async fn cleanup_expired(&self) -> ApplicationResult<usize> {
        let result = sqlx::query("DELETE FROM sessions WHERE created_at <= ?")
            .bind(self.cutoff())
            .execute(&self.pool)
            .await?;

        let removed = result.rows_affected() as usize;
        if removed > 0 {
            info!(removed, "Expired sessions purged");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::connect_in_memory;

    async fn exercise(store: &dyn SessionStorage) {
        let session = Session::new(7);
        store.create(&session).await.unwrap();

        let loaded = store.load(&session.token).await.unwrap().unwrap();
        assert_eq!(loaded.user_id, 7);
        assert_eq!(loaded.selected_role, None);

        assert!(store.set_role(&session.token, Role::Lpaf).await.unwrap());
        assert!(!store.set_role("missing", Role::Lpaf).await.unwrap());
        let loaded = store.load(&session.token).await.unwrap().unwrap();
        assert_eq!(loaded.selected_role, Some(Role::Lpaf));

        let removed = store.remove(&session.token).await.unwrap().unwrap();
        assert_eq!(removed.selected_role, Some(Role::Lpaf));
        assert!(store.load(&session.token).await.unwrap().is_none());
        assert!(store.remove(&session.token).await.unwrap().is_none());
    }

    async fn exercise_expiry(store: &dyn SessionStorage) {
        let mut stale = Session::new(1);
        stale.created_at = Utc::now() - Duration::hours(2);
        let fresh = Session::new(2);
        store.create(&stale).await.unwrap();
        store.create(&fresh).await.unwrap();

        assert!(store.load(&stale.token).await.unwrap().is_none());
        assert!(store.load(&fresh.token).await.unwrap().is_some());

        assert_eq!(store.cleanup_expired().await.unwrap(), 1);
        assert_eq!(store.cleanup_expired().await.unwrap(), 0);
        assert!(store.remove(&stale.token).await.unwrap().is_none());
        assert!(store.load(&fresh.token).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_memory_store_expiry() {
        let store = MemorySessionStorage::with_max_age(Duration::hours(1));
        exercise_expiry(&store).await;
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_sqlite_store_expiry() {
        let pool = connect_in_memory().await.unwrap();
        let store = SqliteSessionStorage::with_max_age(pool, Duration::hours(1))
            .await
            .unwrap();
        exercise_expiry(&store).await;
    }

    #[test]
    fn test_expiry_boundary() {
        let session = Session::new(1);
        let max_age = Duration::minutes(30);
        assert!(!session.is_expired(max_age, session.created_at));
        assert!(session.is_expired(max_age, session.created_at + max_age));
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemorySessionStorage::new();
        exercise(&store).await;
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_sqlite_store() {
        let pool = connect_in_memory().await.unwrap();
        let store = SqliteSessionStorage::new(pool).await.unwrap();
        exercise(&store).await;
    }

    #[test]
    fn test_context_from_session() {
        let mut session = Session::new(3);
        session.selected_role = Some(Role::Admin);

        let mut ctx = SessionContext::from_session(&session);
        assert!(ctx.is_authenticated());
        assert_eq!(ctx.selected_role, Some(Role::Admin));

        ctx.clear();
        assert_eq!(ctx, SessionContext::anonymous());
    }

    #[test]
    fn test_tokens_are_unique() {
        assert_ne!(Session::new(1).token, Session::new(1).token);
    }
}
