//! Credential store: user records and administrative edits

use super::identity::{hash_password, UserAccount};
use super::policy::AccountKind;
use crate::database::{format_timestamp, parse_timestamp};
use crate::{ApplicationError, ApplicationResult};
use async_trait::async_trait;
use chrono::Utc;
use deptrack_core::BootstrapConfig;
use serde::Deserialize;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

/// Administrative create/update payload.
///
/// Every field is trimmed. On update an empty password keeps the old hash.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserForm {
    pub name: String,
    pub username: String,
    pub password: String,
    pub user_type: String,
    pub position: String,
}

/// A validated user ready to insert
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub name: String,
    pub position: Option<String>,
    pub account_kind: AccountKind,
    pub password_hash: String,
}

/// A validated edit; `password_hash` is `None` when the password is kept
#[derive(Debug, Clone)]
pub struct UserChanges {
    pub username: String,
    pub name: String,
    pub position: Option<String>,
    pub account_kind: AccountKind,
    pub password_hash: Option<String>,
}

struct CheckedFields {
    username: String,
    name: String,
    position: Option<String>,
    account_kind: AccountKind,
    password: String,
}

impl UserForm {
    fn check(self, password_required: bool) -> ApplicationResult<CheckedFields> {
        let name = self.name.trim().to_string();
        let username = self.username.trim().to_string();
        let password = self.password.trim().to_string();
        let user_type = self.user_type.trim();
        let position = self.position.trim();

        if name.is_empty() || username.is_empty() || user_type.is_empty() {
            return Err(ApplicationError::validation(if password_required {
                "Name, username, password, and user type are required"
            } else {
                "Name, username and user type are required"
            }));
        }
        if password_required && password.is_empty() {
            return Err(ApplicationError::validation(
                "Name, username, password, and user type are required",
            ));
        }

        let account_kind = user_type
            .parse::<AccountKind>()
            .map_err(|_| ApplicationError::validation("Invalid user type"))?;

        Ok(CheckedFields {
            username,
            name,
            position: (!position.is_empty()).then(|| position.to_string()),
            account_kind,
            password,
        })
    }

    /// Validate for creation and hash the password
    pub fn into_new_user(self) -> ApplicationResult<NewUser> {
        let fields = self.check(true)?;
        Ok(NewUser {
            password_hash: hash_password(&fields.password)?,
            username: fields.username,
            name: fields.name,
            position: fields.position,
            account_kind: fields.account_kind,
        })
    }

    /// Validate for an update; the password is only re-hashed when given
    pub fn into_changes(self) -> ApplicationResult<UserChanges> {
        let fields = self.check(false)?;
        let password_hash = if fields.password.is_empty() {
            None
        } else {
            Some(hash_password(&fields.password)?)
        };
        Ok(UserChanges {
            username: fields.username,
            name: fields.name,
            position: fields.position,
            account_kind: fields.account_kind,
            password_hash,
        })
    }
}

/// Storage for user accounts
#[async_trait]
pub trait UserStorage: Send + Sync {
    async fn find_by_id(&self, id: i64) -> ApplicationResult<Option<UserAccount>>;

    async fn find_by_username(&self, username: &str) -> ApplicationResult<Option<UserAccount>>;

    /// All users ordered by id
    async fn list(&self) -> ApplicationResult<Vec<UserAccount>>;

    /// Insert a user, failing with `Conflict` on a duplicate username
    async fn insert(&self, user: NewUser) -> ApplicationResult<UserAccount>;

    /// Apply an edit, failing with `Conflict` if another user owns the username
    /// and with `LastAdministratorDemotion` if it would leave no admin
    async fn update(&self, id: i64, changes: UserChanges) -> ApplicationResult<UserAccount>;

    /// Delete a user unless it is the only remaining administrator.
    ///
    /// The count and the delete happen in one transaction.
    async fn delete_unless_last_admin(&self, id: i64) -> ApplicationResult<()>;
}

/// Verify a handle/secret pair.
///
/// Lookup misses and mismatches both yield `None`; only storage faults are errors.
pub async fn verify_credentials(
    store: &dyn UserStorage,
    username: &str,
    password: &str,
) -> ApplicationResult<Option<UserAccount>> {
    let Some(user) = store.find_by_username(username.trim()).await? else {
        debug!("Login attempt for unknown username");
        return Ok(None);
    };

    if user.verify_password(password) {
        Ok(Some(user))
    } else {
        debug!(user_id = user.id, "Password mismatch");
        Ok(None)
    }
}

/// Create the bootstrap administrator if no user holds its username.
///
/// Returns `true` when an account was created.
pub async fn ensure_bootstrap_admin(
    store: &dyn UserStorage,
    bootstrap: &BootstrapConfig,
) -> ApplicationResult<bool> {
    if store
        .find_by_username(&bootstrap.admin_username)
        .await?
        .is_some()
    {
        debug!("Bootstrap admin already exists");
        return Ok(false);
    }

    let admin = UserForm {
        name: bootstrap.admin_name.clone(),
        username: bootstrap.admin_username.clone(),
        password: bootstrap.admin_password.clone(),
        user_type: AccountKind::Administrator.to_string(),
        position: bootstrap.admin_position.clone(),
    }
    .into_new_user()?;

    let created = store.insert(admin).await?;
    warn!(
        username = %created.username,
        "Created bootstrap admin; change its password"
    );
    Ok(true)
}

/// SQLite-backed user store
#[derive(Debug, Clone)]
pub struct SqliteUserStorage {
    pool: SqlitePool,
}

const USER_COLUMNS: &str =
    "id, username, name, position, user_type, password_hash, created_at";

impl SqliteUserStorage {
    /// Create the store, creating its table if needed
    pub async fn new(pool: SqlitePool) -> ApplicationResult<Self> {
        let store = Self { pool };
        store.create_tables().await?;
        Ok(store)
    }

    async fn create_tables(&self) -> ApplicationResult<()> {
        let query = r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT UNIQUE NOT NULL,
                name TEXT NOT NULL,
                position TEXT,
                user_type TEXT NOT NULL CHECK (user_type IN ('admin', 'user')),
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
        "#;

        sqlx::raw_sql(query).execute(&self.pool).await?;
        debug!("Users table ready");
        Ok(())
    }

    fn row_to_account(row: &sqlx::sqlite::SqliteRow) -> ApplicationResult<UserAccount> {
        let user_type: String = row.try_get("user_type")?;
        let created_at: String = row.try_get("created_at")?;

        Ok(UserAccount {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            name: row.try_get("name")?,
            position: row.try_get("position")?,
            account_kind: user_type
                .parse()
                .map_err(|e: String| ApplicationError::corrupt(e))?,
            password_hash: row.try_get("password_hash")?,
            created_at: parse_timestamp(&created_at)?,
        })
    }

    fn map_unique_violation(error: sqlx::Error) -> ApplicationError {
        match &error {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                ApplicationError::conflict("Username already exists")
            }
            _ => ApplicationError::Database(error),
        }
    }

    async fn count_admins(conn: &mut SqliteConnection) -> ApplicationResult<i64> {
        let admins: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE user_type = ?")
            .bind(AccountKind::Administrator.as_str())
            .fetch_one(&mut *conn)
            .await?;
        Ok(admins)
    }
}

#[async_trait]
impl UserStorage for SqliteUserStorage {
    async fn find_by_id(&self, id: i64) -> ApplicationResult<Option<UserAccount>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_account).transpose()
    }

    async fn find_by_username(&self, username: &str) -> ApplicationResult<Option<UserAccount>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_account).transpose()
    }

    async fn list(&self) -> ApplicationResult<Vec<UserAccount>> {
        let rows = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::row_to_account).collect()
    }

    async fn insert(&self, user: NewUser) -> ApplicationResult<UserAccount> {
        let created_at = Utc::now();

        let mut tx = self.pool.begin().await?;
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE username = ?")
            .bind(&user.username)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_some() {
            return Err(ApplicationError::conflict("Username already exists"));
        }

        let id = sqlx::query(
            r#"
            INSERT INTO users (username, name, position, user_type, password_hash, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.username)
        .bind(&user.name)
        .bind(&user.position)
        .bind(user.account_kind.as_str())
        .bind(&user.password_hash)
        .bind(format_timestamp(&created_at))
        .execute(&mut *tx)
        .await
        .map_err(Self::map_unique_violation)?
        .last_insert_rowid();
        tx.commit().await?;

        info!(user_id = id, username = %user.username, kind = %user.account_kind, "User created");

        Ok(UserAccount {
            id,
            username: user.username,
            name: user.name,
            position: user.position,
            account_kind: user.account_kind,
            password_hash: user.password_hash,
            created_at,
        })
    }

    async fn update(&self, id: i64, changes: UserChanges) -> ApplicationResult<UserAccount> {
        let mut tx = self.pool.begin().await?;

        let taken: Option<i64> =
            sqlx::query_scalar("SELECT id FROM users WHERE username = ? AND id != ?")
                .bind(&changes.username)
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if taken.is_some() {
            return Err(ApplicationError::conflict("Username already exists"));
        }

        let current: Option<String> =
            sqlx::query_scalar("SELECT user_type FROM users WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(current) = current else {
            return Err(ApplicationError::not_found("User not found"));
        };

        if current == AccountKind::Administrator.as_str()
            && changes.account_kind != AccountKind::Administrator
            && Self::count_admins(&mut *tx).await? <= 1
        {
            warn!(user_id = id, "Refusing to demote the last admin");
            return Err(ApplicationError::LastAdministratorDemotion);
        }

        let result = sqlx::query(
            r#"
            UPDATE users
            SET username = ?, name = ?, position = ?, user_type = ?,
                password_hash = COALESCE(?, password_hash)
            WHERE id = ?
            "#,
        )
        .bind(&changes.username)
        .bind(&changes.name)
        .bind(&changes.position)
        .bind(changes.account_kind.as_str())
        .bind(&changes.password_hash)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(Self::map_unique_violation)?;

        if result.rows_affected() == 0 {
            return Err(ApplicationError::not_found("User not found"));
        }

        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(user_id = id, "User updated");
        Self::row_to_account(&row)
    }

    async fn delete_unless_last_admin(&self, id: i64) -> ApplicationResult<()> {
        let mut tx = self.pool.begin().await?;

        let user_type: Option<String> =
            sqlx::query_scalar("SELECT user_type FROM users WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(user_type) = user_type else {
            return Err(ApplicationError::not_found("User not found"));
        };

        if user_type == AccountKind::Administrator.as_str() {
            if Self::count_admins(&mut *tx).await? <= 1 {
                warn!(user_id = id, "Refusing to delete the last admin");
                return Err(ApplicationError::LastAdministrator);
            }
        }

        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(user_id = id, "User deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::connect_in_memory;

    fn form(username: &str, user_type: &str) -> UserForm {
        UserForm {
            name: format!("{} name", username),
            username: username.to_string(),
            password: "pw".to_string(),
            user_type: user_type.to_string(),
            position: String::new(),
        }
    }

    async fn store() -> SqliteUserStorage {
        SqliteUserStorage::new(connect_in_memory().await.unwrap())
            .await
            .unwrap()
    }

    #[test]
    fn test_form_validation() {
        let err = UserForm::default().into_new_user().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Name, username, password, and user type are required"
        );

        let err = form("x", "superuser").into_new_user().unwrap_err();
        assert_eq!(err.to_string(), "Invalid user type");

        let mut no_password = form("x", "user");
        no_password.password = "   ".to_string();
        assert!(no_password.clone().into_new_user().is_err());
        assert!(no_password.into_changes().unwrap().password_hash.is_none());
    }

    #[test]
    fn test_form_trims_and_blanks_position() {
        let mut f = form("  staff1 ", "user");
        f.position = "   ".to_string();
        let user = f.into_new_user().unwrap();
        assert_eq!(user.username, "staff1");
        assert_eq!(user.position, None);
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let store = store().await;
        let created = store.insert(form("staff1", "user").into_new_user().unwrap()).await.unwrap();

        let by_name = store.find_by_username("staff1").await.unwrap().unwrap();
        assert_eq!(by_name.id, created.id);
        assert_eq!(by_name.account_kind, AccountKind::Member);
        assert!(store.find_by_id(created.id + 100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let store = store().await;
        store.insert(form("dup", "user").into_new_user().unwrap()).await.unwrap();
        let err = store
            .insert(form("dup", "admin").into_new_user().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_update_keeps_password_when_blank() {
        let store = store().await;
        let user = store.insert(form("staff1", "user").into_new_user().unwrap()).await.unwrap();

        let mut edit = form("staff-one", "user");
        edit.password.clear();
        edit.position = "Clerk".to_string();
        let updated = store.update(user.id, edit.into_changes().unwrap()).await.unwrap();

        assert_eq!(updated.username, "staff-one");
        assert_eq!(updated.position.as_deref(), Some("Clerk"));
        assert!(updated.verify_password("pw"));
    }

    #[tokio::test]
    async fn test_update_rejects_taken_username() {
        let store = store().await;
        store.insert(form("a", "user").into_new_user().unwrap()).await.unwrap();
        let b = store.insert(form("b", "user").into_new_user().unwrap()).await.unwrap();

        let err = store
            .update(b.id, form("a", "user").into_changes().unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Username already exists");

        // Re-saving under its own name is fine
        assert!(store.update(b.id, form("b", "user").into_changes().unwrap()).await.is_ok());
    }

    #[tokio::test]
    async fn test_last_admin_cannot_be_deleted() {
        let store = store().await;
        let first = store.insert(form("root", "admin").into_new_user().unwrap()).await.unwrap();
        let member = store.insert(form("m", "user").into_new_user().unwrap()).await.unwrap();

        let err = store.delete_unless_last_admin(first.id).await.unwrap_err();
        assert!(matches!(err, ApplicationError::LastAdministrator));

        let second = store.insert(form("root2", "admin").into_new_user().unwrap()).await.unwrap();
        store.delete_unless_last_admin(first.id).await.unwrap();
        store.delete_unless_last_admin(member.id).await.unwrap();
        assert!(matches!(
            store.delete_unless_last_admin(second.id).await,
            Err(ApplicationError::LastAdministrator)
        ));
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_last_admin_cannot_be_demoted() {
        let store = store().await;
        let root = store.insert(form("root", "admin").into_new_user().unwrap()).await.unwrap();

        let err = store
            .update(root.id, form("root", "user").into_changes().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::LastAdministratorDemotion));
        assert_eq!(
            err.to_string(),
            "Cannot remove admin rights from the last admin user"
        );
        let unchanged = store.find_by_id(root.id).await.unwrap().unwrap();
        assert!(unchanged.is_administrator());

        // Other edits to the last admin still go through
        let renamed = store
            .update(root.id, form("root-renamed", "admin").into_changes().unwrap())
            .await
            .unwrap();
        assert_eq!(renamed.username, "root-renamed");

        // With a second admin around, demotion is allowed
        store.insert(form("deputy", "admin").into_new_user().unwrap()).await.unwrap();
        let demoted = store
            .update(root.id, form("root-renamed", "user").into_changes().unwrap())
            .await
            .unwrap();
        assert!(!demoted.is_administrator());
    }

    #[tokio::test]
    async fn test_update_missing_user() {
        let store = store().await;
        let err = store
            .update(99, form("ghost", "user").into_changes().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_bootstrap_admin_is_idempotent() {
        let store = store().await;
        let bootstrap = BootstrapConfig::default();

        assert!(ensure_bootstrap_admin(&store, &bootstrap).await.unwrap());
        assert!(!ensure_bootstrap_admin(&store, &bootstrap).await.unwrap());

        let admin = verify_credentials(&store, "admin", "admin").await.unwrap().unwrap();
        assert!(admin.is_administrator());
        assert_eq!(admin.position.as_deref(), Some("System Administrator"));
        assert!(verify_credentials(&store, "admin", "nope").await.unwrap().is_none());
        assert!(verify_credentials(&store, "ghost", "admin").await.unwrap().is_none());
    }
}
