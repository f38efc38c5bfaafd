//! Study library folder tree (LPAF)
//!
//! Folders nest through `parent_folder_id`. A folder can only be removed once
//! it has no subfolders left.

use super::{is_present, value_as_i64};
use crate::database::{format_timestamp, parse_timestamp};
use crate::{ApplicationError, ApplicationResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudyFolder {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub parent_folder_id: Option<i64>,
    pub subfolder_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create payload; updates only look at the name and description
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StudyFolderForm {
    pub name: String,
    pub description: String,
    pub parent_folder_id: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyFolderFields {
    pub name: String,
    pub description: String,
    pub parent_folder_id: Option<i64>,
}

impl StudyFolderForm {
    pub fn validated(self) -> ApplicationResult<StudyFolderFields> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ApplicationError::validation("Folder name is required"));
        }

        let parent_folder_id = if is_present(&self.parent_folder_id) {
            match self.parent_folder_id.as_ref().and_then(value_as_i64) {
                Some(0) => None,
                Some(id) => Some(id),
                None => return Err(ApplicationError::validation("Parent folder not found")),
            }
        } else {
            None
        };

        Ok(StudyFolderFields {
            name,
            description: self.description.trim().to_string(),
            parent_folder_id,
        })
    }
}

/// Which folders to list
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StudyFolderQuery {
    /// Direct children of this folder
    pub parent_id: Option<i64>,
    /// Only top-level folders; ignored when `parent_id` is set
    pub root_only: bool,
}

#[async_trait]
pub trait StudyFolderStorage: Send + Sync {
    /// Folders ordered by name
    async fn list(&self, query: &StudyFolderQuery) -> ApplicationResult<Vec<StudyFolder>>;

    async fn get(&self, id: i64) -> ApplicationResult<Option<StudyFolder>>;

    /// Fails with a validation error when the parent does not exist
    async fn insert(&self, fields: &StudyFolderFields) -> ApplicationResult<StudyFolder>;

    /// Rename; the parent never changes. `None` when no such folder exists.
    async fn update(
        &self,
        id: i64,
        name: &str,
        description: &str,
    ) -> ApplicationResult<Option<StudyFolder>>;

    /// `false` when no such folder exists. Folders with subfolders are refused.
    async fn delete(&self, id: i64) -> ApplicationResult<bool>;
}

#[derive(Debug, Clone)]
pub struct SqliteStudyFolderStorage {
    pool: SqlitePool,
}

const FOLDER_SELECT: &str = "SELECT f.id, f.name, f.description, f.parent_folder_id,
        f.created_at, f.updated_at,
        (SELECT COUNT(*) FROM study_folders c WHERE c.parent_folder_id = f.id) AS subfolder_count
    FROM study_folders f";

impl SqliteStudyFolderStorage {
    pub async fn new(pool: SqlitePool) -> ApplicationResult<Self> {
        sqlx::raw_sql(
            r#"
            CREATE TABLE IF NOT EXISTS study_folders (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                parent_folder_id INTEGER REFERENCES study_folders(id),
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_study_folders_parent ON study_folders(parent_folder_id);
            "#,
        )
        .execute(&pool)
        .await?;

        debug!("Study folders table ready");
        Ok(Self { pool })
    }

    fn row_to_folder(row: &sqlx::sqlite::SqliteRow) -> ApplicationResult<StudyFolder> {
        let created_at: String = row.try_get("created_at")?;
        let updated_at: String = row.try_get("updated_at")?;

        Ok(StudyFolder {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            parent_folder_id: row.try_get("parent_folder_id")?,
            subfolder_count: row.try_get("subfolder_count")?,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
        })
    }
}

#[async_trait]
impl StudyFolderStorage for SqliteStudyFolderStorage {
    async fn list(&self, query: &StudyFolderQuery) -> ApplicationResult<Vec<StudyFolder>> {
        let rows = match (query.parent_id, query.root_only) {
            (Some(parent_id), _) => {
                sqlx::query(&format!(
                    "{FOLDER_SELECT} WHERE f.parent_folder_id = ? ORDER BY f.name"
                ))
                .bind(parent_id)
                .fetch_all(&self.pool)
                .await?
            }
            (None, true) => {
                sqlx::query(&format!(
                    "{FOLDER_SELECT} WHERE f.parent_folder_id IS NULL ORDER BY f.name"
                ))
                .fetch_all(&self.pool)
                .await?
            }
            (None, false) => {
                sqlx::query(&format!("{FOLDER_SELECT} ORDER BY f.name"))
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.iter().map(Self::row_to_folder).collect()
    }

    async fn get(&self, id: i64) -> ApplicationResult<Option<StudyFolder>> {
        let row = sqlx::query(&format!("{FOLDER_SELECT} WHERE f.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_folder).transpose()
    }

    async fn insert(&self, fields: &StudyFolderFields) -> ApplicationResult<StudyFolder> {
        let mut tx = self.pool.begin().await?;

        if let Some(parent_id) = fields.parent_folder_id {
            let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM study_folders WHERE id = ?")
                .bind(parent_id)
                .fetch_one(&mut *tx)
                .await?;
            if exists == 0 {
                return Err(ApplicationError::validation("Parent folder not found"));
            }
        }

        let now = Utc::now();
        let stamp = format_timestamp(&now);
        let id = sqlx::query(
            "INSERT INTO study_folders (name, description, parent_folder_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(fields.parent_folder_id)
        .bind(&stamp)
        .bind(&stamp)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();
        tx.commit().await?;

        info!(folder_id = id, parent = ?fields.parent_folder_id, "Study folder created");
        Ok(StudyFolder {
            id,
            name: fields.name.clone(),
            description: fields.description.clone(),
            parent_folder_id: fields.parent_folder_id,
            subfolder_count: 0,
            created_at: now,
            updated_at: now,
        })
    }

    async fn update(
        &self,
        id: i64,
        name: &str,
        description: &str,
    ) -> ApplicationResult<Option<StudyFolder>> {
        let result = sqlx::query(
            "UPDATE study_folders SET name = ?, description = ?, updated_at = ? WHERE id = ?",
        )
        .bind(name)
        .bind(description)
        .bind(format_timestamp(&Utc::now()))
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        info!(folder_id = id, "Study folder updated");
        self.get(id).await
    }

    async fn delete(&self, id: i64) -> ApplicationResult<bool> {
        let mut tx = self.pool.begin().await?;

        let children: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM study_folders WHERE parent_folder_id = ?")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if children > 0 {
            return Err(ApplicationError::conflict(
                "Cannot delete folder that contains subfolders. Delete subfolders first.",
            ));
        }

        let result = sqlx::query("DELETE FROM study_folders WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(folder_id = id, "Study folder deleted");
        }
        Ok(deleted)
    }
}
