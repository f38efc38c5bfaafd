//! LPAF production materials
//!
//! Every material gets an item code derived from its id when it is created.
//! The code never changes afterwards.

use super::catalog::ensure_reference;
use super::{create_inventory_tables, optional_reference, Catalog};
use crate::database::{format_timestamp, parse_timestamp};
use crate::{ApplicationError, ApplicationResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LpafMaterial {
    pub id: i64,
    pub folder_id: Option<i64>,
    pub production_id: Option<i64>,
    pub status_id: Option<i64>,
    pub item_name: String,
    pub item_code: String,
    pub description: String,
    pub folder_name: Option<String>,
    pub production_name: Option<String>,
    pub status_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LpafMaterialForm {
    pub folder_id: Option<Value>,
    pub production_id: Option<Value>,
    pub status_id: Option<Value>,
    pub item_name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LpafMaterialFields {
    pub folder_id: Option<i64>,
    pub production_id: Option<i64>,
    pub status_id: Option<i64>,
    pub item_name: String,
    pub description: String,
}

impl LpafMaterialForm {
    pub fn validated(self) -> ApplicationResult<LpafMaterialFields> {
        let item_name = self.item_name.trim().to_string();
        if item_name.is_empty() {
            return Err(ApplicationError::validation("Item name is required"));
        }

        Ok(LpafMaterialFields {
            folder_id: optional_reference(&self.folder_id, Catalog::LpafFolders)?,
            production_id: optional_reference(&self.production_id, Catalog::LpafProductions)?,
            status_id: optional_reference(&self.status_id, Catalog::LpafStatuses)?,
            item_name,
            description: self.description.trim().to_string(),
        })
    }
}

/// Item code assigned to the material with `id`
pub fn item_code(id: i64) -> String {
    format!("LPAF-{:06}", id)
}

#[async_trait]
pub trait LpafMaterialStorage: Send + Sync {
    /// Materials newest first, optionally restricted to one folder
    async fn list(&self, folder_id: Option<i64>) -> ApplicationResult<Vec<LpafMaterial>>;

    async fn get(&self, id: i64) -> ApplicationResult<Option<LpafMaterial>>;

    async fn insert(&self, fields: &LpafMaterialFields) -> ApplicationResult<LpafMaterial>;

    /// `None` when no such material exists
    async fn update(
        &self,
        id: i64,
        fields: &LpafMaterialFields,
    ) -> ApplicationResult<Option<LpafMaterial>>;

    async fn delete(&self, id: i64) -> ApplicationResult<bool>;
}

#[derive(Debug, Clone)]
pub struct SqliteLpafMaterialStorage {
    pool: SqlitePool,
}

const MATERIAL_SELECT: &str = "SELECT m.id, m.folder_id, m.production_id, m.status_id,
        m.item_name, m.item_code, m.description, m.created_at, m.updated_at,
        f.name AS folder_name, p.name AS production_name, s.name AS status_name
    FROM lpaf_inventory_materials m
    LEFT JOIN lpaf_inventory_folders f ON f.id = m.folder_id
    LEFT JOIN lpaf_productions p ON p.id = m.production_id
    LEFT JOIN lpaf_statuses s ON s.id = m.status_id";

impl SqliteLpafMaterialStorage {
    pub async fn new(pool: SqlitePool) -> ApplicationResult<Self> {
        create_inventory_tables(&pool).await?;
        Ok(Self { pool })
    }

    fn row_to_material(row: &sqlx::sqlite::SqliteRow) -> ApplicationResult<LpafMaterial> {
        let created_at: String = row.try_get("created_at")?;
        let updated_at: String = row.try_get("updated_at")?;
        let item_code: Option<String> = row.try_get("item_code")?;

        Ok(LpafMaterial {
            id: row.try_get("id")?,
            folder_id: row.try_get("folder_id")?,
            production_id: row.try_get("production_id")?,
            status_id: row.try_get("status_id")?,
            item_name: row.try_get("item_name")?,
            item_code: item_code.unwrap_or_default(),
            description: row.try_get("description")?,
            folder_name: row.try_get("folder_name")?,
            production_name: row.try_get("production_name")?,
            status_name: row.try_get("status_name")?,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
        })
    }

    async fn ensure_references(
        conn: &mut SqliteConnection,
        fields: &LpafMaterialFields,
    ) -> ApplicationResult<()> {
        ensure_reference(conn, Catalog::LpafFolders, fields.folder_id).await?;
        ensure_reference(conn, Catalog::LpafProductions, fields.production_id).await?;
        ensure_reference(conn, Catalog::LpafStatuses, fields.status_id).await
    }
}

#[async_trait]
impl LpafMaterialStorage for SqliteLpafMaterialStorage {
    async fn list(&self, folder_id: Option<i64>) -> ApplicationResult<Vec<LpafMaterial>> {
        let rows = match folder_id {
            Some(folder_id) => {
                sqlx::query(&format!(
                    "{MATERIAL_SELECT} WHERE m.folder_id = ? ORDER BY m.created_at DESC, m.id DESC"
                ))
                .bind(folder_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "{MATERIAL_SELECT} ORDER BY m.created_at DESC, m.id DESC"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter().map(Self::row_to_material).collect()
    }

    async fn get(&self, id: i64) -> ApplicationResult<Option<LpafMaterial>> {
        let row = sqlx::query(&format!("{MATERIAL_SELECT} WHERE m.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_material).transpose()
    }

    async fn insert(&self, fields: &LpafMaterialFields) -> ApplicationResult<LpafMaterial> {
        let mut tx = self.pool.begin().await?;
        Self::ensure_references(&mut tx, fields).await?;

        let stamp = format_timestamp(&Utc::now());
        let id = sqlx::query(
            "INSERT INTO lpaf_inventory_materials (folder_id, production_id, status_id,
                item_name, description, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(fields.folder_id)
        .bind(fields.production_id)
        .bind(fields.status_id)
        .bind(&fields.item_name)
        .bind(&fields.description)
        .bind(&stamp)
        .bind(&stamp)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        let code = item_code(id);
        sqlx::query("UPDATE lpaf_inventory_materials SET item_code = ? WHERE id = ?")
            .bind(&code)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(material_id = id, item_code = %code, "LPAF material created");
        self.get(id)
            .await?
            .ok_or_else(|| ApplicationError::corrupt(format!("material {} vanished", id)))
    }

    async fn update(
        &self,
        id: i64,
        fields: &LpafMaterialFields,
    ) -> ApplicationResult<Option<LpafMaterial>> {
        let mut tx = self.pool.begin().await?;
        Self::ensure_references(&mut tx, fields).await?;

        let result = sqlx::query(
            "UPDATE lpaf_inventory_materials SET folder_id = ?, production_id = ?,
                status_id = ?, item_name = ?, description = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(fields.folder_id)
        .bind(fields.production_id)
        .bind(fields.status_id)
        .bind(&fields.item_name)
        .bind(&fields.description)
        .bind(format_timestamp(&Utc::now()))
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        tx.commit().await?;

        info!(material_id = id, "LPAF material updated");
        self.get(id).await
    }

    async fn delete(&self, id: i64) -> ApplicationResult<bool> {
        let result = sqlx::query("DELETE FROM lpaf_inventory_materials WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(material_id = id, "LPAF material deleted");
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::connect_in_memory;
    use crate::records::inventory::{CatalogForm, CatalogStorage, SqliteCatalogStorage};
    use serde_json::json;

    fn named(name: &str) -> CatalogForm {
        CatalogForm {
            name: name.to_string(),
            description: String::new(),
        }
    }

    async fn stores() -> (SqliteCatalogStorage, SqliteLpafMaterialStorage) {
        let pool = connect_in_memory().await.unwrap();
        (
            SqliteCatalogStorage::new(pool.clone()).await.unwrap(),
            SqliteLpafMaterialStorage::new(pool).await.unwrap(),
        )
    }

    #[test]
    fn test_item_name_required() {
        let err = LpafMaterialForm::default().validated().unwrap_err();
        assert_eq!(err.to_string(), "Item name is required");
        assert_eq!(item_code(42), "LPAF-000042");
    }

    #[tokio::test]
    async fn test_item_code_survives_updates() {
        let (catalogs, materials) = stores().await;
        let status = catalogs
            .insert(Catalog::LpafStatuses, &named("In stock"))
            .await
            .unwrap();

        let created = materials
            .insert(
                &LpafMaterialForm {
                    item_name: "Fabric roll".into(),
                    status_id: Some(json!(status.id)),
                    ..Default::default()
                }
                .validated()
                .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(created.item_code, item_code(created.id));
        assert_eq!(created.status_name.as_deref(), Some("In stock"));

        let updated = materials
            .update(
                created.id,
                &LpafMaterialForm {
                    item_name: "Fabric roll, blue".into(),
                    ..Default::default()
                }
                .validated()
                .unwrap(),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.item_code, created.item_code);
        assert_eq!(updated.status_id, None);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn test_productions_in_use_are_kept() {
        let (catalogs, materials) = stores().await;
        let production = catalogs
            .insert(Catalog::LpafProductions, &named("Season 1"))
            .await
            .unwrap();
        materials
            .insert(
                &LpafMaterialForm {
                    item_name: "Costume".into(),
                    production_id: Some(json!(production.id.to_string())),
                    ..Default::default()
                }
                .validated()
                .unwrap(),
            )
            .await
            .unwrap();

        let err = catalogs
            .delete(Catalog::LpafProductions, production.id)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot delete production that has associated materials"
        );
    }

    #[tokio::test]
    async fn test_missing_folder_is_rejected() {
        let (_, materials) = stores().await;
        let fields = LpafMaterialForm {
            item_name: "Lamp".into(),
            folder_id: Some(json!(5)),
            ..Default::default()
        }
        .validated()
        .unwrap();

        let err = materials.insert(&fields).await.unwrap_err();
        assert_eq!(err.to_string(), "Selected folder not found");
    }
}
