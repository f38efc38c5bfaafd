//! TVET training materials

use super::catalog::ensure_reference;
use super::{create_inventory_tables, optional_reference, Catalog};
use crate::database::{format_timestamp, parse_timestamp};
use crate::records::{is_present, value_as_i64};
use crate::{ApplicationError, ApplicationResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::info;

/// A material with the names of everything it references
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TvetMaterial {
    pub id: i64,
    pub folder_id: Option<i64>,
    pub competency_id: Option<i64>,
    pub category_id: Option<i64>,
    pub inspection_remark_id: Option<i64>,
    pub item: String,
    pub specification: String,
    pub quantity_required: i64,
    pub quantity_on_site: i64,
    pub quantity_y1: i64,
    pub quantity_y2: i64,
    /// On-site minus required; negative means a shortfall
    pub difference: i64,
    pub folder_name: Option<String>,
    pub competency_name: Option<String>,
    pub category_name: Option<String>,
    pub inspection_remark: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create/update payload. Quantities and ids may arrive as numbers or strings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TvetMaterialForm {
    pub folder_id: Option<Value>,
    pub competency_id: Option<Value>,
    pub category_id: Option<Value>,
    pub inspection_remark_id: Option<Value>,
    pub item: String,
    pub specification: String,
    pub quantity_required: Option<Value>,
    pub quantity_on_site: Option<Value>,
    pub quantity_y1: Option<Value>,
    pub quantity_y2: Option<Value>,
}

/// Validated material fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TvetMaterialFields {
    pub folder_id: Option<i64>,
    pub competency_id: Option<i64>,
    pub category_id: Option<i64>,
    pub inspection_remark_id: Option<i64>,
    pub item: String,
    pub specification: String,
    pub quantity_required: i64,
    pub quantity_on_site: i64,
    pub quantity_y1: i64,
    pub quantity_y2: i64,
}

impl TvetMaterialFields {
    fn references(&self) -> [(Catalog, Option<i64>); 4] {
        [
            (Catalog::TvetFolders, self.folder_id),
            (Catalog::TvetCompetencies, self.competency_id),
            (Catalog::TvetCategories, self.category_id),
            (Catalog::TvetRemarks, self.inspection_remark_id),
        ]
    }
}

fn quantity(value: &Option<Value>) -> ApplicationResult<i64> {
    if !is_present(value) {
        return Ok(0);
    }
    value
        .as_ref()
        .and_then(value_as_i64)
        .ok_or_else(|| ApplicationError::validation("Quantities must be valid numbers"))
}

impl TvetMaterialForm {
    pub fn validated(self) -> ApplicationResult<TvetMaterialFields> {
        let item = self.item.trim().to_string();
        if item.is_empty() {
            return Err(ApplicationError::validation("Item name is required"));
        }

        if !is_present(&self.quantity_required) || !is_present(&self.quantity_on_site) {
            return Err(ApplicationError::validation(
                "Quantity required and quantity on site are required",
            ));
        }
        let quantities = [
            quantity(&self.quantity_required)?,
            quantity(&self.quantity_on_site)?,
            quantity(&self.quantity_y1)?,
            quantity(&self.quantity_y2)?,
        ];
        if quantities.iter().any(|q| *q < 0) {
            return Err(ApplicationError::validation("Quantities cannot be negative"));
        }
        let [quantity_required, quantity_on_site, quantity_y1, quantity_y2] = quantities;

        Ok(TvetMaterialFields {
            folder_id: optional_reference(&self.folder_id, Catalog::TvetFolders)?,
            competency_id: optional_reference(&self.competency_id, Catalog::TvetCompetencies)?,
            category_id: optional_reference(&self.category_id, Catalog::TvetCategories)?,
            inspection_remark_id: optional_reference(
                &self.inspection_remark_id,
                Catalog::TvetRemarks,
            )?,
            item,
            specification: self.specification.trim().to_string(),
            quantity_required,
            quantity_on_site,
            quantity_y1,
            quantity_y2,
        })
    }
}

#[async_trait]
pub trait TvetMaterialStorage: Send + Sync {
    /// Materials newest first, optionally restricted to one folder
    async fn list(&self, folder_id: Option<i64>) -> ApplicationResult<Vec<TvetMaterial>>;

    async fn get(&self, id: i64) -> ApplicationResult<Option<TvetMaterial>>;

    /// Fails with a validation error when a referenced entry is missing
    async fn insert(&self, fields: &TvetMaterialFields) -> ApplicationResult<TvetMaterial>;

    /// `None` when no such material exists
    async fn update(
        &self,
        id: i64,
        fields: &TvetMaterialFields,
    ) -> ApplicationResult<Option<TvetMaterial>>;

    async fn delete(&self, id: i64) -> ApplicationResult<bool>;
}

#[derive(Debug, Clone)]
pub struct SqliteTvetMaterialStorage {
    pool: SqlitePool,
}

const MATERIAL_SELECT: &str = "SELECT m.id, m.folder_id, m.competency_id, m.category_id,
        m.inspection_remark_id, m.item, m.specification, m.quantity_required,
        m.quantity_on_site, m.quantity_y1, m.quantity_y2, m.created_at, m.updated_at,
        f.name AS folder_name, c.name AS competency_name, k.name AS category_name,
        r.name AS inspection_remark
    FROM tvet_inventory_materials m
    LEFT JOIN tvet_inventory_folders f ON f.id = m.folder_id
    LEFT JOIN tvet_core_competencies c ON c.id = m.competency_id
    LEFT JOIN tvet_categories k ON k.id = m.category_id
    LEFT JOIN tvet_inspection_remarks r ON r.id = m.inspection_remark_id";

impl SqliteTvetMaterialStorage {
    pub async fn new(pool: SqlitePool) -> ApplicationResult<Self> {
        create_inventory_tables(&pool).await?;
        Ok(Self { pool })
    }

    fn row_to_material(row: &sqlx::sqlite::SqliteRow) -> ApplicationResult<TvetMaterial> {
        let created_at: String = row.try_get("created_at")?;
        let updated_at: String = row.try_get("updated_at")?;
        let quantity_required: i64 = row.try_get("quantity_required")?;
        let quantity_on_site: i64 = row.try_get("quantity_on_site")?;

        Ok(TvetMaterial {
            id: row.try_get("id")?,
            folder_id: row.try_get("folder_id")?,
            competency_id: row.try_get("competency_id")?,
            category_id: row.try_get("category_id")?,
            inspection_remark_id: row.try_get("inspection_remark_id")?,
            item: row.try_get("item")?,
            specification: row.try_get("specification")?,
            quantity_required,
            quantity_on_site,
            quantity_y1: row.try_get("quantity_y1")?,
            quantity_y2: row.try_get("quantity_y2")?,
            difference: quantity_on_site - quantity_required,
            folder_name: row.try_get("folder_name")?,
            competency_name: row.try_get("competency_name")?,
            category_name: row.try_get("category_name")?,
            inspection_remark: row.try_get("inspection_remark")?,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
        })
    }

    async fn ensure_references(
        conn: &mut SqliteConnection,
        fields: &TvetMaterialFields,
    ) -> ApplicationResult<()> {
        for (catalog, id) in fields.references() {
            ensure_reference(conn, catalog, id).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl TvetMaterialStorage for SqliteTvetMaterialStorage {
    async fn list(&self, folder_id: Option<i64>) -> ApplicationResult<Vec<TvetMaterial>> {
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

    async fn get(&self, id: i64) -> ApplicationResult<Option<TvetMaterial>> {
        let row = sqlx::query(&format!("{MATERIAL_SELECT} WHERE m.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_material).transpose()
    }

    async fn insert(&self, fields: &TvetMaterialFields) -> ApplicationResult<TvetMaterial> {
        let mut tx = self.pool.begin().await?;
        Self::ensure_references(&mut tx, fields).await?;

        let stamp = format_timestamp(&Utc::now());
        let id = sqlx::query(
            "INSERT INTO tvet_inventory_materials (folder_id, competency_id, category_id,
                inspection_remark_id, item, specification, quantity_required, quantity_on_site,
                quantity_y1, quantity_y2, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(fields.folder_id)
        .bind(fields.competency_id)
        .bind(fields.category_id)
        .bind(fields.inspection_remark_id)
        .bind(&fields.item)
        .bind(&fields.specification)
        .bind(fields.quantity_required)
        .bind(fields.quantity_on_site)
        .bind(fields.quantity_y1)
        .bind(fields.quantity_y2)
        .bind(&stamp)
        .bind(&stamp)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();
        tx.commit().await?;

        info!(material_id = id, item = %fields.item, "TVET material created");
        self.get(id)
            .await?
            .ok_or_else(|| ApplicationError::corrupt(format!("material {} vanished", id)))
    }

    async fn update(
        &self,
        id: i64,
        fields: &TvetMaterialFields,
    ) -> ApplicationResult<Option<TvetMaterial>> {
        let mut tx = self.pool.begin().await?;
        Self::ensure_references(&mut tx, fields).await?;

        let result = sqlx::query(
            "UPDATE tvet_inventory_materials SET folder_id = ?, competency_id = ?,
                category_id = ?, inspection_remark_id = ?, item = ?, specification = ?,
                quantity_required = ?, quantity_on_site = ?, quantity_y1 = ?, quantity_y2 = ?,
                updated_at = ?
             WHERE id = ?",
        )
        .bind(fields.folder_id)
        .bind(fields.competency_id)
        .bind(fields.category_id)
        .bind(fields.inspection_remark_id)
        .bind(&fields.item)
        .bind(&fields.specification)
        .bind(fields.quantity_required)
        .bind(fields.quantity_on_site)
        .bind(fields.quantity_y1)
        .bind(fields.quantity_y2)
        .bind(format_timestamp(&Utc::now()))
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        tx.commit().await?;

        info!(material_id = id, "TVET material updated");
        self.get(id).await
    }

    async fn delete(&self, id: i64) -> ApplicationResult<bool> {
        let result = sqlx::query("DELETE FROM tvet_inventory_materials WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(material_id = id, "TVET material deleted");
        }
        Ok(deleted)
    }
}
