//! Named lookup entries that inventory materials point at

use super::create_inventory_tables;
use crate::auth::Role;
use crate::database::{format_timestamp, parse_timestamp};
use crate::{ApplicationError, ApplicationResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::fmt;
use tracing::info;

/// Every lookup table, with the department that owns it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Catalog {
    TvetFolders,
    TvetCompetencies,
    TvetCategories,
    TvetRemarks,
    LpafFolders,
    LpafProductions,
    LpafStatuses,
}

impl Catalog {
    pub const TVET: [Catalog; 4] = [
        Catalog::TvetFolders,
        Catalog::TvetCompetencies,
        Catalog::TvetCategories,
        Catalog::TvetRemarks,
    ];

    pub const LPAF: [Catalog; 3] = [
        Catalog::LpafFolders,
        Catalog::LpafProductions,
        Catalog::LpafStatuses,
    ];

    /// Role a session must be operating in to touch this catalog
    pub fn role(self) -> Role {
        match self {
            Catalog::TvetFolders
            | Catalog::TvetCompetencies
            | Catalog::TvetCategories
            | Catalog::TvetRemarks => Role::Tvet,
            Catalog::LpafFolders | Catalog::LpafProductions | Catalog::LpafStatuses => Role::Lpaf,
        }
    }

    /// Path segment naming this catalog under its department
    pub fn segment(self) -> &'static str {
        match self {
            Catalog::TvetFolders | Catalog::LpafFolders => "folders",
            Catalog::TvetCompetencies => "competencies",
            Catalog::TvetCategories => "categories",
            Catalog::TvetRemarks => "remarks",
            Catalog::LpafProductions => "productions",
            Catalog::LpafStatuses => "statuses",
        }
    }

    /// Look up a catalog by department and path segment
    pub fn from_segment(role: Role, segment: &str) -> Option<Self> {
        let candidates: &[Catalog] = match role {
            Role::Tvet => &Self::TVET,
            Role::Lpaf => &Self::LPAF,
            Role::Admin => &[],
        };
        candidates
            .iter()
            .copied()
            .find(|catalog| catalog.segment() == segment)
    }

    /// Singular noun used in messages
    pub fn label(self) -> &'static str {
        match self {
            Catalog::TvetFolders | Catalog::LpafFolders => "Folder",
            Catalog::TvetCompetencies => "Competency",
            Catalog::TvetCategories => "Category",
            Catalog::TvetRemarks => "Remark",
            Catalog::LpafProductions => "Production",
            Catalog::LpafStatuses => "Status",
        }
    }

    fn table(self) -> &'static str {
        match self {
            Catalog::TvetFolders => "tvet_inventory_folders",
            Catalog::TvetCompetencies => "tvet_core_competencies",
            Catalog::TvetCategories => "tvet_categories",
            Catalog::TvetRemarks => "tvet_inspection_remarks",
            Catalog::LpafFolders => "lpaf_inventory_folders",
            Catalog::LpafProductions => "lpaf_productions",
            Catalog::LpafStatuses => "lpaf_statuses",
        }
    }

    /// Material table and the column referencing this catalog
    fn material_reference(self) -> (&'static str, &'static str) {
        match self {
            Catalog::TvetFolders => ("tvet_inventory_materials", "folder_id"),
            Catalog::TvetCompetencies => ("tvet_inventory_materials", "competency_id"),
            Catalog::TvetCategories => ("tvet_inventory_materials", "category_id"),
            Catalog::TvetRemarks => ("tvet_inventory_materials", "inspection_remark_id"),
            Catalog::LpafFolders => ("lpaf_inventory_materials", "folder_id"),
            Catalog::LpafProductions => ("lpaf_inventory_materials", "production_id"),
            Catalog::LpafStatuses => ("lpaf_inventory_materials", "status_id"),
        }
    }

    fn in_use_message(self) -> &'static str {
        match self {
            Catalog::TvetFolders | Catalog::LpafFolders => {
                "Cannot delete folder that contains materials"
            }
            Catalog::TvetCompetencies => "Cannot delete competency that is used by materials",
            Catalog::TvetCategories => "Cannot delete category that is used by materials",
            Catalog::TvetRemarks => "Cannot delete remark that is used by materials",
            Catalog::LpafProductions => "Cannot delete production that has associated materials",
            Catalog::LpafStatuses => "Cannot delete status that has associated materials",
        }
    }

    pub fn not_found(self) -> ApplicationError {
        ApplicationError::not_found(format!("{} not found", self.label()))
    }

    /// A material named an entry of this catalog that does not exist
    pub fn missing_reference(self) -> ApplicationError {
        ApplicationError::validation(format!(
            "Selected {} not found",
            self.label().to_lowercase()
        ))
    }

    fn duplicate_name(self) -> ApplicationError {
        ApplicationError::conflict(format!("{} name already exists", self.label()))
    }
}

impl fmt::Display for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.role().department_tag(), self.segment())
    }
}

/// One row of a lookup table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CatalogForm {
    pub name: String,
    pub description: String,
}

impl CatalogForm {
    /// Trim both fields; the name is required
    pub fn validated(self, catalog: Catalog) -> ApplicationResult<Self> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ApplicationError::validation(format!(
                "{} name is required",
                catalog.label()
            )));
        }
        Ok(Self {
            name,
            description: self.description.trim().to_string(),
        })
    }
}

/// Fail with "Selected ... not found" unless `id` names an entry of `catalog`
pub(crate) async fn ensure_reference(
    conn: &mut SqliteConnection,
    catalog: Catalog,
    id: Option<i64>,
) -> ApplicationResult<()> {
    let Some(id) = id else {
        return Ok(());
    };
    let count: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM {} WHERE id = ?",
        catalog.table()
    ))
    .bind(id)
    .fetch_one(&mut *conn)
    .await?;

    if count == 0 {
        return Err(catalog.missing_reference());
    }
    Ok(())
}

/// Storage for every lookup table. Names are unique per catalog.
#[async_trait]
pub trait CatalogStorage: Send + Sync {
    /// Entries ordered by name
    async fn list(&self, catalog: Catalog) -> ApplicationResult<Vec<CatalogEntry>>;

    async fn get(&self, catalog: Catalog, id: i64) -> ApplicationResult<Option<CatalogEntry>>;

    async fn insert(&self, catalog: Catalog, form: &CatalogForm) -> ApplicationResult<CatalogEntry>;

    /// `None` when no such entry exists
    async fn update(
        &self,
        catalog: Catalog,
        id: i64,
        form: &CatalogForm,
    ) -> ApplicationResult<Option<CatalogEntry>>;

    /// `false` when no such entry exists. Entries still referenced by a
    /// material are refused with a conflict.
    async fn delete(&self, catalog: Catalog, id: i64) -> ApplicationResult<bool>;
}

#[derive(Debug, Clone)]
pub struct SqliteCatalogStorage {
    pool: SqlitePool,
}

impl SqliteCatalogStorage {
    pub async fn new(pool: SqlitePool) -> ApplicationResult<Self> {
        create_inventory_tables(&pool).await?;
        Ok(Self { pool })
    }

    fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> ApplicationResult<CatalogEntry> {
        let created_at: String = row.try_get("created_at")?;

        Ok(CatalogEntry {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            created_at: parse_timestamp(&created_at)?,
        })
    }

    async fn name_taken(
        conn: &mut SqliteConnection,
        catalog: Catalog,
        name: &str,
        except: Option<i64>,
    ) -> ApplicationResult<bool> {
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {} WHERE name = ?1 AND id != ?2",
            catalog.table()
        ))
        .bind(name)
        .bind(except.unwrap_or(0))
        .fetch_one(&mut *conn)
        .await?;
        Ok(count > 0)
    }
}

#[async_trait]
impl CatalogStorage for SqliteCatalogStorage {
    async fn list(&self, catalog: Catalog) -> ApplicationResult<Vec<CatalogEntry>> {
        let rows = sqlx::query(&format!(
            "SELECT id, name, description, created_at FROM {} ORDER BY name",
            catalog.table()
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_entry).collect()
    }

    async fn get(&self, catalog: Catalog, id: i64) -> ApplicationResult<Option<CatalogEntry>> {
        let row = sqlx::query(&format!(
            "SELECT id, name, description, created_at FROM {} WHERE id = ?",
            catalog.table()
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_entry).transpose()
    }

    async fn insert(&self, catalog: Catalog, form: &CatalogForm) -> ApplicationResult<CatalogEntry> {
        let mut tx = self.pool.begin().await?;

        if Self::name_taken(&mut tx, catalog, &form.name, None).await? {
            return Err(catalog.duplicate_name());
        }

        let now = Utc::now();
        let id = sqlx::query(&format!(
            "INSERT INTO {} (name, description, created_at) VALUES (?, ?, ?)",
            catalog.table()
        ))
        .bind(&form.name)
        .bind(&form.description)
        .bind(format_timestamp(&now))
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        tx.commit().await?;
        info!(entry_id = id, catalog = %catalog, "Catalog entry created");

        Ok(CatalogEntry {
            id,
            name: form.name.clone(),
            description: form.description.clone(),
            created_at: now,
        })
    }

    async fn update(
        &self,
        catalog: Catalog,
        id: i64,
        form: &CatalogForm,
    ) -> ApplicationResult<Option<CatalogEntry>> {
        let mut tx = self.pool.begin().await?;

        if Self::name_taken(&mut tx, catalog, &form.name, Some(id)).await? {
            return Err(catalog.duplicate_name());
        }

        let result = sqlx::query(&format!(
            "UPDATE {} SET name = ?, description = ? WHERE id = ?",
            catalog.table()
        ))
        .bind(&form.name)
        .bind(&form.description)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        tx.commit().await?;

        info!(entry_id = id, catalog = %catalog, "Catalog entry updated");
        self.get(catalog, id).await
    }

    async fn delete(&self, catalog: Catalog, id: i64) -> ApplicationResult<bool> {
        let mut tx = self.pool.begin().await?;

        let (materials, column) = catalog.material_reference();
        let in_use: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {materials} WHERE {column} = ?"
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if in_use > 0 {
            return Err(ApplicationError::conflict(catalog.in_use_message()));
        }

        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = ?", catalog.table()))
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(entry_id = id, catalog = %catalog, "Catalog entry deleted");
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::connect_in_memory;

    fn form(name: &str) -> CatalogForm {
        CatalogForm {
            name: name.to_string(),
            description: String::new(),
        }
    }

    async fn store() -> SqliteCatalogStorage {
        SqliteCatalogStorage::new(connect_in_memory().await.unwrap())
            .await
            .unwrap()
    }

    #[test]
    fn test_segments_are_scoped_to_department() {
        assert_eq!(
            Catalog::from_segment(Role::Tvet, "remarks"),
            Some(Catalog::TvetRemarks)
        );
        assert_eq!(
            Catalog::from_segment(Role::Lpaf, "folders"),
            Some(Catalog::LpafFolders)
        );
        assert_eq!(Catalog::from_segment(Role::Lpaf, "remarks"), None);
        assert_eq!(Catalog::from_segment(Role::Admin, "folders"), None);
        assert_eq!(Catalog::LpafStatuses.to_string(), "LPAF/statuses");
    }

    #[test]
    fn test_name_is_required() {
        let err = form("  ").validated(Catalog::TvetCompetencies).unwrap_err();
        assert_eq!(err.to_string(), "Competency name is required");
        let ok = form(" Welding ").validated(Catalog::TvetCompetencies).unwrap();
        assert_eq!(ok.name, "Welding");
    }

    #[tokio::test]
    async fn test_catalogs_are_separate_tables() {
        let store = store().await;
        store.insert(Catalog::TvetFolders, &form("Tools")).await.unwrap();
        store.insert(Catalog::LpafFolders, &form("Tools")).await.unwrap();

        assert_eq!(store.list(Catalog::TvetFolders).await.unwrap().len(), 1);
        assert!(store.list(Catalog::TvetCategories).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_names_conflict() {
        let store = store().await;
        let first = store.insert(Catalog::LpafStatuses, &form("Ready")).await.unwrap();
        let second = store.insert(Catalog::LpafStatuses, &form("Shipped")).await.unwrap();

        let err = store
            .insert(Catalog::LpafStatuses, &form("Ready"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Status name already exists");

        let err = store
            .update(Catalog::LpafStatuses, second.id, &form("Ready"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::Conflict { .. }));

        // Renaming an entry to its own name is fine
        let renamed = store
            .update(Catalog::LpafStatuses, first.id, &form("Ready"))
            .await
            .unwrap();
        assert!(renamed.is_some());
    }

    #[tokio::test]
    async fn test_missing_entries() {
        let store = store().await;
        assert!(store.get(Catalog::TvetRemarks, 9).await.unwrap().is_none());
        assert!(store
            .update(Catalog::TvetRemarks, 9, &form("Good"))
            .await
            .unwrap()
            .is_none());
        assert!(!store.delete(Catalog::TvetRemarks, 9).await.unwrap());
        assert_eq!(Catalog::TvetRemarks.not_found().to_string(), "Remark not found");
    }
}
