//! Department inventories
//!
//! TVET tracks training materials against the quantities a programme
//! requires. LPAF tracks production materials under generated item codes.
//! Both file materials under folders and tag them with named lookup
//! entries, see [`Catalog`].

mod catalog;
mod lpaf;
mod tvet;

pub use catalog::{Catalog, CatalogEntry, CatalogForm, CatalogStorage, SqliteCatalogStorage};
pub use lpaf::{
    item_code, LpafMaterial, LpafMaterialFields, LpafMaterialForm, LpafMaterialStorage,
    SqliteLpafMaterialStorage,
};
pub use tvet::{
    SqliteTvetMaterialStorage, TvetMaterial, TvetMaterialFields, TvetMaterialForm,
    TvetMaterialStorage,
};

use super::{is_present, value_as_i64};
use crate::ApplicationResult;
use serde::Serialize;
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::debug;

/// Everything the TVET inventory screen shows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TvetInventory {
    pub folders: Vec<CatalogEntry>,
    pub materials: Vec<TvetMaterial>,
}

/// Everything the LPAF inventory screen shows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LpafInventory {
    pub folders: Vec<CatalogEntry>,
    pub productions: Vec<CatalogEntry>,
    pub statuses: Vec<CatalogEntry>,
    pub materials: Vec<LpafMaterial>,
}

/// Create every inventory table. Safe to call from each store.
pub(crate) async fn create_inventory_tables(pool: &SqlitePool) -> ApplicationResult<()> {
    sqlx::raw_sql(
        r#"
        CREATE TABLE IF NOT EXISTS tvet_inventory_folders (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS tvet_core_competencies (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS tvet_categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS tvet_inspection_remarks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS tvet_inventory_materials (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            folder_id INTEGER REFERENCES tvet_inventory_folders(id),
            competency_id INTEGER REFERENCES tvet_core_competencies(id),
            category_id INTEGER REFERENCES tvet_categories(id),
            inspection_remark_id INTEGER REFERENCES tvet_inspection_remarks(id),
            item TEXT NOT NULL,
            specification TEXT NOT NULL DEFAULT '',
            quantity_required INTEGER NOT NULL,
            quantity_on_site INTEGER NOT NULL,
            quantity_y1 INTEGER NOT NULL DEFAULT 0,
            quantity_y2 INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_tvet_materials_folder
            ON tvet_inventory_materials(folder_id);

        CREATE TABLE IF NOT EXISTS lpaf_inventory_folders (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS lpaf_productions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS lpaf_statuses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS lpaf_inventory_materials (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            folder_id INTEGER REFERENCES lpaf_inventory_folders(id),
            production_id INTEGER REFERENCES lpaf_productions(id),
            status_id INTEGER REFERENCES lpaf_statuses(id),
            item_name TEXT NOT NULL,
            item_code TEXT UNIQUE,
            description TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_lpaf_materials_folder
            ON lpaf_inventory_materials(folder_id);
        "#,
    )
    .execute(pool)
    .await?;

    debug!("Inventory tables ready");
    Ok(())
}

/// Optional reference to a catalog entry.
///
/// Blank, null and zero all mean "none"; anything else must be an integer id.
pub(crate) fn optional_reference(
    value: &Option<Value>,
    catalog: Catalog,
) -> ApplicationResult<Option<i64>> {
    if !is_present(value) {
        return Ok(None);
    }
    match value.as_ref().and_then(value_as_i64) {
        Some(0) => Ok(None),
        Some(id) => Ok(Some(id)),
        None => Err(catalog.missing_reference()),
    }
}
