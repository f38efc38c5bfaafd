//! Guarded inventory and study library operations
//!
//! Each catalog belongs to one department; TVET materials need the TVET
//! role and LPAF materials and study folders need the LPAF role.

use super::DeptrackApplication;
use crate::auth::{Role, RoleRequirement, SessionContext};
use crate::records::{
    Catalog, CatalogEntry, CatalogForm, LpafInventory, LpafMaterial, LpafMaterialForm,
    StudyFolder, StudyFolderForm, StudyFolderQuery, TvetInventory, TvetMaterial,
    TvetMaterialForm,
};
use crate::{ApplicationError, ApplicationResult};

const TVET: RoleRequirement = RoleRequirement::One(Role::Tvet);
const LPAF: RoleRequirement = RoleRequirement::One(Role::Lpaf);

fn material_not_found() -> ApplicationError {
    ApplicationError::not_found("Material not found")
}

fn folder_not_found() -> ApplicationError {
    ApplicationError::not_found("Folder not found")
}

impl DeptrackApplication {
    // Catalogs

    pub async fn list_catalog(
        &self,
        ctx: &SessionContext,
        catalog: Catalog,
    ) -> ApplicationResult<Vec<CatalogEntry>> {
        self.require_role(ctx, &RoleRequirement::One(catalog.role()))
            .await?;
        self.records.catalogs.list(catalog).await
    }

    pub async fn create_catalog_entry(
        &self,
        ctx: &SessionContext,
        catalog: Catalog,
        form: CatalogForm,
    ) -> ApplicationResult<CatalogEntry> {
        self.require_role(ctx, &RoleRequirement::One(catalog.role()))
            .await?;
        let form = form.validated(catalog)?;
        self.records.catalogs.insert(catalog, &form).await
    }

    pub async fn update_catalog_entry(
        &self,
        ctx: &SessionContext,
        catalog: Catalog,
        id: i64,
        form: CatalogForm,
    ) -> ApplicationResult<CatalogEntry> {
        self.require_role(ctx, &RoleRequirement::One(catalog.role()))
            .await?;
        if self.records.catalogs.get(catalog, id).await?.is_none() {
            return Err(catalog.not_found());
        }
        let form = form.validated(catalog)?;
        self.records
            .catalogs
            .update(catalog, id, &form)
            .await?
            .ok_or_else(|| catalog.not_found())
    }

    pub async fn delete_catalog_entry(
        &self,
        ctx: &SessionContext,
        catalog: Catalog,
        id: i64,
    ) -> ApplicationResult<()> {
        self.require_role(ctx, &RoleRequirement::One(catalog.role()))
            .await?;
        if !self.records.catalogs.delete(catalog, id).await? {
            return Err(catalog.not_found());
        }
        Ok(())
    }

    // TVET inventory

    /// Folders plus every material, newest first
    pub async fn tvet_inventory(&self, ctx: &SessionContext) -> ApplicationResult<TvetInventory> {
        self.require_role(ctx, &TVET).await?;
        Ok(TvetInventory {
            folders: self.records.catalogs.list(Catalog::TvetFolders).await?,
            materials: self.records.tvet_materials.list(None).await?,
        })
    }

    pub async fn list_tvet_materials(
        &self,
        ctx: &SessionContext,
        folder_id: Option<i64>,
    ) -> ApplicationResult<Vec<TvetMaterial>> {
        self.require_role(ctx, &TVET).await?;
        self.records.tvet_materials.list(folder_id).await
    }

    pub async fn create_tvet_material(
        &self,
        ctx: &SessionContext,
        form: TvetMaterialForm,
    ) -> ApplicationResult<TvetMaterial> {
        self.require_role(ctx, &TVET).await?;
        self.records.tvet_materials.insert(&form.validated()?).await
    }

    pub async fn update_tvet_material(
        &self,
        ctx: &SessionContext,
        id: i64,
        form: TvetMaterialForm,
    ) -> ApplicationResult<TvetMaterial> {
        self.require_role(ctx, &TVET).await?;
        if self.records.tvet_materials.get(id).await?.is_none() {
            return Err(material_not_found());
        }
        let fields = form.validated()?;
        self.records
            .tvet_materials
            .update(id, &fields)
            .await?
            .ok_or_else(material_not_found)
    }

    pub async fn delete_tvet_material(&self, ctx: &SessionContext, id: i64) -> ApplicationResult<()> {
        self.require_role(ctx, &TVET).await?;
        if !self.records.tvet_materials.delete(id).await? {
            return Err(material_not_found());
        }
        Ok(())
    }

    // LPAF inventory

    /// Every catalog plus every material, newest first
    pub async fn lpaf_inventory(&self, ctx: &SessionContext) -> ApplicationResult<LpafInventory> {
        self.require_role(ctx, &LPAF).await?;
        Ok(LpafInventory {
            folders: self.records.catalogs.list(Catalog::LpafFolders).await?,
            productions: self.records.catalogs.list(Catalog::LpafProductions).await?,
            statuses: self.records.catalogs.list(Catalog::LpafStatuses).await?,
            materials: self.records.lpaf_materials.list(None).await?,
        })
    }

    pub async fn list_lpaf_materials(
        &self,
        ctx: &SessionContext,
        folder_id: Option<i64>,
    ) -> ApplicationResult<Vec<LpafMaterial>> {
        self.require_role(ctx, &LPAF).await?;
        self.records.lpaf_materials.list(folder_id).await
    }

    pub async fn create_lpaf_material(
        &self,
        ctx: &SessionContext,
        form: LpafMaterialForm,
    ) -> ApplicationResult<LpafMaterial> {
        self.require_role(ctx, &LPAF).await?;
        self.records.lpaf_materials.insert(&form.validated()?).await
    }

    pub async fn update_lpaf_material(
        &self,
        ctx: &SessionContext,
        id: i64,
        form: LpafMaterialForm,
    ) -> ApplicationResult<LpafMaterial> {
        self.require_role(ctx, &LPAF).await?;
        if self.records.lpaf_materials.get(id).await?.is_none() {
            return Err(material_not_found());
        }
        let fields = form.validated()?;
        self.records
            .lpaf_materials
            .update(id, &fields)
            .await?
            .ok_or_else(material_not_found)
    }

    pub async fn delete_lpaf_material(&self, ctx: &SessionContext, id: i64) -> ApplicationResult<()> {
        self.require_role(ctx, &LPAF).await?;
        if !self.records.lpaf_materials.delete(id).await? {
            return Err(material_not_found());
        }
        Ok(())
    }

    // Study library

    pub async fn list_study_folders(
        &self,
        ctx: &SessionContext,
        query: &StudyFolderQuery,
    ) -> ApplicationResult<Vec<StudyFolder>> {
        self.require_role(ctx, &LPAF).await?;
        self.records.study_folders.list(query).await
    }

    pub async fn create_study_folder(
        &self,
        ctx: &SessionContext,
        form: StudyFolderForm,
    ) -> ApplicationResult<StudyFolder> {
        self.require_role(ctx, &LPAF).await?;
        self.records.study_folders.insert(&form.validated()?).await
    }

    /// Rename a folder. Any parent in the form is ignored.
    pub async fn update_study_folder(
        &self,
        ctx: &SessionContext,
        id: i64,
        form: StudyFolderForm,
    ) -> ApplicationResult<StudyFolder> {
        self.require_role(ctx, &LPAF).await?;
        if self.records.study_folders.get(id).await?.is_none() {
            return Err(folder_not_found());
        }
        let name = form.name.trim();
        if name.is_empty() {
            return Err(ApplicationError::validation("Folder name is required"));
        }
        self.records
            .study_folders
            .update(id, name, form.description.trim())
            .await?
            .ok_or_else(folder_not_found)
    }

    pub async fn delete_study_folder(&self, ctx: &SessionContext, id: i64) -> ApplicationResult<()> {
        self.require_role(ctx, &LPAF).await?;
        if !self.records.study_folders.delete(id).await? {
            return Err(folder_not_found());
        }
        Ok(())
    }
}
