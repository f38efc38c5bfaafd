//! TVET and LPAF inventories
//!
//! Catalog routes carry the catalog as a path segment (`folders`,
//! `competencies`, `productions`, ...) which is resolved per department.

use super::types::{MaterialQuery, MessageResponse};
use crate::error::ApiResult;
use crate::session::CurrentSession;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use deptrack_applications::{
    ApplicationError, Catalog, CatalogForm, LpafMaterialForm, Role, SessionContext,
    TvetMaterialForm,
};
use serde_json::{json, Map, Value};

fn resolve(role: Role, segment: &str) -> ApiResult<Catalog> {
    Catalog::from_segment(role, segment).ok_or_else(|| {
        ApplicationError::not_found(format!("Unknown inventory list '{}'", segment)).into()
    })
}

fn entry_key(catalog: Catalog) -> String {
    catalog.label().to_lowercase()
}

async fn list_entries(
    state: &AppState,
    ctx: &SessionContext,
    catalog: Catalog,
) -> ApiResult<Json<Value>> {
    let entries = state.application.list_catalog(ctx, catalog).await?;

    let mut body = Map::new();
    body.insert("success".to_string(), Value::Bool(true));
    body.insert(catalog.segment().to_string(), json!(entries));
    Ok(Json(Value::Object(body)))
}

async fn create_entry(
    state: &AppState,
    ctx: &SessionContext,
    catalog: Catalog,
    form: CatalogForm,
) -> ApiResult<Json<Value>> {
    let entry = state
        .application
        .create_catalog_entry(ctx, catalog, form)
        .await?;

    let mut body = Map::new();
    body.insert("success".to_string(), Value::Bool(true));
    body.insert(
        "message".to_string(),
        json!(format!("{} created successfully", catalog.label())),
    );
    body.insert(entry_key(catalog), json!(entry));
    Ok(Json(Value::Object(body)))
}

async fn update_entry(
    state: &AppState,
    ctx: &SessionContext,
    catalog: Catalog,
    id: i64,
    form: CatalogForm,
) -> ApiResult<Json<Value>> {
    let entry = state
        .application
        .update_catalog_entry(ctx, catalog, id, form)
        .await?;

    let mut body = Map::new();
    body.insert("success".to_string(), Value::Bool(true));
    body.insert(
        "message".to_string(),
        json!(format!("{} updated successfully", catalog.label())),
    );
    body.insert(entry_key(catalog), json!(entry));
    Ok(Json(Value::Object(body)))
}

async fn delete_entry(
    state: &AppState,
    ctx: &SessionContext,
    catalog: Catalog,
    id: i64,
) -> ApiResult<Json<MessageResponse>> {
    state
        .application
        .delete_catalog_entry(ctx, catalog, id)
        .await?;
    Ok(Json(MessageResponse::ok(format!(
        "{} deleted successfully",
        catalog.label()
    ))))
}

// TVET catalogs

pub async fn list_tvet_entries(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Path(segment): Path<String>,
) -> ApiResult<Json<Value>> {
    list_entries(&state, &ctx, resolve(Role::Tvet, &segment)?).await
}

pub async fn create_tvet_entry(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Path(segment): Path<String>,
    Json(form): Json<CatalogForm>,
) -> ApiResult<Json<Value>> {
    create_entry(&state, &ctx, resolve(Role::Tvet, &segment)?, form).await
}

pub async fn update_tvet_entry(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Path((segment, id)): Path<(String, i64)>,
    Json(form): Json<CatalogForm>,
) -> ApiResult<Json<Value>> {
    update_entry(&state, &ctx, resolve(Role::Tvet, &segment)?, id, form).await
}

pub async fn delete_tvet_entry(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Path((segment, id)): Path<(String, i64)>,
) -> ApiResult<Json<MessageResponse>> {
    delete_entry(&state, &ctx, resolve(Role::Tvet, &segment)?, id).await
}

// LPAF catalogs

pub async fn list_lpaf_entries(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Path(segment): Path<String>,
) -> ApiResult<Json<Value>> {
    list_entries(&state, &ctx, resolve(Role::Lpaf, &segment)?).await
}

pub async fn create_lpaf_entry(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Path(segment): Path<String>,
    Json(form): Json<CatalogForm>,
) -> ApiResult<Json<Value>> {
    create_entry(&state, &ctx, resolve(Role::Lpaf, &segment)?, form).await
}

pub async fn update_lpaf_entry(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Path((segment, id)): Path<(String, i64)>,
    Json(form): Json<CatalogForm>,
) -> ApiResult<Json<Value>> {
    update_entry(&state, &ctx, resolve(Role::Lpaf, &segment)?, id, form).await
}

pub async fn delete_lpaf_entry(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Path((segment, id)): Path<(String, i64)>,
) -> ApiResult<Json<MessageResponse>> {
    delete_entry(&state, &ctx, resolve(Role::Lpaf, &segment)?, id).await
}

// TVET materials

pub async fn list_tvet_materials(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Query(query): Query<MaterialQuery>,
) -> ApiResult<Json<Value>> {
    let materials = state
        .application
        .list_tvet_materials(&ctx, query.folder_id)
        .await?;
    Ok(Json(json!({ "success": true, "materials": materials })))
}

pub async fn create_tvet_material(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Json(form): Json<TvetMaterialForm>,
) -> ApiResult<Json<Value>> {
    let material = state.application.create_tvet_material(&ctx, form).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Material created successfully",
        "material": material,
    })))
}

pub async fn update_tvet_material(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Path(id): Path<i64>,
    Json(form): Json<TvetMaterialForm>,
) -> ApiResult<Json<Value>> {
    let material = state.application.update_tvet_material(&ctx, id, form).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Material updated successfully",
        "material": material,
    })))
}

pub async fn delete_tvet_material(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Path(id): Path<i64>,
) -> ApiResult<Json<MessageResponse>> {
    state.application.delete_tvet_material(&ctx, id).await?;
    Ok(Json(MessageResponse::ok("Material deleted successfully")))
}

// LPAF materials

pub async fn list_lpaf_materials(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Query(query): Query<MaterialQuery>,
) -> ApiResult<Json<Value>> {
    let materials = state
        .application
        .list_lpaf_materials(&ctx, query.folder_id)
        .await?;
    Ok(Json(json!({ "success": true, "materials": materials })))
}

pub async fn create_lpaf_material(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Json(form): Json<LpafMaterialForm>,
) -> ApiResult<Json<Value>> {
    let material = state.application.create_lpaf_material(&ctx, form).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Material created successfully",
        "material": material,
    })))
}

pub async fn update_lpaf_material(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Path(id): Path<i64>,
    Json(form): Json<LpafMaterialForm>,
) -> ApiResult<Json<Value>> {
    let material = state.application.update_lpaf_material(&ctx, id, form).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Material updated successfully",
        "material": material,
    })))
}

pub async fn delete_lpaf_material(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Path(id): Path<i64>,
) -> ApiResult<Json<MessageResponse>> {
    state.application.delete_lpaf_material(&ctx, id).await?;
    Ok(Json(MessageResponse::ok("Material deleted successfully")))
}
