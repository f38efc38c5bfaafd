//! Study library folders (LPAF)

use super::types::MessageResponse;
use crate::error::ApiResult;
use crate::session::CurrentSession;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use deptrack_applications::{StudyFolderForm, StudyFolderQuery};
use serde_json::{json, Value};

/// All folders, the children of `parent_id`, or the roots with `root_only=true`
pub async fn list_study_folders(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Query(query): Query<StudyFolderQuery>,
) -> ApiResult<Json<Value>> {
    let folders = state.application.list_study_folders(&ctx, &query).await?;
    Ok(Json(json!({ "success": true, "folders": folders })))
}

pub async fn create_study_folder(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Json(form): Json<StudyFolderForm>,
) -> ApiResult<Json<Value>> {
    let folder = state.application.create_study_folder(&ctx, form).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Folder created successfully",
        "folder": folder,
    })))
}

pub async fn update_study_folder(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Path(id): Path<i64>,
    Json(form): Json<StudyFolderForm>,
) -> ApiResult<Json<Value>> {
    let folder = state.application.update_study_folder(&ctx, id, form).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Folder updated successfully",
        "folder": folder,
    })))
}

pub async fn delete_study_folder(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Path(id): Path<i64>,
) -> ApiResult<Json<MessageResponse>> {
    state.application.delete_study_folder(&ctx, id).await?;
    Ok(Json(MessageResponse::ok("Folder deleted successfully")))
}
