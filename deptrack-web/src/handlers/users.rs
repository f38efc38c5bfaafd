//! User administration

use super::types::MessageResponse;
use crate::error::ApiResult;
use crate::session::CurrentSession;
use crate::AppState;
use axum::{
    extract::{Path, State},
    response::Json,
};
use deptrack_applications::UserForm;
use serde_json::{json, Value};

pub async fn list_users(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
) -> ApiResult<Json<Value>> {
    let users = state.application.list_users(&ctx).await?;
    Ok(Json(json!({ "success": true, "users": users })))
}

pub async fn create_user(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Json(form): Json<UserForm>,
) -> ApiResult<Json<Value>> {
    let user = state.application.create_user(&ctx, form).await?;
    Ok(Json(json!({
        "success": true,
        "message": "User created successfully",
        "user": user,
    })))
}

/// A blank password leaves the current one in place
pub async fn update_user(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Path(id): Path<i64>,
    Json(form): Json<UserForm>,
) -> ApiResult<Json<Value>> {
    let user = state.application.update_user(&ctx, id, form).await?;
    Ok(Json(json!({
        "success": true,
        "message": "User updated successfully",
        "user": user,
    })))
}

pub async fn delete_user(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Path(id): Path<i64>,
) -> ApiResult<Json<MessageResponse>> {
    state.application.delete_user(&ctx, id).await?;
    Ok(Json(MessageResponse::ok("User deleted successfully")))
}
