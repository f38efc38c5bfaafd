//! TVET student roster

use super::types::{MessageResponse, SearchQuery};
use crate::error::ApiResult;
use crate::session::CurrentSession;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use deptrack_applications::StudentForm;
use serde_json::{json, Value};

pub async fn list_students(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Value>> {
    let students = state
        .application
        .list_students(&ctx, query.search.as_deref())
        .await?;
    Ok(Json(json!({ "success": true, "students": students })))
}

pub async fn get_student(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let student = state.application.get_student(&ctx, id).await?;
    Ok(Json(json!({ "success": true, "student": student })))
}

pub async fn create_student(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Json(form): Json<StudentForm>,
) -> ApiResult<Json<Value>> {
    let student = state.application.create_student(&ctx, form).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Student added successfully",
        "student": student,
    })))
}

pub async fn update_student(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Path(id): Path<i64>,
    Json(form): Json<StudentForm>,
) -> ApiResult<Json<Value>> {
    let student = state.application.update_student(&ctx, id, form).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Student updated successfully",
        "student": student,
    })))
}

pub async fn delete_student(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Path(id): Path<i64>,
) -> ApiResult<Json<MessageResponse>> {
    state.application.delete_student(&ctx, id).await?;
    Ok(Json(MessageResponse::ok("Student deleted successfully")))
}
