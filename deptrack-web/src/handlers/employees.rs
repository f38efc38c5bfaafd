//! Personnel records of the active department

use super::types::{MessageResponse, SearchQuery};
use crate::error::ApiResult;
use crate::session::CurrentSession;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use deptrack_applications::EmployeeForm;
use serde_json::{json, Value};

pub async fn list_employees(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Value>> {
    let employees = state
        .application
        .list_employees(&ctx, query.search.as_deref())
        .await?;
    Ok(Json(json!({ "success": true, "employees": employees })))
}

pub async fn get_employee(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let employee = state.application.get_employee(&ctx, id).await?;
    Ok(Json(json!({ "success": true, "employee": employee })))
}

pub async fn create_employee(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Json(form): Json<EmployeeForm>,
) -> ApiResult<Json<Value>> {
    let employee = state.application.create_employee(&ctx, form).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Employee added successfully",
        "employee": employee,
    })))
}

pub async fn update_employee(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Path(id): Path<i64>,
    Json(form): Json<EmployeeForm>,
) -> ApiResult<Json<Value>> {
    let employee = state.application.update_employee(&ctx, id, form).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Employee updated successfully",
        "employee": employee,
    })))
}

pub async fn delete_employee(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Path(id): Path<i64>,
) -> ApiResult<Json<MessageResponse>> {
    state.application.delete_employee(&ctx, id).await?;
    Ok(Json(MessageResponse::ok("Employee deleted successfully")))
}
