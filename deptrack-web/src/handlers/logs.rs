//! Activity log view for administrators

use super::types::{LogQuery, LogView};
use crate::error::ApiResult;
use crate::session::CurrentSession;
use crate::AppState;
use axum::{
    extract::{Query, State},
    response::Json,
};
use deptrack_applications::DepartmentFilter;
use serde_json::{json, Value};

/// Newest entries first, optionally restricted to one department
pub async fn list_logs(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Query(query): Query<LogQuery>,
) -> ApiResult<Json<Value>> {
    let filter = DepartmentFilter::parse(query.department.as_deref());
    let logs: Vec<LogView> = state
        .application
        .query_audit_log(&ctx, &filter)
        .await?
        .into_iter()
        .map(LogView::from)
        .collect();

    Ok(Json(json!({ "success": true, "logs": logs })))
}
