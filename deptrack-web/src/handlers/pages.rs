//! Landing resources the session flow redirects to
//!
//! `/` is the public entry point. Each role lands on its own overview after
//! selection: administrators on the activity log, TVET and LPAF on their
//! inventories.

use super::types::{LogQuery, LogView};
use crate::error::{ApiResult, ROLE_SELECTION_PATH};
use crate::session::CurrentSession;
use crate::AppState;
use axum::{
    extract::{Query, State},
    response::Json,
};
use deptrack_applications::DepartmentFilter;
use serde_json::{json, Value};

/// Where to log in, and where a signed-in caller should go next
pub async fn index(CurrentSession(ctx): CurrentSession) -> Json<Value> {
    let next = match ctx.selected_role {
        Some(role) => role.landing_path(),
        None if ctx.is_authenticated() => ROLE_SELECTION_PATH,
        None => "/auth/login",
    };

    Json(json!({
        "success": true,
        "authenticated": ctx.is_authenticated(),
        "login": "/auth/login",
        "redirect": next,
    }))
}

/// Activity log overview with the applied department filter echoed back
pub async fn admin_logs(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Query(query): Query<LogQuery>,
) -> ApiResult<Json<Value>> {
    let current_filter = query
        .department
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or("all")
        .to_string();
    let filter = DepartmentFilter::parse(Some(current_filter.as_str()));

    let logs: Vec<LogView> = state
        .application
        .query_audit_log(&ctx, &filter)
        .await?
        .into_iter()
        .map(LogView::from)
        .collect();

    Ok(Json(json!({
        "success": true,
        "logs": logs,
        "current_filter": current_filter,
    })))
}

pub async fn tvet_inventory(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
) -> ApiResult<Json<Value>> {
    let inventory = state.application.tvet_inventory(&ctx).await?;
    Ok(Json(json!({
        "success": true,
        "folders": inventory.folders,
        "materials": inventory.materials,
    })))
}

pub async fn lpaf_inventory(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
) -> ApiResult<Json<Value>> {
    let inventory = state.application.lpaf_inventory(&ctx).await?;
    Ok(Json(json!({
        "success": true,
        "folders": inventory.folders,
        "productions": inventory.productions,
        "statuses": inventory.statuses,
        "materials": inventory.materials,
    })))
}
