//! Login, role selection and logout

use super::types::{LoginRequest, LoginResponse, MessageResponse};
use crate::error::{ApiError, ApiResult, ROLE_SELECTION_PATH};
use crate::session::{removal_cookie, session_cookie, CurrentSession};
use crate::AppState;
use axum::{
    extract::{Path, State},
    response::Json,
};
use axum_extra::extract::cookie::CookieJar;
use deptrack_applications::Role;
use serde_json::{json, Value};
use tracing::debug;

/// Verify credentials and hand out a session cookie
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> ApiResult<(CookieJar, Json<LoginResponse>)> {
    let outcome = state
        .application
        .authenticate(&request.username, &request.password)
        .await?;

    let jar = jar.add(session_cookie(
        state.session_config(),
        outcome.session.token.clone(),
    ));
    Ok((
        jar,
        Json(LoginResponse {
            success: true,
            message: "Login successful".to_string(),
            redirect: ROLE_SELECTION_PATH.to_string(),
            user: outcome.user,
        }),
    ))
}

/// Roles the signed-in user may pick from
pub async fn available_roles(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
) -> ApiResult<Json<Value>> {
    let roles = state.application.list_available_roles(&ctx).await?;
    let roles: Vec<Value> = roles
        .into_iter()
        .map(|role| {
            json!({
                "role": role,
                "department": role.department_tag(),
                "redirect": role.landing_path(),
            })
        })
        .collect();

    Ok(Json(json!({ "success": true, "roles": roles })))
}

/// Switch the session into the role named in the path
pub async fn select_role(
    State(state): State<AppState>,
    CurrentSession(mut ctx): CurrentSession,
    Path(role): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let role = role.parse::<Role>().map_err(|e| {
        debug!(error = %e, "Rejected role selection");
        ApiError::BadRequest("Invalid role selected".to_string())
    })?;

    let target = state.application.select_role(&mut ctx, role).await?;
    Ok(Json(MessageResponse::redirect(
        format!("Now working as {}", role.department_tag()),
        target,
    )))
}

/// End the session and clear the cookie. Anonymous callers get the same reply.
pub async fn logout(
    State(state): State<AppState>,
    CurrentSession(mut ctx): CurrentSession,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Json<MessageResponse>)> {
    state.application.end_session(&mut ctx).await?;

    let jar = jar.remove(removal_cookie(state.session_config()));
    Ok((
        jar,
        Json(MessageResponse::redirect(
            "You have been logged out successfully.",
            "/",
        )),
    ))
}
