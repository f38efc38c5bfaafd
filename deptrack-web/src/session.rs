//! Session cookie handling
//!
//! The cookie carries only the opaque session token. [`CurrentSession`]
//! resolves it against the session store on every request; an unknown token
//! yields an anonymous context rather than an error.

use crate::{error::ApiError, AppState};
use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use deptrack_applications::SessionContext;
use deptrack_core::SessionConfig;

/// The caller's session, anonymous when no valid cookie was sent
#[derive(Debug, Clone)]
pub struct CurrentSession(pub SessionContext);

impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(&state.session_config().cookie_name)
            .map(|cookie| cookie.value().to_string());

        let ctx = state.application.session_context(token.as_deref()).await?;
        Ok(Self(ctx))
    }
}

/// Cookie carrying a freshly issued session token
pub fn session_cookie(config: &SessionConfig, token: String) -> Cookie<'static> {
    Cookie::build((config.cookie_name.clone(), token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.secure_cookie)
        .build()
}

/// Cookie that clears the session on the client
pub fn removal_cookie(config: &SessionConfig) -> Cookie<'static> {
    Cookie::build((config.cookie_name.clone(), String::new()))
        .path("/")
        .build()
}
