//! Sign-in endpoints.
//!
//! - `GET /login`: redirect to Google with a fresh single-use `state`
//! - `GET /auth/callback`: exchange the code, start a session
//! - `GET /logout`: revoke the session and clear the cookie
//! - `GET /api/auth/status`: who is signed in, and are they an admin

use axum::extract::{Query, State};
use axum::http::header::SET_COOKIE;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{clear_session_cookie, session_cookie, session_token, ApiContext};
use crate::core_state::CoreError;
use crate::oauth::{GoogleOAuth, OAuthError};
use crate::sessions::SessionUser;

const AFTER_LOGIN: &str = "/?admin=true";
const LOGIN_FAILED: &str = "/?error=auth_failed";

/// `GET /login`
pub async fn login(State(ctx): State<ApiContext>) -> Result<Response, ApiError> {
    let oauth = ctx.core.oauth().ok_or(ApiError::OAuthNotConfigured)?;
    let state = ctx.core.lock_oauth_states()?.issue();
    let url = oauth
        .authorize_url(&state)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Redirect::to(&url).into_response())
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, thiserror::Error)]
enum CallbackError {
    #[error("Identity provider returned error: {0}")]
    Provider(String),
    #[error("Callback is missing code or state")]
    MissingParams,
    #[error("Unknown or expired OAuth state")]
    InvalidState,
    #[error(transparent)]
    OAuth(#[from] OAuthError),
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// `GET /auth/callback`: any failure lands the browser on the error page
/// rather than a JSON body.
pub async fn callback(
    State(ctx): State<ApiContext>,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, ApiError> {
    let oauth = ctx.core.oauth().ok_or(ApiError::OAuthNotConfigured)?;

    match complete_login(&ctx, oauth, query).await {
        Ok(user) => {
            let (token, ttl) = {
                let mut sessions = ctx.core.lock_sessions()?;
                (sessions.create(user.clone()), sessions.ttl())
            };
            tracing::info!(
                email = %user.email,
                is_admin = ctx.core.allowlist().is_admin(&user.email),
                "User signed in"
            );
            let cookie = session_cookie(&token, ttl, ctx.core.config.secure_cookies());
            Ok(([(SET_COOKIE, cookie)], Redirect::to(AFTER_LOGIN)).into_response())
        }
        Err(e) => {
            tracing::warn!(error = %e, "OAuth callback failed");
            Ok(Redirect::to(LOGIN_FAILED).into_response())
        }
    }
}

async fn complete_login(
    ctx: &ApiContext,
    oauth: &GoogleOAuth,
    query: CallbackQuery,
) -> Result<SessionUser, CallbackError> {
    if let Some(error) = query.error {
        if let Some(state) = query.state.as_deref() {
            ctx.core.lock_oauth_states()?.consume(state);
        }
        return Err(CallbackError::Provider(error));
    }
    let (code, state) = match (query.code, query.state) {
        (Some(code), Some(state)) => (code, state),
        _ => return Err(CallbackError::MissingParams),
    };
    if !ctx.core.lock_oauth_states()?.consume(&state) {
        return Err(CallbackError::InvalidState);
    }
    Ok(oauth.exchange_code(&code).await?)
}

/// `GET /logout`
pub async fn logout(State(ctx): State<ApiContext>, headers: HeaderMap) -> Response {
    if let Some(token) = session_token(&headers) {
        match ctx.core.lock_sessions() {
            Ok(mut sessions) => {
                sessions.revoke(&token);
            }
            Err(e) => tracing::error!(error = %e, "Could not revoke session"),
        }
    }
    ([(SET_COOKIE, clear_session_cookie())], Redirect::to("/")).into_response()
}

#[derive(Debug, Serialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,
}

/// `GET /api/auth/status`
pub async fn status(State(ctx): State<ApiContext>, headers: HeaderMap) -> Json<AuthStatus> {
    let user = ctx.current_user(&headers);
    Json(AuthStatus {
        authenticated: user.is_some(),
        is_admin: user
            .as_ref()
            .is_some_and(|u| ctx.core.allowlist().is_admin(&u.email)),
        user,
    })
}
