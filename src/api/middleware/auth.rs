//! Admin session middleware.
//!
//! Resolves the session cookie, checks the caller against the admin
//! allowlist, and injects `AdminContext` into request extensions for
//! downstream handlers.

use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::{AdminContext, ApiContext};
use crate::authorization::AccessDecision;

/// Require a signed-in admin.
///
/// No session → 401. Signed in but not on the allowlist → 403.
pub async fn require_admin(req: Request<axum::body::Body>, next: Next) -> Response {
    match require_admin_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn require_admin_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let user = ctx.current_user(req.headers());
    let decision = ctx
        .core
        .allowlist()
        .check(user.as_ref().map(|u| u.email.as_str()));

    let user = match (decision, user) {
        (AccessDecision::Admin, Some(user)) => user,
        (AccessDecision::NotAdmin, Some(user)) => {
            tracing::warn!(email = %user.email, path = %req.uri().path(), "Non-admin denied");
            return Err(ApiError::Forbidden);
        }
        _ => return Err(ApiError::Unauthorized),
    };

    req.extensions_mut().insert(AdminContext {
        email: user.email,
        name: user.name,
    });

    let mut response = next.run(req).await;
    response
        .headers_mut()
        .insert("Cache-Control", HeaderValue::from_static("no-store"));
    Ok(response)
}
