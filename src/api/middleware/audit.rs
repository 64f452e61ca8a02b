//! Admin audit logging middleware.
//!
//! Logs every admin request with actor, method, path, and response
//! status. Runs innermost (after auth has injected `AdminContext`).

use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::api::types::AdminContext;

pub async fn log_admin_action(req: Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let actor = req
        .extensions()
        .get::<AdminContext>()
        .map(|a| a.email.clone())
        .unwrap_or_else(|| "unknown".into());

    let response = next.run(req).await;

    tracing::info!(
        target: "audit",
        %actor,
        %method,
        %path,
        status = response.status().as_u16(),
        "Admin action"
    );

    response
}
