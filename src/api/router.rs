//! HTTP router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Public routes (submission, lookup, sign-in, scheduler trigger) carry no
//! gate. Admin routes are nested under `/api/admin/` behind:
//!
//! Extension(ApiContext) → Admin gate → Audit logger → Handler

use std::sync::Arc;

use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the full application router.
///
/// Middleware uses `Extension<ApiContext>` (injected as the outermost layer
/// of the admin group). Endpoint handlers use `State<ApiContext>`.
pub fn api_router(core: Arc<CoreState>) -> Router {
    let static_dir = core.config.static_dir.clone();
    let router = build_router(ApiContext::new(core));

    let router = match static_dir {
        Some(dir) => {
            tracing::info!(dir = %dir.display(), "Serving static assets");
            router.fallback_service(ServeDir::new(dir))
        }
        None => router,
    };

    router
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn build_router(ctx: ApiContext) -> Router {
    // Layers are applied from bottom (innermost) to top (outermost).
    // Extension must be outermost so the gate can extract ApiContext.
    //
    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let admin = Router::new()
        .route("/referrals", get(endpoints::admin::list))
        .route(
            "/referrals/:id",
            patch(endpoints::admin::update).delete(endpoints::admin::delete),
        )
        .route("/referrals/:id/archive", patch(endpoints::admin::archive))
        .route(
            "/referrals/:id/unarchive",
            patch(endpoints::admin::unarchive),
        )
        .route("/stats", get(endpoints::admin::stats))
        .route("/test-rollup", post(endpoints::admin::test_rollup))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(
            middleware::audit::log_admin_action,
        ))
        .layer(axum::middleware::from_fn(middleware::auth::require_admin))
        .layer(axum::Extension(ctx.clone()));

    let public = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/api/referrals", post(endpoints::referrals::submit))
        .route("/api/referrals/lookup", get(endpoints::referrals::lookup))
        .route("/api/staff/lookup", get(endpoints::referrals::staff_lookup))
        .route("/api/statuses", get(endpoints::referrals::statuses))
        .route("/api/weekly-rollup", post(endpoints::rollup::trigger))
        .route("/login", get(endpoints::auth::login))
        .route("/auth/callback", get(endpoints::auth::callback))
        .route("/logout", get(endpoints::auth::logout))
        .route("/api/auth/status", get(endpoints::auth::status))
        .with_state(ctx);

    Router::new().merge(public).nest("/api/admin", admin)
}
