//! Admin endpoints. Every route here sits behind the admin gate, so
//! handlers receive an `AdminContext`.
//!
//! - `GET /api/admin/referrals`: everything, newest first, archived included
//! - `PATCH /api/admin/referrals/:id`: partial update, triggers notifications
//! - `DELETE /api/admin/referrals/:id`: hard delete
//! - `PATCH /api/admin/referrals/:id/archive` and `/unarchive`
//! - `GET /api/admin/stats`: dashboard counts, archived excluded
//! - `POST /api/admin/test-rollup`: send the weekly digest now

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::Response;
use axum::{Extension, Json};
use serde::Serialize;

use crate::api::endpoints::rollup::send_rollup;
use crate::api::error::ApiError;
use crate::api::types::{AdminContext, ApiContext};
use crate::db::repository;
use crate::lifecycle::{apply_update, ReferralUpdate};
use crate::models::Referral;
use crate::reports::{self, DashboardStats};

#[derive(Serialize)]
pub struct ReferralsResponse {
    pub referrals: Vec<Referral>,
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Serialize)]
pub struct UpdateResponse {
    pub success: bool,
    pub referral: Referral,
}

/// `GET /api/admin/referrals`
pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<ReferralsResponse>, ApiError> {
    let referrals = ctx.core.with_db(repository::list_referrals)?;
    Ok(Json(ReferralsResponse { referrals }))
}

/// `PATCH /api/admin/referrals/:id`
///
/// The whole payload is validated before anything is written; notification
/// mail is rendered from the record as saved.
pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(admin): Extension<AdminContext>,
    Path(referral_id): Path<String>,
    payload: Result<Json<ReferralUpdate>, JsonRejection>,
) -> Result<Json<UpdateResponse>, ApiError> {
    let Json(update) = payload?;

    let current = ctx
        .core
        .with_db(|conn| repository::get_referral(conn, &referral_id))?
        .ok_or_else(|| ApiError::NotFound(format!("Referral {referral_id} not found")))?;

    let applied = apply_update(&current, update, &admin.email, chrono::Utc::now())?;
    ctx.core
        .with_db(|conn| repository::update_referral(conn, &applied.referral))?;

    tracing::info!(
        %referral_id,
        actor = %admin.email,
        from = %current.status,
        to = %applied.referral.status,
        events = applied.events.len(),
        "Referral updated"
    );

    ctx.core
        .notifier()
        .lifecycle_events(&applied.referral, &applied.events)
        .await;

    Ok(Json(UpdateResponse {
        success: true,
        referral: applied.referral,
    }))
}

/// `DELETE /api/admin/referrals/:id`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(admin): Extension<AdminContext>,
    Path(referral_id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    ctx.core
        .with_db(|conn| repository::delete_referral(conn, &referral_id))?;
    tracing::info!(%referral_id, actor = %admin.email, "Deleted referral");
    Ok(Json(SuccessResponse { success: true }))
}

/// `PATCH /api/admin/referrals/:id/archive`
pub async fn archive(
    State(ctx): State<ApiContext>,
    Extension(admin): Extension<AdminContext>,
    Path(referral_id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    set_archived(&ctx, &admin, &referral_id, true)
}

/// `PATCH /api/admin/referrals/:id/unarchive`
pub async fn unarchive(
    State(ctx): State<ApiContext>,
    Extension(admin): Extension<AdminContext>,
    Path(referral_id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    set_archived(&ctx, &admin, &referral_id, false)
}

fn set_archived(
    ctx: &ApiContext,
    admin: &AdminContext,
    referral_id: &str,
    archived: bool,
) -> Result<Json<SuccessResponse>, ApiError> {
    ctx.core
        .with_db(|conn| repository::set_archived(conn, referral_id, archived))?;
    tracing::info!(%referral_id, actor = %admin.email, archived, "Archive flag changed");
    Ok(Json(SuccessResponse { success: true }))
}

/// `GET /api/admin/stats`
pub async fn stats(State(ctx): State<ApiContext>) -> Result<Json<DashboardStats>, ApiError> {
    let referrals = ctx.core.with_db(repository::list_referrals)?;
    Ok(Json(reports::dashboard_stats(&referrals)))
}

/// `POST /api/admin/test-rollup`
pub async fn test_rollup(
    State(ctx): State<ApiContext>,
    Extension(admin): Extension<AdminContext>,
) -> Result<Response, ApiError> {
    tracing::info!(actor = %admin.email, "Manual weekly rollup requested");
    send_rollup(&ctx, "Test rollup sent", "Failed to send").await
}
