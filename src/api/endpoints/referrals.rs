//! Public referral endpoints.
//!
//! - `POST /api/referrals`: submit a referral
//! - `GET /api/referrals/lookup?email=`: a referrer's own referrals
//! - `GET /api/staff/lookup?email=`: autofill from a previous submission
//! - `GET /api/statuses`: canonical status list

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::core_state::CoreError;
use crate::db::{repository, DatabaseError};
use crate::lifecycle::start_referral;
use crate::models::{generate_referral_id, NewReferral, ReferralStatus};
use crate::reports::{self, ReferrerLookup, StaffLookup};

/// Fresh ids are drawn again on a primary-key collision, up to this many times.
const MAX_ID_ATTEMPTS: usize = 5;

#[derive(Serialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub referral_id: String,
    pub bonus_amount: i64,
}

/// `POST /api/referrals`: store a new referral, then notify the referrer
/// and the talent team. Mail failures do not fail the submission.
pub async fn submit(
    State(ctx): State<ApiContext>,
    payload: Result<Json<NewReferral>, JsonRejection>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let Json(form) = payload?;
    if let Some(field) = form.first_missing_field() {
        return Err(ApiError::BadRequest(format!(
            "Missing required field: {field}"
        )));
    }

    let now = chrono::Utc::now();
    let mut attempt = 0;
    let referral = loop {
        attempt += 1;
        let referral = start_referral(form.clone(), generate_referral_id(), now);
        match ctx
            .core
            .with_db(|conn| repository::insert_referral(conn, &referral))
        {
            Ok(()) => break referral,
            Err(CoreError::Database(DatabaseError::ConstraintViolation(reason)))
                if attempt < MAX_ID_ATTEMPTS =>
            {
                tracing::warn!(
                    referral_id = %referral.referral_id,
                    attempt,
                    %reason,
                    "Referral id collision, retrying"
                );
            }
            Err(e) => return Err(e.into()),
        }
    };

    tracing::info!(
        referral_id = %referral.referral_id,
        position_type = %referral.position_type,
        bonus = referral.bonus_amount,
        "Referral submitted"
    );

    ctx.core.notifier().referral_submitted(&referral).await;

    Ok(Json(SubmitResponse {
        success: true,
        referral_id: referral.referral_id,
        bonus_amount: referral.bonus_amount,
    }))
}

#[derive(Deserialize)]
pub struct EmailQuery {
    #[serde(default)]
    pub email: String,
}

impl EmailQuery {
    fn normalized(&self) -> Result<String, ApiError> {
        let email = self.email.trim().to_lowercase();
        if email.is_empty() {
            return Err(ApiError::BadRequest("Email required".into()));
        }
        Ok(email)
    }
}

/// `GET /api/referrals/lookup`: referrer's referrals with bonus totals,
/// admin-only fields removed.
pub async fn lookup(
    State(ctx): State<ApiContext>,
    Query(query): Query<EmailQuery>,
) -> Result<Json<ReferrerLookup>, ApiError> {
    let email = query.normalized()?;
    let referrals = ctx
        .core
        .with_db(|conn| repository::list_referrals_by_referrer(conn, &email))?;
    Ok(Json(reports::referrer_lookup(&referrals)))
}

/// `GET /api/staff/lookup`: name and school from the referrer's latest
/// submission.
pub async fn staff_lookup(
    State(ctx): State<ApiContext>,
    Query(query): Query<EmailQuery>,
) -> Result<Json<StaffLookup>, ApiError> {
    let email = query.normalized()?;
    let referrals = ctx
        .core
        .with_db(|conn| repository::list_referrals_by_referrer(conn, &email))?;
    Ok(Json(reports::staff_lookup(&referrals)))
}

#[derive(Serialize)]
pub struct StatusesResponse {
    pub statuses: Vec<&'static str>,
}

/// `GET /api/statuses`: the 11 statuses in canonical order.
pub async fn statuses() -> Json<StatusesResponse> {
    Json(StatusesResponse {
        statuses: ReferralStatus::ALL.iter().map(|s| s.as_str()).collect(),
    })
}
