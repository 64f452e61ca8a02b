use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::enums::ReferralStatus;

/// Actor recorded on the initial status of a new referral.
pub const SYSTEM_ACTOR: &str = "System";

/// Default for `already_applied` when the referrer leaves it blank.
pub const NOT_YET_APPLIED: &str = "Not yet";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Referral {
    pub referral_id: String,
    /// `None` only for legacy rows whose timestamp could not be read.
    pub submitted_at: Option<DateTime<Utc>>,
    pub referrer_name: String,
    pub referrer_email: String,
    pub referrer_school: String,
    pub candidate_name: String,
    pub candidate_email: String,
    pub candidate_phone: String,
    pub position: String,
    pub position_type: String,
    pub role_fit: String,
    pub bonus_amount: i64,
    pub relationship: String,
    pub already_applied: String,
    pub notes: String,
    pub status: ReferralStatus,
    pub status_updated_at: Option<DateTime<Utc>>,
    pub status_updated_by: String,
    pub hire_date: Option<NaiveDate>,
    pub sixty_day_date: Option<NaiveDate>,
    pub payout_month: Option<String>,
    pub paid_date: Option<NaiveDate>,
    pub admin_notes: String,
    pub is_archived: bool,
}

/// Submission form payload for `POST /api/referrals`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewReferral {
    #[serde(deserialize_with = "null_as_empty")]
    pub referrer_name: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub referrer_email: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub referrer_school: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub candidate_name: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub candidate_email: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub candidate_phone: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub position: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub position_type: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub role_fit: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub relationship: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub already_applied: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub notes: String,
}

/// Browser forms send `null` for fields left untouched; read those as blank.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl NewReferral {
    /// Name of the first required field that is blank, in form order.
    pub fn first_missing_field(&self) -> Option<&'static str> {
        let required = [
            ("referrer_name", &self.referrer_name),
            ("referrer_email", &self.referrer_email),
            ("referrer_school", &self.referrer_school),
            ("candidate_name", &self.candidate_name),
            ("candidate_email", &self.candidate_email),
            ("position", &self.position),
            ("position_type", &self.position_type),
            ("relationship", &self.relationship),
        ];
        required
            .into_iter()
            .find(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| name)
    }
}

/// Short opaque referral token: the first 8 hex digits of a v4 UUID, uppercased.
pub fn generate_referral_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_uppercase()
}
