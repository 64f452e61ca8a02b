//! Read-side views over referrals: referrer lookup, staff autofill and
//! the admin dashboard counts.

use serde::Serialize;
use serde_json::Value;

use crate::models::{Referral, ReferralStatus};

/// A referrer's own referrals with running bonus totals.
#[derive(Debug, Serialize)]
pub struct ReferrerLookup {
    pub referrals: Vec<Value>,
    pub total_pending: i64,
    pub total_paid: i64,
}

/// Fields that only admins may see.
const ADMIN_ONLY_FIELDS: &[&str] = &["admin_notes"];

/// Referral as shown to the referrer: admin-only fields removed.
pub fn public_view(referral: &Referral) -> Value {
    let mut value = serde_json::to_value(referral).unwrap_or(Value::Null);
    if let Value::Object(map) = &mut value {
        for field in ADMIN_ONLY_FIELDS {
            map.remove(*field);
        }
    }
    value
}

/// Build the lookup response from the referrer's referrals.
pub fn referrer_lookup(referrals: &[Referral]) -> ReferrerLookup {
    let total_pending = referrals
        .iter()
        .filter(|r| r.status.counts_as_pending_bonus())
        .map(|r| r.bonus_amount)
        .sum();
    let total_paid = sum_bonus(referrals, |s| s == ReferralStatus::Paid);

    ReferrerLookup {
        referrals: referrals.iter().map(public_view).collect(),
        total_pending,
        total_paid,
    }
}

/// Autofill data from a referrer's most recent submission.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct StaffLookup {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school: Option<String>,
}

/// `referrals` must be ordered newest first.
pub fn staff_lookup(referrals: &[Referral]) -> StaffLookup {
    match referrals.first() {
        Some(latest) => StaffLookup {
            found: true,
            name: Some(latest.referrer_name.clone()),
            school: Some(latest.referrer_school.clone()),
        },
        None => StaffLookup {
            found: false,
            name: None,
            school: None,
        },
    }
}

/// Admin dashboard counts. Archived referrals are excluded.
#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct DashboardStats {
    pub total: usize,
    pub pending_review: usize,
    pub in_progress: usize,
    pub hired_pending: usize,
    pub paid_count: usize,
    pub bonuses_paid: i64,
    pub bonuses_pending: i64,
    pub not_hired: usize,
}

pub fn dashboard_stats(referrals: &[Referral]) -> DashboardStats {
    let active: Vec<Referral> = referrals.iter().filter(|r| !r.is_archived).cloned().collect();
    let count = |pred: fn(ReferralStatus) -> bool| active.iter().filter(|r| pred(r.status)).count();

    DashboardStats {
        total: active.len(),
        pending_review: count(ReferralStatus::needs_review),
        in_progress: count(|s| {
            matches!(s, ReferralStatus::CandidateApplied | ReferralStatus::Interviewing)
        }),
        hired_pending: count(ReferralStatus::awaiting_payout),
        paid_count: count(|s| s == ReferralStatus::Paid),
        bonuses_paid: sum_bonus(&active, |s| s == ReferralStatus::Paid),
        bonuses_pending: sum_bonus(&active, ReferralStatus::awaiting_payout),
        not_hired: count(|s| {
            matches!(
                s,
                ReferralStatus::NotHired
                    | ReferralStatus::LeftBeforeSixtyDays
                    | ReferralStatus::Ineligible
            )
        }),
    }
}

pub(crate) fn sum_bonus(referrals: &[Referral], pred: impl Fn(ReferralStatus) -> bool) -> i64 {
    referrals
        .iter()
        .filter(|r| pred(r.status))
        .map(|r| r.bonus_amount)
        .sum()
}
