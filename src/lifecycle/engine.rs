//! Status transitions and admin field updates.
//!
//! `apply_update` parses every field of a `ReferralUpdate` before applying
//! it to a copy of the referral, so a rejected update never produces a
//! partially-mutated record.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};

use super::bonus::compute_bonus;
use super::dates::{derive_dates, parse_optional_date};
use super::LifecycleError;
use crate::models::{NewReferral, Referral, ReferralStatus, NOT_YET_APPLIED, SYSTEM_ACTOR};

/// Notification-worthy outcome of an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Tell the referrer their referral moved.
    StatusChanged {
        from: ReferralStatus,
        to: ReferralStatus,
    },
    /// Tell payroll, HR and talent a bonus can be paid.
    PayoutReady,
}

/// Admin edit payload for `PATCH /api/admin/referrals/{id}`.
///
/// Absent keys leave the field alone. For the two date fields `null` (or an
/// empty string) clears the value. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReferralUpdate {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub hire_date: Option<Option<String>>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub position_type: Option<String>,
    #[serde(default, deserialize_with = "whole_amount")]
    pub bonus_amount: Option<i64>,
    #[serde(default, deserialize_with = "present")]
    pub paid_date: Option<Option<String>>,
    #[serde(default)]
    pub admin_notes: Option<String>,
}

/// Distinguishes a key sent as `null` (`Some(None)`) from an absent key (`None`).
fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Admin forms post the bonus as either `500` or `"500"`.
fn whole_amount<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Amount {
        Number(i64),
        Text(String),
    }

    match Option::<Amount>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Amount::Number(amount)) => Ok(Some(amount)),
        Some(Amount::Text(raw)) => raw.trim().parse().map(Some).map_err(|_| {
            serde::de::Error::custom(format!("invalid bonus_amount: {raw:?}"))
        }),
    }
}

/// Result of a successful `apply_update`.
#[derive(Debug, Clone)]
pub struct AppliedUpdate {
    pub referral: Referral,
    pub events: Vec<LifecycleEvent>,
}

/// Reject anything outside the 11 canonical statuses.
pub fn validate_status(candidate: &str) -> Result<ReferralStatus, LifecycleError> {
    candidate
        .parse::<ReferralStatus>()
        .map_err(|_| LifecycleError::InvalidStatus(candidate.to_string()))
}

/// Record a status change and decide which notifications it triggers.
///
/// The status timestamp and actor are refreshed even when the status is
/// unchanged; notifications only fire on an actual change.
pub fn apply_status_change(
    referral: &mut Referral,
    new_status: ReferralStatus,
    actor: &str,
    now: DateTime<Utc>,
) -> Vec<LifecycleEvent> {
    let old_status = referral.status;
    referral.status = new_status;
    referral.status_updated_at = Some(now);
    referral.status_updated_by = actor.to_string();

    if old_status == new_status {
        return Vec::new();
    }

    let mut events = vec![LifecycleEvent::StatusChanged {
        from: old_status,
        to: new_status,
    }];
    if new_status == ReferralStatus::Eligible {
        events.push(LifecycleEvent::PayoutReady);
    }
    events
}

/// Set or clear the hire date, keeping the derived dates in lockstep.
pub fn apply_hire_date(
    referral: &mut Referral,
    hire_date: Option<NaiveDate>,
) -> Result<(), LifecycleError> {
    match hire_date.map(derive_dates).transpose()? {
        Some(dates) => {
            referral.sixty_day_date = Some(dates.sixty_day_date);
            referral.payout_month = Some(dates.payout_month);
        }
        None => {
            referral.sixty_day_date = None;
            referral.payout_month = None;
        }
    }
    referral.hire_date = hire_date;
    Ok(())
}

/// Validate an admin update in full, then apply it to a copy of `current`.
pub fn apply_update(
    current: &Referral,
    update: ReferralUpdate,
    actor: &str,
    now: DateTime<Utc>,
) -> Result<AppliedUpdate, LifecycleError> {
    let status = update.status.as_deref().map(validate_status).transpose()?;

    let hire_date = update
        .hire_date
        .as_ref()
        .map(|raw| parse_optional_date("hire_date", raw.as_deref()))
        .transpose()?;

    let paid_date = update
        .paid_date
        .as_ref()
        .map(|raw| parse_optional_date("paid_date", raw.as_deref()))
        .transpose()?;

    if let Some(amount) = update.bonus_amount {
        if amount < 0 {
            return Err(LifecycleError::InvalidBonus(amount));
        }
    }

    // Work on a copy: an out-of-range hire date still fails below, and
    // `current` must stay untouched when it does.
    let mut referral = current.clone();
    if let Some(hire_date) = hire_date {
        apply_hire_date(&mut referral, hire_date)?;
    }

    let mut events = Vec::new();
    if let Some(status) = status {
        events = apply_status_change(&mut referral, status, actor, now);
    }
    if let Some(position) = update.position {
        referral.position = position;
    }
    // Changing the position type does not touch the bonus; only an explicit
    // bonus_amount does.
    if let Some(position_type) = update.position_type {
        referral.position_type = position_type;
    }
    if let Some(amount) = update.bonus_amount {
        referral.bonus_amount = amount;
    }
    if let Some(paid_date) = paid_date {
        referral.paid_date = paid_date;
    }
    if let Some(notes) = update.admin_notes {
        referral.admin_notes = notes;
    }

    Ok(AppliedUpdate { referral, events })
}

/// Build the initial record for a validated submission form.
pub fn start_referral(form: NewReferral, referral_id: String, now: DateTime<Utc>) -> Referral {
    let already_applied = if form.already_applied.trim().is_empty() {
        NOT_YET_APPLIED.to_string()
    } else {
        form.already_applied
    };

    Referral {
        referral_id,
        submitted_at: Some(now),
        bonus_amount: compute_bonus(&form.position_type),
        referrer_name: form.referrer_name.trim().to_string(),
        referrer_email: form.referrer_email.trim().to_lowercase(),
        referrer_school: form.referrer_school,
        candidate_name: form.candidate_name.trim().to_string(),
        candidate_email: form.candidate_email.trim().to_lowercase(),
        candidate_phone: form.candidate_phone,
        position: form.position,
        position_type: form.position_type,
        role_fit: form.role_fit,
        relationship: form.relationship,
        already_applied,
        notes: form.notes,
        status: ReferralStatus::Submitted,
        status_updated_at: Some(now),
        status_updated_by: SYSTEM_ACTOR.to_string(),
        hire_date: None,
        sixty_day_date: None,
        payout_month: None,
        paid_date: None,
        admin_notes: String::new(),
        is_archived: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 1, 15, 0, 0).unwrap()
    }

    fn form() -> NewReferral {
        NewReferral {
            referrer_name: " Dana Lee ".into(),
            referrer_email: "Dana.Lee@School.org ".into(),
            referrer_school: "Arthur Ashe".into(),
            candidate_name: "Sam Park".into(),
            candidate_email: "SAM@Example.com".into(),
            position: "3rd Grade ELA".into(),
            position_type: "Lead Teacher".into(),
            relationship: "Former colleague".into(),
            ..Default::default()
        }
    }

    fn referral_with(status: ReferralStatus) -> Referral {
        let mut referral = start_referral(form(), "AB12CD34".into(), now());
        referral.status = status;
        referral
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn update_from(json: &str) -> ReferralUpdate {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn start_referral_defaults() {
        let referral = start_referral(form(), "AB12CD34".into(), now());
        assert_eq!(referral.status, ReferralStatus::Submitted);
        assert_eq!(referral.status_updated_by, "System");
        assert_eq!(referral.bonus_amount, 500);
        assert_eq!(referral.referrer_email, "dana.lee@school.org");
        assert_eq!(referral.candidate_email, "sam@example.com");
        assert_eq!(referral.referrer_name, "Dana Lee");
        assert_eq!(referral.already_applied, "Not yet");
        assert_eq!(referral.submitted_at, Some(now()));
        assert!(!referral.is_archived);
    }

    #[test]
    fn validate_status_rejects_unknown() {
        assert_eq!(validate_status("Eligible").unwrap(), ReferralStatus::Eligible);
        assert!(matches!(
            validate_status("Onboarding"),
            Err(LifecycleError::InvalidStatus(s)) if s == "Onboarding"
        ));
    }

    #[test]
    fn hired_to_eligible_emits_referrer_and_payout_events() {
        let mut referral = referral_with(ReferralStatus::Hired);
        let events = apply_status_change(&mut referral, ReferralStatus::Eligible, "admin@school.org", now());
        assert_eq!(
            events,
            vec![
                LifecycleEvent::StatusChanged {
                    from: ReferralStatus::Hired,
                    to: ReferralStatus::Eligible
                },
                LifecycleEvent::PayoutReady,
            ]
        );
        assert_eq!(referral.status_updated_by, "admin@school.org");
    }

    #[test]
    fn same_status_emits_nothing() {
        let mut referral = referral_with(ReferralStatus::Interviewing);
        let events =
            apply_status_change(&mut referral, ReferralStatus::Interviewing, "admin@school.org", now());
        assert!(events.is_empty());
    }

    #[test]
    fn ordinary_change_emits_only_referrer_event() {
        let mut referral = referral_with(ReferralStatus::Submitted);
        let events = apply_status_change(&mut referral, ReferralStatus::UnderReview, "a", now());
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], LifecycleEvent::StatusChanged { .. }));
    }

    #[test]
    fn hire_date_sets_and_clears_derived_dates() {
        let mut referral = referral_with(ReferralStatus::Hired);
        apply_hire_date(&mut referral, Some(date(2025, 1, 1))).unwrap();
        assert_eq!(referral.sixty_day_date, Some(date(2025, 3, 2)));
        assert_eq!(referral.payout_month.as_deref(), Some("April 2025"));

        apply_hire_date(&mut referral, None).unwrap();
        assert_eq!(referral.hire_date, None);
        assert_eq!(referral.sixty_day_date, None);
        assert_eq!(referral.payout_month, None);
    }

    #[test]
    fn out_of_range_hire_date_leaves_referral_alone() {
        let mut referral = referral_with(ReferralStatus::Hired);
        apply_hire_date(&mut referral, Some(date(2025, 1, 1))).unwrap();
        let before = referral.clone();

        let err = apply_hire_date(&mut referral, Some(NaiveDate::MAX)).unwrap_err();
        assert!(matches!(err, LifecycleError::DateOutOfRange(_)));
        assert_eq!(referral, before);
    }

    #[test]
    fn update_with_invalid_status_changes_nothing() {
        let current = referral_with(ReferralStatus::Hired);
        let err = apply_update(
            &current,
            update_from(r#"{"status": "Promoted", "admin_notes": "x"}"#),
            "admin@school.org",
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidStatus(_)));
    }

    #[test]
    fn update_with_bad_hire_date_is_rejected() {
        let current = referral_with(ReferralStatus::Hired);
        let err = apply_update(
            &current,
            update_from(r#"{"hire_date": "next monday", "status": "Eligible"}"#),
            "a",
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidDate { field: "hire_date", .. }));
    }

    #[test]
    fn update_null_hire_date_clears_derived() {
        let mut current = referral_with(ReferralStatus::Hired);
        apply_hire_date(&mut current, Some(date(2025, 1, 1))).unwrap();

        let applied = apply_update(&current, update_from(r#"{"hire_date": null}"#), "a", now()).unwrap();
        assert_eq!(applied.referral.hire_date, None);
        assert_eq!(applied.referral.sixty_day_date, None);
        assert_eq!(applied.referral.payout_month, None);

        let applied = apply_update(&current, update_from(r#"{"hire_date": ""}"#), "a", now()).unwrap();
        assert_eq!(applied.referral.payout_month, None);
    }

    #[test]
    fn absent_hire_date_leaves_derived_untouched() {
        let mut current = referral_with(ReferralStatus::Hired);
        apply_hire_date(&mut current, Some(date(2025, 1, 1))).unwrap();
        let applied =
            apply_update(&current, update_from(r#"{"admin_notes": "called"}"#), "a", now()).unwrap();
        assert_eq!(applied.referral.payout_month.as_deref(), Some("April 2025"));
        assert_eq!(applied.referral.admin_notes, "called");
        assert!(applied.events.is_empty());
    }

    #[test]
    fn position_type_change_keeps_bonus() {
        let current = referral_with(ReferralStatus::Submitted);
        let applied = apply_update(
            &current,
            update_from(r#"{"position_type": "Operations"}"#),
            "a",
            now(),
        )
        .unwrap();
        assert_eq!(applied.referral.position_type, "Operations");
        assert_eq!(applied.referral.bonus_amount, 500);

        let applied =
            apply_update(&current, update_from(r#"{"bonus_amount": 300}"#), "a", now()).unwrap();
        assert_eq!(applied.referral.bonus_amount, 300);
    }

    #[test]
    fn negative_bonus_rejected() {
        let current = referral_with(ReferralStatus::Submitted);
        let err = apply_update(&current, update_from(r#"{"bonus_amount": -5}"#), "a", now()).unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidBonus(-5)));
    }

    #[test]
    fn bonus_amount_accepts_numeric_string() {
        let current = referral_with(ReferralStatus::Submitted);
        let applied =
            apply_update(&current, update_from(r#"{"bonus_amount": " 300 "}"#), "a", now()).unwrap();
        assert_eq!(applied.referral.bonus_amount, 300);

        let err =
            apply_update(&current, update_from(r#"{"bonus_amount": "-5"}"#), "a", now()).unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidBonus(-5)));

        assert_eq!(update_from(r#"{"bonus_amount": null}"#).bonus_amount, None);
        assert!(serde_json::from_str::<ReferralUpdate>(r#"{"bonus_amount": "lots"}"#).is_err());
        assert!(serde_json::from_str::<ReferralUpdate>(r#"{"bonus_amount": true}"#).is_err());
    }

    #[test]
    fn full_update_applies_every_field() {
        let current = referral_with(ReferralStatus::Hired);
        let applied = apply_update(
            &current,
            update_from(
                r#"{"status": "Paid", "hire_date": "2025-01-01", "position": "4th Grade Math",
                    "paid_date": "2025-04-15", "admin_notes": "April payroll"}"#,
            ),
            "hr@school.org",
            now(),
        )
        .unwrap();
        let r = &applied.referral;
        assert_eq!(r.status, ReferralStatus::Paid);
        assert_eq!(r.status_updated_by, "hr@school.org");
        assert_eq!(r.status_updated_at, Some(now()));
        assert_eq!(r.sixty_day_date, Some(date(2025, 3, 2)));
        assert_eq!(r.position, "4th Grade Math");
        assert_eq!(r.paid_date, Some(date(2025, 4, 15)));
        assert_eq!(applied.events.len(), 1);
    }

    #[test]
    fn unknown_update_keys_rejected() {
        let result: Result<ReferralUpdate, _> =
            serde_json::from_str(r#"{"referral_id": "HIJACK00"}"#);
        assert!(result.is_err());
    }
}
