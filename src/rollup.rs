//! Weekly rollup digest of the referral pipeline.
//!
//! Pure aggregation: takes a snapshot of referrals and a reference time,
//! returns the buckets and action items the digest email is built from.
//! Referrals with missing or unreadable dates are left out of the
//! date-based buckets and still counted everywhere else.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::models::{Referral, ReferralStatus};
use crate::reports::sum_bonus;

const NEW_WINDOW_DAYS: i64 = 7;
const UPCOMING_WINDOW_DAYS: i64 = 14;

pub const ALL_CAUGHT_UP: &str = "All caught up! No immediate action items.";

#[derive(Debug, Clone, Serialize)]
pub struct WeeklyRollup {
    pub generated_at: DateTime<Utc>,
    pub total_referrals: usize,
    pub new_this_week: Vec<Referral>,
    pub needs_review: Vec<Referral>,
    pub interviewing: Vec<Referral>,
    pub hired_waiting: Vec<Referral>,
    pub upcoming_sixty_day: Vec<Referral>,
    pub ready_for_payout: Vec<Referral>,
    /// Hired + Eligible bonus total.
    pub pending_bonus_total: i64,
    pub paid_bonus_total: i64,
    /// Bonus total of the ready-for-payout bucket.
    pub payout_total: i64,
}

impl WeeklyRollup {
    pub fn build(referrals: &[Referral], now: DateTime<Utc>) -> Self {
        let week_ago = now - Duration::days(NEW_WINDOW_DAYS);
        let today = now.date_naive();
        let horizon = today + Duration::days(UPCOMING_WINDOW_DAYS);

        let pick = |pred: &dyn Fn(&Referral) -> bool| -> Vec<Referral> {
            referrals.iter().filter(|r| pred(r)).cloned().collect()
        };

        let ready_for_payout = pick(&|r| r.status == ReferralStatus::Eligible);
        let payout_total = ready_for_payout.iter().map(|r| r.bonus_amount).sum();

        Self {
            generated_at: now,
            total_referrals: referrals.len(),
            new_this_week: pick(&|r| r.submitted_at.is_some_and(|ts| ts > week_ago)),
            needs_review: pick(&|r| r.status.needs_review()),
            interviewing: pick(&|r| r.status == ReferralStatus::Interviewing),
            hired_waiting: pick(&|r| r.status == ReferralStatus::Hired),
            upcoming_sixty_day: pick(&|r| {
                r.status == ReferralStatus::Hired
                    && r.sixty_day_date.is_some_and(|d| within(d, today, horizon))
            }),
            ready_for_payout,
            pending_bonus_total: sum_bonus(referrals, ReferralStatus::awaiting_payout),
            paid_bonus_total: sum_bonus(referrals, |s| s == ReferralStatus::Paid),
            payout_total,
        }
    }

    /// Follow-ups for the talent team, or the all-caught-up line.
    pub fn action_items(&self) -> Vec<String> {
        let mut items = Vec::new();
        if !self.needs_review.is_empty() {
            items.push(format!(
                "Review {} referral(s) awaiting review",
                self.needs_review.len()
            ));
        }
        if !self.ready_for_payout.is_empty() {
            items.push(format!(
                "Process {} payout(s) totaling ${}",
                self.ready_for_payout.len(),
                format_thousands(self.payout_total)
            ));
        }
        if !self.upcoming_sixty_day.is_empty() {
            items.push(format!(
                "{} referral(s) reaching 60-day mark soon",
                self.upcoming_sixty_day.len()
            ));
        }
        if items.is_empty() {
            items.push(ALL_CAUGHT_UP.to_string());
        }
        items
    }
}

fn within(date: NaiveDate, start: NaiveDate, end: NaiveDate) -> bool {
    start <= date && date <= end
}

/// 12500 -> "12,500"
pub fn format_thousands(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if amount < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::fixtures::referral;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 12, 13, 0, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ids(referrals: &[Referral]) -> Vec<&str> {
        referrals.iter().map(|r| r.referral_id.as_str()).collect()
    }

    #[test]
    fn empty_pipeline_is_all_caught_up() {
        let rollup = WeeklyRollup::build(&[], now());
        assert_eq!(rollup.total_referrals, 0);
        assert!(rollup.new_this_week.is_empty());
        assert!(rollup.needs_review.is_empty());
        assert!(rollup.interviewing.is_empty());
        assert!(rollup.hired_waiting.is_empty());
        assert!(rollup.upcoming_sixty_day.is_empty());
        assert!(rollup.ready_for_payout.is_empty());
        assert_eq!(rollup.action_items(), vec![ALL_CAUGHT_UP.to_string()]);
    }

    #[test]
    fn new_this_week_uses_submission_time() {
        let mut fresh = referral("FRESH001", ReferralStatus::Submitted, 300);
        fresh.submitted_at = Some(now() - Duration::days(2));
        let mut stale = referral("STALE001", ReferralStatus::Submitted, 300);
        stale.submitted_at = Some(now() - Duration::days(8));
        let mut unknown = referral("NODATE01", ReferralStatus::Submitted, 300);
        unknown.submitted_at = None;

        let rollup = WeeklyRollup::build(&[fresh, stale, unknown], now());
        assert_eq!(ids(&rollup.new_this_week), vec!["FRESH001"]);
        // Missing dates only drop out of date buckets
        assert_eq!(rollup.needs_review.len(), 3);
        assert_eq!(rollup.total_referrals, 3);
    }

    #[test]
    fn upcoming_window_is_inclusive_two_weeks() {
        let mut today = referral("TODAY001", ReferralStatus::Hired, 500);
        today.sixty_day_date = Some(date(2025, 5, 12));
        let mut edge = referral("EDGE0001", ReferralStatus::Hired, 500);
        edge.sixty_day_date = Some(date(2025, 5, 26));
        let mut too_far = referral("FAR00001", ReferralStatus::Hired, 500);
        too_far.sixty_day_date = Some(date(2025, 5, 27));
        let mut past = referral("PAST0001", ReferralStatus::Hired, 500);
        past.sixty_day_date = Some(date(2025, 5, 11));
        let mut not_hired = referral("ELIG0001", ReferralStatus::Eligible, 500);
        not_hired.sixty_day_date = Some(date(2025, 5, 13));
        let no_date = referral("NODATE02", ReferralStatus::Hired, 500);

        let rollup = WeeklyRollup::build(&[today, edge, too_far, past, not_hired, no_date], now());
        assert_eq!(ids(&rollup.upcoming_sixty_day), vec!["TODAY001", "EDGE0001"]);
        assert_eq!(rollup.hired_waiting.len(), 5);
    }

    #[test]
    fn buckets_and_totals() {
        let referrals = vec![
            referral("REVIEW01", ReferralStatus::UnderReview, 300),
            referral("INTV0001", ReferralStatus::Interviewing, 300),
            referral("HIRED001", ReferralStatus::Hired, 500),
            referral("ELIG0001", ReferralStatus::Eligible, 500),
            referral("ELIG0002", ReferralStatus::Eligible, 300),
            referral("PAID0001", ReferralStatus::Paid, 500),
        ];
        let rollup = WeeklyRollup::build(&referrals, now());
        assert_eq!(ids(&rollup.needs_review), vec!["REVIEW01"]);
        assert_eq!(ids(&rollup.interviewing), vec!["INTV0001"]);
        assert_eq!(ids(&rollup.ready_for_payout), vec!["ELIG0001", "ELIG0002"]);
        assert_eq!(rollup.pending_bonus_total, 1300);
        assert_eq!(rollup.paid_bonus_total, 500);
        assert_eq!(rollup.payout_total, 800);
        assert_eq!(
            rollup.action_items(),
            vec![
                "Review 1 referral(s) awaiting review".to_string(),
                "Process 2 payout(s) totaling $800".to_string(),
            ]
        );
    }

    #[test]
    fn thousands_separator() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(800), "800");
        assert_eq!(format_thousands(1300), "1,300");
        assert_eq!(format_thousands(1234567), "1,234,567");
        assert_eq!(format_thousands(-4500), "-4,500");
    }
}
