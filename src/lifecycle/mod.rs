//! Referral status lifecycle engine.
//!
//! Owns the rules of the program: which statuses exist, which transitions
//! notify whom, what a referral's bonus is, and when its 60-day window
//! closes and the bonus is scheduled for payout. Pure functions only; the
//! caller persists the result and dispatches notifications.

pub mod bonus;
pub mod dates;
pub mod engine;

use chrono::NaiveDate;

pub use bonus::compute_bonus;
pub use dates::{derive_dates, DerivedDates};
pub use engine::{
    apply_hire_date, apply_status_change, apply_update, start_referral, validate_status,
    AppliedUpdate, LifecycleEvent, ReferralUpdate,
};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("Invalid status: {0}")]
    InvalidStatus(String),
    #[error("Invalid {field}: expected YYYY-MM-DD, got {value:?}")]
    InvalidDate { field: &'static str, value: String },
    #[error("Date out of range: {0}")]
    DateOutOfRange(NaiveDate),
    #[error("Invalid bonus amount: {0}")]
    InvalidBonus(i64),
}
