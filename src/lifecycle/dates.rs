//! Retention-window date arithmetic.
//!
//! A hire date determines two derived values:
//! - the 60-day completion date (calendar days, not business days)
//! - the payout month: the calendar month after the one containing the
//!   60-day date, rendered as "Month Year".

use chrono::{Datelike, Days, NaiveDate};

use super::LifecycleError;

pub const RETENTION_DAYS: u64 = 60;

/// Dates derived from a hire date. Always recomputed together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedDates {
    pub sixty_day_date: NaiveDate,
    pub payout_month: String,
}

pub fn sixty_day_date(hire_date: NaiveDate) -> Result<NaiveDate, LifecycleError> {
    hire_date
        .checked_add_days(Days::new(RETENTION_DAYS))
        .ok_or(LifecycleError::DateOutOfRange(hire_date))
}

/// First day of the month following `date`'s month.
pub fn first_of_next_month(date: NaiveDate) -> Result<NaiveDate, LifecycleError> {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).ok_or(LifecycleError::DateOutOfRange(date))
}

/// "April 2025"
pub fn format_payout_month(month_start: NaiveDate) -> String {
    month_start.format("%B %Y").to_string()
}

pub fn derive_dates(hire_date: NaiveDate) -> Result<DerivedDates, LifecycleError> {
    let sixty_day_date = sixty_day_date(hire_date)?;
    let payout_month = format_payout_month(first_of_next_month(sixty_day_date)?);
    Ok(DerivedDates {
        sixty_day_date,
        payout_month,
    })
}

/// Parse a `YYYY-MM-DD` calendar date supplied by an admin.
pub fn parse_calendar_date(field: &'static str, raw: &str) -> Result<NaiveDate, LifecycleError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| LifecycleError::InvalidDate {
        field,
        value: raw.to_string(),
    })
}

/// Null and blank both mean "clear the date".
pub fn parse_optional_date(
    field: &'static str,
    raw: Option<&str>,
) -> Result<Option<NaiveDate>, LifecycleError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_calendar_date(field, value).map(Some),
    }
}
