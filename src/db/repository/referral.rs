use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};

use crate::db::DatabaseError;
use crate::models::*;

const REFERRAL_COLUMNS: &str = "referral_id, submitted_at, referrer_name, referrer_email,
     referrer_school, candidate_name, candidate_email, candidate_phone, position,
     position_type, role_fit, bonus_amount, relationship, already_applied, notes, status,
     status_updated_at, status_updated_by, hire_date, sixty_day_date, payout_month,
     paid_date, admin_notes, is_archived";

/// Insert a new referral. A duplicate `referral_id` surfaces as
/// `ConstraintViolation` so the caller can retry with a fresh id.
pub fn insert_referral(conn: &Connection, referral: &Referral) -> Result<(), DatabaseError> {
    conn.execute(
        &format!(
            "INSERT INTO referrals ({REFERRAL_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                     ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24)"
        ),
        params![
            referral.referral_id,
            referral.submitted_at.map(format_timestamp),
            referral.referrer_name,
            referral.referrer_email,
            referral.referrer_school,
            referral.candidate_name,
            referral.candidate_email,
            referral.candidate_phone,
            referral.position,
            referral.position_type,
            referral.role_fit,
            referral.bonus_amount,
            referral.relationship,
            referral.already_applied,
            referral.notes,
            referral.status.as_str(),
            referral.status_updated_at.map(format_timestamp),
            referral.status_updated_by,
            referral.hire_date.map(|d| d.to_string()),
            referral.sixty_day_date.map(|d| d.to_string()),
            referral.payout_month,
            referral.paid_date.map(|d| d.to_string()),
            referral.admin_notes,
            referral.is_archived,
        ],
    )
    .map_err(|e| match e.sqlite_error_code() {
        Some(ErrorCode::ConstraintViolation) => {
            DatabaseError::ConstraintViolation(format!("referral_id {}", referral.referral_id))
        }
        _ => DatabaseError::from(e),
    })?;
    Ok(())
}

pub fn get_referral(conn: &Connection, referral_id: &str) -> Result<Option<Referral>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {REFERRAL_COLUMNS} FROM referrals WHERE referral_id = ?1"
    ))?;
    let raw = stmt.query_row([referral_id], read_row).optional()?;
    raw.map(RawReferral::into_referral).transpose()
}

/// All referrals, newest submission first. Archived rows included.
pub fn list_referrals(conn: &Connection) -> Result<Vec<Referral>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {REFERRAL_COLUMNS} FROM referrals ORDER BY submitted_at DESC"
    ))?;
    let rows = stmt.query_map([], read_row)?;
    collect_referrals(rows)
}

/// Referrals submitted by one referrer (email compared case-insensitively),
/// newest first.
pub fn list_referrals_by_referrer(
    conn: &Connection,
    referrer_email: &str,
) -> Result<Vec<Referral>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {REFERRAL_COLUMNS} FROM referrals
         WHERE LOWER(referrer_email) = LOWER(?1)
         ORDER BY submitted_at DESC"
    ))?;
    let rows = stmt.query_map([referrer_email], read_row)?;
    collect_referrals(rows)
}

/// Persist every mutable field of an existing referral (last write wins).
/// `referral_id`, `submitted_at` and the referrer/candidate identity are
/// never rewritten.
pub fn update_referral(conn: &Connection, referral: &Referral) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE referrals SET
            position = ?2, position_type = ?3, bonus_amount = ?4, status = ?5,
            status_updated_at = ?6, status_updated_by = ?7, hire_date = ?8,
            sixty_day_date = ?9, payout_month = ?10, paid_date = ?11, admin_notes = ?12
         WHERE referral_id = ?1",
        params![
            referral.referral_id,
            referral.position,
            referral.position_type,
            referral.bonus_amount,
            referral.status.as_str(),
            referral.status_updated_at.map(format_timestamp),
            referral.status_updated_by,
            referral.hire_date.map(|d| d.to_string()),
            referral.sixty_day_date.map(|d| d.to_string()),
            referral.payout_month,
            referral.paid_date.map(|d| d.to_string()),
            referral.admin_notes,
        ],
    )?;
    require_row(changed, &referral.referral_id)
}

pub fn delete_referral(conn: &Connection, referral_id: &str) -> Result<(), DatabaseError> {
    let changed = conn.execute("DELETE FROM referrals WHERE referral_id = ?1", [referral_id])?;
    require_row(changed, referral_id)
}

pub fn set_archived(conn: &Connection, referral_id: &str, archived: bool) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE referrals SET is_archived = ?2 WHERE referral_id = ?1",
        params![referral_id, archived],
    )?;
    require_row(changed, referral_id)
}

fn require_row(changed: usize, referral_id: &str) -> Result<(), DatabaseError> {
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Referral".into(),
            id: referral_id.into(),
        });
    }
    Ok(())
}

// ═══════════════════════════════════════════
// Row mapping
// ═══════════════════════════════════════════

/// Column values as stored. Dates stay as text until `into_referral`
/// so one malformed value does not fail the whole query.
struct RawReferral {
    referral_id: String,
    submitted_at: Option<String>,
    referrer_name: String,
    referrer_email: String,
    referrer_school: String,
    candidate_name: String,
    candidate_email: String,
    candidate_phone: String,
    position: String,
    position_type: String,
    role_fit: String,
    bonus_amount: i64,
    relationship: String,
    already_applied: String,
    notes: String,
    status: String,
    status_updated_at: Option<String>,
    status_updated_by: String,
    hire_date: Option<String>,
    sixty_day_date: Option<String>,
    payout_month: Option<String>,
    paid_date: Option<String>,
    admin_notes: String,
    is_archived: bool,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<RawReferral> {
    Ok(RawReferral {
        referral_id: row.get(0)?,
        submitted_at: row.get(1)?,
        referrer_name: row.get(2)?,
        referrer_email: row.get(3)?,
        referrer_school: row.get(4)?,
        candidate_name: row.get(5)?,
        candidate_email: row.get(6)?,
        candidate_phone: row.get(7)?,
        position: row.get(8)?,
        position_type: row.get(9)?,
        role_fit: row.get(10)?,
        bonus_amount: row.get(11)?,
        relationship: row.get(12)?,
        already_applied: row.get(13)?,
        notes: row.get(14)?,
        status: row.get(15)?,
        status_updated_at: row.get(16)?,
        status_updated_by: row.get(17)?,
        hire_date: row.get(18)?,
        sixty_day_date: row.get(19)?,
        payout_month: row.get(20)?,
        paid_date: row.get(21)?,
        admin_notes: row.get(22)?,
        is_archived: row.get::<_, Option<bool>>(23)?.unwrap_or(false),
    })
}

impl RawReferral {
    fn into_referral(self) -> Result<Referral, DatabaseError> {
        let id = self.referral_id;
        Ok(Referral {
            submitted_at: lenient_timestamp(&id, "submitted_at", self.submitted_at),
            status_updated_at: lenient_timestamp(&id, "status_updated_at", self.status_updated_at),
            hire_date: lenient_date(&id, "hire_date", self.hire_date),
            sixty_day_date: lenient_date(&id, "sixty_day_date", self.sixty_day_date),
            paid_date: lenient_date(&id, "paid_date", self.paid_date),
            payout_month: self.payout_month.filter(|m| !m.is_empty()),
            status: ReferralStatus::from_str(&self.status)?,
            referrer_name: self.referrer_name,
            referrer_email: self.referrer_email,
            referrer_school: self.referrer_school,
            candidate_name: self.candidate_name,
            candidate_email: self.candidate_email,
            candidate_phone: self.candidate_phone,
            position: self.position,
            position_type: self.position_type,
            role_fit: self.role_fit,
            bonus_amount: self.bonus_amount,
            relationship: self.relationship,
            already_applied: self.already_applied,
            notes: self.notes,
            status_updated_by: self.status_updated_by,
            admin_notes: self.admin_notes,
            is_archived: self.is_archived,
            referral_id: id,
        })
    }
}

fn collect_referrals(
    rows: impl Iterator<Item = rusqlite::Result<RawReferral>>,
) -> Result<Vec<Referral>, DatabaseError> {
    let mut referrals = Vec::new();
    for row in rows {
        referrals.push(row?.into_referral()?);
    }
    Ok(referrals)
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Accepts RFC 3339 and naive ISO timestamps (read as UTC).
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn lenient_timestamp(id: &str, field: &str, raw: Option<String>) -> Option<DateTime<Utc>> {
    let raw = raw.filter(|s| !s.trim().is_empty())?;
    let parsed = parse_timestamp(&raw);
    if parsed.is_none() {
        tracing::warn!(referral_id = id, field, value = %raw, "Unreadable timestamp, treating as unset");
    }
    parsed
}

fn lenient_date(id: &str, field: &str, raw: Option<String>) -> Option<NaiveDate> {
    let raw = raw.filter(|s| !s.trim().is_empty())?;
    let parsed = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok();
    if parsed.is_none() {
        tracing::warn!(referral_id = id, field, value = %raw, "Unreadable date, treating as unset");
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use chrono::TimeZone;

    fn sample(id: &str, email: &str, submitted: DateTime<Utc>) -> Referral {
        Referral {
            referral_id: id.into(),
            submitted_at: Some(submitted),
            referrer_name: "Dana Lee".into(),
            referrer_email: email.into(),
            referrer_school: "Arthur Ashe".into(),
            candidate_name: "Sam Park".into(),
            candidate_email: "sam@example.com".into(),
            candidate_phone: String::new(),
            position: "3rd Grade ELA".into(),
            position_type: "Lead Teacher".into(),
            role_fit: String::new(),
            bonus_amount: 500,
            relationship: "Former colleague".into(),
            already_applied: "Not yet".into(),
            notes: String::new(),
            status: ReferralStatus::Submitted,
            status_updated_at: Some(submitted),
            status_updated_by: "System".into(),
            hire_date: None,
            sixty_day_date: None,
            payout_month: None,
            paid_date: None,
            admin_notes: String::new(),
            is_archived: false,
        }
    }

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn insert_then_get_preserves_fields() {
        let conn = open_memory_database().unwrap();
        let mut referral = sample("AB12CD34", "dana@school.org", ts(1));
        referral.hire_date = NaiveDate::from_ymd_opt(2025, 1, 1);
        referral.payout_month = Some("April 2025".into());
        insert_referral(&conn, &referral).unwrap();

        let loaded = get_referral(&conn, "AB12CD34").unwrap().unwrap();
        assert_eq!(loaded, referral);
    }

    #[test]
    fn get_unknown_returns_none() {
        let conn = open_memory_database().unwrap();
        assert!(get_referral(&conn, "NOPE0000").unwrap().is_none());
    }

    #[test]
    fn duplicate_id_is_constraint_violation() {
        let conn = open_memory_database().unwrap();
        let referral = sample("DUPL0001", "dana@school.org", ts(1));
        insert_referral(&conn, &referral).unwrap();
        let err = insert_referral(&conn, &referral).unwrap_err();
        assert!(matches!(err, DatabaseError::ConstraintViolation(_)));
    }

    #[test]
    fn list_orders_newest_first() {
        let conn = open_memory_database().unwrap();
        insert_referral(&conn, &sample("OLD00001", "a@school.org", ts(1))).unwrap();
        insert_referral(&conn, &sample("NEW00001", "b@school.org", ts(9))).unwrap();
        let ids: Vec<String> = list_referrals(&conn)
            .unwrap()
            .into_iter()
            .map(|r| r.referral_id)
            .collect();
        assert_eq!(ids, vec!["NEW00001", "OLD00001"]);
    }

    #[test]
    fn list_by_referrer_ignores_case() {
        let conn = open_memory_database().unwrap();
        insert_referral(&conn, &sample("AAAA0001", "dana@school.org", ts(1))).unwrap();
        insert_referral(&conn, &sample("BBBB0001", "other@school.org", ts(2))).unwrap();
        let found = list_referrals_by_referrer(&conn, "DANA@School.org").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].referral_id, "AAAA0001");
    }

    #[test]
    fn update_persists_mutable_fields() {
        let conn = open_memory_database().unwrap();
        let mut referral = sample("UPDT0001", "dana@school.org", ts(1));
        insert_referral(&conn, &referral).unwrap();

        referral.status = ReferralStatus::Hired;
        referral.hire_date = NaiveDate::from_ymd_opt(2025, 1, 1);
        referral.sixty_day_date = NaiveDate::from_ymd_opt(2025, 3, 2);
        referral.payout_month = Some("April 2025".into());
        referral.admin_notes = "Offer accepted".into();
        update_referral(&conn, &referral).unwrap();

        assert_eq!(get_referral(&conn, "UPDT0001").unwrap().unwrap(), referral);
    }

    #[test]
    fn update_unknown_is_not_found() {
        let conn = open_memory_database().unwrap();
        let referral = sample("GHOST001", "dana@school.org", ts(1));
        let err = update_referral(&conn, &referral).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn archive_and_delete() {
        let conn = open_memory_database().unwrap();
        insert_referral(&conn, &sample("ARCH0001", "dana@school.org", ts(1))).unwrap();

        set_archived(&conn, "ARCH0001", true).unwrap();
        assert!(get_referral(&conn, "ARCH0001").unwrap().unwrap().is_archived);
        set_archived(&conn, "ARCH0001", false).unwrap();
        assert!(!get_referral(&conn, "ARCH0001").unwrap().unwrap().is_archived);

        delete_referral(&conn, "ARCH0001").unwrap();
        assert!(get_referral(&conn, "ARCH0001").unwrap().is_none());
        assert!(matches!(
            delete_referral(&conn, "ARCH0001"),
            Err(DatabaseError::NotFound { .. })
        ));
    }

    #[test]
    fn malformed_dates_read_as_unset() {
        let conn = open_memory_database().unwrap();
        conn.execute(
            "INSERT INTO referrals (referral_id, submitted_at, status, hire_date, sixty_day_date)
             VALUES ('BADDATE1', 'last tuesday', 'Hired', '2025-13-45', 'soon')",
            [],
        )
        .unwrap();
        let referral = get_referral(&conn, "BADDATE1").unwrap().unwrap();
        assert!(referral.submitted_at.is_none());
        assert!(referral.hire_date.is_none());
        assert!(referral.sixty_day_date.is_none());
        assert_eq!(referral.status, ReferralStatus::Hired);
    }

    #[test]
    fn unknown_status_is_invalid_enum() {
        let conn = open_memory_database().unwrap();
        conn.execute(
            "INSERT INTO referrals (referral_id, status) VALUES ('BADSTAT1', 'Onboarding')",
            [],
        )
        .unwrap();
        let err = get_referral(&conn, "BADSTAT1").unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidEnum { .. }));
    }

    #[test]
    fn parse_timestamp_accepts_naive_iso() {
        let parsed = parse_timestamp("2025-03-01T08:30:00.123456").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 3, 1, 8, 30, 0).unwrap() + chrono::Duration::microseconds(123456));
        assert!(parse_timestamp("2025-03-01T08:30:00Z").is_some());
        assert!(parse_timestamp("not a time").is_none());
    }
}
