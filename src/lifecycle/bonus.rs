//! Referral bonus amounts, fixed at submission time.

pub const LEAD_TEACHER: &str = "Lead Teacher";
pub const LEAD_TEACHER_BONUS: i64 = 500;
pub const STANDARD_BONUS: i64 = 300;

/// Bonus for a position type. Exact match on "Lead Teacher"; every other
/// position type (including differently-cased variants) earns the standard amount.
pub fn compute_bonus(position_type: &str) -> i64 {
    if position_type == LEAD_TEACHER {
        LEAD_TEACHER_BONUS
    } else {
        STANDARD_BONUS
    }
}
