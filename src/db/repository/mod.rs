//! Repository layer: entity-scoped database operations.
//!
//! Plain functions over a borrowed `Connection`; callers own the
//! connection and its locking.

mod referral;

pub use referral::*;
