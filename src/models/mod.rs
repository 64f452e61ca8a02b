pub mod enums;
pub mod referral;

pub use enums::*;
pub use referral::*;
