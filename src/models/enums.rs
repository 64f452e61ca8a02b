use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::db::DatabaseError;

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// Serializes through the string form so JSON and SQL share one vocabulary.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

// Declaration order is the canonical display order.
str_enum!(ReferralStatus {
    Submitted => "Submitted",
    UnderReview => "Under Review",
    CandidateApplied => "Candidate Applied",
    Interviewing => "Interviewing",
    Hired => "Hired",
    Eligible => "Eligible",
    Paid => "Paid",
    NotHired => "Not Hired",
    Withdrawn => "Withdrawn/Non-responsive",
    LeftBeforeSixtyDays => "Candidate Left before 60 Days",
    Ineligible => "Ineligible",
});

/// Visual treatment of a status in referrer-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    Positive,
    Negative,
    Neutral,
}

impl StatusTone {
    /// Hex color used for the status banner in emails.
    pub fn color(self) -> &'static str {
        match self {
            Self::Positive => "#22c55e",
            Self::Negative => "#ef4444",
            Self::Neutral => "#e47727",
        }
    }
}

impl ReferralStatus {
    pub fn tone(self) -> StatusTone {
        match self {
            Self::Hired | Self::Eligible | Self::Paid => StatusTone::Positive,
            Self::NotHired | Self::Withdrawn | Self::LeftBeforeSixtyDays | Self::Ineligible => {
                StatusTone::Negative
            }
            Self::Submitted | Self::UnderReview | Self::CandidateApplied | Self::Interviewing => {
                StatusTone::Neutral
            }
        }
    }

    /// Label shown to the referrer. Payroll handles "Paid" outside this
    /// system, so referrers see it as "Processing".
    pub fn display_label(self) -> &'static str {
        match self {
            Self::Paid => "Processing",
            other => other.as_str(),
        }
    }

    /// Statuses whose bonus still counts as pending for the referrer.
    pub fn counts_as_pending_bonus(self) -> bool {
        matches!(
            self,
            Self::Submitted
                | Self::UnderReview
                | Self::CandidateApplied
                | Self::Interviewing
                | Self::Hired
                | Self::Eligible
        )
    }

    pub fn needs_review(self) -> bool {
        matches!(self, Self::Submitted | Self::UnderReview)
    }

    /// Hired or Eligible: the bonus is committed but not yet paid.
    pub fn awaiting_payout(self) -> bool {
        matches!(self, Self::Hired | Self::Eligible)
    }
}

impl Default for ReferralStatus {
    fn default() -> Self {
        Self::Submitted
    }
}
