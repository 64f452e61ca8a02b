//! Admin access gate.
//!
//! Two roles only: anyone, and admins. A caller is an admin iff they hold
//! a signed-in session AND their email is on the configured allowlist.
//! Comparison is case-insensitive; an empty allowlist admits nobody.

use std::collections::HashSet;

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Outcome of an access check, for the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    /// Signed in and on the allowlist.
    Admin,
    /// Signed in, not on the allowlist.
    NotAdmin,
    /// No session identity.
    Anonymous,
}

// ═══════════════════════════════════════════════════════════
// Allowlist
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default)]
pub struct AdminAllowlist {
    emails: HashSet<String>,
}

impl AdminAllowlist {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            emails: emails
                .into_iter()
                .map(|e| normalize(e.as_ref()))
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    pub fn is_admin(&self, email: &str) -> bool {
        self.emails.contains(&normalize(email))
    }

    /// Decide access for an optional session email.
    pub fn check(&self, session_email: Option<&str>) -> AccessDecision {
        match session_email {
            None => AccessDecision::Anonymous,
            Some(email) if self.is_admin(email) => AccessDecision::Admin,
            Some(_) => AccessDecision::NotAdmin,
        }
    }

    pub fn len(&self) -> usize {
        self.emails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}
