//! Server-side login sessions and OAuth `state` tracking.
//!
//! The browser only ever holds an opaque random token in an HttpOnly
//! cookie. The store keys sessions by the SHA-256 of that token, so a dump
//! of process memory does not yield usable cookies.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Serialize;

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "referral_session";

/// OAuth `state` values are single-use and expire after 10 minutes.
const OAUTH_STATE_TTL: Duration = Duration::from_secs(600);

/// Sweep expired entries once the map grows past this.
const CLEANUP_THRESHOLD: usize = 1000;

/// Hash a session token string using SHA-256.
pub fn hash_token(token: &str) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().into()
}

/// Generate a random token (URL-safe base64, 32 bytes of entropy).
pub fn generate_token() -> String {
    use base64::Engine;
    let bytes: [u8; 32] = rand::random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

// ═══════════════════════════════════════════════════════════
// SessionUser: identity from the identity provider
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionUser {
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
}

struct SessionEntry {
    user: SessionUser,
    expires_at: Instant,
}

// ═══════════════════════════════════════════════════════════
// SessionStore
// ═══════════════════════════════════════════════════════════

pub struct SessionStore {
    sessions: HashMap<[u8; 32], SessionEntry>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            ttl,
        }
    }

    /// Start a session and return the raw token for the cookie.
    pub fn create(&mut self, user: SessionUser) -> String {
        if self.sessions.len() > CLEANUP_THRESHOLD {
            self.cleanup();
        }
        let token = generate_token();
        self.sessions.insert(
            hash_token(&token),
            SessionEntry {
                user,
                expires_at: Instant::now() + self.ttl,
            },
        );
        token
    }

    /// Resolve a cookie token. Expired sessions are dropped on sight.
    pub fn get(&mut self, token: &str) -> Option<SessionUser> {
        let key = hash_token(token);
        let entry = self.sessions.get(&key)?;
        if Instant::now() >= entry.expires_at {
            self.sessions.remove(&key);
            return None;
        }
        Some(entry.user.clone())
    }

    pub fn revoke(&mut self, token: &str) -> bool {
        self.sessions.remove(&hash_token(token)).is_some()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn cleanup(&mut self) {
        let now = Instant::now();
        self.sessions.retain(|_, s| now < s.expires_at);
    }
}

// ═══════════════════════════════════════════════════════════
// OAuthStateStore: CSRF protection for the login redirect
// ═══════════════════════════════════════════════════════════

pub struct OAuthStateStore {
    states: HashMap<String, Instant>,
    ttl: Duration,
}

impl OAuthStateStore {
    pub fn new() -> Self {
        Self {
            states: HashMap::new(),
            ttl: OAUTH_STATE_TTL,
        }
    }

    /// Issue a fresh state value for one login redirect.
    pub fn issue(&mut self) -> String {
        if self.states.len() > CLEANUP_THRESHOLD {
            self.cleanup();
        }
        let state = generate_token();
        self.states
            .insert(state.clone(), Instant::now() + self.ttl);
        state
    }

    /// Consume a state value (one-time use). Returns false if unknown or expired.
    pub fn consume(&mut self, state: &str) -> bool {
        match self.states.remove(state) {
            Some(expires_at) => Instant::now() < expires_at,
            None => false,
        }
    }

    fn cleanup(&mut self) {
        let now = Instant::now();
        self.states.retain(|_, expires_at| now < *expires_at);
    }
}

impl Default for OAuthStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl OAuthStateStore {
    pub(crate) fn with_ttl(ttl: Duration) -> Self {
        Self {
            states: HashMap::new(),
            ttl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> SessionUser {
        SessionUser {
            email: "admin@school.org".into(),
            name: "Avery Admin".into(),
            picture: None,
        }
    }

    #[test]
    fn generate_token_is_unique() {
        let t1 = generate_token();
        let t2 = generate_token();
        assert_ne!(t1, t2);
        assert_eq!(t1.len(), 43);
    }

    #[test]
    fn hash_token_is_deterministic() {
        assert_eq!(hash_token("test"), hash_token("test"));
        assert_ne!(hash_token("token-a"), hash_token("token-b"));
    }

    #[test]
    fn session_roundtrip_and_revoke() {
        let mut store = SessionStore::new(Duration::from_secs(60));
        let token = store.create(user());
        assert_eq!(store.get(&token), Some(user()));
        assert!(store.revoke(&token));
        assert_eq!(store.get(&token), None);
        assert!(!store.revoke(&token));
    }

    #[test]
    fn unknown_token_rejected() {
        let mut store = SessionStore::new(Duration::from_secs(60));
        store.create(user());
        assert_eq!(store.get("forged"), None);
    }

    #[test]
    fn expired_session_is_dropped() {
        let mut store = SessionStore::new(Duration::ZERO);
        let token = store.create(user());
        assert_eq!(store.get(&token), None);
        assert!(store.is_empty());
    }

    #[test]
    fn raw_token_is_not_stored() {
        let mut store = SessionStore::new(Duration::from_secs(60));
        let token = store.create(user());
        assert!(store.sessions.contains_key(&hash_token(&token)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn oauth_state_single_use() {
        let mut states = OAuthStateStore::new();
        let state = states.issue();
        assert!(states.consume(&state));
        assert!(!states.consume(&state));
        assert!(!states.consume("never-issued"));
    }

    #[test]
    fn oauth_state_expires() {
        let mut states = OAuthStateStore::with_ttl(Duration::ZERO);
        let state = states.issue();
        assert!(!states.consume(&state));
    }
}
