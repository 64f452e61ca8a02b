//! Shared types for the HTTP layer.

use std::sync::Arc;
use std::time::Duration;

use axum::http::header::COOKIE;
use axum::http::HeaderMap;

use crate::core_state::CoreState;
use crate::sessions::{SessionUser, SESSION_COOKIE};

// ═══════════════════════════════════════════════════════════
// API context: shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self { core }
    }

    /// Signed-in user for the request's session cookie, if any.
    pub fn current_user(&self, headers: &HeaderMap) -> Option<SessionUser> {
        let token = session_token(headers)?;
        match self.core.session_user(&token) {
            Ok(user) => user,
            Err(e) => {
                tracing::error!(error = %e, "Session lookup failed");
                None
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Admin context: injected by the admin middleware
// ═══════════════════════════════════════════════════════════

/// Authenticated admin, injected into request extensions after the
/// allowlist check.
#[derive(Debug, Clone)]
pub struct AdminContext {
    pub email: String,
    pub name: String,
}

// ═══════════════════════════════════════════════════════════
// Session cookie
// ═══════════════════════════════════════════════════════════

/// Extract the session token from the `Cookie` header(s).
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value that installs a session.
pub fn session_cookie(token: &str, ttl: Duration, secure: bool) -> String {
    let mut cookie = format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        ttl.as_secs()
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that removes the session cookie.
pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn session_token_found_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; referral_session=abc123; lang=en"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn session_token_across_multiple_cookie_headers() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(COOKIE, HeaderValue::from_static("referral_session=xyz"));
        assert_eq!(session_token(&headers).as_deref(), Some("xyz"));
    }

    #[test]
    fn missing_or_empty_session_cookie() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_token(&headers), None);
        headers.insert(COOKIE, HeaderValue::from_static("referral_session="));
        assert_eq!(session_token(&headers), None);
        headers.insert(COOKIE, HeaderValue::from_static("other_referral_session=x"));
        assert_eq!(session_token(&headers), None);
    }

    #[test]
    fn cookie_attributes() {
        let cookie = session_cookie("tok", Duration::from_secs(3600), true);
        assert_eq!(
            cookie,
            "referral_session=tok; Path=/; HttpOnly; SameSite=Lax; Max-Age=3600; Secure"
        );
        assert!(!session_cookie("tok", Duration::from_secs(1), false).contains("Secure"));
        assert!(clear_session_cookie().contains("Max-Age=0"));
    }
}
