//! Shared application state.
//!
//! One `CoreState` is built at startup and shared behind an `Arc` by every
//! request handler. The SQLite connection sits behind a `std::sync::Mutex`
//! and is only locked inside synchronous closures passed to `with_db`, so
//! the guard can never be held across an `.await`.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

use crate::authorization::AdminAllowlist;
use crate::config::AppConfig;
use crate::db::DatabaseError;
use crate::notify::{Mailer, Notifier};
use crate::oauth::GoogleOAuth;
use crate::sessions::{OAuthStateStore, SessionStore, SessionUser};

// ═══════════════════════════════════════════════════════════
// CoreState
// ═══════════════════════════════════════════════════════════

pub struct CoreState {
    pub config: AppConfig,
    /// Referral store. Last write wins; there is no row-level locking.
    db: Mutex<Connection>,
    notifier: Notifier,
    allowlist: AdminAllowlist,
    /// `None` when Google credentials are not configured.
    oauth: Option<GoogleOAuth>,
    sessions: Mutex<SessionStore>,
    oauth_states: Mutex<OAuthStateStore>,
}

impl CoreState {
    pub fn new(
        config: AppConfig,
        conn: Connection,
        mailer: Arc<dyn Mailer>,
        oauth: Option<GoogleOAuth>,
    ) -> Self {
        Self {
            notifier: Notifier::new(mailer, &config),
            allowlist: AdminAllowlist::new(&config.admin_users),
            sessions: Mutex::new(SessionStore::new(config.session_ttl)),
            oauth_states: Mutex::new(OAuthStateStore::new()),
            db: Mutex::new(conn),
            oauth,
            config,
        }
    }

    // ── Store access ────────────────────────────────────────

    /// Run a synchronous store operation under the connection lock.
    pub fn with_db<T, F>(&self, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(&Connection) -> Result<T, DatabaseError>,
    {
        let conn = self.db.lock().map_err(|_| CoreError::LockPoisoned)?;
        f(&conn).map_err(CoreError::Database)
    }

    // ── Collaborators ───────────────────────────────────────

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn allowlist(&self) -> &AdminAllowlist {
        &self.allowlist
    }

    pub fn oauth(&self) -> Option<&GoogleOAuth> {
        self.oauth.as_ref()
    }

    // ── Sessions ────────────────────────────────────────────

    pub fn lock_sessions(&self) -> Result<MutexGuard<'_, SessionStore>, CoreError> {
        self.sessions.lock().map_err(|_| CoreError::LockPoisoned)
    }

    pub fn lock_oauth_states(&self) -> Result<MutexGuard<'_, OAuthStateStore>, CoreError> {
        self.oauth_states.lock().map_err(|_| CoreError::LockPoisoned)
    }

    /// Resolve a session cookie value to the signed-in user.
    pub fn session_user(&self, token: &str) -> Result<Option<SessionUser>, CoreError> {
        Ok(self.lock_sessions()?.get(token))
    }
}

// ═══════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Internal lock error")]
    LockPoisoned,
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

#[cfg(test)]
impl CoreState {
    /// In-memory store, test config, the given mailer, no OAuth.
    pub(crate) fn for_tests(mailer: Arc<dyn Mailer>) -> Arc<Self> {
        let conn = crate::db::open_memory_database().expect("in-memory database");
        Arc::new(Self::new(AppConfig::for_tests(), conn, mailer, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository;
    use crate::notify::DisabledMailer;
    use crate::reports::fixtures::referral;
    use crate::models::ReferralStatus;

    #[test]
    fn with_db_round_trip() {
        let state = CoreState::for_tests(Arc::new(DisabledMailer));
        let r = referral("AB12CD34", ReferralStatus::Submitted, 300);
        state
            .with_db(|conn| repository::insert_referral(conn, &r))
            .unwrap();
        let loaded = state
            .with_db(|conn| repository::get_referral(conn, "AB12CD34"))
            .unwrap();
        assert_eq!(loaded, Some(r));
    }

    #[test]
    fn with_db_surfaces_store_errors() {
        let state = CoreState::for_tests(Arc::new(DisabledMailer));
        let err = state
            .with_db(|conn| repository::delete_referral(conn, "MISSING0"))
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Database(DatabaseError::NotFound { .. })
        ));
    }

    #[test]
    fn allowlist_comes_from_config() {
        let state = CoreState::for_tests(Arc::new(DisabledMailer));
        assert!(state.allowlist().is_admin("ADMIN@school.org"));
        assert!(state.oauth().is_none());
    }

    #[test]
    fn sessions_resolve_through_state() {
        let state = CoreState::for_tests(Arc::new(DisabledMailer));
        let token = state
            .lock_sessions()
            .unwrap()
            .create(SessionUser {
                email: "admin@school.org".into(),
                name: "Admin".into(),
                picture: None,
            });
        let user = state.session_user(&token).unwrap().unwrap();
        assert_eq!(user.email, "admin@school.org");
        assert!(state.session_user("bogus").unwrap().is_none());
    }
}
