//! Application configuration.
//!
//! Everything environment-specific (allowlist, SMTP, recipients, OAuth,
//! store location) is read once at startup into an `AppConfig` and injected
//! into `CoreState`. Nothing reads the environment after that.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "Staff Referral Program";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_SMTP_SERVER: &str = "smtp.gmail.com";
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_SESSION_TTL_HOURS: u64 = 8;
const MAX_SESSION_TTL_HOURS: u64 = 24 * 365;

/// Default `tracing` filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "info,staff_referral_lib=debug,tower_http=info"
}

/// Default on-disk location of the referral database.
/// `<data dir>/staff-referral/referrals.db`, or the working directory when
/// the platform has no data dir.
pub fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("staff-referral"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("referrals.db")
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// SMTP transport settings. `password: None` disables delivery.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: Option<String>,
    pub from_name: String,
}

/// Fixed mailboxes that receive team-facing notifications.
#[derive(Debug, Clone, Default)]
pub struct Recipients {
    pub talent: String,
    pub hr: String,
    pub cpo: Option<String>,
    pub payroll_manager: String,
    pub payroll: String,
}

/// Google OAuth client credentials.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_path: PathBuf,
    /// Public base URL, used for OAuth redirects and links inside emails.
    pub app_url: String,
    pub organization_name: String,
    pub static_dir: Option<PathBuf>,
    pub admin_users: Vec<String>,
    pub smtp: SmtpConfig,
    pub recipients: Recipients,
    pub oauth: Option<OAuthConfig>,
    pub rollup_secret: Option<String>,
    pub session_ttl: Duration,
}

impl AppConfig {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let ip = match get("BIND_ADDR") {
            Some(raw) => raw
                .parse::<IpAddr>()
                .map_err(|_| ConfigError::InvalidValue { key: "BIND_ADDR", value: raw })?,
            None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };
        let port = parse_or("PORT", get("PORT"), DEFAULT_PORT)?;

        let smtp_username = get("SMTP_EMAIL").unwrap_or_default();
        let talent = get("TALENT_TEAM_EMAIL").unwrap_or_else(|| smtp_username.clone());

        let oauth = match (get("GOOGLE_CLIENT_ID"), get("GOOGLE_CLIENT_SECRET")) {
            (Some(client_id), Some(client_secret)) => Some(OAuthConfig {
                client_id,
                client_secret,
            }),
            _ => None,
        };

        let session_ttl = session_ttl(get("SESSION_TTL_HOURS"))?;

        Ok(Self {
            bind_addr: SocketAddr::new(ip, port),
            database_path: get("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(default_database_path),
            app_url: get("APP_URL")
                .unwrap_or_else(|| format!("http://localhost:{port}"))
                .trim_end_matches('/')
                .to_string(),
            organization_name: get("ORGANIZATION_NAME").unwrap_or_else(|| APP_NAME.to_string()),
            static_dir: get("STATIC_DIR").map(PathBuf::from),
            admin_users: get("ADMIN_USERS")
                .map(|raw| split_list(&raw))
                .unwrap_or_default(),
            smtp: SmtpConfig {
                server: get("SMTP_SERVER").unwrap_or_else(|| DEFAULT_SMTP_SERVER.to_string()),
                port: parse_or("SMTP_PORT", get("SMTP_PORT"), DEFAULT_SMTP_PORT)?,
                username: smtp_username,
                password: get("SMTP_PASSWORD"),
                from_name: get("SMTP_FROM_NAME").unwrap_or_else(|| "Talent Team".to_string()),
            },
            recipients: Recipients {
                hr: get("HR_EMAIL").unwrap_or_else(|| talent.clone()),
                cpo: get("CPO_EMAIL"),
                payroll_manager: get("PAYROLL_MANAGER_EMAIL").unwrap_or_else(|| talent.clone()),
                payroll: get("PAYROLL_EMAIL").unwrap_or_else(|| talent.clone()),
                talent,
            },
            oauth,
            rollup_secret: get("ROLLUP_SECRET"),
            session_ttl,
        })
    }

    /// OAuth redirect target registered with the identity provider.
    pub fn oauth_redirect_uri(&self) -> String {
        format!("{}/auth/callback", self.app_url)
    }

    /// Session cookies get the `Secure` attribute when served over https.
    pub fn secure_cookies(&self) -> bool {
        self.app_url.starts_with("https://")
    }
}

fn parse_or<T: std::str::FromStr>(
    key: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        None => Ok(default),
    }
}

/// Session lifetime in whole hours, between 1 and `MAX_SESSION_TTL_HOURS`.
fn session_ttl(raw: Option<String>) -> Result<Duration, ConfigError> {
    let hours = parse_or("SESSION_TTL_HOURS", raw.clone(), DEFAULT_SESSION_TTL_HOURS)?;
    (1..=MAX_SESSION_TTL_HOURS)
        .contains(&hours)
        .then(|| hours.checked_mul(3600))
        .flatten()
        .map(Duration::from_secs)
        .ok_or_else(|| ConfigError::InvalidValue {
            key: "SESSION_TTL_HOURS",
            value: raw.unwrap_or_default(),
        })
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
impl AppConfig {
    /// Baseline config for tests: in-memory friendly, one admin, no SMTP.
    pub(crate) fn for_tests() -> Self {
        let vars = [
            ("ADMIN_USERS", "admin@school.org"),
            ("SMTP_EMAIL", "talent@school.org"),
            ("HR_EMAIL", "hr@school.org"),
            ("CPO_EMAIL", "cpo@school.org"),
            ("PAYROLL_MANAGER_EMAIL", "payroll.manager@school.org"),
            ("PAYROLL_EMAIL", "payroll@school.org"),
            ("ROLLUP_SECRET", "rollup-test-secret"),
            ("DATABASE_PATH", ":memory:"),
        ];
        Self::from_lookup(|key| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        })
        .expect("test config is valid")
    }
}
