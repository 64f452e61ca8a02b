pub mod api;
pub mod authorization;
pub mod config;
pub mod core_state;
pub mod db;
pub mod lifecycle; // Status transitions, derived dates, bonus amounts
pub mod models;
pub mod notify;
pub mod oauth;
pub mod reports;
pub mod rollup; // Weekly digest
pub mod sessions;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::api::ServerError;
use crate::config::{AppConfig, ConfigError};
use crate::core_state::CoreState;
use crate::db::DatabaseError;
use crate::notify::NotificationError;
use crate::oauth::{GoogleOAuth, OAuthError};

/// Anything that can stop the service from coming up.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Mailer error: {0}")]
    Mailer(#[from] NotificationError),
    #[error("OAuth error: {0}")]
    OAuth(#[from] OAuthError),
    #[error("Runtime error: {0}")]
    Runtime(#[from] std::io::Error),
    #[error(transparent)]
    Server(#[from] ServerError),
}

pub fn run() -> Result<(), StartupError> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = AppConfig::from_env()?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(start(config))
}

async fn start(config: AppConfig) -> Result<(), StartupError> {
    let conn = db::open_database(&config.database_path)?;
    tracing::info!(path = %config.database_path.display(), "Referral store opened");

    if config.admin_users.is_empty() {
        tracing::warn!("ADMIN_USERS is empty; nobody can use the admin dashboard");
    }
    if config.rollup_secret.is_none() {
        tracing::info!("ROLLUP_SECRET not set; weekly rollup accepts scheduler header only");
    }

    let mailer = notify::mailer_from_config(&config.smtp)?;
    let oauth = match &config.oauth {
        Some(oauth_config) => Some(GoogleOAuth::new(
            oauth_config,
            config.oauth_redirect_uri(),
        )?),
        None => {
            tracing::warn!("Google OAuth not configured; admin sign-in is disabled");
            None
        }
    };

    let addr = config.bind_addr;
    let core = Arc::new(CoreState::new(config, conn, mailer, oauth));
    api::serve(core, addr).await?;
    Ok(())
}
