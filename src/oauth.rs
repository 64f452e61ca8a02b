//! Google sign-in (OAuth 2.0 authorization code flow).
//!
//! Only identity is requested (`openid email profile`); the access token is
//! used once to read the userinfo endpoint and then dropped.

use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;

use crate::config::OAuthConfig;
use crate::sessions::SessionUser;

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";
const SCOPES: &str = "openid email profile";
const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    #[error("HTTP client error: {0}")]
    HttpClient(String),
    #[error("Identity provider returned {status}: {body}")]
    Provider { status: u16, body: String },
    #[error("Response parsing error: {0}")]
    ResponseParsing(String),
    #[error("Identity has no verified email")]
    UnverifiedEmail,
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct UserInfo {
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    name: Option<String>,
    picture: Option<String>,
}

pub struct GoogleOAuth {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    client: reqwest::Client,
}

impl GoogleOAuth {
    pub fn new(config: &OAuthConfig, redirect_uri: String) -> Result<Self, OAuthError> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| OAuthError::HttpClient(e.to_string()))?;

        Ok(Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri,
            client,
        })
    }

    /// Where to send the browser to start sign-in.
    pub fn authorize_url(&self, state: &str) -> Result<String, OAuthError> {
        let url = Url::parse_with_params(
            AUTHORIZE_URL,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", SCOPES),
                ("state", state),
                ("prompt", "select_account"),
            ],
        )
        .map_err(|e| OAuthError::InvalidUrl(e.to_string()))?;
        Ok(url.into())
    }

    /// Trade the callback `code` for the signed-in user's identity.
    pub async fn exchange_code(&self, code: &str) -> Result<SessionUser, OAuthError> {
        let response = self
            .client
            .post(TOKEN_URL)
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| OAuthError::HttpClient(e.to_string()))?;
        let token: TokenResponse = parse_json(response).await?;

        let response = self
            .client
            .get(USERINFO_URL)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(|e| OAuthError::HttpClient(e.to_string()))?;
        let info: UserInfo = parse_json(response).await?;

        user_from_info(info)
    }
}

async fn parse_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, OAuthError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(OAuthError::Provider {
            status: status.as_u16(),
            body,
        });
    }
    response
        .json()
        .await
        .map_err(|e| OAuthError::ResponseParsing(e.to_string()))
}

fn user_from_info(info: UserInfo) -> Result<SessionUser, OAuthError> {
    let email = match info.email {
        Some(email) if info.email_verified && !email.trim().is_empty() => email,
        _ => return Err(OAuthError::UnverifiedEmail),
    };
    Ok(SessionUser {
        name: info.name.unwrap_or_else(|| email.clone()),
        email,
        picture: info.picture,
    })
}
