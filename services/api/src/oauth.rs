//! Google OAuth 2.0 sign-in
//!
//! The state token issued at the start of the flow is persisted server-side
//! and consumed exactly once at the callback, so a replayed or forged state
//! is rejected even across process restarts.

use std::env;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Duration, Utc};
use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, RedirectUrl, Scope,
    TokenResponse, TokenUrl,
};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::Deserialize;
use sqlx::{PgPool, Row};
use tracing::info;

use crate::error::ApiError;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// State tokens older than this are treated as expired at the callback.
const STATE_TTL_MINUTES: i64 = 10;

/// Google OAuth credentials, read from the environment
#[derive(Debug, Clone)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
}

impl GoogleOAuthConfig {
    /// Load the Google credentials, or `None` when sign-in with Google is
    /// not configured for this deployment
    pub fn from_env() -> Option<Self> {
        let client_id = env::var("GOOGLE_CLIENT_ID").ok()?;
        let client_secret = env::var("GOOGLE_CLIENT_SECRET").ok()?;
        let redirect_url = env::var("GOOGLE_REDIRECT_URL").ok()?;

        Some(Self {
            client_id,
            client_secret,
            redirect_url,
        })
    }
}

/// The subset of the Google userinfo response we consume
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleProfile {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    #[serde(default)]
    pub verified_email: bool,
}

/// Client for the Google authorization-code flow
#[derive(Clone)]
pub struct GoogleOAuthClient {
    client: BasicClient,
    http: reqwest::Client,
}

impl GoogleOAuthClient {
    /// Build the client from loaded credentials
    pub fn new(config: &GoogleOAuthConfig) -> Result<Self> {
        let client = BasicClient::new(
            ClientId::new(config.client_id.clone()),
            Some(ClientSecret::new(config.client_secret.clone())),
            AuthUrl::new(GOOGLE_AUTH_URL.to_string()).context("Invalid Google auth URL")?,
            Some(TokenUrl::new(GOOGLE_TOKEN_URL.to_string()).context("Invalid Google token URL")?),
        )
        .set_redirect_uri(
            RedirectUrl::new(config.redirect_url.clone()).context("Invalid redirect URL")?,
        );

        Ok(Self {
            client,
            http: reqwest::Client::new(),
        })
    }

    /// Build the Google consent-screen URL carrying the supplied state token
    pub fn authorize_url(&self, state: String) -> String {
        let (url, _csrf) = self
            .client
            .authorize_url(|| CsrfToken::new(state))
            .add_scope(Scope::new("openid".to_string()))
            .add_scope(Scope::new("email".to_string()))
            .add_scope(Scope::new("profile".to_string()))
            .url();

        url.to_string()
    }

    /// Exchange the authorization code for an access token
    pub async fn exchange_code(&self, code: String) -> Result<String> {
        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code))
            .request_async(oauth2::reqwest::async_http_client)
            .await
            .map_err(|e| anyhow!("Token exchange failed: {e}"))?;

        Ok(token.access_token().secret().clone())
    }

    /// Fetch the signed-in user's profile with the access token
    pub async fn fetch_profile(&self, access_token: &str) -> Result<GoogleProfile> {
        let profile = self
            .http
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(access_token)
            .send()
            .await
            .context("Userinfo request failed")?
            .error_for_status()
            .context("Userinfo request rejected")?
            .json::<GoogleProfile>()
            .await
            .context("Userinfo response was not valid JSON")?;

        Ok(profile)
    }
}

/// Generate an unguessable state token for one sign-in attempt
pub fn generate_state_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

/// Server-side store of pending OAuth state tokens
#[derive(Clone)]
pub struct OAuthStateStore {
    pool: PgPool,
}

impl OAuthStateStore {
    /// Create a new state store
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Persist a freshly issued state token
    pub async fn insert_state(&self, state: &str) -> Result<(), ApiError> {
        let expires_at = Utc::now() + Duration::minutes(STATE_TTL_MINUTES);

        sqlx::query("INSERT INTO oauth_states (state_token, expires_at) VALUES ($1, $2)")
            .bind(state)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;

        info!("Issued OAuth state token");
        Ok(())
    }

    /// Consume a state token; returns true only when the token existed and
    /// had not expired. The DELETE makes consumption single-use.
    pub async fn consume_state(&self, state: &str) -> Result<bool, ApiError> {
        let row = sqlx::query("DELETE FROM oauth_states WHERE state_token = $1 RETURNING expires_at")
            .bind(state)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(false);
        };
        let expires_at: DateTime<Utc> = row.get("expires_at");

        Ok(expires_at > Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn test_config() -> GoogleOAuthConfig {
        GoogleOAuthConfig {
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            redirect_url: "http://localhost:9000/auth/google/callback".to_string(),
        }
    }

    #[test]
    fn test_generate_state_token_shape() {
        let token = generate_state_token();
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generate_state_token_unique() {
        assert_ne!(generate_state_token(), generate_state_token());
    }

    #[test]
    fn test_authorize_url_carries_state_and_scopes() {
        let client = GoogleOAuthClient::new(&test_config()).unwrap();
        let url = client.authorize_url("my-state-token".to_string());

        assert!(url.starts_with(GOOGLE_AUTH_URL));
        assert!(url.contains("state=my-state-token"));
        assert!(url.contains("client_id=client-id"));
        assert!(url.contains("scope=openid+email+profile"));
    }

    #[test]
    #[serial]
    fn test_config_absent_when_unset() {
        unsafe {
            std::env::remove_var("GOOGLE_CLIENT_ID");
            std::env::remove_var("GOOGLE_CLIENT_SECRET");
            std::env::remove_var("GOOGLE_REDIRECT_URL");
        }
        assert!(GoogleOAuthConfig::from_env().is_none());
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        unsafe {
            std::env::set_var("GOOGLE_CLIENT_ID", "id");
            std::env::set_var("GOOGLE_CLIENT_SECRET", "secret");
            std::env::set_var("GOOGLE_REDIRECT_URL", "http://localhost/cb");
        }
        let config = GoogleOAuthConfig::from_env().unwrap();
        assert_eq!(config.client_id, "id");
        assert_eq!(config.client_secret, "secret");
        assert_eq!(config.redirect_url, "http://localhost/cb");
        unsafe {
            std::env::remove_var("GOOGLE_CLIENT_ID");
            std::env::remove_var("GOOGLE_CLIENT_SECRET");
            std::env::remove_var("GOOGLE_REDIRECT_URL");
        }
    }

    #[test]
    fn test_profile_deserializes_without_name() {
        let profile: GoogleProfile =
            serde_json::from_str(r#"{"id":"123","email":"a@b.com"}"#).unwrap();
        assert_eq!(profile.id, "123");
        assert!(profile.name.is_none());
        assert!(!profile.verified_email);
    }
}
