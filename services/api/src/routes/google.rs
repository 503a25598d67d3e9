//! Google sign-in handlers
//!
//! Both ends of the flow land the browser back on the frontend: with a
//! `token` query parameter on success, or an `error` code it can render on
//! any failure.

use axum::{
    extract::{Query, State},
    response::Redirect,
};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    error::ApiError,
    models::user::NewUser,
    oauth::{GoogleOAuthClient, GoogleProfile, generate_state_token},
    state::AppState,
    validation,
};

/// Query parameters Google appends to the callback redirect
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

fn client(state: &AppState) -> Result<&GoogleOAuthClient, ApiError> {
    state
        .oauth_client
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("Google sign-in is not configured").into())
}

fn frontend_error(state: &AppState, code: &str) -> Redirect {
    Redirect::temporary(&format!("{}?error={code}", state.frontend_url))
}

/// Start the flow: persist a one-time state token and send the browser to
/// the Google consent screen
pub async fn google_login(State(state): State<AppState>) -> Result<Redirect, ApiError> {
    let oauth = client(&state)?;

    let state_token = generate_state_token();
    state.oauth_states.insert_state(&state_token).await?;

    Ok(Redirect::temporary(&oauth.authorize_url(state_token)))
}

/// Finish the flow: verify the state token, exchange the code, and sign the
/// Google account in, creating a local account on first sign-in
pub async fn google_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Redirect, ApiError> {
    let oauth = client(&state)?;

    if let Some(error) = query.error {
        warn!("Google sign-in denied: {}", error);
        return Ok(frontend_error(&state, "auth_failed"));
    }
    let (Some(code), Some(state_token)) = (query.code, query.state) else {
        return Ok(frontend_error(&state, "auth_failed"));
    };

    if !state.oauth_states.consume_state(&state_token).await? {
        warn!("Google sign-in rejected: unknown or expired state token");
        return Ok(frontend_error(&state, "state_mismatch"));
    }

    let access_token = match oauth.exchange_code(code).await {
        Ok(token) => token,
        Err(e) => {
            warn!("Google token exchange failed: {:#}", e);
            return Ok(frontend_error(&state, "token_error"));
        }
    };

    let profile = match oauth.fetch_profile(&access_token).await {
        Ok(profile) => profile,
        Err(e) => {
            warn!("Google profile fetch failed: {:#}", e);
            return Ok(frontend_error(&state, "network_error"));
        }
    };

    let email = validation::normalize_email(&profile.email);

    let user = match state
        .users
        .find_by_email_or_google_id(&email, &profile.id)
        .await?
    {
        Some(user) => {
            // First Google sign-in on an account created with a password
            if user.google_id.is_none() {
                state.users.attach_google_id(user.id, &profile.id).await?;
            }
            user
        }
        None => {
            let base = derive_username_base(&email);
            let user = match state
                .users
                .create(&new_google_user(&email, &profile, base.clone()))
                .await
            {
                Ok(user) => user,
                // Someone already owns the email-derived name
                Err(ApiError::Validation(msg)) if msg.contains("username") => {
                    let retry = format!("{base}.{}", random_suffix());
                    state
                        .users
                        .create(&new_google_user(&email, &profile, retry))
                        .await?
                }
                Err(e) => return Err(e),
            };
            info!("Account created via Google sign-in: {}", user.username);
            user
        }
    };

    let token = state.jwt.issue_token(user.id, &user.role)?;

    Ok(Redirect::temporary(&format!(
        "{}?token={token}",
        state.frontend_url
    )))
}

/// Derive a valid username from the email local part
fn derive_username_base(email: &str) -> String {
    let local_part: String = email
        .split('@')
        .next()
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '.')
        .take(20)
        .collect();

    if local_part.len() < 3 {
        "user".to_string()
    } else {
        local_part
    }
}

fn random_suffix() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect::<String>()
        .to_lowercase()
}

/// Build a local account for a first-time Google sign-in
///
/// The password is random and never disclosed, so the account is usable
/// through Google only until a password reset.
fn new_google_user(email: &str, profile: &GoogleProfile, username: String) -> NewUser {
    let password: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect();

    let full_name = profile
        .name
        .clone()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| username.clone());

    NewUser {
        full_name,
        email: email.to_string(),
        username,
        password,
        role: "user".to_string(),
        status: None,
        image: None,
        google_id: Some(profile.id.clone()),
    }
}
