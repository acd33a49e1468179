//! Registration, login, and session lifecycle.
//!
//! Registration posts credentials as JSON; the token endpoint instead takes
//! an URL-encoded form and answers with an access token, which is persisted
//! through the injected session store. State is derived from the store on
//! every call: whoever holds a token is considered authenticated, without
//! revalidating it against the server. A 401 arriving later does not clear
//! the stored token; the user is told to log in again instead.

use crate::core_types::StatusMessage;
use crate::errors::ClientError;
use crate::http::ApiClient;
use crate::session::SessionStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Authenticated,
    Unauthenticated,
}

#[derive(Debug, Serialize)]
struct CredentialsPayload<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    #[allow(dead_code)]
    token_type: Option<String>,
}

pub struct AuthManager {
    api: ApiClient,
    session: Arc<dyn SessionStore>,
}

impl AuthManager {
    pub fn new(api: ApiClient, session: Arc<dyn SessionStore>) -> Self {
        Self { api, session }
    }

    pub fn state(&self) -> AuthState {
        if self.session.token().is_some() {
            AuthState::Authenticated
        } else {
            AuthState::Unauthenticated
        }
    }

    /// Create an account. Success does not log the user in; a login call
    /// must follow.
    pub async fn register(&self, username: &str, password: &str) -> StatusMessage {
        if let Err(err) = validate_credentials(username, password) {
            return StatusMessage::failure("Registration failed", &err);
        }

        let payload = CredentialsPayload { username, password };
        match self
            .api
            .post_json::<_, serde_json::Value>("/register", &payload)
            .await
        {
            Ok(_) => StatusMessage::success("Registration successful. You can now log in."),
            Err(err) => {
                log::error!("Registration failed for '{}': {}", username, err);
                StatusMessage::failure("Registration failed", &err)
            }
        }
    }

    /// Exchange credentials for an access token and persist it. On failure
    /// the session stays unauthenticated.
    pub async fn login(&self, username: &str, password: &str) -> StatusMessage {
        if let Err(err) = validate_credentials(username, password) {
            return StatusMessage::failure("Login failed", &err);
        }

        let fields = [("username", username), ("password", password)];
        let token = match self.api.post_form::<TokenResponse>("/token", &fields).await {
            Ok(token) if token.access_token.trim().is_empty() => {
                let err = ClientError::ParsingError(
                    "Token endpoint returned an empty access token".to_string(),
                );
                log::error!("Login failed for '{}': {}", username, err);
                return StatusMessage::failure("Login failed", &err);
            }
            Ok(token) => token,
            Err(err) => {
                log::error!("Login failed for '{}': {}", username, err);
                return StatusMessage::failure("Login failed", &err);
            }
        };

        match self.session.set_token(&token.access_token) {
            Ok(()) => StatusMessage::success(format!("Logged in as {}.", username)),
            Err(err) => {
                log::error!("Could not persist access token: {}", err);
                StatusMessage::failure("Login failed", &err)
            }
        }
    }

    /// Drop the persisted token. Purely local, no network call.
    pub fn logout(&self) -> StatusMessage {
        match self.session.clear() {
            Ok(()) => StatusMessage::success("Logged out."),
            Err(err) => {
                log::error!("Could not clear access token: {}", err);
                StatusMessage::failure("Logout failed", &err)
            }
        }
    }
}

fn validate_credentials(username: &str, password: &str) -> Result<(), ClientError> {
    if username.trim().is_empty() {
        return Err(ClientError::ValidationError(
            "The username cannot be empty.".to_string(),
        ));
    }
    if password.is_empty() {
        return Err(ClientError::ValidationError(
            "The password cannot be empty.".to_string(),
        ));
    }
    Ok(())
}
