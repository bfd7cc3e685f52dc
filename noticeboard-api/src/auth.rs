//! Notice board authentication
//!
//! Signs up and signs in against the server, and moves the token to and
//! from the key store.
//!
//! # Authentication methods
//!
//! - [sign_up](NoticeClient::sign_up) - create an account
//! - [sign_in](NoticeClient::sign_in) - exchange email and password for a token
//! - [sign_out](NoticeClient::sign_out) - discard the token
//! - [auth_status](NoticeClient::auth_status) - report endpoint and token state
//!
//! # Token methods
//!
//! - [set_token](NoticeClient::set_token)
//! - [load_token](NoticeClient::load_token)
//! - [get_key_store](NoticeClient::get_key_store)

use std::{fmt, path::PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::{Result, config::NOTICEBOARD_TOKEN_ENV, prelude::*};

/// Body of `POST /signup`
#[derive(Clone, Serialize)]
pub struct SignUpRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl SignUpRequest {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for SignUpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignUpRequest")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"MASKED")
            .finish()
    }
}

/// Body of `POST /signin`
#[derive(Clone, Serialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

impl SignInRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for SignInRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignInRequest")
            .field("email", &self.email)
            .field("password", &"MASKED")
            .finish()
    }
}

/// Response from `/signup` and `/signin`
#[derive(Clone, Deserialize, Serialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing)]
    pub token: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    /// user record, as sent by the server
    #[serde(default)]
    pub user: Option<Value>,
}

impl fmt::Debug for AuthResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthResponse")
            .field("success", &self.success)
            .field("token", &self.token.as_ref().map(|_| "MASKED"))
            .field("message", &self.message)
            .field("user", &self.user)
            .finish()
    }
}

impl AuthResponse {
    // success:false becomes an Auth error carrying the server's message
    fn check(self, fallback: &str) -> Result<Self> {
        if self.success {
            Ok(self)
        } else {
            Err(NoticeError::Auth {
                message: self.message.unwrap_or_else(|| fallback.to_string()),
            })
        }
    }
}

/// Status response from auth_status()
#[derive(Clone, Debug, Serialize)]
pub struct AuthStatus {
    pub url: String,
    pub has_token: bool,
    /// token file, if a keystore is configured
    pub keystore: Option<PathBuf>,
}

impl AuthStatus {
    /// Returns true if the client has a token.
    /// The server decides whether it is still valid.
    pub fn is_authenticated(&self) -> bool {
        self.has_token
    }
}

impl NoticeClient {
    /// Creates an account.
    ///
    /// The server does not sign the new user in; call `sign_in` afterwards.
    pub async fn sign_up(&self, request: SignUpRequest) -> Result<AuthResponse> {
        debug!(email = %request.email, "sign up");
        let response: AuthResponse = self
            .client
            .post_unauthenticated("/signup", &request)
            .await?;
        response.check("Sign up failed")
    }

    /// Signs in and stores the returned token.
    ///
    /// The token is set on this client, and saved to the keystore when one is configured.
    pub async fn sign_in(&self, request: SignInRequest) -> Result<AuthResponse> {
        debug!(email = %request.email, "sign in");
        let response: AuthResponse = self
            .client
            .post_unauthenticated("/signin", &request)
            .await?;
        let response = response.check("Sign in failed")?;
        let token = response
            .token
            .as_deref()
            .filter(|token| !token.is_empty())
            .ok_or_else(|| NoticeError::Auth {
                message: "server did not return a token".to_string(),
            })?;
        let creds = Credentials::new(token);
        if let Some(keystore) = self.keystore.as_ref() {
            keystore.update_credentials(&creds)?;
        }
        self.client.set_token(creds);
        info!(email = %request.email, "signed in");
        Ok(response)
    }

    /// Clears the client token and removes it from the keystore.
    pub fn sign_out(&self) -> Result<()> {
        self.client.clear_token();
        if let Some(keystore) = self.keystore.as_ref() {
            keystore.clear_credentials()?;
        }
        Ok(())
    }

    /// Sets the token in memory for authenticated requests. It is not persisted.
    pub fn set_token(&self, creds: Credentials) {
        self.client.set_token(creds);
    }

    /// Loads a token from `NOTICEBOARD_TOKEN`, or else from the keystore.
    /// Returns true if a token was found.
    pub fn load_token(&self) -> Result<bool> {
        if let Ok(token) = std::env::var(NOTICEBOARD_TOKEN_ENV)
            && !token.trim().is_empty()
        {
            debug!("using token from {NOTICEBOARD_TOKEN_ENV}");
            self.client.set_token(Credentials::new(token.trim()));
            return Ok(true);
        }
        let Some(keystore) = self.keystore.as_ref() else {
            return Ok(false);
        };
        let creds = keystore.get_credentials()?;
        if !creds.has_creds() {
            return Ok(false);
        }
        self.client.set_token(creds);
        Ok(true)
    }

    /// Returns true if the client has a token.
    pub fn has_token(&self) -> bool {
        self.client.has_token()
    }

    /// Returns the configured keystore, if any.
    pub fn get_key_store(&self) -> Option<&KeyStore> {
        self.keystore.as_ref()
    }

    /// Returns endpoint and token status
    pub fn auth_status(&self) -> AuthStatus {
        AuthStatus {
            url: self.config.base_url.clone(),
            has_token: self.client.has_token(),
            keystore: self.keystore.as_ref().map(|ks| ks.path().to_path_buf()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_bodies() {
        let body = serde_json::to_value(SignUpRequest::new("Ada", "ada@example.edu", "pw"))
            .expect("serialize");
        assert_eq!(
            body,
            serde_json::json!({"name": "Ada", "email": "ada@example.edu", "password": "pw"})
        );
        let body = serde_json::to_value(SignInRequest::new("ada@example.edu", "pw"))
            .expect("serialize");
        assert_eq!(
            body,
            serde_json::json!({"email": "ada@example.edu", "password": "pw"})
        );
    }

    #[test]
    fn test_debug_hides_secrets() {
        let shown = format!("{:?}", SignInRequest::new("a@b.c", "hunter2"));
        assert!(!shown.contains("hunter2"));
        let resp: AuthResponse =
            serde_json::from_str(r#"{"success":true,"token":"tok-abc"}"#).expect("parse");
        assert!(!format!("{resp:?}").contains("tok-abc"));
    }

    #[test]
    fn test_failed_response_is_auth_error() {
        let resp: AuthResponse =
            serde_json::from_str(r#"{"success":false,"message":"User already exists"}"#)
                .expect("parse");
        match resp.check("Sign up failed") {
            Err(NoticeError::Auth { message }) => assert_eq!(message, "User already exists"),
            other => panic!("unexpected {other:?}"),
        }
        let resp: AuthResponse = serde_json::from_str("{}").expect("parse");
        assert!(matches!(
            resp.check("Sign in failed"),
            Err(NoticeError::Auth { message }) if message == "Sign in failed"
        ));
    }
}
