//! Hosted identity service client.
//!
//! The storefront does not store credentials; sign-up, sign-in, and password
//! reset are delegated to the hosted identity service's REST API. The service
//! returns an opaque uid and tokens, and reports failures as coded strings
//! which are mapped onto [`IdentityError`] here.

use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::instrument;

use novakart_core::UserId;

use crate::config::IdentityConfig;

/// Errors that can occur when interacting with the identity service.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// An account with this email already exists.
    #[error("email already registered")]
    EmailExists,

    /// The email/password combination is wrong, or the account is missing.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The password does not meet the service's strength requirements.
    #[error("weak password: {0}")]
    WeakPassword(String),

    /// The account exists but has no storefront role document.
    #[error("user role not found")]
    RoleNotFound,

    /// The service returned an error this client does not recognize.
    #[error("identity service error: {0}")]
    Service(String),
}

/// A signed-in identity as returned by the service.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
    /// The service-assigned uid, used as the document key everywhere.
    #[serde(rename = "localId")]
    pub uid: UserId,
    /// The account email.
    pub email: String,
    /// Short-lived bearer token for the session.
    pub id_token: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Client for the hosted identity service.
#[derive(Clone)]
pub struct IdentityClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl IdentityClient {
    /// Create a new identity service client.
    #[must_use]
    pub fn new(config: &IdentityConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.expose_secret().to_owned(),
        }
    }

    async fn call(
        &self,
        endpoint: &str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, IdentityError> {
        let url = format!("{}/v1/accounts:{endpoint}", self.base_url);

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(response.json().await?);
        }

        // The service encodes failures as coded strings in the error body
        let code = response
            .json::<ErrorBody>()
            .await
            .map(|b| b.error.message)
            .unwrap_or_else(|_| "UNKNOWN".to_owned());

        Err(map_error_code(&code))
    }

    /// Create a new account with email and password.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::EmailExists` if the email is taken,
    /// `IdentityError::WeakPassword` if the password is rejected, or an error
    /// if the request fails.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthenticatedUser, IdentityError> {
        let data = self
            .call(
                "signUp",
                json!({
                    "email": email,
                    "password": password,
                    "returnSecureToken": true,
                }),
            )
            .await?;

        serde_json::from_value(data).map_err(|e| IdentityError::Service(e.to_string()))
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::InvalidCredentials` if the combination is
    /// wrong, or an error if the request fails.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthenticatedUser, IdentityError> {
        let data = self
            .call(
                "signInWithPassword",
                json!({
                    "email": email,
                    "password": password,
                    "returnSecureToken": true,
                }),
            )
            .await?;

        serde_json::from_value(data).map_err(|e| IdentityError::Service(e.to_string()))
    }

    /// Ask the service to send a password-reset email.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails. An unknown email is reported by
    /// the service as invalid credentials.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn send_password_reset(&self, email: &str) -> Result<(), IdentityError> {
        self.call(
            "sendOobCode",
            json!({
                "requestType": "PASSWORD_RESET",
                "email": email,
            }),
        )
        .await?;

        Ok(())
    }
}

/// Map the service's coded error strings onto typed errors.
fn map_error_code(code: &str) -> IdentityError {
    // Codes may carry a suffix, e.g. "WEAK_PASSWORD : Password should be ..."
    let (head, detail) = match code.split_once(':') {
        Some((head, detail)) => (head.trim(), detail.trim()),
        None => (code.trim(), ""),
    };

    match head {
        "EMAIL_EXISTS" => IdentityError::EmailExists,
        "INVALID_LOGIN_CREDENTIALS" | "INVALID_PASSWORD" | "EMAIL_NOT_FOUND" | "USER_DISABLED" => {
            IdentityError::InvalidCredentials
        }
        "WEAK_PASSWORD" => IdentityError::WeakPassword(if detail.is_empty() {
            "password is too weak".to_owned()
        } else {
            detail.to_owned()
        }),
        other => IdentityError::Service(other.to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_email_exists() {
        assert!(matches!(
            map_error_code("EMAIL_EXISTS"),
            IdentityError::EmailExists
        ));
    }

    #[test]
    fn test_map_credential_codes() {
        for code in ["INVALID_LOGIN_CREDENTIALS", "EMAIL_NOT_FOUND", "INVALID_PASSWORD"] {
            assert!(matches!(
                map_error_code(code),
                IdentityError::InvalidCredentials
            ));
        }
    }

    #[test]
    fn test_map_weak_password_carries_detail() {
        let err = map_error_code("WEAK_PASSWORD : Password should be at least 6 characters");
        match err {
            IdentityError::WeakPassword(msg) => {
                assert_eq!(msg, "Password should be at least 6 characters");
            }
            other => panic!("expected WeakPassword, got {other:?}"),
        }
    }

    #[test]
    fn test_map_unknown_code() {
        assert!(matches!(
            map_error_code("TOO_MANY_ATTEMPTS_TRY_LATER"),
            IdentityError::Service(_)
        ));
    }
}
