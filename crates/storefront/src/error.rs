//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//! Remote failures surface as transient JSON notifications; nothing upstream
//! is retried.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::backend::BackendError;
use crate::services::{CheckoutError, IdentityError};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Document store operation failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Identity service operation failed.
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    /// Payment gateway operation failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User is authenticated but not allowed to do this.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether this error is a server-side fault worth reporting.
    fn is_server_error(&self) -> bool {
        match self {
            Self::Internal(_) => true,
            Self::Backend(err) => {
                !matches!(err, BackendError::NotFound(_) | BackendError::Conflict(_))
            }
            Self::Identity(err) => {
                matches!(err, IdentityError::Http(_) | IdentityError::Service(_))
            }
            Self::Checkout(err) => !matches!(err, CheckoutError::InvalidSignature),
            _ => false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Backend(err) => match err {
                BackendError::NotFound(_) => StatusCode::NOT_FOUND,
                BackendError::Conflict(_) => StatusCode::CONFLICT,
                _ => StatusCode::BAD_GATEWAY,
            },
            Self::Identity(err) => match err {
                IdentityError::EmailExists => StatusCode::CONFLICT,
                IdentityError::InvalidCredentials | IdentityError::RoleNotFound => {
                    StatusCode::UNAUTHORIZED
                }
                IdentityError::WeakPassword(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::BAD_GATEWAY,
            },
            Self::Checkout(err) => match err {
                CheckoutError::InvalidSignature => StatusCode::BAD_REQUEST,
                _ => StatusCode::BAD_GATEWAY,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Internal(_) => "Internal server error".to_string(),
            Self::Backend(err) => match err {
                BackendError::NotFound(_) => "Not found".to_string(),
                BackendError::Conflict(msg) => msg.clone(),
                _ => "External service error".to_string(),
            },
            Self::Identity(err) => match err {
                IdentityError::EmailExists => {
                    "An account with this email already exists".to_string()
                }
                IdentityError::InvalidCredentials => "Invalid credentials".to_string(),
                IdentityError::RoleNotFound => "User role not found".to_string(),
                IdentityError::WeakPassword(msg) => msg.clone(),
                _ => "Authentication service error".to_string(),
            },
            Self::Checkout(err) => match err {
                CheckoutError::InvalidSignature => "Payment verification failed".to_string(),
                _ => "Payment service error".to_string(),
            },
            _ => self.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product p-123".to_string());
        assert_eq!(err.to_string(), "Not found: product p-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(get_status(AppError::RateLimited), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_cart_conflict_maps_to_409() {
        let err = AppError::Backend(BackendError::Conflict("product already in cart".to_string()));
        assert_eq!(get_status(err), StatusCode::CONFLICT);
    }

    #[test]
    fn test_missing_document_maps_to_404() {
        let err = AppError::Backend(BackendError::NotFound("products/p-9".to_string()));
        assert_eq!(get_status(err), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_identity_errors_map_to_client_statuses() {
        assert_eq!(
            get_status(AppError::Identity(IdentityError::EmailExists)),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Identity(IdentityError::InvalidCredentials)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Identity(IdentityError::WeakPassword(
                "too short".to_string()
            ))),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_invalid_signature_maps_to_400() {
        let err = AppError::Checkout(CheckoutError::InvalidSignature);
        assert_eq!(get_status(err), StatusCode::BAD_REQUEST);
    }
}
