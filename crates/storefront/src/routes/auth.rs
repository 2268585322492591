//! Authentication route handlers.
//!
//! Credentials never touch this service: registration, login, and password
//! reset are delegated to the hosted identity service. On success the session
//! records the uid and email, and registration writes the user's role
//! document to the store.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_sessions::Session;
use tracing::instrument;

use novakart_core::Email;

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{OptionalUser, clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::services::IdentityError;
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Password reset form data.
#[derive(Debug, Deserialize)]
pub struct ResetForm {
    pub email: String,
}

/// The session user, as returned to the client.
#[derive(Debug, Serialize)]
pub struct SessionUser {
    pub uid: novakart_core::UserId,
    pub email: String,
}

impl From<CurrentUser> for SessionUser {
    fn from(user: CurrentUser) -> Self {
        Self {
            uid: user.uid,
            email: user.email,
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Register a new account.
#[instrument(skip(state, session, form))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<RegisterForm>,
) -> Result<impl IntoResponse> {
    let email =
        Email::parse(&form.email).map_err(|e| AppError::BadRequest(e.to_string()))?;

    if form.password != form.confirm_password {
        return Err(AppError::BadRequest("Passwords don't match!".to_owned()));
    }

    let auth = state
        .identity()
        .sign_up(email.as_str(), &form.password)
        .await?;

    // The role document is what marks the account as a storefront user
    state
        .data()
        .create_profile(&auth.uid, &auth.email, Utc::now())
        .await?;

    let user = CurrentUser {
        uid: auth.uid,
        email: auth.email,
    };

    if let Err(e) = set_current_user(&session, &user).await {
        tracing::error!(error = %e, "failed to persist session after registration");
        return Err(AppError::Internal("session error".to_owned()));
    }
    set_sentry_user(&user.uid, Some(&user.email));

    Ok((StatusCode::CREATED, Json(SessionUser::from(user))))
}

/// Log in with email and password.
#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<LoginForm>,
) -> Result<Json<SessionUser>> {
    let email =
        Email::parse(&form.email).map_err(|e| AppError::BadRequest(e.to_string()))?;

    let auth = state
        .identity()
        .sign_in(email.as_str(), &form.password)
        .await?;

    // An account without a role document cannot use the storefront
    if state.data().get_profile(&auth.uid).await?.is_none() {
        return Err(AppError::Identity(IdentityError::RoleNotFound));
    }

    let user = CurrentUser {
        uid: auth.uid,
        email: auth.email,
    };

    if let Err(e) = set_current_user(&session, &user).await {
        tracing::error!(error = %e, "failed to persist session after login");
        return Err(AppError::Internal("session error".to_owned()));
    }
    set_sentry_user(&user.uid, Some(&user.email));

    Ok(Json(SessionUser::from(user)))
}

/// Log out the current user.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<Json<serde_json::Value>> {
    if let Err(e) = clear_current_user(&session).await {
        tracing::error!(error = %e, "failed to clear session on logout");
    }
    clear_sentry_user();

    Ok(Json(json!({ "message": "Logged out" })))
}

/// Send a password reset email.
#[instrument(skip(state, form))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(form): Json<ResetForm>,
) -> Result<Json<serde_json::Value>> {
    let email =
        Email::parse(&form.email).map_err(|e| AppError::BadRequest(e.to_string()))?;

    state.identity().send_password_reset(email.as_str()).await?;

    Ok(Json(json!({ "message": "Password reset email sent" })))
}

/// Who is logged in, if anyone.
#[instrument(skip(user))]
pub async fn me(OptionalUser(user): OptionalUser) -> Json<serde_json::Value> {
    match user {
        Some(user) => Json(json!({ "user": SessionUser::from(user) })),
        None => Json(json!({ "user": null })),
    }
}
