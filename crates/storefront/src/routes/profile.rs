//! Profile route handlers.

use axum::{Json, extract::State};
use serde::Deserialize;
use tracing::instrument;

use crate::backend::types::UserProfile;
use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::state::AppState;

/// Longest accepted mobile number.
const MAX_MOBILE_DIGITS: usize = 10;

/// Profile update form data.
#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    pub full_name: String,
    pub dob: String,
    pub mobile: String,
    pub email: String,
}

/// Validate a mobile number: digits only, at most ten.
fn validate_mobile(mobile: &str) -> Result<()> {
    if mobile.is_empty() {
        return Ok(());
    }

    if !mobile.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::BadRequest(
            "Mobile number may contain digits only".to_owned(),
        ));
    }

    if mobile.len() > MAX_MOBILE_DIGITS {
        return Err(AppError::BadRequest(format!(
            "Mobile number must be at most {MAX_MOBILE_DIGITS} digits"
        )));
    }

    Ok(())
}

/// Get the current user's profile.
///
/// A user who has never saved a profile gets empty fields carrying the
/// session email.
#[instrument(skip(state, user), fields(user_id = %user.0.uid))]
pub async fn show(State(state): State<AppState>, user: RequireUser) -> Result<Json<UserProfile>> {
    let RequireUser(user) = user;

    let profile = state
        .data()
        .get_profile(&user.uid)
        .await?
        .unwrap_or_else(|| UserProfile::empty_with_email(&user.email));

    Ok(Json(profile))
}

/// Update the current user's profile.
#[instrument(skip(state, user, form), fields(user_id = %user.0.uid))]
pub async fn update(
    State(state): State<AppState>,
    user: RequireUser,
    Json(form): Json<ProfileForm>,
) -> Result<Json<UserProfile>> {
    let RequireUser(user) = user;

    validate_mobile(&form.mobile)?;

    let profile = UserProfile {
        full_name: form.full_name,
        dob: form.dob,
        mobile: form.mobile,
        email: form.email,
    };

    state.data().update_profile(&user.uid, &profile).await?;

    Ok(Json(profile))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_mobiles() {
        assert!(validate_mobile("").is_ok());
        assert!(validate_mobile("9876543210").is_ok());
        assert!(validate_mobile("98765").is_ok());
    }

    #[test]
    fn test_mobile_rejects_non_digits() {
        assert!(validate_mobile("98765-4321").is_err());
        assert!(validate_mobile("+919876543210").is_err());
        assert!(validate_mobile("abc").is_err());
    }

    #[test]
    fn test_mobile_rejects_more_than_ten_digits() {
        assert!(validate_mobile("98765432101").is_err());
    }
}
