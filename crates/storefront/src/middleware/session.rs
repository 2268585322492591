//! Session middleware configuration.
//!
//! Sets up signed cookie sessions using tower-sessions. The store is
//! in-memory: the hosted document store owns all durable state, so sessions
//! only carry the logged-in identity and may be dropped on restart.

use secrecy::ExposeSecret;
use tower_sessions::cookie::Key;
use tower_sessions::service::SignedCookie;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "nk_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Create the session layer with an in-memory store and signed cookies.
///
/// # Arguments
///
/// * `config` - Storefront configuration (for the session secret)
#[must_use]
pub fn create_session_layer(
    config: &StorefrontConfig,
) -> SessionManagerLayer<MemoryStore, SignedCookie> {
    let store = MemoryStore::default();

    // Config validation guarantees the secret is at least 32 bytes
    let key = Key::derive_from(config.session_secret.expose_secret().as_bytes());

    // Determine if we're in production (HTTPS)
    let is_secure = config.base_url.starts_with("https://");

    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(is_secure)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
        .with_signed(key)
}
