//! HTTP middleware for the storefront.

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod session;

pub use auth::{OptionalUser, RequireUser, clear_current_user, set_current_user};
pub use rate_limit::{api_rate_limiter, auth_rate_limiter};
pub use request_id::request_id_middleware;
pub use session::create_session_layer;
