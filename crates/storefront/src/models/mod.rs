//! Domain models for storefront.
//!
//! Durable entities live in the hosted document store and are typed in
//! [`crate::backend::types`]; this module holds the session-local models.

pub mod session;

pub use session::{CurrentUser, keys as session_keys};
