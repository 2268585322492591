//! Hosted document-store client.
//!
//! # Architecture
//!
//! - Plain JSON documents in named collections, accessed over REST
//! - The hosted store is source of truth - NO local sync, direct API calls
//! - In-memory caching via `moka` for catalog reads (5 minute TTL)
//!
//! # Collections
//!
//! - `products` (+ `products/{id}/reviews` subcollection)
//! - `cart` - at most one document per user, found by `userId` filter
//! - `orders` - one document per user, keyed by the auth uid
//! - `users` - profile documents, keyed by the auth uid
//!
//! # Example
//!
//! ```rust,ignore
//! use novakart_storefront::backend::DataClient;
//!
//! let client = DataClient::new(&config.backend);
//!
//! // Get a product
//! let product = client.get_product(&product_id).await?;
//!
//! // Add it to the user's cart
//! client.add_to_cart(&user_id, &product.id).await?;
//! ```

mod client;
pub mod types;

pub use client::DataClient;
pub use types::*;

use thiserror::Error;

/// Errors that can occur when talking to the hosted document store.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The store returned a non-success status.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        message: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Document not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Write rejected because the document is already in the requested state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Rate limited by the store.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_display() {
        let err = BackendError::NotFound("products/p-123".to_string());
        assert_eq!(err.to_string(), "Not found: products/p-123");

        let err = BackendError::Conflict("product already in cart".to_string());
        assert_eq!(err.to_string(), "Conflict: product already in cart");
    }

    #[test]
    fn test_api_error_display() {
        let err = BackendError::Api {
            status: 503,
            message: "upstream unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 503 - upstream unavailable");
    }

    #[test]
    fn test_rate_limited_error() {
        let err = BackendError::RateLimited(30);
        assert_eq!(err.to_string(), "Rate limited, retry after 30 seconds");
    }
}
