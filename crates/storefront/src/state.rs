//! Application state shared across handlers.

use std::path::Path;
use std::sync::Arc;

use crate::backend::DataClient;
use crate::config::StorefrontConfig;
use crate::content::{ContentError, ContentStore};
use crate::services::{CheckoutClient, IdentityClient};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the hosted-service clients and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    data: DataClient,
    identity: IdentityClient,
    checkout: CheckoutClient,
    content: ContentStore,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `content_dir` - Directory holding the markdown page content
    ///
    /// # Errors
    ///
    /// Returns an error if the static content cannot be loaded.
    pub fn new(config: StorefrontConfig, content_dir: &Path) -> Result<Self, ContentError> {
        let data = DataClient::new(&config.backend);
        let identity = IdentityClient::new(&config.identity);
        let checkout = CheckoutClient::new(&config.payment);
        let content = ContentStore::load(content_dir)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                data,
                identity,
                checkout,
                content,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the document-store client.
    #[must_use]
    pub fn data(&self) -> &DataClient {
        &self.inner.data
    }

    /// Get a reference to the identity service client.
    #[must_use]
    pub fn identity(&self) -> &IdentityClient {
        &self.inner.identity
    }

    /// Get a reference to the payment gateway client.
    #[must_use]
    pub fn checkout(&self) -> &CheckoutClient {
        &self.inner.checkout
    }

    /// Get a reference to the loaded static content.
    #[must_use]
    pub fn content(&self) -> &ContentStore {
        &self.inner.content
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod test_support {
    use secrecy::SecretString;

    use super::AppState;
    use crate::config::{BackendConfig, IdentityConfig, PaymentConfig, StorefrontConfig};

    /// A state backed by unreachable endpoints, for tests that never touch
    /// the network.
    pub(crate) fn test_state() -> AppState {
        let config = StorefrontConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            session_secret: SecretString::from("x".repeat(32)),
            backend: BackendConfig {
                base_url: "https://docstore.test".to_string(),
                api_key: SecretString::from("k"),
            },
            identity: IdentityConfig {
                base_url: "https://identity.test".to_string(),
                api_key: SecretString::from("k"),
            },
            payment: PaymentConfig {
                base_url: "https://checkout.test".to_string(),
                key_id: "key_test".to_string(),
                key_secret: SecretString::from("k"),
                currency: novakart_core::CurrencyCode::INR,
            },
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.1,
        };

        AppState::new(config, std::path::Path::new("/nonexistent")).unwrap()
    }
}
