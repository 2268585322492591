//! Payment gateway client for the hosted checkout widget.
//!
//! The browser-side widget collects the payment; this module covers the two
//! server-side halves of that flow: creating a gateway order for a given
//! amount, and verifying the signature the widget hands back on completion.
//! Amounts travel in minor units (paise for INR).

use hmac::{Hmac, Mac};
use reqwest::header::CONTENT_TYPE;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::Sha256;
use thiserror::Error;
use tracing::instrument;

use crate::config::PaymentConfig;

type HmacSha256 = Hmac<Sha256>;

/// Errors that can occur when interacting with the payment gateway.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Gateway returned an error response.
    #[error("gateway error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        message: String,
    },

    /// The payment callback signature did not verify.
    #[error("payment signature verification failed")]
    InvalidSignature,
}

/// A gateway order, created before the widget opens.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayOrder {
    /// Gateway-assigned order id, passed to the widget.
    pub id: String,
    /// Amount in minor units.
    pub amount: i64,
    /// ISO 4217 currency code.
    pub currency: String,
}

/// Everything the browser needs to open the checkout widget.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSession {
    /// Gateway order id.
    pub order_id: String,
    /// Publishable key id for the widget.
    pub key_id: String,
    /// Amount in minor units.
    pub amount: i64,
    /// ISO 4217 currency code.
    pub currency: String,
}

/// Client for the hosted payment gateway.
#[derive(Clone)]
pub struct CheckoutClient {
    client: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl CheckoutClient {
    /// Create a new payment gateway client.
    #[must_use]
    pub fn new(config: &PaymentConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.expose_secret().to_owned(),
        }
    }

    /// The publishable key id, safe to hand to the browser.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Create a gateway order for the given amount.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the gateway rejects the
    /// order.
    #[instrument(skip(self), fields(amount_minor = amount_minor, currency = %currency))]
    pub async fn create_order(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, CheckoutError> {
        let response = self
            .client
            .post(format!("{}/v1/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .header(CONTENT_TYPE, "application/json")
            .json(&json!({
                "amount": amount_minor,
                "currency": currency,
                "receipt": receipt,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::error!(
                status = %status,
                body = %message.chars().take(500).collect::<String>(),
                "payment gateway rejected order"
            );
            return Err(CheckoutError::Api {
                status: status.as_u16(),
                message: message.chars().take(200).collect(),
            });
        }

        Ok(response.json().await?)
    }

    /// Verify the signature the checkout widget returned.
    ///
    /// The gateway signs `"{order_id}|{payment_id}"` with the key secret
    /// (HMAC-SHA256, hex-encoded). A payment is only recorded after this
    /// check passes.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::InvalidSignature` if the signature does not
    /// match.
    pub fn verify_signature(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<(), CheckoutError> {
        let Ok(mut mac) = HmacSha256::new_from_slice(self.key_secret.as_bytes()) else {
            return Err(CheckoutError::InvalidSignature);
        };

        mac.update(format!("{order_id}|{payment_id}").as_bytes());
        let computed = hex::encode(mac.finalize().into_bytes());

        if computed == signature {
            Ok(())
        } else {
            Err(CheckoutError::InvalidSignature)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn test_client() -> CheckoutClient {
        CheckoutClient::new(&PaymentConfig {
            base_url: "https://api.checkout.test".to_owned(),
            key_id: "key_test_abc".to_owned(),
            key_secret: SecretString::from("s3cr3t-key"),
            currency: novakart_core::CurrencyCode::INR,
        })
    }

    fn sign(secret: &str, order_id: &str, payment_id: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{order_id}|{payment_id}").as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_verify_signature_accepts_valid() {
        let client = test_client();
        let signature = sign("s3cr3t-key", "order_1", "pay_1");
        assert!(client.verify_signature("order_1", "pay_1", &signature).is_ok());
    }

    #[test]
    fn test_verify_signature_rejects_tampered_payment_id() {
        let client = test_client();
        let signature = sign("s3cr3t-key", "order_1", "pay_1");
        assert!(matches!(
            client.verify_signature("order_1", "pay_2", &signature),
            Err(CheckoutError::InvalidSignature)
        ));
    }

    #[test]
    fn test_verify_signature_rejects_wrong_secret() {
        let client = test_client();
        let signature = sign("other-secret", "order_1", "pay_1");
        assert!(client.verify_signature("order_1", "pay_1", &signature).is_err());
    }

    #[test]
    fn test_verify_signature_rejects_garbage() {
        let client = test_client();
        assert!(client
            .verify_signature("order_1", "pay_1", "not-hex-at-all")
            .is_err());
    }
}
