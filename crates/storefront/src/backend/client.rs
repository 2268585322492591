//! Document-store client implementation.
//!
//! Wraps the hosted store's REST surface with typed collection operations.
//! Catalog reads are cached with `moka` (5-minute TTL); everything that can
//! change under the user's feet (cart, orders, profiles) goes straight to the
//! store on every call.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::Method;
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, instrument};

use novakart_core::{ProductId, UserId};

use super::BackendError;
use super::types::{Cart, OrderHistory, OrderRecord, Product, Review, UserProfile};
use crate::config::BackendConfig;

/// API key header expected by the hosted store.
const API_KEY_HEADER: &str = "X-Api-Key";

/// Values stored in the catalog cache.
#[derive(Clone)]
enum CacheValue {
    Product(Box<Product>),
    Products(Arc<Vec<Product>>),
}

// =============================================================================
// DataClient
// =============================================================================

/// Client for the hosted document store.
///
/// Provides typed access to the storefront's remote collections. Composite
/// operations (cart membership, order append, stock adjustment) are expressed
/// here as the sequential read-modify-write calls they have always been;
/// the store offers no transactions and none are simulated.
#[derive(Clone)]
pub struct DataClient {
    inner: Arc<DataClientInner>,
}

struct DataClientInner {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    cache: Cache<String, CacheValue>,
}

impl DataClient {
    /// Create a new document-store client.
    #[must_use]
    pub fn new(config: &BackendConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self {
            inner: Arc::new(DataClientInner {
                client: reqwest::Client::new(),
                base_url: config.base_url.trim_end_matches('/').to_owned(),
                api_key: config.api_key.expose_secret().to_owned(),
                cache,
            }),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{path}", self.inner.base_url)
    }

    /// Execute a request against the store and decode the JSON response.
    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(&str, &str)]>,
        body: Option<&serde_json::Value>,
    ) -> Result<T, BackendError> {
        let mut request = self
            .inner
            .client
            .request(method, self.url(path))
            .header(API_KEY_HEADER, &self.inner.api_key);

        if let Some(query) = query {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(BackendError::RateLimited(retry_after));
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound(path.to_owned()));
        }

        // Read the body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %response_text.chars().take(500).collect::<String>(),
                "document store returned non-success status"
            );
            return Err(BackendError::Api {
                status: status.as_u16(),
                message: response_text.chars().take(200).collect(),
            });
        }

        match serde_json::from_str(&response_text) {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    body = %response_text.chars().take(500).collect::<String>(),
                    "failed to parse document store response"
                );
                Err(BackendError::Parse(e))
            }
        }
    }

    /// GET a document, mapping 404 to `None`.
    async fn get_opt<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, BackendError> {
        match self.execute(Method::GET, path, None, None).await {
            Ok(value) => Ok(Some(value)),
            Err(BackendError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// POST a new document to a collection; the store assigns the id and
    /// returns the stored document.
    async fn create<T: DeserializeOwned>(
        &self,
        collection: &str,
        body: &impl Serialize,
    ) -> Result<T, BackendError> {
        let body = serde_json::to_value(body)?;
        self.execute(Method::POST, collection, None, Some(&body))
            .await
    }

    /// PUT a document at a caller-assigned id, creating or replacing it.
    async fn put(&self, path: &str, body: &impl Serialize) -> Result<(), BackendError> {
        let body = serde_json::to_value(body)?;
        self.send_ok(Method::PUT, path, &body).await
    }

    /// PATCH a subset of a document's fields.
    async fn patch(&self, path: &str, body: &serde_json::Value) -> Result<(), BackendError> {
        self.send_ok(Method::PATCH, path, body).await
    }

    /// Issue a write and check the status, ignoring the response body.
    async fn send_ok(
        &self,
        method: Method,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<(), BackendError> {
        let response = self
            .inner
            .client
            .request(method, self.url(path))
            .header(API_KEY_HEADER, &self.inner.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(BackendError::RateLimited(retry_after));
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound(path.to_owned()));
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::error!(
                status = %status,
                body = %message.chars().take(500).collect::<String>(),
                "document store rejected write"
            );
            return Err(BackendError::Api {
                status: status.as_u16(),
                message: message.chars().take(200).collect(),
            });
        }

        Ok(())
    }

    // =========================================================================
    // Catalog Methods
    // =========================================================================

    /// Fetch the full product catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_products(&self) -> Result<Arc<Vec<Product>>, BackendError> {
        let cache_key = "products".to_owned();

        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await {
            debug!("cache hit for catalog");
            return Ok(products);
        }

        let products: Vec<Product> = self.execute(Method::GET, "products", None, None).await?;
        let products = Arc::new(products);

        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(Arc::clone(&products)))
            .await;

        Ok(products)
    }

    /// Get a product by its document id.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if the product does not exist, or an
    /// error if the API request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: &ProductId) -> Result<Product, BackendError> {
        let cache_key = format!("product:{id}");

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("cache hit for product");
            return Ok(*product);
        }

        let product: Product = self
            .execute(Method::GET, &format!("products/{id}"), None, None)
            .await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Get a product, mapping a missing document to `None`.
    ///
    /// Cart and checkout reads use this to silently drop ids whose products
    /// have been removed from the catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn get_product_if_exists(
        &self,
        id: &ProductId,
    ) -> Result<Option<Product>, BackendError> {
        match self.get_product(id).await {
            Ok(product) => Ok(Some(product)),
            Err(BackendError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    // =========================================================================
    // Review Methods
    // =========================================================================

    /// List the reviews of a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn list_reviews(&self, product_id: &ProductId) -> Result<Vec<Review>, BackendError> {
        match self
            .get_opt(&format!("products/{product_id}/reviews"))
            .await?
        {
            Some(reviews) => Ok(reviews),
            None => Ok(Vec::new()),
        }
    }

    /// Append a review to a product's `reviews` subcollection.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, review), fields(product_id = %product_id))]
    pub async fn add_review(
        &self,
        product_id: &ProductId,
        review: &Review,
    ) -> Result<(), BackendError> {
        self.create::<serde_json::Value>(&format!("products/{product_id}/reviews"), review)
            .await?;
        Ok(())
    }

    // =========================================================================
    // Cart Methods (not cached - mutable state)
    // =========================================================================

    /// Find the user's cart document, if any.
    ///
    /// Carts are located by equality filter on `userId`; at most one document
    /// per user is expected, and the first match wins.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn find_cart(&self, user_id: &UserId) -> Result<Option<Cart>, BackendError> {
        let carts: Vec<Cart> = self
            .execute(
                Method::GET,
                "cart",
                Some(&[("userId", user_id.as_str())]),
                None,
            )
            .await?;

        Ok(carts.into_iter().next())
    }

    /// Add a product to the user's cart.
    ///
    /// Creates the cart document on first use. Adding a product that is
    /// already present is rejected without writing anything.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Conflict` if the product is already in the
    /// cart, or an error if an API request fails.
    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn add_to_cart(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
    ) -> Result<Cart, BackendError> {
        match self.find_cart(user_id).await? {
            Some(mut cart) => {
                if cart.products.contains(product_id) {
                    return Err(BackendError::Conflict("Product already in cart".to_owned()));
                }

                cart.products.push(product_id.clone());
                self.patch(
                    &format!("cart/{}", cart.id),
                    &json!({ "products": cart.products }),
                )
                .await?;

                Ok(cart)
            }
            None => {
                self.create(
                    "cart",
                    &json!({
                        "userId": user_id,
                        "products": [product_id],
                    }),
                )
                .await
            }
        }
    }

    /// Remove a product from the user's cart.
    ///
    /// Removing an id that is not in the cart, or from a user without a cart
    /// document, is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if an API request fails.
    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn remove_from_cart(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
    ) -> Result<(), BackendError> {
        let Some(mut cart) = self.find_cart(user_id).await? else {
            debug!("cart not found");
            return Ok(());
        };

        if !cart.products.contains(product_id) {
            debug!("product not in cart");
            return Ok(());
        }

        cart.products.retain(|id| id != product_id);
        self.patch(
            &format!("cart/{}", cart.id),
            &json!({ "products": cart.products }),
        )
        .await
    }

    /// Resolve the user's cart to product documents.
    ///
    /// Ids whose product documents no longer exist are dropped silently.
    ///
    /// # Errors
    ///
    /// Returns an error if an API request fails.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn cart_products(&self, user_id: &UserId) -> Result<Vec<Product>, BackendError> {
        let Some(cart) = self.find_cart(user_id).await? else {
            return Ok(Vec::new());
        };

        let mut products = Vec::with_capacity(cart.products.len());
        for product_id in &cart.products {
            if let Some(product) = self.get_product_if_exists(product_id).await? {
                products.push(product);
            }
        }

        Ok(products)
    }

    /// Remove a set of purchased product ids from the user's cart.
    ///
    /// # Errors
    ///
    /// Returns an error if an API request fails.
    #[instrument(skip(self, purchased), fields(user_id = %user_id))]
    pub async fn remove_cart_products(
        &self,
        user_id: &UserId,
        purchased: &[ProductId],
    ) -> Result<(), BackendError> {
        let Some(mut cart) = self.find_cart(user_id).await? else {
            debug!("no cart found for user");
            return Ok(());
        };

        cart.products.retain(|id| !purchased.contains(id));
        self.patch(
            &format!("cart/{}", cart.id),
            &json!({ "products": cart.products }),
        )
        .await
    }

    // =========================================================================
    // Order Methods
    // =========================================================================

    /// Get the user's order history document, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_order_history(
        &self,
        user_id: &UserId,
    ) -> Result<Option<OrderHistory>, BackendError> {
        self.get_opt(&format!("orders/{user_id}")).await
    }

    /// Append an order record to the user's history, creating the history
    /// document on first purchase.
    ///
    /// # Errors
    ///
    /// Returns an error if an API request fails.
    #[instrument(skip(self, record), fields(user_id = %user_id, payment_id = %record.payment_id))]
    pub async fn append_order(
        &self,
        user_id: &UserId,
        record: OrderRecord,
    ) -> Result<(), BackendError> {
        match self.get_order_history(user_id).await? {
            Some(mut history) => {
                history.orders.push(record);
                self.patch(
                    &format!("orders/{user_id}"),
                    &json!({ "orders": history.orders }),
                )
                .await
            }
            None => {
                self.put(
                    &format!("orders/{user_id}"),
                    &json!({
                        "userId": user_id,
                        "orders": [record],
                    }),
                )
                .await
            }
        }
    }

    // =========================================================================
    // Stock Methods
    // =========================================================================

    /// Decrement stock for a set of purchases.
    ///
    /// Each product's quantity is reduced by the purchased amount, clamped at
    /// zero; a product that hits zero also has its in-stock flag cleared.
    /// Products that have disappeared from the catalog are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if an API request fails.
    #[instrument(skip(self, purchases))]
    pub async fn apply_stock_decrements(
        &self,
        purchases: &[(ProductId, u32)],
    ) -> Result<(), BackendError> {
        for (product_id, purchased) in purchases {
            let Some(product) = self.get_product_if_exists(product_id).await? else {
                continue;
            };

            let (remaining, still_in_stock) = stock_after_purchase(product.quantity, *purchased);
            let body = if still_in_stock {
                json!({ "quantity": remaining })
            } else {
                json!({ "quantity": remaining, "stock": false })
            };

            self.patch(&format!("products/{product_id}"), &body).await?;
            self.invalidate_product(product_id).await;
        }

        self.invalidate_catalog().await;
        Ok(())
    }

    // =========================================================================
    // Profile Methods
    // =========================================================================

    /// Get a user's profile document, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_profile(&self, user_id: &UserId) -> Result<Option<UserProfile>, BackendError> {
        self.get_opt(&format!("users/{user_id}")).await
    }

    /// Create the profile document written at registration time.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, email), fields(user_id = %user_id))]
    pub async fn create_profile(
        &self,
        user_id: &UserId,
        email: &str,
        created_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), BackendError> {
        self.put(
            &format!("users/{user_id}"),
            &json!({
                "uid": user_id,
                "email": email,
                "role": "user",
                "createdAt": created_at,
            }),
        )
        .await
    }

    /// Update the editable profile fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, profile), fields(user_id = %user_id))]
    pub async fn update_profile(
        &self,
        user_id: &UserId,
        profile: &UserProfile,
    ) -> Result<(), BackendError> {
        self.patch(
            &format!("users/{user_id}"),
            &json!({
                "fullName": profile.full_name,
                "dob": profile.dob,
                "mobile": profile.mobile,
                "email": profile.email,
            }),
        )
        .await
    }

    // =========================================================================
    // Cache Management
    // =========================================================================

    /// Invalidate a cached product.
    pub async fn invalidate_product(&self, id: &ProductId) {
        self.inner.cache.invalidate(&format!("product:{id}")).await;
    }

    /// Invalidate the cached catalog listing.
    pub async fn invalidate_catalog(&self) {
        self.inner.cache.invalidate(&"products".to_owned()).await;
    }
}

/// Quantity and in-stock flag after a purchase, clamped at zero.
const fn stock_after_purchase(available: u32, purchased: u32) -> (u32, bool) {
    let remaining = available.saturating_sub(purchased);
    (remaining, remaining > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_decrement() {
        assert_eq!(stock_after_purchase(10, 3), (7, true));
        assert_eq!(stock_after_purchase(3, 3), (0, false));
    }

    #[test]
    fn test_stock_never_goes_negative() {
        // Someone else bought the last units between quote and capture
        assert_eq!(stock_after_purchase(2, 5), (0, false));
        assert_eq!(stock_after_purchase(0, 1), (0, false));
    }
}
