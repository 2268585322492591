//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Health check
//!
//! # Products
//! GET  /products               - Product listing (search/category/sort)
//! GET  /products/{id}          - Product detail with reviews
//! POST /products/{id}/reviews  - Submit a review (requires auth)
//!
//! # Cart (requires auth)
//! GET  /cart                   - Cart contents with quote
//! POST /cart/add               - Add a product
//! POST /cart/remove            - Remove a product
//! GET  /cart/count             - Cart count badge
//!
//! # Checkout (requires auth)
//! POST /checkout/session       - Create a payment session for the widget
//! POST /checkout/confirm       - Verify the payment and record the order
//!
//! # Orders (requires auth)
//! GET  /orders                 - Order history, newest first
//! GET  /orders/{payment_id}    - One order's detail
//!
//! # Profile (requires auth)
//! GET  /profile                - Profile, defaulted when unset
//! PUT  /profile                - Update profile
//!
//! # Auth (rate limited)
//! POST /auth/register          - Create an account
//! POST /auth/login             - Log in
//! POST /auth/logout            - Log out
//! POST /auth/reset-password    - Send a password reset email
//! GET  /auth/me                - Current session user
//!
//! # Content
//! GET  /pages                  - List static pages
//! GET  /pages/{slug}           - One static page (about, faq, ...)
//! ```

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod orders;
pub mod pages;
pub mod products;
pub mod profile;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/reset-password", post(auth::reset_password))
        .route("/me", get(auth::me))
        .layer(auth_rate_limiter())
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
        .route("/{id}/reviews", post(products::submit_review))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/remove", post(cart::remove))
        .route("/count", get(cart::count))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/session", post(checkout::create_session))
        .route("/confirm", post(checkout::confirm))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{payment_id}", get(orders::show))
}

/// Create the profile routes router.
pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/", get(profile::show).put(profile::update))
}

/// Create the content page routes router.
pub fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(pages::index))
        .route("/{slug}", get(pages::show))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Product routes
        .nest("/products", product_routes())
        // Cart routes
        .nest("/cart", cart_routes())
        // Checkout routes
        .nest("/checkout", checkout_routes())
        // Order routes
        .nest("/orders", order_routes())
        // Profile routes
        .nest("/profile", profile_routes())
        // Content pages
        .nest("/pages", page_routes())
        // General API rate limit over everything above
        .layer(api_rate_limiter())
        // Auth routes carry their own, stricter limiter
        .nest("/auth", auth_routes())
}
