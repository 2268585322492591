//! Cart route handlers.
//!
//! The cart document stores product ids only; quantities are chosen at
//! checkout time. Prices shown here are quotes computed from the live
//! catalog, so out-of-stock items appear in the cart but never in the total.

use axum::{Json, extract::State};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use novakart_core::{Price, ProductId};

use crate::backend::types::Product;
use crate::error::Result;
use crate::middleware::{OptionalUser, RequireUser};
use crate::state::AppState;

// =============================================================================
// View Types
// =============================================================================

/// Cart line display data.
#[derive(Debug, Clone, Serialize)]
pub struct CartItemView {
    pub id: ProductId,
    pub name: String,
    pub image: String,
    pub price: Decimal,
    pub discount: u8,
    pub discounted_price: Decimal,
    pub available: bool,
    pub quantity_in_stock: u32,
}

/// Cart display data.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    /// Quote over available items, one unit each.
    pub subtotal: Decimal,
    /// Formatted subtotal, e.g. "₹1234.00".
    pub subtotal_display: String,
    /// Number of available items.
    pub item_count: usize,
}

impl CartView {
    /// Build the cart view and quote from resolved products.
    fn from_products(products: &[Product], state: &AppState) -> Self {
        let currency = state.config().payment.currency;

        let items: Vec<CartItemView> = products
            .iter()
            .map(|product| CartItemView {
                id: product.id.clone(),
                name: product.name.clone(),
                image: product.image.clone(),
                price: product.price,
                discount: product.discount.as_u8(),
                discounted_price: product.discounted_price(currency).amount,
                available: product.is_available(),
                quantity_in_stock: product.quantity,
            })
            .collect();

        // Only in-stock items count toward the quote
        let subtotal: Decimal = products
            .iter()
            .filter(|p| p.is_available())
            .map(|p| p.discounted_price(currency).amount)
            .sum();

        let item_count = items.iter().filter(|i| i.available).count();

        Self {
            items,
            subtotal,
            subtotal_display: Price::new(subtotal, currency).display(),
            item_count,
        }
    }
}

// =============================================================================
// Form Types
// =============================================================================

/// Add/remove form data.
#[derive(Debug, Deserialize)]
pub struct CartItemForm {
    pub product_id: ProductId,
}

/// Response for cart mutations.
#[derive(Debug, Serialize)]
pub struct CartMessage {
    pub message: String,
    pub count: usize,
}

/// Cart count badge data.
#[derive(Debug, Serialize)]
pub struct CartCount {
    pub count: usize,
}

// =============================================================================
// Handlers
// =============================================================================

/// Show the cart with a quote.
#[instrument(skip(state, user), fields(user_id = %user.0.uid))]
pub async fn show(State(state): State<AppState>, user: RequireUser) -> Result<Json<CartView>> {
    let RequireUser(user) = user;
    let products = state.data().cart_products(&user.uid).await?;
    Ok(Json(CartView::from_products(&products, &state)))
}

/// Add a product to the cart.
///
/// Adding a product that is already in the cart is a conflict and writes
/// nothing.
#[instrument(skip(state, user, form), fields(user_id = %user.0.uid))]
pub async fn add(
    State(state): State<AppState>,
    user: RequireUser,
    Json(form): Json<CartItemForm>,
) -> Result<Json<CartMessage>> {
    let RequireUser(user) = user;

    // Reject ids that do not exist in the catalog
    let _ = state.data().get_product(&form.product_id).await?;

    let cart = state.data().add_to_cart(&user.uid, &form.product_id).await?;

    Ok(Json(CartMessage {
        message: "Product added to cart".to_owned(),
        count: cart.products.len(),
    }))
}

/// Remove a product from the cart.
#[instrument(skip(state, user, form), fields(user_id = %user.0.uid))]
pub async fn remove(
    State(state): State<AppState>,
    user: RequireUser,
    Json(form): Json<CartItemForm>,
) -> Result<Json<CartMessage>> {
    let RequireUser(user) = user;

    state.data().remove_from_cart(&user.uid, &form.product_id).await?;

    let count = state
        .data()
        .find_cart(&user.uid)
        .await?
        .map_or(0, |cart| cart.products.len());

    Ok(Json(CartMessage {
        message: "Item removed from cart".to_owned(),
        count,
    }))
}

/// Cart count badge.
#[instrument(skip(state, user))]
pub async fn count(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
) -> Result<Json<CartCount>> {
    let count = match user {
        Some(user) => state
            .data()
            .find_cart(&user.uid)
            .await?
            .map_or(0, |cart| cart.products.len()),
        None => 0,
    };

    Ok(Json(CartCount { count }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use novakart_core::DiscountPercent;

    fn product(id: &str, price: &str, discount: u8, quantity: u32, stock: bool) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            description: String::new(),
            category: String::new(),
            image: String::new(),
            price: price.parse().unwrap(),
            discount: DiscountPercent::new(discount),
            quantity,
            stock,
        }
    }

    use crate::state::test_support::test_state;

    #[test]
    fn test_quote_covers_available_items_only() {
        let state = test_state();
        let products = vec![
            product("a", "100.00", 10, 5, true), // 90.00
            product("b", "50.00", 0, 0, true),   // out of stock
            product("c", "20.00", 0, 3, false),  // flag cleared
        ];

        let view = CartView::from_products(&products, &state);
        assert_eq!(view.items.len(), 3);
        assert_eq!(view.item_count, 1);
        assert_eq!(view.subtotal, "90.00".parse::<Decimal>().unwrap());
        assert_eq!(view.subtotal_display, "₹90.00");
    }

    #[test]
    fn test_empty_cart_quote_is_zero() {
        let state = test_state();
        let view = CartView::from_products(&[], &state);
        assert!(view.items.is_empty());
        assert_eq!(view.subtotal, Decimal::ZERO);
        assert_eq!(view.item_count, 0);
    }
}
