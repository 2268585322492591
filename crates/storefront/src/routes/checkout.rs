//! Checkout route handlers.
//!
//! Checkout is a two-step flow around the hosted payment widget:
//!
//! 1. `create_session` validates the lines and address, recomputes the total
//!    from the live catalog, and creates a gateway order for the widget.
//! 2. `confirm` verifies the widget's signature, then records the order,
//!    clears the purchased items from the cart, and decrements stock.
//!
//! The three post-payment writes are sequential remote calls with no
//! rollback: once the order record lands, later failures are logged and the
//! order stands.

use axum::{Json, extract::State};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use novakart_core::{PaymentId, Price, ProductId};

use crate::backend::types::{DeliveryAddress, OrderRecord, OrderedItem, Product};
use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::services::checkout::CheckoutSession;
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// One line of a checkout request.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Checkout session request.
#[derive(Debug, Deserialize)]
pub struct SessionForm {
    pub items: Vec<CheckoutLine>,
    pub address: DeliveryAddress,
}

/// Payment confirmation request, echoing the widget's callback.
#[derive(Debug, Deserialize)]
pub struct ConfirmForm {
    pub order_id: String,
    pub payment_id: PaymentId,
    pub signature: String,
    pub items: Vec<CheckoutLine>,
    pub address: DeliveryAddress,
}

/// Confirmation response.
#[derive(Debug, Serialize)]
pub struct ConfirmResponse {
    pub message: String,
    pub payment_id: PaymentId,
    pub total: Decimal,
}

// =============================================================================
// Helpers
// =============================================================================

/// A checkout line resolved against the live catalog.
struct ResolvedLine {
    product: Product,
    quantity: u32,
}

/// Resolve and validate checkout lines against current stock.
async fn resolve_lines(state: &AppState, items: &[CheckoutLine]) -> Result<Vec<ResolvedLine>> {
    if items.is_empty() {
        return Err(AppError::BadRequest("No in-stock items to checkout".to_owned()));
    }

    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        if item.quantity == 0 {
            return Err(AppError::BadRequest("Quantity must be at least 1".to_owned()));
        }

        let Some(product) = state.data().get_product_if_exists(&item.product_id).await? else {
            return Err(AppError::BadRequest(
                "A product in your order is no longer available".to_owned(),
            ));
        };

        if !product.is_available() {
            return Err(AppError::BadRequest(format!(
                "\"{}\" is out of stock",
                product.name
            )));
        }

        if item.quantity > product.quantity {
            return Err(AppError::BadRequest(format!(
                "Only {} of \"{}\" in stock",
                product.quantity, product.name
            )));
        }

        lines.push(ResolvedLine {
            product,
            quantity: item.quantity,
        });
    }

    Ok(lines)
}

/// Total over the resolved lines: discounted unit price times quantity.
fn order_total(lines: &[ResolvedLine], state: &AppState) -> Price {
    let currency = state.config().payment.currency;
    let amount = lines
        .iter()
        .map(|line| {
            line.product
                .discounted_price(currency)
                .times(line.quantity)
                .amount
        })
        .sum();
    Price::new(amount, currency)
}

fn validate_address(address: &DeliveryAddress) -> Result<()> {
    if address.is_complete() {
        Ok(())
    } else {
        Err(AppError::BadRequest(
            "Please fill in all delivery address fields".to_owned(),
        ))
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Create a payment session for the hosted checkout widget.
#[instrument(skip(state, user, form), fields(user_id = %user.0.uid))]
pub async fn create_session(
    State(state): State<AppState>,
    user: RequireUser,
    Json(form): Json<SessionForm>,
) -> Result<Json<CheckoutSession>> {
    let RequireUser(user) = user;

    validate_address(&form.address)?;
    let lines = resolve_lines(&state, &form.items).await?;
    let total = order_total(&lines, &state);

    let receipt = format!("nk_{}_{}", user.uid, Uuid::new_v4().simple());
    let order = state
        .checkout()
        .create_order(
            total.to_minor_units(),
            total.currency_code.code(),
            &receipt,
        )
        .await?;

    Ok(Json(CheckoutSession {
        order_id: order.id,
        key_id: state.checkout().key_id().to_owned(),
        amount: order.amount,
        currency: order.currency,
    }))
}

/// Record a completed payment.
///
/// Verifies the gateway signature before writing anything. The order record
/// is required to land; cart cleanup and stock decrements are best-effort
/// afterwards.
#[instrument(skip(state, user, form), fields(user_id = %user.0.uid, payment_id = %form.payment_id))]
pub async fn confirm(
    State(state): State<AppState>,
    user: RequireUser,
    Json(form): Json<ConfirmForm>,
) -> Result<Json<ConfirmResponse>> {
    let RequireUser(user) = user;

    state
        .checkout()
        .verify_signature(&form.order_id, form.payment_id.as_str(), &form.signature)?;

    validate_address(&form.address)?;
    let lines = resolve_lines(&state, &form.items).await?;
    let total = order_total(&lines, &state);

    let items: Vec<OrderedItem> = lines
        .iter()
        .map(|line| OrderedItem {
            id: line.product.id.clone(),
            name: line.product.name.clone(),
            quantity: line.quantity,
            price: line.product.price,
            image: line.product.image.clone(),
            status: novakart_core::OrderStatus::Ordered,
        })
        .collect();

    let record = OrderRecord {
        products: items,
        total_payment: total.amount,
        payment_id: form.payment_id.clone(),
        user_data: form.address,
        created_at: Utc::now(),
    };

    state.data().append_order(&user.uid, record).await?;

    // The payment is captured and the order recorded; cleanup failures must
    // not fail the request.
    let purchased_ids: Vec<ProductId> =
        lines.iter().map(|line| line.product.id.clone()).collect();
    if let Err(e) = state
        .data()
        .remove_cart_products(&user.uid, &purchased_ids)
        .await
    {
        tracing::error!(error = %e, "failed to clear purchased items from cart");
    }

    let purchases: Vec<(ProductId, u32)> = lines
        .iter()
        .map(|line| (line.product.id.clone(), line.quantity))
        .collect();
    if let Err(e) = state.data().apply_stock_decrements(&purchases).await {
        tracing::error!(error = %e, "failed to decrement stock after order");
    }

    Ok(Json(ConfirmResponse {
        message: "Payment successful".to_owned(),
        payment_id: form.payment_id,
        total: total.amount,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use novakart_core::DiscountPercent;

    fn line(price: &str, discount: u8, quantity: u32) -> ResolvedLine {
        ResolvedLine {
            product: Product {
                id: ProductId::new("p-1"),
                name: "Thing".to_string(),
                description: String::new(),
                category: String::new(),
                image: String::new(),
                price: price.parse().unwrap(),
                discount: DiscountPercent::new(discount),
                quantity: 99,
                stock: true,
            },
            quantity,
        }
    }

    use crate::state::test_support::test_state;

    #[test]
    fn test_order_total_applies_discount_per_unit() {
        let state = test_state();
        // 2 x (500 - 20%) + 1 x 100 = 800 + 100
        let lines = vec![line("500.00", 20, 2), line("100.00", 0, 1)];
        let total = order_total(&lines, &state);
        assert_eq!(total.amount, "900.00".parse::<Decimal>().unwrap());
        assert_eq!(total.to_minor_units(), 90_000);
    }

    #[test]
    fn test_incomplete_address_is_rejected() {
        let address = DeliveryAddress {
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            phone: String::new(),
            address: "12 MG Road".to_string(),
            city: "Bengaluru".to_string(),
            pincode: "560001".to_string(),
        };
        assert!(validate_address(&address).is_err());
    }
}
