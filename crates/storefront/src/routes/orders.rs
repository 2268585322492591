//! Order history route handlers.
//!
//! History is stored as one document per user with an append-only order
//! array; the listing flattens it into per-line-item records the way the
//! orders page has always displayed them, newest first.

use axum::{
    Json,
    extract::{Path, State},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;

use novakart_core::{OrderStatus, PaymentId, ProductId};

use crate::backend::types::{DeliveryAddress, OrderHistory};
use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::state::AppState;

// =============================================================================
// View Types
// =============================================================================

/// One ordered line item, flattened out of its order record.
#[derive(Debug, Clone, Serialize)]
pub struct OrderedItemView {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub price: Decimal,
    pub image: String,
    pub status: OrderStatus,
    pub payment_id: PaymentId,
    pub created_at: DateTime<Utc>,
}

/// Order history response.
#[derive(Debug, Serialize)]
pub struct OrderListResponse {
    pub orders: Vec<OrderedItemView>,
}

/// One order's detail.
#[derive(Debug, Serialize)]
pub struct OrderDetailResponse {
    pub payment_id: PaymentId,
    pub created_at: DateTime<Utc>,
    pub total_payment: Decimal,
    pub address: DeliveryAddress,
    pub items: Vec<OrderedItemView>,
}

// =============================================================================
// Helpers
// =============================================================================

/// Flatten the history into line items, newest order first.
fn flatten_history(history: &OrderHistory) -> Vec<OrderedItemView> {
    let mut items: Vec<OrderedItemView> = history
        .orders
        .iter()
        .flat_map(|order| {
            order.products.iter().map(|item| OrderedItemView {
                product_id: item.id.clone(),
                name: item.name.clone(),
                quantity: item.quantity,
                price: item.price,
                image: item.image.clone(),
                status: item.status,
                payment_id: order.payment_id.clone(),
                created_at: order.created_at,
            })
        })
        .collect();

    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    items
}

// =============================================================================
// Handlers
// =============================================================================

/// List the user's ordered items, newest first.
#[instrument(skip(state, user), fields(user_id = %user.0.uid))]
pub async fn index(
    State(state): State<AppState>,
    user: RequireUser,
) -> Result<Json<OrderListResponse>> {
    let RequireUser(user) = user;

    let orders = match state.data().get_order_history(&user.uid).await? {
        Some(history) => flatten_history(&history),
        None => Vec::new(),
    };

    Ok(Json(OrderListResponse { orders }))
}

/// Show one order by its payment id.
#[instrument(skip(state, user), fields(user_id = %user.0.uid, payment_id = %payment_id))]
pub async fn show(
    State(state): State<AppState>,
    user: RequireUser,
    Path(payment_id): Path<PaymentId>,
) -> Result<Json<OrderDetailResponse>> {
    let RequireUser(user) = user;

    let history = state
        .data()
        .get_order_history(&user.uid)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {payment_id}")))?;

    let order = history
        .orders
        .iter()
        .find(|order| order.payment_id == payment_id)
        .ok_or_else(|| AppError::NotFound(format!("order {payment_id}")))?;

    let items = order
        .products
        .iter()
        .map(|item| OrderedItemView {
            product_id: item.id.clone(),
            name: item.name.clone(),
            quantity: item.quantity,
            price: item.price,
            image: item.image.clone(),
            status: item.status,
            payment_id: order.payment_id.clone(),
            created_at: order.created_at,
        })
        .collect();

    Ok(Json(OrderDetailResponse {
        payment_id: order.payment_id.clone(),
        created_at: order.created_at,
        total_payment: order.total_payment,
        address: order.user_data.clone(),
        items,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::backend::types::{OrderRecord, OrderedItem};
    use chrono::TimeZone;
    use novakart_core::UserId;

    fn record(payment_id: &str, day: u32, names: &[&str]) -> OrderRecord {
        OrderRecord {
            products: names
                .iter()
                .map(|name| OrderedItem {
                    id: ProductId::new(format!("p-{name}")),
                    name: (*name).to_string(),
                    quantity: 1,
                    price: "10.00".parse().unwrap(),
                    image: String::new(),
                    status: OrderStatus::Ordered,
                })
                .collect(),
            total_payment: "10.00".parse().unwrap(),
            payment_id: PaymentId::new(payment_id),
            user_data: DeliveryAddress {
                name: "Asha".to_string(),
                email: "asha@example.com".to_string(),
                phone: "9876543210".to_string(),
                address: "12 MG Road".to_string(),
                city: "Bengaluru".to_string(),
                pincode: "560001".to_string(),
            },
            created_at: Utc.with_ymd_and_hms(2026, 7, day, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_flatten_sorts_newest_first() {
        let history = OrderHistory {
            user_id: UserId::new("u-1"),
            orders: vec![
                record("pay_1", 1, &["mouse", "keyboard"]),
                record("pay_2", 9, &["monitor"]),
            ],
        };

        let items = flatten_history(&history);
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].name, "monitor");
        assert_eq!(items[0].payment_id, PaymentId::new("pay_2"));
        assert!(items[1].created_at <= items[0].created_at);
    }

    #[test]
    fn test_flatten_carries_order_metadata_onto_items() {
        let history = OrderHistory {
            user_id: UserId::new("u-1"),
            orders: vec![record("pay_7", 3, &["mouse"])],
        };

        let items = flatten_history(&history);
        assert_eq!(items[0].payment_id, PaymentId::new("pay_7"));
        assert_eq!(items[0].status, OrderStatus::Ordered);
    }
}
