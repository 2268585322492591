//! Domain types for the hosted document store.
//!
//! Field names serialize in camelCase because that is how the storefront's
//! documents have always been written; renaming them here would strand
//! existing data.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use novakart_core::{DiscountPercent, OrderStatus, PaymentId, ProductId, UserId};

// =============================================================================
// Products
// =============================================================================

/// A catalog product document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Store-assigned document id.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Long-form description.
    #[serde(default)]
    pub description: String,
    /// Free-form category label ("Electronics", "Fashion", ...).
    #[serde(default)]
    pub category: String,
    /// Primary image URL.
    #[serde(default)]
    pub image: String,
    /// Unit price before discount.
    pub price: Decimal,
    /// Percentage discount applied at display and checkout time.
    #[serde(default)]
    pub discount: DiscountPercent,
    /// Units remaining in stock.
    #[serde(default)]
    pub quantity: u32,
    /// Whether the product is purchasable. Cleared when quantity hits zero.
    #[serde(default)]
    pub stock: bool,
}

impl Product {
    /// Unit price with the product's discount applied.
    #[must_use]
    pub fn discounted_price(&self, currency: novakart_core::CurrencyCode) -> novakart_core::Price {
        novakart_core::Price::new(self.price, currency).discounted(self.discount)
    }

    /// Whether the product can currently be purchased.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.stock && self.quantity > 0
    }
}

// =============================================================================
// Reviews
// =============================================================================

/// A product review, stored in the product's `reviews` subcollection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    /// Reviewer's auth uid.
    #[serde(rename = "userId")]
    pub user_id: UserId,
    /// Display name shown next to the review (the reviewer's email).
    #[serde(rename = "Name")]
    pub name: String,
    /// Review body.
    pub comment: String,
    /// Star rating, 1..=5.
    pub rating: u8,
    /// Denormalized product name, copied at write time.
    #[serde(rename = "productName")]
    pub product_name: String,
    /// Submission timestamp.
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Cart
// =============================================================================

/// A user's cart document.
///
/// Holds product ids only; quantities are chosen at checkout time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    /// Store-assigned document id.
    pub id: novakart_core::CartId,
    /// Owning user's auth uid.
    pub user_id: UserId,
    /// Product ids in the cart, oldest first.
    #[serde(default)]
    pub products: Vec<ProductId>,
}

// =============================================================================
// Orders
// =============================================================================

/// A denormalized line item inside an order record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderedItem {
    /// Product document id at purchase time.
    pub id: ProductId,
    /// Product name, copied at write time.
    pub name: String,
    /// Units purchased.
    pub quantity: u32,
    /// Unit price at purchase time.
    pub price: Decimal,
    /// Product image URL, copied at write time.
    #[serde(default)]
    pub image: String,
    /// Fulfillment status, starts as `Ordered`.
    pub status: OrderStatus,
}

/// Delivery address captured by the checkout form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryAddress {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub pincode: String,
}

impl DeliveryAddress {
    /// Whether every field is filled in.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        [
            &self.name,
            &self.email,
            &self.phone,
            &self.address,
            &self.city,
            &self.pincode,
        ]
        .iter()
        .all(|field| !field.trim().is_empty())
    }
}

/// One placed order, appended to the user's order history document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    /// Denormalized line items.
    pub products: Vec<OrderedItem>,
    /// Total captured by the payment gateway.
    pub total_payment: Decimal,
    /// Gateway payment id, also the order's public identifier.
    pub payment_id: PaymentId,
    /// Delivery address snapshot.
    pub user_data: DeliveryAddress,
    /// Server timestamp at order time.
    pub created_at: DateTime<Utc>,
}

/// The per-user order history document, keyed by the auth uid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderHistory {
    /// Owning user's auth uid.
    pub user_id: UserId,
    /// Append-only list of placed orders.
    #[serde(default)]
    pub orders: Vec<OrderRecord>,
}

// =============================================================================
// Profiles
// =============================================================================

/// A user profile document, keyed by the auth uid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub full_name: String,
    /// Date of birth as entered, `YYYY-MM-DD`.
    #[serde(default)]
    pub dob: String,
    /// Mobile number, digits only.
    #[serde(default)]
    pub mobile: String,
    #[serde(default)]
    pub email: String,
}

impl UserProfile {
    /// An empty profile carrying only the session email, used when the
    /// document does not exist yet.
    #[must_use]
    pub fn empty_with_email(email: &str) -> Self {
        Self {
            full_name: String::new(),
            dob: String::new(),
            mobile: String::new(),
            email: email.to_owned(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use novakart_core::CurrencyCode;

    fn product(price: &str, discount: u8, quantity: u32, stock: bool) -> Product {
        Product {
            id: ProductId::new("p-1"),
            name: "Headphones".to_string(),
            description: String::new(),
            category: "Electronics".to_string(),
            image: String::new(),
            price: price.parse().unwrap(),
            discount: DiscountPercent::new(discount),
            quantity,
            stock,
        }
    }

    #[test]
    fn test_discounted_price() {
        let p = product("1000.00", 25, 5, true);
        assert_eq!(
            p.discounted_price(CurrencyCode::INR).amount,
            "750.00".parse::<Decimal>().unwrap()
        );
    }

    #[test]
    fn test_availability_needs_both_flag_and_quantity() {
        assert!(product("10", 0, 3, true).is_available());
        assert!(!product("10", 0, 0, true).is_available());
        assert!(!product("10", 0, 3, false).is_available());
    }

    #[test]
    fn test_address_completeness() {
        let mut address = DeliveryAddress {
            name: "Asha Rao".to_string(),
            email: "asha@example.com".to_string(),
            phone: "9876543210".to_string(),
            address: "12 MG Road".to_string(),
            city: "Bengaluru".to_string(),
            pincode: "560001".to_string(),
        };
        assert!(address.is_complete());

        address.city = "   ".to_string();
        assert!(!address.is_complete());
    }

    #[test]
    fn test_document_wire_format_is_camel_case() {
        let history = OrderHistory {
            user_id: UserId::new("u-1"),
            orders: vec![],
        };
        let json = serde_json::to_value(&history).unwrap();
        assert!(json.get("userId").is_some());

        let review = Review {
            user_id: UserId::new("u-1"),
            name: "asha@example.com".to_string(),
            comment: "Great".to_string(),
            rating: 5,
            product_name: "Headphones".to_string(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&review).unwrap();
        assert!(json.get("Name").is_some());
        assert!(json.get("productName").is_some());
    }
}
