//! Product route handlers.
//!
//! Listing supports the storefront's search box, category chips, and sort
//! menu; filtering and sorting happen here against the cached catalog.
//! Product detail carries the reviews and their average rating.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use novakart_core::{OrderStatus, ProductId, UserId};

use crate::backend::types::{Product, Review};
use crate::error::{AppError, Result};
use crate::middleware::{OptionalUser, RequireUser};
use crate::state::AppState;

// =============================================================================
// View Types
// =============================================================================

/// Product display data.
#[derive(Debug, Clone, Serialize)]
pub struct ProductView {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub category: String,
    pub image: String,
    pub price: Decimal,
    pub discount: u8,
    pub discounted_price: Decimal,
    pub quantity: u32,
    pub in_stock: bool,
    pub average_rating: f64,
    pub review_count: usize,
}

impl ProductView {
    fn new(product: &Product, reviews: &[Review], state: &AppState) -> Self {
        let currency = state.config().payment.currency;
        Self {
            id: product.id.clone(),
            name: product.name.clone(),
            description: product.description.clone(),
            category: product.category.clone(),
            image: product.image.clone(),
            price: product.price,
            discount: product.discount.as_u8(),
            discounted_price: product.discounted_price(currency).amount,
            quantity: product.quantity,
            in_stock: product.is_available(),
            average_rating: average_rating(reviews),
            review_count: reviews.len(),
        }
    }
}

/// Review display data.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewView {
    pub name: String,
    pub comment: String,
    pub rating: u8,
    pub created_at: DateTime<Utc>,
}

impl From<&Review> for ReviewView {
    fn from(review: &Review) -> Self {
        Self {
            name: review.name.clone(),
            comment: review.comment.clone(),
            rating: review.rating,
            created_at: review.created_at,
        }
    }
}

/// Product listing response.
#[derive(Debug, Serialize)]
pub struct ProductListResponse {
    pub products: Vec<ProductView>,
}

/// Product detail response.
#[derive(Debug, Serialize)]
pub struct ProductDetailResponse {
    pub product: ProductView,
    pub reviews: Vec<ReviewView>,
    /// Whether the current user has a delivered purchase of this product and
    /// may therefore review it.
    pub can_review: bool,
}

// =============================================================================
// Query & Form Types
// =============================================================================

/// Sort orders offered by the product listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ProductSort {
    #[serde(rename = "price-low-to-high")]
    PriceLowToHigh,
    #[serde(rename = "price-high-to-low")]
    PriceHighToLow,
    #[serde(rename = "rating-high-to-low")]
    RatingHighToLow,
}

/// Product listing query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Case-insensitive name substring search.
    pub search: Option<String>,
    /// Category filter; "All" (or absence) passes everything.
    pub category: Option<String>,
    pub sort: Option<ProductSort>,
}

/// Review submission form data.
#[derive(Debug, Deserialize)]
pub struct ReviewForm {
    pub rating: u8,
    pub comment: String,
}

// =============================================================================
// Helpers
// =============================================================================

/// Mean review rating, 0.0 when there are no reviews.
fn average_rating(reviews: &[Review]) -> f64 {
    if reviews.is_empty() {
        return 0.0;
    }

    #[allow(clippy::cast_precision_loss)] // Review counts are tiny
    let count = reviews.len() as f64;
    let total: u32 = reviews.iter().map(|r| u32::from(r.rating)).sum();
    f64::from(total) / count
}

/// Apply the listing filters to a product.
fn matches_filters(product: &Product, query: &ListQuery) -> bool {
    if !product.stock {
        return false;
    }

    if let Some(category) = &query.category
        && category != "All"
        && *category != product.category
    {
        return false;
    }

    if let Some(search) = &query.search
        && !product.name.to_lowercase().contains(&search.to_lowercase())
    {
        return false;
    }

    true
}

/// Sort the assembled views in place.
fn sort_views(views: &mut [ProductView], sort: Option<ProductSort>) {
    match sort {
        Some(ProductSort::PriceLowToHigh) => views.sort_by(|a, b| a.price.cmp(&b.price)),
        Some(ProductSort::PriceHighToLow) => views.sort_by(|a, b| b.price.cmp(&a.price)),
        Some(ProductSort::RatingHighToLow) => views.sort_by(|a, b| {
            b.average_rating
                .partial_cmp(&a.average_rating)
                .unwrap_or(std::cmp::Ordering::Equal)
        }),
        None => {}
    }
}

/// Whether the user has a delivered purchase of this product.
async fn has_delivered_purchase(
    state: &AppState,
    user_id: &UserId,
    product_id: &ProductId,
) -> Result<bool> {
    let Some(history) = state.data().get_order_history(user_id).await? else {
        return Ok(false);
    };

    Ok(history.orders.iter().any(|order| {
        order
            .products
            .iter()
            .any(|item| item.id == *product_id && item.status == OrderStatus::Delivered)
    }))
}

// =============================================================================
// Handlers
// =============================================================================

/// List the catalog, filtered and sorted.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ProductListResponse>> {
    let products = state.data().get_products().await?;

    let mut views = Vec::new();
    for product in products.iter().filter(|p| matches_filters(p, &query)) {
        let reviews = state.data().list_reviews(&product.id).await?;
        views.push(ProductView::new(product, &reviews, &state));
    }

    sort_views(&mut views, query.sort);

    Ok(Json(ProductListResponse { products: views }))
}

/// Show one product with its reviews.
#[instrument(skip(state, user))]
pub async fn show(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductDetailResponse>> {
    let product = state.data().get_product(&id).await?;

    let mut reviews = state.data().list_reviews(&id).await?;
    reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let can_review = match &user {
        Some(user) => has_delivered_purchase(&state, &user.uid, &id).await?,
        None => false,
    };

    Ok(Json(ProductDetailResponse {
        product: ProductView::new(&product, &reviews, &state),
        reviews: reviews.iter().map(ReviewView::from).collect(),
        can_review,
    }))
}

/// Submit a review for a product.
///
/// Only users with a delivered purchase of the product may review it.
#[instrument(skip(state, user, form), fields(user_id = %user.0.uid, product_id = %id))]
pub async fn submit_review(
    State(state): State<AppState>,
    user: RequireUser,
    Path(id): Path<ProductId>,
    Json(form): Json<ReviewForm>,
) -> Result<impl IntoResponse> {
    let RequireUser(user) = user;

    if form.comment.trim().is_empty() {
        return Err(AppError::BadRequest("Review comment cannot be empty".to_owned()));
    }
    if !(1..=5).contains(&form.rating) {
        return Err(AppError::BadRequest("Rating must be between 1 and 5".to_owned()));
    }

    if !has_delivered_purchase(&state, &user.uid, &id).await? {
        return Err(AppError::Forbidden(
            "Only delivered purchases can be reviewed".to_owned(),
        ));
    }

    let product = state.data().get_product(&id).await?;

    let review = Review {
        user_id: user.uid,
        name: user.email,
        comment: form.comment,
        rating: form.rating,
        product_name: product.name,
        created_at: Utc::now(),
    };

    state.data().add_review(&id, &review).await?;

    Ok((StatusCode::CREATED, Json(ReviewView::from(&review))))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use novakart_core::DiscountPercent;

    fn product(name: &str, category: &str, price: &str, stock: bool) -> Product {
        Product {
            id: ProductId::new(format!("p-{name}")),
            name: name.to_string(),
            description: String::new(),
            category: category.to_string(),
            image: String::new(),
            price: price.parse().unwrap(),
            discount: DiscountPercent::default(),
            quantity: 5,
            stock,
        }
    }

    fn review(rating: u8) -> Review {
        Review {
            user_id: UserId::new("u-1"),
            name: "user@example.com".to_string(),
            comment: "fine".to_string(),
            rating,
            product_name: "Thing".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_average_rating() {
        assert!((average_rating(&[]) - 0.0).abs() < f64::EPSILON);
        let reviews = vec![review(5), review(4), review(3)];
        assert!((average_rating(&reviews) - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_out_of_stock_products_are_not_listed() {
        let query = ListQuery::default();
        assert!(matches_filters(&product("a", "Electronics", "10", true), &query));
        assert!(!matches_filters(&product("b", "Electronics", "10", false), &query));
    }

    #[test]
    fn test_category_all_passes_everything() {
        let query = ListQuery {
            category: Some("All".to_string()),
            ..ListQuery::default()
        };
        assert!(matches_filters(&product("a", "Electronics", "10", true), &query));
        assert!(matches_filters(&product("b", "Fashion", "10", true), &query));
    }

    #[test]
    fn test_category_filter_is_exact() {
        let query = ListQuery {
            category: Some("Fashion".to_string()),
            ..ListQuery::default()
        };
        assert!(!matches_filters(&product("a", "Electronics", "10", true), &query));
        assert!(matches_filters(&product("b", "Fashion", "10", true), &query));
    }

    #[test]
    fn test_search_is_case_insensitive_substring() {
        let query = ListQuery {
            search: Some("PHONE".to_string()),
            ..ListQuery::default()
        };
        assert!(matches_filters(&product("Headphones", "Audio", "10", true), &query));
        assert!(!matches_filters(&product("Keyboard", "Audio", "10", true), &query));
    }

    #[test]
    fn test_sort_orders() {
        let make_view = |name: &str, price: &str, rating: f64| ProductView {
            id: ProductId::new(name),
            name: name.to_string(),
            description: String::new(),
            category: String::new(),
            image: String::new(),
            price: price.parse().unwrap(),
            discount: 0,
            discounted_price: price.parse().unwrap(),
            quantity: 1,
            in_stock: true,
            average_rating: rating,
            review_count: 0,
        };

        let mut views = vec![
            make_view("a", "30", 2.0),
            make_view("b", "10", 5.0),
            make_view("c", "20", 4.0),
        ];

        sort_views(&mut views, Some(ProductSort::PriceLowToHigh));
        let names: Vec<_> = views.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["b", "c", "a"]);

        sort_views(&mut views, Some(ProductSort::PriceHighToLow));
        let names: Vec<_> = views.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["a", "c", "b"]);

        sort_views(&mut views, Some(ProductSort::RatingHighToLow));
        let names: Vec<_> = views.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["b", "c", "a"]);
    }
}
