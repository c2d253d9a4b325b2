//! Shop route handlers: catalog and product detail.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use pgcards_core::{Price, ProductId, VariantId};
use serde::Deserialize;
use tracing::instrument;

use super::PageContext;
use crate::backend::{ApiError, Product};
use crate::error::{AppError, Result};
use crate::filters;
use crate::state::AppState;

// =============================================================================
// Views
// =============================================================================

/// Product tile for grids.
#[derive(Clone)]
pub struct ProductCard {
    pub id: String,
    pub title: String,
    pub category: String,
    pub material: String,
    /// Lowest price across base and variants, e.g. "AED 899.00".
    pub price: String,
    pub has_price_range: bool,
    pub image: Option<String>,
}

impl From<&Product> for ProductCard {
    fn from(product: &Product) -> Self {
        let lowest = product
            .variants
            .iter()
            .filter_map(|v| v.price)
            .chain(std::iter::once(product.base_price))
            .min()
            .unwrap_or(product.base_price);
        let has_price_range = product
            .variants
            .iter()
            .filter_map(|v| v.price)
            .any(|p| p != lowest);

        Self {
            id: product.id.to_string(),
            title: product.title.clone(),
            category: product.category.clone(),
            material: product.material.clone(),
            price: Price {
                amount: lowest,
                currency_code: product.currency,
            }
            .to_string(),
            has_price_range,
            image: product.images.first().cloned(),
        }
    }
}

/// A selectable variant on the product page.
#[derive(Clone)]
pub struct VariantOption {
    pub id: String,
    pub label: String,
    pub price: String,
    pub selected: bool,
}

/// Product detail display data.
#[derive(Clone)]
pub struct ProductDetail {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub material: String,
    pub features: Vec<String>,
    /// Price of the selected variant (or base price).
    pub price: String,
    pub image: Option<String>,
    pub gallery: Vec<String>,
    pub variants: Vec<VariantOption>,
    pub selected_variant: Option<String>,
}

impl ProductDetail {
    fn new(product: &Product, selected: Option<&VariantId>) -> Self {
        // Unknown variant IDs fall back to the first variant
        let selected = selected
            .and_then(|id| product.variant(id))
            .or_else(|| product.variants.first())
            .map(|v| v.id.clone());

        Self {
            id: product.id.to_string(),
            title: product.title.clone(),
            description: product.description.clone(),
            category: product.category.clone(),
            material: product.material.clone(),
            features: product.features.clone(),
            price: product.price_for(selected.as_ref()).to_string(),
            image: product.image_for(selected.as_ref()).map(str::to_string),
            gallery: product.images.clone(),
            variants: product
                .variants
                .iter()
                .map(|v| VariantOption {
                    id: v.id.to_string(),
                    label: v.label(),
                    price: product.price_for(Some(&v.id)).to_string(),
                    selected: selected.as_ref() == Some(&v.id),
                })
                .collect(),
            selected_variant: selected.map(|id| id.to_string()),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Catalog page template.
#[derive(Template, WebTemplate)]
#[template(path = "shop/index.html")]
pub struct ShopIndexTemplate {
    pub page: PageContext,
    pub products: Vec<ProductCard>,
    /// Set when the catalog could not be loaded.
    pub error: Option<String>,
}

/// Product detail template.
#[derive(Template, WebTemplate)]
#[template(path = "shop/show.html")]
pub struct ShopShowTemplate {
    pub page: PageContext,
    pub product: ProductDetail,
}

/// Product detail query parameters.
#[derive(Debug, Deserialize)]
pub struct ShowQuery {
    pub variant: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the catalog.
#[instrument(skip(state, page))]
pub async fn index(State(state): State<AppState>, page: PageContext) -> impl IntoResponse {
    let (products, error) = match state.backend().list_products().await {
        Ok(products) => (products.iter().map(ProductCard::from).collect(), None),
        Err(e) => {
            tracing::error!("Failed to fetch products: {e}");
            (Vec::new(), Some(e.user_message()))
        }
    };

    ShopIndexTemplate {
        page,
        products,
        error,
    }
}

/// Display a product with its variants.
///
/// # Errors
///
/// Returns 404 when the backend has no such product.
#[instrument(skip(state, page))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ShowQuery>,
    page: PageContext,
) -> Result<impl IntoResponse> {
    let product = state
        .backend()
        .get_product(&ProductId::new(id.as_str()))
        .await
        .map_err(|e| match e {
            ApiError::NotFound(_) => AppError::NotFound(format!("Product {id}")),
            other => AppError::Api(other),
        })?;

    let selected = query
        .variant
        .filter(|v| !v.trim().is_empty())
        .map(VariantId::new);

    Ok(ShopShowTemplate {
        page,
        product: ProductDetail::new(&product, selected.as_ref()),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pgcards_core::CurrencyCode;
    use rust_decimal::Decimal;

    use super::*;
    use crate::backend::Variant;

    fn product() -> Product {
        Product {
            id: ProductId::new("p1"),
            title: "Metal Card".to_string(),
            description: String::new(),
            category: "metal".to_string(),
            material: "Steel".to_string(),
            base_price: Decimal::from(899),
            currency: CurrencyCode::AED,
            features: vec!["NFC".to_string()],
            variants: vec![
                Variant {
                    id: VariantId::new("black"),
                    color: "Black".to_string(),
                    finish: "Matte".to_string(),
                    price: Some(Decimal::from(999)),
                    images: vec!["https://cdn/black.png".to_string()],
                },
                Variant {
                    id: VariantId::new("gold"),
                    color: "Gold".to_string(),
                    finish: String::new(),
                    price: None,
                    images: Vec::new(),
                },
            ],
            images: vec!["https://cdn/base.png".to_string()],
        }
    }

    #[test]
    fn test_card_shows_lowest_price() {
        let card = ProductCard::from(&product());
        assert_eq!(card.price, "AED 899.00");
        assert!(card.has_price_range);
    }

    #[test]
    fn test_detail_selects_variant() {
        let detail = ProductDetail::new(&product(), Some(&VariantId::new("black")));
        assert_eq!(detail.price, "AED 999.00");
        assert_eq!(detail.image.as_deref(), Some("https://cdn/black.png"));
        assert!(detail.variants[0].selected);
        assert!(!detail.variants[1].selected);
    }

    #[test]
    fn test_detail_unknown_variant_falls_back_to_first() {
        let detail = ProductDetail::new(&product(), Some(&VariantId::new("nope")));
        assert_eq!(detail.selected_variant.as_deref(), Some("black"));
    }
}
