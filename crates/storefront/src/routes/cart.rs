//! Cart route handlers.
//!
//! Cart operations use HTMX for dynamic updates without full page reloads.
//! The cart lives in the backend against the signed-in user. Every card is
//! personalised, so each line counts as one card whatever quantity the
//! backend reports.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::HeaderMap,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use pgcards_core::{CartItemId, ProductId, VariantId};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{PageContext, is_htmx};
use crate::backend::CartItem;
use crate::checkout::cart::{line_price, subtotal};
use crate::filters;
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::Flash;
use crate::state::AppState;

/// Cart item display data for templates.
#[derive(Clone)]
pub struct CartItemView {
    pub id: String,
    pub product_id: String,
    pub variant_id: Option<String>,
    pub title: String,
    pub variant_label: Option<String>,
    pub price: String,
    pub image: Option<String>,
    /// Link that starts checkout for this line.
    pub checkout_url: String,
}

impl From<&CartItem> for CartItemView {
    fn from(item: &CartItem) -> Self {
        let product = &item.product;
        let variant = item.variant_id.as_ref().and_then(|id| product.variant(id));
        let mut checkout_url = format!(
            "/checkout?product={}",
            urlencoding::encode(product.id.as_str())
        );
        if let Some(variant) = variant {
            checkout_url.push_str("&variant=");
            checkout_url.push_str(&urlencoding::encode(variant.id.as_str()));
        }

        Self {
            id: item.id.to_string(),
            product_id: product.id.to_string(),
            variant_id: variant.map(|v| v.id.to_string()),
            title: product.title.clone(),
            variant_label: variant.map(crate::backend::Variant::label),
            price: line_price(item).to_string(),
            image: product
                .image_for(item.variant_id.as_ref())
                .map(str::to_string),
            checkout_url,
        }
    }
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub subtotal: String,
    pub item_count: usize,
}

impl CartView {
    /// Create an empty cart.
    #[must_use]
    pub fn empty() -> Self {
        Self::from(&[][..])
    }
}

impl From<&[CartItem]> for CartView {
    fn from(items: &[CartItem]) -> Self {
        Self {
            items: items.iter().map(CartItemView::from).collect(),
            subtotal: subtotal(items).to_string(),
            item_count: items.len(),
        }
    }
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: String,
    #[serde(default)]
    pub variant_id: Option<String>,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub item_id: String,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub page: PageContext,
    pub cart: CartView,
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: usize,
}

/// Display cart page.
#[instrument(skip(state, user, page))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    page: PageContext,
) -> impl IntoResponse {
    let cart = match state.backend().get_cart(&user.token()).await {
        Ok(items) => CartView::from(items.as_slice()),
        Err(e) => {
            tracing::warn!(user_id = %user.id, "Failed to fetch cart: {e}");
            CartView::empty()
        }
    };

    CartShowTemplate { page, cart }
}

/// Add a card to the cart (HTMX).
///
/// HTMX requests get an empty body and a `cartUpdated` trigger; plain form
/// posts are redirected to the cart with a toast.
#[instrument(skip(state, user, session, headers))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<AddToCartForm>,
) -> Response {
    let product_id = ProductId::new(form.product_id.trim());
    let variant_id = form
        .variant_id
        .filter(|v| !v.trim().is_empty())
        .map(|v| VariantId::new(v.trim()));

    match state
        .backend()
        .add_to_cart(&user.token(), &product_id, variant_id.as_ref())
        .await
    {
        Ok(()) => {
            if is_htmx(&headers) {
                return AppendHeaders([("HX-Trigger", "cartUpdated")]).into_response();
            }
            Flash::success(&session, "Added to your cart").await;
            Redirect::to("/cart").into_response()
        }
        Err(e) => {
            tracing::warn!(product_id = %product_id, "Failed to add to cart: {e}");
            if is_htmx(&headers) {
                let message = e.user_message();
                return AppendHeaders([
                    ("HX-Reswap", "none".to_string()),
                    ("HX-Trigger", toast_trigger(&message)),
                ])
                .into_response();
            }
            Flash::error(&session, e.user_message()).await;
            Redirect::to(&format!("/shop/{}", urlencoding::encode(product_id.as_str())))
                .into_response()
        }
    }
}

/// Remove a line (HTMX), returning the refreshed items fragment.
#[instrument(skip(state, user, session, headers))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<RemoveFromCartForm>,
) -> Response {
    let token = user.token();
    let item_id = CartItemId::new(form.item_id.trim());

    if let Err(e) = state.backend().remove_from_cart(&token, &item_id).await {
        tracing::warn!(item_id = %item_id, "Failed to remove cart item: {e}");
        Flash::error(&session, e.user_message()).await;
    }

    if !is_htmx(&headers) {
        return Redirect::to("/cart").into_response();
    }

    let cart = match state.backend().get_cart(&token).await {
        Ok(items) => CartView::from(items.as_slice()),
        Err(e) => {
            tracing::warn!("Failed to refetch cart: {e}");
            CartView::empty()
        }
    };

    (
        AppendHeaders([("HX-Trigger", "cartUpdated")]),
        CartItemsTemplate { cart },
    )
        .into_response()
}

/// Cart count badge (HTMX). Signed-out visitors see zero.
pub async fn count(State(state): State<AppState>, OptionalAuth(user): OptionalAuth) -> Response {
    let count = match user {
        Some(user) => state
            .backend()
            .get_cart(&user.token())
            .await
            .map_or(0, |items| items.len()),
        None => 0,
    };
    CartCountTemplate { count }.into_response()
}

/// `HX-Trigger` payload that raises a toast on the client.
pub(crate) fn toast_trigger(message: &str) -> String {
    serde_json::json!({ "toast": { "kind": "error", "message": message } }).to_string()
}

#[cfg(test)]
mod tests {
    use pgcards_core::CurrencyCode;
    use rust_decimal::Decimal;

    use super::*;
    use crate::backend::{Product, Variant};

    fn item(variant: Option<&str>) -> CartItem {
        CartItem {
            id: CartItemId::new("line-1"),
            product: Product {
                id: ProductId::new("p 1"),
                title: "Wood Card".to_string(),
                description: String::new(),
                category: String::new(),
                material: String::new(),
                base_price: Decimal::from(899),
                currency: CurrencyCode::AED,
                features: Vec::new(),
                variants: vec![Variant {
                    id: VariantId::new("oak"),
                    color: "Oak".to_string(),
                    finish: String::new(),
                    price: Some(Decimal::from(999)),
                    images: Vec::new(),
                }],
                images: Vec::new(),
            },
            variant_id: variant.map(VariantId::new),
            quantity: 4,
        }
    }

    #[test]
    fn test_item_view_prices_variant_and_links_checkout() {
        let view = CartItemView::from(&item(Some("oak")));
        assert_eq!(view.price, "AED 999.00");
        assert_eq!(view.variant_label.as_deref(), Some("Oak"));
        assert_eq!(view.checkout_url, "/checkout?product=p%201&variant=oak");
    }

    #[test]
    fn test_cart_view_counts_lines_not_quantity() {
        let items = vec![item(Some("oak")), item(None)];
        let view = CartView::from(items.as_slice());
        assert_eq!(view.item_count, 2);
        assert_eq!(view.subtotal, "AED 1898.00");
    }

    #[test]
    fn test_toast_trigger_is_json() {
        let trigger = toast_trigger("Out of stock");
        let value: serde_json::Value = serde_json::from_str(&trigger).unwrap_or_default();
        assert_eq!(value["toast"]["message"], "Out of stock");
    }
}
