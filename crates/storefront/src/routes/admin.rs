//! Admin panel: users, products and orders.
//!
//! Every handler takes [`RequireAdmin`]; other roles get a 403.

use std::str::FromStr;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use pgcards_core::{CurrencyCode, OrderId, OrderStatus, ProductId, UserId};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::PageContext;
use super::account::OrderView;
use crate::backend::{AdminUser, Product, ProductInput, VariantInput};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{CspNonce, RequireAdmin};
use crate::models::Flash;
use crate::state::AppState;

// =============================================================================
// Views
// =============================================================================

#[derive(Clone)]
pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
    pub joined: String,
}

impl From<&AdminUser> for UserRow {
    fn from(user: &AdminUser) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            is_admin: user.role.is_admin(),
            joined: user
                .created_at
                .map_or_else(|| "-".to_string(), |d| d.format("%d %b %Y").to_string()),
        }
    }
}

#[derive(Clone)]
pub struct ProductRow {
    pub id: String,
    pub title: String,
    pub category: String,
    pub price: String,
    pub variants: usize,
}

impl From<&Product> for ProductRow {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.to_string(),
            title: product.title.clone(),
            category: product.category.clone(),
            price: product.price_for(None).to_string(),
            variants: product.variants.len(),
        }
    }
}

/// Status dropdown entry.
#[derive(Clone)]
pub struct StatusOption {
    pub value: &'static str,
    pub selected: bool,
}

#[derive(Clone)]
pub struct AdminOrderRow {
    pub order: OrderView,
    pub statuses: Vec<StatusOption>,
}

impl AdminOrderRow {
    fn new(order: &crate::backend::Order) -> Self {
        Self {
            order: OrderView::from(order),
            statuses: OrderStatus::ALL
                .iter()
                .map(|&s| StatusOption {
                    value: s.as_str(),
                    selected: s == order.status,
                })
                .collect(),
        }
    }
}

// =============================================================================
// Product form
// =============================================================================

/// Product editor fields. List fields are one entry per line; variants are
/// written `color | finish | price` with the price optional.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProductForm {
    pub title: String,
    pub description: String,
    pub category: String,
    pub material: String,
    pub base_price: String,
    pub currency: String,
    pub features: String,
    pub variants: String,
    pub images: String,
}

fn lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_variant(line: &str) -> std::result::Result<VariantInput, String> {
    let mut parts = line.split('|').map(str::trim);
    let color = parts.next().unwrap_or_default().to_string();
    let finish = parts.next().unwrap_or_default().to_string();
    let price = match parts.next().filter(|p| !p.is_empty()) {
        Some(p) => Some(
            Decimal::from_str(p).map_err(|_| format!("Invalid variant price \"{p}\""))?,
        ),
        None => None,
    };
    if parts.next().is_some() {
        return Err(format!("Variant \"{line}\" has too many fields"));
    }
    if color.is_empty() && finish.is_empty() {
        return Err(format!("Variant \"{line}\" needs a colour or finish"));
    }
    Ok(VariantInput {
        color,
        finish,
        price,
    })
}

impl ProductForm {
    /// Validate and build the backend payload.
    ///
    /// # Errors
    ///
    /// Returns a message for the first invalid field.
    pub fn into_input(self) -> std::result::Result<ProductInput, String> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err("Title is required".to_string());
        }
        let base_price = Decimal::from_str(self.base_price.trim())
            .map_err(|_| "Base price must be a number".to_string())?;
        if base_price.is_sign_negative() {
            return Err("Base price cannot be negative".to_string());
        }
        let currency = if self.currency.trim().is_empty() {
            CurrencyCode::default()
        } else {
            CurrencyCode::from_str(&self.currency).map_err(|e| e.to_string())?
        };
        let variants = self
            .variants
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(parse_variant)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(ProductInput {
            title: title.to_string(),
            description: self.description.trim().to_string(),
            category: self.category.trim().to_string(),
            material: self.material.trim().to_string(),
            base_price,
            currency,
            features: lines(&self.features),
            variants,
            images: lines(&self.images),
        })
    }
}

impl From<&Product> for ProductForm {
    fn from(product: &Product) -> Self {
        let variants = product
            .variants
            .iter()
            .map(|v| match v.price {
                Some(price) => format!("{} | {} | {price}", v.color, v.finish),
                None => format!("{} | {}", v.color, v.finish),
            })
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            title: product.title.clone(),
            description: product.description.clone(),
            category: product.category.clone(),
            material: product.material.clone(),
            base_price: product.base_price.to_string(),
            currency: product.currency.code().to_string(),
            features: product.features.join("\n"),
            variants,
            images: product.images.join("\n"),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

// =============================================================================
// Templates
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "admin/index.html")]
pub struct AdminIndexTemplate {
    pub page: PageContext,
    pub user_count: Option<usize>,
    pub product_count: Option<usize>,
    pub order_count: Option<usize>,
    pub pending_orders: Option<usize>,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/users.html")]
pub struct UsersTemplate {
    pub page: PageContext,
    pub users: Vec<UserRow>,
    pub error: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/products.html")]
pub struct ProductsTemplate {
    pub page: PageContext,
    pub products: Vec<ProductRow>,
    pub error: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/product_form.html")]
pub struct ProductFormTemplate {
    pub page: PageContext,
    pub heading: &'static str,
    pub action: String,
    pub product: ProductForm,
    pub currencies: Vec<&'static str>,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/orders.html")]
pub struct AdminOrdersTemplate {
    pub page: PageContext,
    pub orders: Vec<AdminOrderRow>,
    pub error: Option<String>,
}

const CURRENCIES: [CurrencyCode; 5] = [
    CurrencyCode::AED,
    CurrencyCode::USD,
    CurrencyCode::EUR,
    CurrencyCode::GBP,
    CurrencyCode::INR,
];

fn currency_codes() -> Vec<&'static str> {
    CURRENCIES.iter().map(|c| c.code()).collect()
}

// =============================================================================
// Overview
// =============================================================================

/// Counts across users, products and orders.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    page: PageContext,
) -> impl IntoResponse {
    let token = admin.token();
    let backend = state.backend();
    let (users, products, orders) = tokio::join!(
        backend.admin_list_users(&token),
        backend.admin_list_products(&token),
        backend.admin_list_orders(&token),
    );

    let pending_orders = orders.as_ref().ok().map(|orders| {
        orders
            .iter()
            .filter(|o| o.status == OrderStatus::Pending)
            .count()
    });

    AdminIndexTemplate {
        page,
        user_count: users
            .inspect_err(|e| tracing::warn!("Failed to count users: {e}"))
            .ok()
            .map(|u| u.len()),
        product_count: products
            .inspect_err(|e| tracing::warn!("Failed to count products: {e}"))
            .ok()
            .map(|p| p.len()),
        order_count: orders
            .inspect_err(|e| tracing::warn!("Failed to count orders: {e}"))
            .ok()
            .map(|o| o.len()),
        pending_orders,
    }
}

// =============================================================================
// Users
// =============================================================================

#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn users(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    page: PageContext,
) -> impl IntoResponse {
    let (users, error) = match state.backend().admin_list_users(&admin.token()).await {
        Ok(users) => (users.iter().map(UserRow::from).collect(), None),
        Err(e) => {
            tracing::warn!("Failed to list users: {e}");
            (Vec::new(), Some(e.user_message()))
        }
    };
    UsersTemplate { page, users, error }
}

#[instrument(skip_all, fields(admin_id = %admin.id, user_id = %id))]
pub async fn delete_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    session: Session,
    Path(id): Path<String>,
) -> Redirect {
    if id == admin.id.as_str() {
        Flash::error(&session, "You cannot delete your own account here").await;
        return Redirect::to("/admin/users");
    }
    match state
        .backend()
        .admin_delete_user(&admin.token(), &UserId::new(id.as_str()))
        .await
    {
        Ok(()) => {
            tracing::info!(user_id = %id, "User deleted");
            Flash::success(&session, "User deleted").await;
        }
        Err(e) => {
            tracing::warn!("Failed to delete user: {e}");
            Flash::error(&session, e.user_message()).await;
        }
    }
    Redirect::to("/admin/users")
}

// =============================================================================
// Products
// =============================================================================

#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn products(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    page: PageContext,
) -> impl IntoResponse {
    let (products, error) = match state.backend().admin_list_products(&admin.token()).await {
        Ok(list) => (list.iter().map(ProductRow::from).collect(), None),
        Err(e) => {
            tracing::warn!("Failed to list products: {e}");
            (Vec::new(), Some(e.user_message()))
        }
    };
    ProductsTemplate {
        page,
        products,
        error,
    }
}

pub async fn new_product(RequireAdmin(_admin): RequireAdmin, page: PageContext) -> impl IntoResponse {
    ProductFormTemplate {
        page,
        heading: "New product",
        action: "/admin/products".to_string(),
        product: ProductForm {
            currency: CurrencyCode::default().code().to_string(),
            ..ProductForm::default()
        },
        currencies: currency_codes(),
    }
}

#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn create_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    session: Session,
    Form(form): Form<ProductForm>,
) -> Redirect {
    let input = match form.into_input() {
        Ok(input) => input,
        Err(message) => {
            Flash::error(&session, message).await;
            return Redirect::to("/admin/products/new");
        }
    };
    match state
        .backend()
        .admin_create_product(&admin.token(), &input)
        .await
    {
        Ok(()) => {
            Flash::success(&session, format!("Created {}", input.title)).await;
            Redirect::to("/admin/products")
        }
        Err(e) => {
            tracing::warn!("Failed to create product: {e}");
            Flash::error(&session, e.user_message()).await;
            Redirect::to("/admin/products/new")
        }
    }
}

/// # Errors
///
/// Returns 404 when the product does not exist.
#[instrument(skip_all, fields(admin_id = %admin.id, product_id = %id))]
pub async fn edit_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    session: Session,
    nonce: CspNonce,
) -> Result<Response> {
    let product_id = ProductId::new(id.as_str());
    let product = state
        .backend()
        .admin_list_products(&admin.token())
        .await?
        .into_iter()
        .find(|p| p.id == product_id)
        .ok_or_else(|| AppError::NotFound(format!("Product {id}")))?;

    let page = PageContext::build(&state, &session, "/admin/products", nonce.0).await;
    Ok(ProductFormTemplate {
        page,
        heading: "Edit product",
        action: format!("/admin/products/{}", urlencoding::encode(&id)),
        product: ProductForm::from(&product),
        currencies: currency_codes(),
    }
    .into_response())
}

#[instrument(skip_all, fields(admin_id = %admin.id, product_id = %id))]
pub async fn update_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    session: Session,
    Path(id): Path<String>,
    Form(form): Form<ProductForm>,
) -> Redirect {
    let edit_url = format!("/admin/products/{}/edit", urlencoding::encode(&id));
    let input = match form.into_input() {
        Ok(input) => input,
        Err(message) => {
            Flash::error(&session, message).await;
            return Redirect::to(&edit_url);
        }
    };
    match state
        .backend()
        .admin_update_product(&admin.token(), &ProductId::new(id.as_str()), &input)
        .await
    {
        Ok(()) => {
            Flash::success(&session, format!("Updated {}", input.title)).await;
            Redirect::to("/admin/products")
        }
        Err(e) => {
            tracing::warn!("Failed to update product: {e}");
            Flash::error(&session, e.user_message()).await;
            Redirect::to(&edit_url)
        }
    }
}

#[instrument(skip_all, fields(admin_id = %admin.id, product_id = %id))]
pub async fn delete_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    session: Session,
    Path(id): Path<String>,
) -> Redirect {
    match state
        .backend()
        .admin_delete_product(&admin.token(), &ProductId::new(id.as_str()))
        .await
    {
        Ok(()) => Flash::success(&session, "Product deleted").await,
        Err(e) => {
            tracing::warn!("Failed to delete product: {e}");
            Flash::error(&session, e.user_message()).await;
        }
    }
    Redirect::to("/admin/products")
}

// =============================================================================
// Orders
// =============================================================================

#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn orders(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    page: PageContext,
) -> impl IntoResponse {
    let (orders, error) = match state.backend().admin_list_orders(&admin.token()).await {
        Ok(list) => (list.iter().map(AdminOrderRow::new).collect(), None),
        Err(e) => {
            tracing::warn!("Failed to list orders: {e}");
            (Vec::new(), Some(e.user_message()))
        }
    };
    AdminOrdersTemplate {
        page,
        orders,
        error,
    }
}

#[instrument(skip_all, fields(admin_id = %admin.id, order_id = %id))]
pub async fn update_order_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    session: Session,
    Path(id): Path<String>,
    Form(form): Form<StatusForm>,
) -> Redirect {
    let status = match OrderStatus::from_str(&form.status) {
        Ok(status) => status,
        Err(message) => {
            Flash::error(&session, message).await;
            return Redirect::to("/admin/orders");
        }
    };
    match state
        .backend()
        .admin_update_order_status(&admin.token(), &OrderId::new(id.as_str()), status)
        .await
    {
        Ok(()) => {
            tracing::info!(order_id = %id, status = %status, "Order status changed");
            Flash::success(&session, format!("Order marked {status}")).await;
        }
        Err(e) => {
            tracing::warn!("Failed to update order status: {e}");
            Flash::error(&session, e.user_message()).await;
        }
    }
    Redirect::to("/admin/orders")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form() -> ProductForm {
        ProductForm {
            title: " Metal Card ".to_string(),
            base_price: "999".to_string(),
            currency: "aed".to_string(),
            features: "NFC\n\n  QR code  \n".to_string(),
            variants: "Black | Matte | 1099\nGold | Brushed\n".to_string(),
            images: "https://res.cloudinary.com/pg/a.png".to_string(),
            ..ProductForm::default()
        }
    }

    #[test]
    fn test_product_form_parses_lists_and_variants() {
        let input = form().into_input().unwrap();
        assert_eq!(input.title, "Metal Card");
        assert_eq!(input.currency, CurrencyCode::AED);
        assert_eq!(input.features, vec!["NFC", "QR code"]);
        assert_eq!(
            input.variants,
            vec![
                VariantInput {
                    color: "Black".to_string(),
                    finish: "Matte".to_string(),
                    price: Some(Decimal::from(1099)),
                },
                VariantInput {
                    color: "Gold".to_string(),
                    finish: "Brushed".to_string(),
                    price: None,
                },
            ]
        );
    }

    #[test]
    fn test_product_form_rejects_bad_price() {
        let err = ProductForm {
            base_price: "cheap".to_string(),
            ..form()
        }
        .into_input()
        .unwrap_err();
        assert_eq!(err, "Base price must be a number");
    }

    #[test]
    fn test_product_form_rejects_bad_variant_price() {
        let err = ProductForm {
            variants: "Black | Matte | lots".to_string(),
            ..form()
        }
        .into_input()
        .unwrap_err();
        assert!(err.contains("lots"));
    }

    #[test]
    fn test_status_options_select_current() {
        let order = crate::backend::Order {
            id: OrderId::new("o1"),
            product_title: "PVC Card".to_string(),
            variant_label: None,
            amount: Decimal::from(199),
            currency: CurrencyCode::AED,
            status: OrderStatus::from_str("shipped").unwrap(),
            created_at: None,
            customer_name: None,
            customer_email: None,
        };
        let row = AdminOrderRow::new(&order);
        assert_eq!(row.statuses.len(), OrderStatus::ALL.len());
        assert_eq!(
            row.statuses
                .iter()
                .filter(|s| s.selected)
                .map(|s| s.value)
                .collect::<Vec<_>>(),
            vec!["shipped"]
        );
    }
}
