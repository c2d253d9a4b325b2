//! Account route handlers: order history and saved addresses.
//!
//! These routes require authentication.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use pgcards_core::AddressId;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::PageContext;
use crate::backend::{Address, Order};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::Flash;
use crate::state::AppState;

// =============================================================================
// Views
// =============================================================================

/// Order display data for templates.
#[derive(Clone)]
pub struct OrderView {
    pub id: String,
    pub product: String,
    pub variant: Option<String>,
    pub total: String,
    pub status: &'static str,
    pub placed_on: String,
    pub customer: Option<String>,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        let customer = match (&order.customer_name, &order.customer_email) {
            (Some(name), Some(email)) => Some(format!("{name} <{email}>")),
            (Some(name), None) => Some(name.clone()),
            (None, Some(email)) => Some(email.clone()),
            (None, None) => None,
        };
        Self {
            id: order.id.to_string(),
            product: order.product_title.clone(),
            variant: order.variant_label.clone(),
            total: order.total().to_string(),
            status: order.status.as_str(),
            placed_on: order.placed_on(),
            customer,
        }
    }
}

/// Address display data for templates.
#[derive(Clone)]
pub struct AddressView {
    pub id: String,
    pub full_name: String,
    pub summary: String,
    pub phone: String,
    pub is_default: bool,
}

impl From<&Address> for AddressView {
    fn from(address: &Address) -> Self {
        Self {
            id: address.id.as_ref().map(ToString::to_string).unwrap_or_default(),
            full_name: address.full_name.clone(),
            summary: address.one_line(),
            phone: address.phone.clone(),
            is_default: address.is_default,
        }
    }
}

/// Address form data.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AddressForm {
    pub full_name: String,
    pub line1: String,
    pub line2: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub phone: String,
    /// Checkbox: present when ticked.
    pub is_default: Option<String>,
}

impl AddressForm {
    /// Validate and convert to the backend record.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first missing required field.
    pub fn into_address(self) -> std::result::Result<Address, String> {
        let required = [
            (&self.full_name, "Full name"),
            (&self.line1, "Address line 1"),
            (&self.city, "City"),
            (&self.country, "Country"),
        ];
        if let Some((_, label)) = required.iter().find(|(v, _)| v.trim().is_empty()) {
            return Err(format!("{label} is required"));
        }

        Ok(Address {
            id: None,
            full_name: self.full_name.trim().to_string(),
            line1: self.line1.trim().to_string(),
            line2: self.line2.trim().to_string(),
            city: self.city.trim().to_string(),
            state: self.state.trim().to_string(),
            postal_code: self.postal_code.trim().to_string(),
            country: self.country.trim().to_string(),
            phone: self.phone.trim().to_string(),
            is_default: self.is_default.is_some(),
        })
    }
}

impl From<&Address> for AddressForm {
    fn from(address: &Address) -> Self {
        Self {
            full_name: address.full_name.clone(),
            line1: address.line1.clone(),
            line2: address.line2.clone(),
            city: address.city.clone(),
            state: address.state.clone(),
            postal_code: address.postal_code.clone(),
            country: address.country.clone(),
            phone: address.phone.clone(),
            is_default: address.is_default.then(|| "on".to_string()),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "orders.html")]
pub struct OrdersTemplate {
    pub page: PageContext,
    pub orders: Vec<OrderView>,
    pub error: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "account/addresses.html")]
pub struct AddressesTemplate {
    pub page: PageContext,
    pub addresses: Vec<AddressView>,
    pub error: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "account/address_form.html")]
pub struct AddressFormTemplate {
    pub page: PageContext,
    pub heading: &'static str,
    pub action: String,
    pub address: AddressForm,
}

// =============================================================================
// Orders
// =============================================================================

/// Display the signed-in user's orders.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    page: PageContext,
) -> impl IntoResponse {
    let (orders, error) = match state.backend().list_orders(&user.token()).await {
        Ok(orders) => (orders.iter().map(OrderView::from).collect(), None),
        Err(e) => {
            tracing::warn!("Failed to fetch orders: {e}");
            (Vec::new(), Some(e.user_message()))
        }
    };
    OrdersTemplate {
        page,
        orders,
        error,
    }
}

// =============================================================================
// Addresses
// =============================================================================

/// List saved addresses.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn addresses(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    page: PageContext,
) -> impl IntoResponse {
    let (addresses, error) = match state.backend().list_addresses(&user.token()).await {
        Ok(list) => (list.iter().map(AddressView::from).collect(), None),
        Err(e) => {
            tracing::warn!("Failed to fetch addresses: {e}");
            (Vec::new(), Some(e.user_message()))
        }
    };
    AddressesTemplate {
        page,
        addresses,
        error,
    }
}

/// New address form.
pub async fn new_address(RequireAuth(_user): RequireAuth, page: PageContext) -> impl IntoResponse {
    AddressFormTemplate {
        page,
        heading: "Add an address",
        action: "/account/addresses".to_string(),
        address: AddressForm::default(),
    }
}

/// Create an address.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn create_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Form(form): Form<AddressForm>,
) -> Redirect {
    let address = match form.into_address() {
        Ok(address) => address,
        Err(message) => {
            Flash::error(&session, message).await;
            return Redirect::to("/account/addresses/new");
        }
    };
    match state
        .backend()
        .create_address(&user.token(), &address)
        .await
    {
        Ok(_) => Flash::success(&session, "Address saved").await,
        Err(e) => {
            tracing::warn!("Failed to create address: {e}");
            Flash::error(&session, e.user_message()).await;
            return Redirect::to("/account/addresses/new");
        }
    }
    Redirect::to("/account/addresses")
}

/// Edit form for an existing address.
///
/// # Errors
///
/// Returns 404 when the address is not one of the user's.
#[instrument(skip_all, fields(user_id = %user.id, address_id = %id))]
pub async fn edit_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
    page: PageContext,
) -> Result<Response> {
    let address_id = AddressId::new(id.as_str());
    let address = state
        .backend()
        .list_addresses(&user.token())
        .await?
        .into_iter()
        .find(|a| a.id.as_ref() == Some(&address_id))
        .ok_or_else(|| AppError::NotFound(format!("Address {id}")))?;

    Ok(AddressFormTemplate {
        page,
        heading: "Edit address",
        action: format!("/account/addresses/{}", urlencoding::encode(&id)),
        address: AddressForm::from(&address),
    }
    .into_response())
}

/// Update an address.
#[instrument(skip_all, fields(user_id = %user.id, address_id = %id))]
pub async fn update_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Path(id): Path<String>,
    Form(form): Form<AddressForm>,
) -> Redirect {
    let edit_url = format!("/account/addresses/{}/edit", urlencoding::encode(&id));
    let address = match form.into_address() {
        Ok(address) => address,
        Err(message) => {
            Flash::error(&session, message).await;
            return Redirect::to(&edit_url);
        }
    };
    if let Err(e) = state
        .backend()
        .update_address(&user.token(), &AddressId::new(id.as_str()), &address)
        .await
    {
        tracing::warn!("Failed to update address: {e}");
        Flash::error(&session, e.user_message()).await;
        return Redirect::to(&edit_url);
    }
    Flash::success(&session, "Address updated").await;
    Redirect::to("/account/addresses")
}

/// Delete an address.
#[instrument(skip_all, fields(user_id = %user.id, address_id = %id))]
pub async fn delete_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Path(id): Path<String>,
) -> Redirect {
    match state
        .backend()
        .delete_address(&user.token(), &AddressId::new(id.as_str()))
        .await
    {
        Ok(()) => Flash::success(&session, "Address removed").await,
        Err(e) => {
            tracing::warn!("Failed to delete address: {e}");
            Flash::error(&session, e.user_message()).await;
        }
    }
    Redirect::to("/account/addresses")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use pgcards_core::{CurrencyCode, OrderId, OrderStatus};
    use rust_decimal::Decimal;

    use super::*;

    fn form() -> AddressForm {
        AddressForm {
            full_name: " Sam Lee ".to_string(),
            line1: "12 Marina Walk".to_string(),
            city: "Dubai".to_string(),
            country: "AE".to_string(),
            is_default: Some("on".to_string()),
            ..AddressForm::default()
        }
    }

    #[test]
    fn test_address_form_trims_and_reads_checkbox() {
        let address = form().into_address().unwrap();
        assert_eq!(address.full_name, "Sam Lee");
        assert!(address.is_default);
        assert_eq!(address.one_line(), "12 Marina Walk, Dubai, AE");
    }

    #[test]
    fn test_address_form_names_missing_field() {
        let err = AddressForm {
            city: String::new(),
            ..form()
        }
        .into_address()
        .unwrap_err();
        assert_eq!(err, "City is required");
    }

    #[test]
    fn test_order_view_formats_total_and_customer() {
        let order = Order {
            id: OrderId::new("o1"),
            product_title: "Metal Card".to_string(),
            variant_label: Some("Black / Matte".to_string()),
            amount: Decimal::from(999),
            currency: CurrencyCode::AED,
            status: OrderStatus::default(),
            created_at: chrono::Utc.with_ymd_and_hms(2026, 3, 9, 10, 0, 0).single(),
            customer_name: Some("Sam".to_string()),
            customer_email: Some("sam@example.com".to_string()),
        };
        let view = OrderView::from(&order);
        assert_eq!(view.total, "AED 999.00");
        assert_eq!(view.placed_on, "09 Mar 2026");
        assert_eq!(view.customer.as_deref(), Some("Sam <sam@example.com>"));
    }
}
