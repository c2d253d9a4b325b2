//! Wire types for the REST backend.
//!
//! Field names follow the backend's JSON (`camelCase`, Mongo-style `_id`).
//! Everything the backend may omit is `#[serde(default)]`.

use chrono::{DateTime, Utc};
use pgcards_core::{
    AddressId, CartItemId, CurrencyCode, OrderId, OrderStatus, PaymentIntentId,
    PaymentIntentStatus, Price, ProductId, UserId, UserRole, VariantId,
};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::ApiError;

// =============================================================================
// Auth
// =============================================================================

/// User record returned by the auth endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    #[serde(rename = "_id", alias = "id")]
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: UserRole,
}

/// Successful login/register/Google response.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: AuthUser,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// Google Identity Services ID token forwarded to the backend.
#[derive(Debug, Serialize)]
pub struct GoogleLoginRequest<'a> {
    pub credential: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ForgotPasswordRequest<'a> {
    pub email: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ResetPasswordRequest<'a> {
    pub password: &'a str,
}

/// Generic `{ "msg": "..." }` acknowledgement.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageResponse {
    #[serde(default, alias = "message")]
    pub msg: String,
}

// =============================================================================
// Catalog
// =============================================================================

/// A card product (PVC, metal, wood...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id", alias = "id")]
    pub id: ProductId,
    #[serde(alias = "name")]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub material: String,
    #[serde(alias = "price")]
    pub base_price: Decimal,
    #[serde(default)]
    pub currency: CurrencyCode,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub variants: Vec<Variant>,
    #[serde(default)]
    pub images: Vec<String>,
}

/// A colour/finish option with an optional price override.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    #[serde(rename = "_id", alias = "id")]
    pub id: VariantId,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub finish: String,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub images: Vec<String>,
}

impl Product {
    /// Look up a variant by ID.
    #[must_use]
    pub fn variant(&self, id: &VariantId) -> Option<&Variant> {
        self.variants.iter().find(|v| &v.id == id)
    }

    /// Unit price for an optional variant: the variant's own price when it
    /// has one, otherwise the product's base price.
    #[must_use]
    pub fn price_for(&self, variant_id: Option<&VariantId>) -> Price {
        let amount = variant_id
            .and_then(|id| self.variant(id))
            .and_then(|v| v.price)
            .unwrap_or(self.base_price);
        Price {
            amount,
            currency_code: self.currency,
        }
    }

    /// First image of the variant, falling back to the product's images.
    #[must_use]
    pub fn image_for(&self, variant_id: Option<&VariantId>) -> Option<&str> {
        variant_id
            .and_then(|id| self.variant(id))
            .and_then(|v| v.images.first())
            .or_else(|| self.images.first())
            .map(String::as_str)
    }
}

impl Variant {
    /// Human label, e.g. "Black / Matte".
    #[must_use]
    pub fn label(&self) -> String {
        match (self.color.is_empty(), self.finish.is_empty()) {
            (false, false) => format!("{} / {}", self.color, self.finish),
            (false, true) => self.color.clone(),
            (true, false) => self.finish.clone(),
            (true, true) => "Default".to_string(),
        }
    }
}

/// Admin create/update payload for a product.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub title: String,
    pub description: String,
    pub category: String,
    pub material: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub base_price: Decimal,
    pub currency: CurrencyCode,
    pub features: Vec<String>,
    pub variants: Vec<VariantInput>,
    pub images: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantInput {
    pub color: String,
    pub finish: String,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
}

// =============================================================================
// Cart
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CartResponse {
    #[serde(default)]
    pub items: Vec<CartItem>,
}

/// A line in the user's cart. Stored quantity is informational only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    #[serde(rename = "_id", alias = "id")]
    pub id: CartItemId,
    pub product: Product,
    #[serde(default, alias = "variant")]
    pub variant_id: Option<VariantId>,
    #[serde(default = "one")]
    pub quantity: u32,
}

const fn one() -> u32 {
    1
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest<'a> {
    pub product_id: &'a ProductId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<&'a VariantId>,
    pub quantity: u32,
}

// =============================================================================
// Addresses
// =============================================================================

/// Shipping address.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(
        rename = "_id",
        alias = "id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<AddressId>,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub line1: String,
    #[serde(default)]
    pub line2: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub is_default: bool,
}

impl Address {
    /// Single-line rendering for lists.
    #[must_use]
    pub fn one_line(&self) -> String {
        [
            self.line1.as_str(),
            self.line2.as_str(),
            self.city.as_str(),
            self.state.as_str(),
            self.postal_code.as_str(),
            self.country.as_str(),
        ]
        .iter()
        .filter(|part| !part.trim().is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(", ")
    }
}

// =============================================================================
// Coupons
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ApplyCouponRequest<'a> {
    pub code: &'a str,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

/// Discount granted by a coupon, in the currency's standard unit.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponResponse {
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub msg: String,
}

// =============================================================================
// Payments
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentIntentRequest<'a> {
    /// Amount in minor units (cents/fils).
    pub amount: i64,
    pub user_id: &'a UserId,
    pub product_id: &'a ProductId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<&'a VariantId>,
    pub is_trial: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponse {
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub order_id: Option<OrderId>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub payment_intent_id: Option<PaymentIntentId>,
}

/// Payment intent held by the checkout while the card form is shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub order_id: OrderId,
    pub client_secret: String,
    pub payment_intent_id: PaymentIntentId,
    /// Amount in minor units, for display and sanity checks.
    pub amount: i64,
    pub currency: CurrencyCode,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentRequest<'a> {
    pub payment_intent_id: &'a PaymentIntentId,
    pub order_id: &'a OrderId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmPaymentResponse {
    pub status: PaymentIntentStatus,
    #[serde(default, alias = "message")]
    pub msg: String,
}

// =============================================================================
// Orders & admin
// =============================================================================

/// An order as listed for the customer or the admin panel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id", alias = "id")]
    pub id: OrderId,
    #[serde(default, alias = "productName")]
    pub product_title: String,
    #[serde(default)]
    pub variant_label: Option<String>,
    #[serde(default)]
    pub amount: Decimal,
    #[serde(default)]
    pub currency: CurrencyCode,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
}

impl Order {
    #[must_use]
    pub const fn total(&self) -> Price {
        Price {
            amount: self.amount,
            currency_code: self.currency,
        }
    }

    /// Order date for display, `-` when unknown.
    #[must_use]
    pub fn placed_on(&self) -> String {
        self.created_at
            .map_or_else(|| "-".to_string(), |d| d.format("%d %b %Y").to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    #[serde(rename = "_id", alias = "id")]
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

/// Read a list that the backend returns either bare or wrapped in an object
/// under `key` (`{"orders": [...]}`).
pub(crate) fn list_from<T: DeserializeOwned>(
    value: serde_json::Value,
    key: &str,
) -> Result<Vec<T>, ApiError> {
    match value {
        serde_json::Value::Array(_) => Ok(serde_json::from_value(value)?),
        serde_json::Value::Object(mut map) => match map.remove(key) {
            Some(list) => Ok(serde_json::from_value(list)?),
            None => Err(ApiError::Unexpected(format!("missing `{key}` list"))),
        },
        _ => Err(ApiError::Unexpected(format!("`{key}` is not a list"))),
    }
}

/// Read an object that the backend returns either bare or wrapped under
/// `key` (`{"msg": "...", "profile": {...}}`).
pub(crate) fn object_from<T: DeserializeOwned>(
    value: serde_json::Value,
    key: &str,
) -> Result<T, ApiError> {
    match value {
        serde_json::Value::Object(mut map) if map.contains_key(key) => {
            let inner = map.remove(key).unwrap_or_default();
            Ok(serde_json::from_value(inner)?)
        }
        other => Ok(serde_json::from_value(other)?),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sample_product() -> Product {
        serde_json::from_value(json!({
            "_id": "p1",
            "title": "Metal Card",
            "basePrice": 899,
            "currency": "AED",
            "variants": [
                { "_id": "v-black", "color": "Black", "finish": "Matte", "price": 999 },
                { "_id": "v-gold", "color": "Gold", "finish": "" }
            ],
            "images": ["https://res.cloudinary.com/pg/image/upload/card.png"]
        }))
        .unwrap()
    }

    #[test]
    fn test_variant_price_wins_over_base() {
        let product = sample_product();
        let price = product.price_for(Some(&VariantId::new("v-black")));
        assert_eq!(price.amount, Decimal::from(999));
    }

    #[test]
    fn test_variant_without_price_uses_base() {
        let product = sample_product();
        assert_eq!(
            product.price_for(Some(&VariantId::new("v-gold"))).amount,
            Decimal::from(899)
        );
        assert_eq!(product.price_for(None).amount, Decimal::from(899));
        assert_eq!(
            product.price_for(Some(&VariantId::new("missing"))).amount,
            Decimal::from(899)
        );
    }

    #[test]
    fn test_variant_label() {
        let product = sample_product();
        assert_eq!(product.variants[0].label(), "Black / Matte");
        assert_eq!(product.variants[1].label(), "Gold");
    }

    #[test]
    fn test_cart_item_quantity_defaults_to_one() {
        let item: CartItem = serde_json::from_value(json!({
            "_id": "c1",
            "product": serde_json::to_value(sample_product()).unwrap(),
            "variant": "v-black"
        }))
        .unwrap();
        assert_eq!(item.quantity, 1);
        assert_eq!(item.variant_id, Some(VariantId::new("v-black")));
    }

    #[test]
    fn test_payment_intent_response_missing_fields() {
        let resp: PaymentIntentResponse =
            serde_json::from_value(json!({ "msg": "Something else" })).unwrap();
        assert!(resp.client_secret.is_none());
        assert!(resp.order_id.is_none());
    }

    #[test]
    fn test_list_from_bare_and_wrapped() {
        let bare: Vec<MessageResponse> =
            list_from(json!([{ "msg": "a" }, { "message": "b" }]), "items").unwrap();
        assert_eq!(bare.len(), 2);
        assert_eq!(bare[1].msg, "b");

        let wrapped: Vec<MessageResponse> =
            list_from(json!({ "items": [{ "msg": "a" }], "count": 1 }), "items").unwrap();
        assert_eq!(wrapped.len(), 1);

        assert!(list_from::<MessageResponse>(json!({ "other": [] }), "items").is_err());
    }

    #[test]
    fn test_object_from_bare_and_wrapped() {
        let wrapped: MessageResponse =
            object_from(json!({ "msg": "outer", "data": { "msg": "inner" } }), "data").unwrap();
        assert_eq!(wrapped.msg, "inner");
        let bare: MessageResponse = object_from(json!({ "msg": "bare" }), "data").unwrap();
        assert_eq!(bare.msg, "bare");
    }

    #[test]
    fn test_address_one_line_skips_blanks() {
        let address = Address {
            line1: "Office 12".to_string(),
            city: "Dubai".to_string(),
            country: "AE".to_string(),
            ..Address::default()
        };
        assert_eq!(address.one_line(), "Office 12, Dubai, AE");
    }

    #[test]
    fn test_product_input_prices_serialize_as_numbers() {
        let input = VariantInput {
            color: "Black".to_string(),
            finish: "Matte".to_string(),
            price: Some(Decimal::from(999)),
        };
        let value = serde_json::to_value(&input).unwrap();
        assert!(value["price"].is_number());
    }
}
