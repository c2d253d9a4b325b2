//! Cart endpoints.

use pgcards_core::{CartItemId, ProductId, VariantId};
use reqwest::Method;
use secrecy::SecretString;
use tracing::instrument;

use super::types::{AddToCartRequest, CartItem, CartResponse};
use super::{ApiError, BackendClient};

impl BackendClient {
    /// Get the signed-in user's cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip_all)]
    pub async fn get_cart(&self, token: &SecretString) -> Result<Vec<CartItem>, ApiError> {
        let cart: CartResponse = self
            .execute(self.request(Method::GET, "/cart", Some(token)))
            .await?;
        Ok(cart.items)
    }

    /// Add a product to the cart. Quantity is always one card.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(product_id = %product_id))]
    pub async fn add_to_cart(
        &self,
        token: &SecretString,
        product_id: &ProductId,
        variant_id: Option<&VariantId>,
    ) -> Result<(), ApiError> {
        let body = AddToCartRequest {
            product_id,
            variant_id,
            quantity: 1,
        };
        self.execute_empty(self.request(Method::POST, "/cart", Some(token)).json(&body))
            .await
    }

    /// Remove a line from the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(item_id = %item_id))]
    pub async fn remove_from_cart(
        &self,
        token: &SecretString,
        item_id: &CartItemId,
    ) -> Result<(), ApiError> {
        let path = format!("/cart/{}", urlencoding::encode(item_id.as_str()));
        self.execute_empty(self.request(Method::DELETE, &path, Some(token)))
            .await
    }
}
