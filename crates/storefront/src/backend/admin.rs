//! Admin-only endpoints: users, products, orders.

use pgcards_core::{OrderId, OrderStatus, ProductId, UserId};
use reqwest::Method;
use secrecy::SecretString;
use tracing::instrument;

use super::types::{AdminUser, Order, Product, ProductInput, UpdateOrderStatusRequest, list_from};
use super::{ApiError, BackendClient};

impl BackendClient {
    /// All registered users.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip_all)]
    pub async fn admin_list_users(&self, token: &SecretString) -> Result<Vec<AdminUser>, ApiError> {
        let value: serde_json::Value = self
            .execute(self.request(Method::GET, "/admin/users", Some(token)))
            .await?;
        list_from(value, "users")
    }

    /// Delete a user account.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(user_id = %id))]
    pub async fn admin_delete_user(&self, token: &SecretString, id: &UserId) -> Result<(), ApiError> {
        let path = format!("/admin/users/{}", urlencoding::encode(id.as_str()));
        self.execute_empty(self.request(Method::DELETE, &path, Some(token)))
            .await
    }

    /// All products, bypassing the catalog cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip_all)]
    pub async fn admin_list_products(&self, token: &SecretString) -> Result<Vec<Product>, ApiError> {
        let value: serde_json::Value = self
            .execute(self.request(Method::GET, "/admin/products", Some(token)))
            .await?;
        list_from(value, "products")
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` when the backend refuses the fields.
    #[instrument(skip_all, fields(title = %input.title))]
    pub async fn admin_create_product(
        &self,
        token: &SecretString,
        input: &ProductInput,
    ) -> Result<(), ApiError> {
        self.execute_empty(
            self.request(Method::POST, "/admin/products", Some(token))
                .json(input),
        )
        .await?;
        self.invalidate_catalog().await;
        Ok(())
    }

    /// Replace a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token, input), fields(product_id = %id))]
    pub async fn admin_update_product(
        &self,
        token: &SecretString,
        id: &ProductId,
        input: &ProductInput,
    ) -> Result<(), ApiError> {
        let path = format!("/admin/products/{}", urlencoding::encode(id.as_str()));
        self.execute_empty(self.request(Method::PUT, &path, Some(token)).json(input))
            .await?;
        self.invalidate_catalog().await;
        Ok(())
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(product_id = %id))]
    pub async fn admin_delete_product(
        &self,
        token: &SecretString,
        id: &ProductId,
    ) -> Result<(), ApiError> {
        let path = format!("/admin/products/{}", urlencoding::encode(id.as_str()));
        self.execute_empty(self.request(Method::DELETE, &path, Some(token)))
            .await?;
        self.invalidate_catalog().await;
        Ok(())
    }

    /// Every order in the shop.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip_all)]
    pub async fn admin_list_orders(&self, token: &SecretString) -> Result<Vec<Order>, ApiError> {
        let value: serde_json::Value = self
            .execute(self.request(Method::GET, "/admin/orders", Some(token)))
            .await?;
        let mut orders: Vec<Order> = list_from(value, "orders")?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    /// Move an order to a new status.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(order_id = %id, status = %status))]
    pub async fn admin_update_order_status(
        &self,
        token: &SecretString,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<(), ApiError> {
        let path = format!("/admin/orders/{}/status", urlencoding::encode(id.as_str()));
        let body = UpdateOrderStatusRequest { status };
        self.execute_empty(self.request(Method::PUT, &path, Some(token)).json(&body))
            .await
    }
}
