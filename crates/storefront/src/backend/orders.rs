//! Customer order history.

use reqwest::Method;
use secrecy::SecretString;
use tracing::instrument;

use super::types::{Order, list_from};
use super::{ApiError, BackendClient};

impl BackendClient {
    /// Orders placed by the signed-in user, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip_all)]
    pub async fn list_orders(&self, token: &SecretString) -> Result<Vec<Order>, ApiError> {
        let value: serde_json::Value = self
            .execute(self.request(Method::GET, "/orders", Some(token)))
            .await?;
        let mut orders: Vec<Order> = list_from(value, "orders")?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }
}
