//! Shipping address book.

use pgcards_core::AddressId;
use reqwest::Method;
use secrecy::SecretString;
use tracing::instrument;

use super::types::{Address, list_from};
use super::{ApiError, BackendClient};

impl BackendClient {
    /// List saved addresses.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip_all)]
    pub async fn list_addresses(&self, token: &SecretString) -> Result<Vec<Address>, ApiError> {
        let value: serde_json::Value = self
            .execute(self.request(Method::GET, "/address", Some(token)))
            .await?;
        list_from(value, "addresses")
    }

    /// Save a new address.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` when the backend refuses the fields.
    #[instrument(skip_all)]
    pub async fn create_address(
        &self,
        token: &SecretString,
        address: &Address,
    ) -> Result<(), ApiError> {
        self.execute_empty(
            self.request(Method::POST, "/address", Some(token))
                .json(address),
        )
        .await
    }

    /// Replace an existing address.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token, address), fields(address_id = %id))]
    pub async fn update_address(
        &self,
        token: &SecretString,
        id: &AddressId,
        address: &Address,
    ) -> Result<(), ApiError> {
        let path = format!("/address/{}", urlencoding::encode(id.as_str()));
        self.execute_empty(self.request(Method::PUT, &path, Some(token)).json(address))
            .await
    }

    /// Delete an address.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(address_id = %id))]
    pub async fn delete_address(&self, token: &SecretString, id: &AddressId) -> Result<(), ApiError> {
        let path = format!("/address/{}", urlencoding::encode(id.as_str()));
        self.execute_empty(self.request(Method::DELETE, &path, Some(token)))
            .await
    }
}
