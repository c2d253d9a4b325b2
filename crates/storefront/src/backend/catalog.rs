//! Product catalog reads (cached).

use pgcards_core::ProductId;
use reqwest::Method;
use tracing::{debug, instrument};

use super::cache::{CacheValue, PRODUCTS_KEY, product_key};
use super::types::{Product, list_from, object_from};
use super::{ApiError, BackendClient};

impl BackendClient {
    /// List every product in the catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>, ApiError> {
        if let Some(CacheValue::Products(products)) = self.inner.cache.get(PRODUCTS_KEY).await {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let value: serde_json::Value = self
            .execute(self.request(Method::GET, "/products", None))
            .await?;
        let products: Vec<Product> = list_from(value, "products")?;

        self.inner
            .cache
            .insert(
                PRODUCTS_KEY.to_string(),
                CacheValue::Products(products.clone()),
            )
            .await;

        Ok(products)
    }

    /// Get a single product by ID.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the product does not exist.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: &ProductId) -> Result<Product, ApiError> {
        let cache_key = product_key(id.as_str());
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let path = format!("/products/{}", urlencoding::encode(id.as_str()));
        let value: serde_json::Value = self.execute(self.request(Method::GET, &path, None)).await?;
        let product: Product = object_from(value, "product")?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }
}
