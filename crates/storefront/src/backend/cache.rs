//! Cache types for catalog responses.

use super::types::Product;

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    Products(Vec<Product>),
}

/// Cache key for the full catalog listing.
pub const PRODUCTS_KEY: &str = "products";

/// Cache key for a single product.
pub fn product_key(id: &str) -> String {
    format!("product:{id}")
}
