//! PG Cards REST backend client.
//!
//! # Architecture
//!
//! - The backend is the source of truth for users, products, carts, orders
//!   and profiles. The storefront keeps no copy beyond the session.
//! - Calls carry the signed-in user's bearer token when one is available.
//! - Catalog reads are cached in memory via `moka` (5 minute TTL).
//!
//! Endpoints are grouped by resource in submodules (`auth`, `catalog`,
//! `cart`, `addresses`, `coupons`, `payments`, `profiles`, `orders`,
//! `admin`), each adding methods to [`BackendClient`].
//!
//! # Example
//!
//! ```rust,ignore
//! use pgcards_storefront::backend::BackendClient;
//!
//! let client = BackendClient::new(&config.api);
//! let products = client.list_products().await?;
//! let profile = client.get_profile(&profile_id).await?;
//! ```

mod addresses;
mod admin;
mod auth;
mod cache;
mod cart;
mod catalog;
mod coupons;
mod orders;
mod payments;
mod profiles;
pub mod types;

pub use types::*;

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::ApiConfig;
use cache::CacheValue;

/// Errors that can occur when calling the REST backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connect, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or expired bearer token.
    #[error("Unauthorized")]
    Unauthorized,

    /// Backend refused the input (4xx with a message).
    #[error("Rejected ({status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },

    /// Backend failed (5xx or unexpected status).
    #[error("HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Response parsed but lacks a field the flow depends on.
    #[error("Unexpected response: {0}")]
    Unexpected(String),
}

impl ApiError {
    /// Message suitable for a toast.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected { message, .. } => message.clone(),
            Self::NotFound(_) => "We couldn't find that.".to_string(),
            Self::Unauthorized => "Please sign in again.".to_string(),
            Self::RateLimited(_) => "Too many requests, please wait a moment.".to_string(),
            Self::Http(_) | Self::Parse(_) | Self::Status { .. } | Self::Unexpected(_) => {
                "Something went wrong talking to our servers. Please try again.".to_string()
            }
        }
    }

    /// True for failures the visitor cannot fix by changing input.
    #[must_use]
    pub const fn is_server_side(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Parse(_) | Self::Status { .. } | Self::Unexpected(_)
        )
    }
}

// =============================================================================
// BackendClient
// =============================================================================

/// Client for the PG Cards REST backend.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    base_url: String,
    cache: Cache<String, CacheValue>,
}

impl BackendClient {
    /// Create a new backend client.
    #[must_use]
    pub fn new(config: &ApiConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(500)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("pgcards-storefront/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self {
            inner: Arc::new(BackendClientInner {
                client,
                base_url: config.base_url.clone(),
                cache,
            }),
        }
    }

    /// Base URL this client talks to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Start a request against `path` (leading slash, relative to the base URL).
    fn request(&self, method: Method, path: &str, token: Option<&SecretString>) -> RequestBuilder {
        let url = format!("{}{path}", self.inner.base_url);
        let builder = self.inner.client.request(method, url);
        match token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    /// Send a request and parse the JSON body.
    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response_text = self.send(request).await?;
        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %truncate(&response_text, 500),
                "Failed to parse backend response"
            );
            ApiError::Parse(e)
        })
    }

    /// Send a request whose response body is not needed.
    async fn execute_empty(&self, request: RequestBuilder) -> Result<(), ApiError> {
        self.send(request).await.map(|_| ())
    }

    /// Send a request, check the status and return the raw body text.
    async fn send(&self, request: RequestBuilder) -> Result<String, ApiError> {
        let response = request.send().await?;
        let status = response.status();

        // Check for rate limiting
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ApiError::RateLimited(retry_after));
        }

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;

        if status.is_success() {
            return Ok(response_text);
        }

        let message = extract_message(&response_text)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());

        match status {
            StatusCode::NOT_FOUND => Err(ApiError::NotFound(message)),
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
            s if s.is_client_error() => {
                tracing::debug!(status = %s, message = %message, "Backend rejected request");
                Err(ApiError::Rejected {
                    status: s.as_u16(),
                    message,
                })
            }
            s => {
                tracing::error!(
                    status = %s,
                    body = %truncate(&response_text, 500),
                    "Backend returned non-success status"
                );
                Err(ApiError::Status {
                    status: s.as_u16(),
                    message,
                })
            }
        }
    }

    /// Quick reachability probe for the readiness endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached.
    pub async fn ping(&self) -> Result<(), ApiError> {
        self.inner
            .client
            .get(format!("{}/products", self.inner.base_url))
            .timeout(Duration::from_secs(3))
            .send()
            .await?;
        Ok(())
    }

    /// Drop every cached catalog entry (after admin edits).
    pub async fn invalidate_catalog(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }
}

/// Pull a human message out of an error body (`{"msg": ..}` or `{"message": ..}`).
fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["msg", "message", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .map(str::to_string)
        .filter(|m| !m.trim().is_empty())
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_message_variants() {
        assert_eq!(
            extract_message(r#"{"msg":"Invalid credentials"}"#).as_deref(),
            Some("Invalid credentials")
        );
        assert_eq!(
            extract_message(r#"{"message":"Product not found"}"#).as_deref(),
            Some("Product not found")
        );
        assert_eq!(extract_message(r#"{"msg":"  "}"#), None);
        assert_eq!(extract_message("<html>502</html>"), None);
    }

    #[test]
    fn test_rejected_message_reaches_user() {
        let err = ApiError::Rejected {
            status: 400,
            message: "Coupon expired".to_string(),
        };
        assert_eq!(err.user_message(), "Coupon expired");
        assert!(!err.is_server_side());
    }

    #[test]
    fn test_server_errors_are_generic() {
        let err = ApiError::Status {
            status: 500,
            message: "stack trace".to_string(),
        };
        assert!(!err.user_message().contains("stack"));
        assert!(err.is_server_side());
    }
}
