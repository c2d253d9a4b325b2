//! Rate limiting middleware using governor and `tower_governor`.
//!
//! Provides configurable rate limiters for different endpoint categories:
//! - `auth_rate_limiter`: Strict limits for login, registration and password reset (~10/min)
//! - `upload_rate_limiter`: Image uploads and QR exports, which decode and encode images (~30/min)

use std::net::IpAddr;
use std::sync::Arc;

use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

// =============================================================================
// Client IP Key Extractor
// =============================================================================

/// Key extractor that reads the client IP from proxy headers, CDN header
/// first, then `X-Forwarded-For`, then `X-Real-IP`.
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let headers = req.headers();

        // CDN-provided real client IP
        if let Some(ip) = headers
            .get("cf-connecting-ip")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<IpAddr>().ok())
        {
            return Ok(ip);
        }

        // Try X-Forwarded-For (first IP in the chain)
        if let Some(ip) = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
        {
            return Ok(ip);
        }

        // Try X-Real-IP
        if let Some(ip) = headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
        {
            return Ok(ip);
        }

        // Direct connection (local development, tests)
        req.extensions()
            .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
            .map(|info| info.0.ip())
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

// =============================================================================
// Rate Limiter Configuration
// =============================================================================

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

fn limiter(replenish_secs: u64, burst: u32) -> Option<RateLimiterLayer> {
    GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(replenish_secs)
        .burst_size(burst)
        .finish()
        .map(|config| GovernorLayer::new(Arc::new(config)))
}

/// Rate limiter for auth endpoints: ~10 requests per minute per IP.
///
/// Replenishes 1 token every 6 seconds with a burst of 5, which stops
/// credential stuffing against the backend's login endpoint.
#[must_use]
pub fn auth_rate_limiter() -> Option<RateLimiterLayer> {
    limiter(6, 5)
}

/// Rate limiter for image uploads and QR exports: ~30 requests per minute per IP.
///
/// Replenishes 1 token every 2 seconds with a burst of 10 (a carousel
/// upload is one request carrying several files).
#[must_use]
pub fn upload_rate_limiter() -> Option<RateLimiterLayer> {
    limiter(2, 10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limiters_build() {
        assert!(auth_rate_limiter().is_some());
        assert!(upload_rate_limiter().is_some());
    }

    #[test]
    fn test_forwarded_for_takes_first_hop() {
        use tower_governor::key_extractor::KeyExtractor;

        let request = axum::http::Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .body(())
            .unwrap_or_default();
        let ip = ClientIpKeyExtractor.extract(&request).ok();
        assert_eq!(ip, "203.0.113.7".parse().ok());
    }
}
