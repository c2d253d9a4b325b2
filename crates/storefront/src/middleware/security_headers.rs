//! Security headers middleware for XSS, clickjacking, and isolation protection.
//!
//! Adds restrictive security headers to all responses. The CSP is built per
//! request so inline scripts can be allowed by nonce. Third-party origins are
//! limited to what checkout and sign-in need:
//!
//! - `js.stripe.com` / `api.stripe.com` / `hooks.stripe.com`: card element and 3-D Secure
//! - `accounts.google.com`: Google sign-in button
//! - `res.cloudinary.com`: profile and product images
//! - `unpkg.com`: HTMX
//! - `www.googletagmanager.com`: GA4, when configured

use axum::{
    extract::Request,
    http::{
        HeaderName, HeaderValue,
        header::{
            CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};

use super::CspNonce;

/// Build the CSP header value for a nonce.
///
/// Style attributes are allowed (`style-src-attr 'unsafe-inline'`) because
/// card previews carry the visitor's accent colour inline; `<style>` elements
/// still need the nonce.
#[must_use]
pub fn content_security_policy(nonce: &str) -> String {
    format!(
        "default-src 'none'; \
         script-src 'self' 'nonce-{nonce}' https://unpkg.com https://js.stripe.com https://accounts.google.com/gsi/client https://www.googletagmanager.com; \
         style-src 'self' 'nonce-{nonce}' https://accounts.google.com/gsi/style; \
         style-src-attr 'unsafe-inline'; \
         font-src 'self'; \
         img-src 'self' data: blob: https://res.cloudinary.com https://*.stripe.com https://www.googletagmanager.com; \
         connect-src 'self' https://api.stripe.com https://accounts.google.com/gsi/ https://*.google-analytics.com; \
         frame-src https://js.stripe.com https://hooks.stripe.com https://accounts.google.com/gsi/; \
         object-src 'none'; \
         base-uri 'self'; \
         form-action 'self'; \
         frame-ancestors 'none'; \
         upgrade-insecure-requests"
    )
}

/// Add security headers to all responses.
///
/// Headers applied:
/// - `X-Frame-Options: DENY` - Prevent clickjacking
/// - `X-Content-Type-Options: nosniff` - Prevent MIME sniffing
/// - `Referrer-Policy: strict-origin-when-cross-origin` - Stripe needs the origin
/// - `Content-Security-Policy` - see [`content_security_policy`]
/// - `Permissions-Policy` - Deny sensitive features except payment for Stripe
/// - `Cache-Control: no-store` on HTML responses
/// - `Cross-Origin-Opener-Policy: same-origin-allow-popups` - Google sign-in popup
/// - `Cross-Origin-Resource-Policy: same-origin`
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let nonce = request
        .extensions()
        .get::<CspNonce>()
        .map(|n| n.value().to_string())
        .unwrap_or_default();

    let mut response = next.run(request).await;
    let is_html = response
        .headers()
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("text/html"));
    let headers = response.headers_mut();

    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(
        REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );

    match HeaderValue::from_str(&content_security_policy(&nonce)) {
        Ok(value) => {
            headers.insert(CONTENT_SECURITY_POLICY, value);
        }
        Err(e) => tracing::error!(error = %e, "Invalid CSP header value"),
    }

    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static(
            "accelerometer=(), \
             autoplay=(), \
             browsing-topics=(), \
             camera=(), \
             display-capture=(), \
             geolocation=(), \
             gyroscope=(), \
             magnetometer=(), \
             microphone=(), \
             payment=(self \"https://js.stripe.com\"), \
             usb=(), \
             xr-spatial-tracking=()",
        ),
    );

    // Pages carry session-specific content; static assets and exports are cacheable.
    if is_html {
        headers.insert(
            HeaderName::from_static("cache-control"),
            HeaderValue::from_static("no-store, max-age=0"),
        );
    }

    headers.insert(
        HeaderName::from_static("cross-origin-opener-policy"),
        HeaderValue::from_static("same-origin-allow-popups"),
    );
    headers.insert(
        HeaderName::from_static("cross-origin-resource-policy"),
        HeaderValue::from_static("same-origin"),
    );
    headers.insert(
        HeaderName::from_static("x-dns-prefetch-control"),
        HeaderValue::from_static("off"),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csp_contains_nonce_and_payment_origins() {
        let csp = content_security_policy("abc123");
        assert!(csp.contains("'nonce-abc123'"));
        assert!(csp.contains("https://js.stripe.com"));
        assert!(csp.contains("https://res.cloudinary.com"));
        assert!(csp.contains("frame-ancestors 'none'"));
        assert!(HeaderValue::from_str(&csp).is_ok());
    }
}
