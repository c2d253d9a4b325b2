//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, transaction per route)
//! 2. `TraceLayer` (request span with `request_id` field)
//! 3. Request ID (adds unique ID to each request)
//! 4. CSP nonce (per-request nonce for inline scripts)
//! 5. Security headers (CSP built with the nonce, frame/sniff protection)
//! 6. Session layer (tower-sessions, in-memory store, signed cookie)
//! 7. Rate limiting (governor) on auth and upload routes only

pub mod auth;
pub mod csp;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{OptionalAuth, RequireAdmin, RequireAuth, login_url};
pub use csp::{CspNonce, csp_nonce_middleware};
pub use rate_limit::{auth_rate_limiter, upload_rate_limiter};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
