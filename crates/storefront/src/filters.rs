//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

use crate::profile::cdn::normalize_cdn_image_url;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Rewrites an image CDN URL for delivery (auto format/quality, HEIC to JPEG).
///
/// Usage in templates: `{{ product.images[0]|cdn }}`
#[askama::filter_fn]
pub fn cdn(url: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(normalize_cdn_image_url(&url.to_string()))
}

/// Returns the content hash for main.css.
///
/// The hash is computed at build time from the CSS file content.
///
/// Usage in templates: `{{ ""|css_hash }}`
#[askama::filter_fn]
pub fn css_hash(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<&'static str> {
    Ok(env!("CSS_HASH"))
}
