//! Delivery URL rewriting for images hosted on the image CDN.
//!
//! Uploaded originals are delivered through a transformation segment so the
//! CDN picks the best format and quality for the browser. HEIC uploads are
//! served as JPEG because most browsers cannot display them.

const CDN_HOST: &str = "res.cloudinary.com";
const UPLOAD_SEGMENT: &str = "/upload/";
const AUTO_TRANSFORM: &str = "f_auto,q_auto/";

/// Rewrite a CDN image URL for delivery. Non-CDN URLs are returned unchanged.
///
/// ```
/// use pgcards_storefront::profile::cdn::normalize_cdn_image_url;
///
/// assert_eq!(
///     normalize_cdn_image_url("https://res.cloudinary.com/pg/image/upload/v1/a.png"),
///     "https://res.cloudinary.com/pg/image/upload/f_auto,q_auto/v1/a.png"
/// );
/// assert_eq!(normalize_cdn_image_url("https://example.com/a.png"), "https://example.com/a.png");
/// ```
#[must_use]
pub fn normalize_cdn_image_url(url: &str) -> String {
    let url = url.trim();
    if !is_cdn_url(url) {
        return url.to_string();
    }

    if let Some(stem) = strip_suffix_ignore_case(url, ".heic") {
        return format!("{stem}.jpg");
    }

    if url.contains("/f_auto") {
        return url.to_string();
    }

    match url.find(UPLOAD_SEGMENT) {
        Some(idx) => {
            let split = idx + UPLOAD_SEGMENT.len();
            format!("{}{AUTO_TRANSFORM}{}", &url[..split], &url[split..])
        }
        None => url.to_string(),
    }
}

fn is_cdn_url(url: &str) -> bool {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.eq_ignore_ascii_case(CDN_HOST)))
        .unwrap_or(false)
}

fn strip_suffix_ignore_case<'a>(s: &'a str, suffix: &str) -> Option<&'a str> {
    let split = s.len().checked_sub(suffix.len())?;
    let tail = s.get(split..)?;
    tail.eq_ignore_ascii_case(suffix).then(|| &s[..split])
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(
        "https://res.cloudinary.com/pg/image/upload/v17/photo.heic",
        "https://res.cloudinary.com/pg/image/upload/v17/photo.jpg"
    )]
    #[case(
        "https://res.cloudinary.com/pg/image/upload/v17/PHOTO.HEIC",
        "https://res.cloudinary.com/pg/image/upload/v17/PHOTO.jpg"
    )]
    #[case(
        "https://res.cloudinary.com/pg/image/upload/v17/photo.png",
        "https://res.cloudinary.com/pg/image/upload/f_auto,q_auto/v17/photo.png"
    )]
    #[case(
        "https://res.cloudinary.com/pg/image/upload/f_auto,q_auto/v17/photo.png",
        "https://res.cloudinary.com/pg/image/upload/f_auto,q_auto/v17/photo.png"
    )]
    #[case(
        "https://res.cloudinary.com/pg/image/upload/c_fill,w_200/f_auto/v1/a.png",
        "https://res.cloudinary.com/pg/image/upload/c_fill,w_200/f_auto/v1/a.png"
    )]
    #[case("https://images.example.com/upload/photo.heic", "https://images.example.com/upload/photo.heic")]
    #[case("", "")]
    fn test_normalize_cdn_image_url(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_cdn_image_url(input), expected);
    }

    #[test]
    fn test_cdn_url_without_upload_segment_unchanged() {
        let url = "https://res.cloudinary.com/pg/image/fetch/photo.png";
        assert_eq!(normalize_cdn_image_url(url), url);
    }
}
