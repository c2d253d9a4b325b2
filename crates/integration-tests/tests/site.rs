//! Landing page, shop, blog and the shared response layers.

use axum::http::{StatusCode, header};
use pgcards_integration_tests::{body_text, get_path, test_app};
use rstest::rstest;

#[tokio::test]
async fn health_is_ok() {
    let response = get_path(test_app().await, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn readiness_reaches_the_backend() {
    let response = get_path(test_app().await, "/health/ready").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn landing_page_features_catalog_and_posts() {
    let response = get_path(test_app().await, "/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Metal NFC Card"));
    assert!(html.contains("Styled QR codes that still scan"));
}

#[tokio::test]
async fn pages_carry_security_headers_and_request_id() {
    let response = get_path(test_app().await, "/").await;
    let csp = response
        .headers()
        .get(header::CONTENT_SECURITY_POLICY)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(csp.contains("'nonce-"), "CSP without nonce: {csp}");
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn unknown_path_renders_not_found_page() {
    let response = get_path(test_app().await, "/no/such/page").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_text(response).await.contains("<html"));
}

#[tokio::test]
async fn shop_lists_products() {
    let response = get_path(test_app().await, "/shop").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Metal NFC Card"));
}

#[tokio::test]
async fn product_page_offers_variants() {
    let response = get_path(test_app().await, "/shop/p1").await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Black"));
    assert!(html.contains("Gold"));
}

#[tokio::test]
async fn unknown_product_is_not_found() {
    let response = get_path(test_app().await, "/shop/missing").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[rstest]
#[case("/blog", StatusCode::OK)]
#[case("/blog/styled-qr-codes", StatusCode::OK)]
#[case("/blog/why-nfc-business-cards", StatusCode::OK)]
#[case("/blog/not-a-post", StatusCode::NOT_FOUND)]
#[tokio::test]
async fn blog_routes(#[case] path: &str, #[case] expected: StatusCode) {
    let response = get_path(test_app().await, path).await;
    assert_eq!(response.status(), expected);
}
