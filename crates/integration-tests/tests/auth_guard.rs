//! Signed-out visitors are sent to the login page.

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use pgcards_integration_tests::{body_text, client_ip, get_path, send, test_app};
use rstest::rstest;

fn location(response: &axum::response::Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[rstest]
#[case("/checkout", "/auth/login?next=%2Fcheckout")]
#[case("/dashboard", "/auth/login?next=%2Fdashboard")]
#[case("/orders", "/auth/login?next=%2Forders")]
#[case("/account/addresses", "/auth/login?next=%2Faccount%2Faddresses")]
#[case("/admin/products", "/auth/login?next=%2Fadmin%2Fproducts")]
#[tokio::test]
async fn protected_pages_redirect_to_login(#[case] path: &str, #[case] expected: &str) {
    let response = get_path(test_app().await, path).await;
    assert!(response.status().is_redirection());
    assert_eq!(location(&response), expected);
}

#[tokio::test]
async fn htmx_requests_get_hx_redirect() {
    let request = Request::builder()
        .uri("/checkout")
        .header("hx-request", "true")
        .header("x-forwarded-for", client_ip())
        .body(Body::empty())
        .unwrap();
    let response = send(test_app().await, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("hx-redirect").unwrap(),
        "/auth/login?next=%2Fcheckout"
    );
}

#[tokio::test]
async fn login_page_keeps_safe_next() {
    let response = get_path(test_app().await, "/auth/login?next=%2Fcheckout").await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("value=\"/checkout\""));
}

#[tokio::test]
async fn reset_password_page_posts_to_token() {
    let response = get_path(test_app().await, "/reset-password/abc123").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("/reset-password/abc123"));
}

#[tokio::test]
async fn reset_password_is_rate_limited() {
    let app = test_app().await;
    let ip = client_ip();
    let mut statuses = Vec::new();
    for _ in 0..6 {
        let request = Request::builder()
            .uri("/reset-password/abc123")
            .header("x-forwarded-for", ip.as_str())
            .body(Body::empty())
            .unwrap();
        statuses.push(send(app.clone(), request).await.status());
    }
    assert!(statuses.iter().take(5).all(|s| *s == StatusCode::OK));
    assert_eq!(statuses.last(), Some(&StatusCode::TOO_MANY_REQUESTS));
}
