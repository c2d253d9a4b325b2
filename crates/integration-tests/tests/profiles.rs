//! Public card viewer and vCard download.

use axum::http::{StatusCode, header};
use pgcards_integration_tests::{KNOWN_PROFILE_ID, body_text, get_path, test_app};
use rstest::rstest;

#[rstest]
#[case("standard", "pg-card-standard")]
#[case("modern", "pg-card-modern")]
#[case("epic", "pg-card-epic")]
#[tokio::test]
async fn path_segment_picks_the_theme(#[case] theme: &str, #[case] class: &str) {
    let path = format!("/{theme}/{KNOWN_PROFILE_ID}");
    let response = get_path(test_app().await, &path).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains(class), "{path} did not render {class}");
    assert!(html.contains("Jane Public"));
}

#[tokio::test]
async fn profile_route_uses_stored_theme() {
    let response = get_path(test_app().await, &format!("/profile/{KNOWN_PROFILE_ID}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("pg-card-modern"));
}

#[tokio::test]
async fn theme_query_overrides_stored_theme() {
    let path = format!("/profile/{KNOWN_PROFILE_ID}?theme=epic");
    let response = get_path(test_app().await, &path).await;
    assert!(body_text(response).await.contains("pg-card-epic"));
}

#[tokio::test]
async fn card_links_to_vcard() {
    let response = get_path(test_app().await, &format!("/standard/{KNOWN_PROFILE_ID}")).await;
    let html = body_text(response).await;
    assert!(html.contains(&format!("/profile/{KNOWN_PROFILE_ID}/vcard")));
}

#[rstest]
#[case("/standard/unknown")]
#[case("/profile/unknown")]
#[case("/profile/unknown/vcard")]
#[tokio::test]
async fn unknown_profile_is_not_found(#[case] path: &str) {
    let response = get_path(test_app().await, path).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn vcard_download() {
    let response = get_path(
        test_app().await,
        &format!("/profile/{KNOWN_PROFILE_ID}/vcard"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
        "attachment; filename=\"Jane_Public.vcf\""
    );
    let card = body_text(response).await;
    assert!(card.starts_with("BEGIN:VCARD\r\nVERSION:3.0\r\n"));
    assert!(card.contains("FN:Jane Public\r\n"));
    assert!(card.contains("ORG:Acme\\, Inc\r\n"));
    assert!(card.contains("TEL;"));
    assert!(card.contains("501234567"));
    assert!(card.trim_end().ends_with("END:VCARD"));
}
