//! Integration tests for the PG Cards storefront.
//!
//! The router runs in-process and is driven with `tower::ServiceExt::oneshot`.
//! The REST backend is replaced by a small axum app on an ephemeral port that
//! serves a fixed catalog and one saved profile.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p pgcards-integration-tests
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::extract::Path;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use pgcards_storefront::config::{
    AnalyticsConfig, ApiConfig, CloudinaryConfig, PaymentsConfig, StorefrontConfig,
};
use pgcards_storefront::content::ContentStore;
use pgcards_storefront::state::AppState;
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;

/// ID of the profile the stub backend knows about.
pub const KNOWN_PROFILE_ID: &str = "64f1c0ffee";

/// Saved profile served by the stub backend.
#[must_use]
pub fn sample_profile() -> Value {
    json!({
        "_id": KNOWN_PROFILE_ID,
        "userId": "u1",
        "fullName": "Jane Public",
        "companyName": "Acme, Inc",
        "designation": "Founder",
        "about": "Building smart cards.",
        "phoneNumbers": [{"label": "Mobile", "countryCode": "+971", "number": "501234567"}],
        "emails": [{"label": "Work", "emailAddress": "jane@acme.test"}],
        "contactDetails": {"address": "1 Main St", "state": "Dubai", "country": "UAE", "mapLink": ""},
        "socialMedia": [{"platform": "LinkedIn", "url": "https://linkedin.com/in/jane"}],
        "profilePicture": "",
        "coverImage": "",
        "carouselImages": [],
        "theme": "modern"
    })
}

/// Catalog served by the stub backend.
#[must_use]
pub fn sample_products() -> Value {
    json!({
        "products": [{
            "_id": "p1",
            "title": "Metal NFC Card",
            "description": "Brushed steel, engraved.",
            "category": "metal",
            "basePrice": 899,
            "currency": "AED",
            "variants": [
                {"_id": "v1", "color": "Black", "finish": "Matte"},
                {"_id": "v2", "color": "Gold", "finish": "Mirror", "price": 1099}
            ],
            "images": []
        }]
    })
}

async fn stub_profile(Path(id): Path<String>) -> Response {
    if id == KNOWN_PROFILE_ID {
        axum::Json(json!({"msg": "ok", "profile": sample_profile()})).into_response()
    } else {
        (StatusCode::NOT_FOUND, axum::Json(json!({"msg": "Profile not found"}))).into_response()
    }
}

async fn stub_product(Path(id): Path<String>) -> Response {
    let products = sample_products();
    products["products"]
        .as_array()
        .and_then(|list| list.iter().find(|p| p["_id"] == id.as_str()).cloned())
        .map_or_else(
            || (StatusCode::NOT_FOUND, axum::Json(json!({"msg": "Product not found"}))).into_response(),
            |product| axum::Json(json!({"product": product})).into_response(),
        )
}

/// Start the stub backend and return its base URL.
pub async fn spawn_backend() -> String {
    let app = Router::new()
        .route("/products", get(|| async { axum::Json(sample_products()) }))
        .route("/products/{id}", get(stub_product))
        .route("/user-profile/{id}", get(stub_profile));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Storefront config pointing at `api_url`.
#[must_use]
pub fn test_config(api_url: &str) -> StorefrontConfig {
    StorefrontConfig {
        host: [127, 0, 0, 1].into(),
        port: 3000,
        base_url: "http://localhost:3000".to_string(),
        session_secret: SecretString::from("k7Qp2vX9mZ4rT8wB1nL6yH3jF5cD0sGa"),
        api: ApiConfig {
            base_url: api_url.to_string(),
            timeout: Duration::from_secs(5),
        },
        cloudinary: CloudinaryConfig {
            cloud_name: "pgcards-test".to_string(),
            upload_preset: "unsigned_test".to_string(),
        },
        payments: PaymentsConfig {
            publishable_key: "pk_test_integration".to_string(),
            trial_mode: true,
        },
        analytics: AnalyticsConfig::default(),
        google_client_id: None,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// Blog posts shipped with the storefront.
#[must_use]
pub fn content_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../storefront/content")
}

/// The storefront router wired to a fresh stub backend.
pub async fn test_app() -> Router {
    let api_url = spawn_backend().await;
    let content = ContentStore::load(&content_dir()).unwrap();
    pgcards_storefront::app(AppState::new(test_config(&api_url), content))
}

/// A distinct client address per call, so rate limiters never trip
/// across tests.
#[must_use]
pub fn client_ip() -> String {
    static NEXT: AtomicU8 = AtomicU8::new(1);
    format!("198.51.100.{}", NEXT.fetch_add(1, Ordering::Relaxed))
}

/// Send a request through the router.
pub async fn send(app: Router, request: Request<Body>) -> Response {
    app.oneshot(request).await.unwrap()
}

/// `GET path` with no session.
pub async fn get_path(app: Router, path: &str) -> Response {
    let request = Request::builder()
        .uri(path)
        .header("x-forwarded-for", client_ip())
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// Collect a response body as text.
pub async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), 4 * 1024 * 1024).await.unwrap();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Build a `multipart/form-data` body from text fields.
#[must_use]
pub fn multipart(fields: &[(&str, &str)]) -> (String, Vec<u8>) {
    const BOUNDARY: &str = "pgcards-test-boundary";
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

/// `POST path` with a multipart body.
pub async fn post_multipart(app: Router, path: &str, fields: &[(&str, &str)]) -> Response {
    let (content_type, body) = multipart(fields);
    let request = Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", content_type)
        .header("x-forwarded-for", client_ip())
        .body(Body::from(body))
        .unwrap();
    send(app, request).await
}
