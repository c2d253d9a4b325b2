//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                         - Landing page
//! GET  /health                   - Health check
//!
//! # Shop
//! GET  /shop                     - Product catalog
//! GET  /shop/{id}                - Product detail with variants
//!
//! # Cart (HTMX fragments)
//! GET  /cart                     - Cart page
//! POST /cart/add                 - Add to cart (triggers cartUpdated)
//! POST /cart/remove              - Remove line (returns cart_items fragment)
//! GET  /cart/count               - Cart count badge (fragment)
//!
//! # Checkout wizard (requires auth)
//! GET  /checkout                 - Current step (?product=&variant= selects a card)
//! POST /checkout/profile         - Save profile
//! POST /checkout/preview         - Live card preview (fragment)
//! POST /checkout/template        - Pick a theme
//! POST /checkout/coupon          - Apply a coupon code
//! POST /checkout/payment         - Create or reuse the payment intent
//! POST /checkout/confirm         - Confirm after Stripe.js returns
//! POST /checkout/upload          - Crop + upload an image (multipart, rate limited)
//!
//! # Profiles
//! GET  /customize                - Edit the saved profile
//! POST /customize                - Save edits
//! POST /customize/preview        - Live card preview (fragment)
//! GET  /dashboard                - Profile summary, public link, QR
//! GET  /profile                  - Redirect to the signed-in user's public card
//! GET  /profile/{id}             - Public card, stored theme
//! GET  /profile/{id}/vcard       - vCard download
//! GET  /standard|modern|epic/{id} - Public card in that theme
//!
//! # QR generator
//! GET  /create-qr                - Generator page (/create-qrCode alias)
//! POST /create-qr/preview        - SVG preview (multipart, fragment)
//! POST /create-qr/export         - PNG/JPEG/SVG download (multipart)
//!
//! # Account (requires auth)
//! GET  /orders                   - Order history
//! GET  /account/addresses        - Address list (+ new/edit/delete)
//!
//! # Admin (admin role)
//! GET  /admin                    - Overview
//! GET  /admin/users              - Users (POST /admin/users/{id}/delete)
//! GET  /admin/products           - Products (new/edit/delete)
//! GET  /admin/orders             - Orders (POST /admin/orders/{id}/status)
//!
//! # Auth
//! GET  /auth/login               - Login page
//! POST /auth/login               - Login action
//! GET  /auth/register            - Register page
//! POST /auth/register            - Register action
//! POST /auth/logout              - Logout action
//! POST /auth/google              - Google sign-in credential callback
//! GET  /auth/forgot-password     - Request a reset link
//! GET  /reset-password/{token}   - Choose a new password
//!
//! # Blog
//! GET  /blog                     - Post index
//! GET  /blog/{slug}              - Post
//! ```

pub mod account;
pub mod admin;
pub mod auth;
pub mod blog;
pub mod cart;
pub mod checkout;
pub mod customize;
pub mod dashboard;
pub mod home;
pub mod page;
pub mod profile;
pub mod qr;
pub mod shop;

pub use page::PageContext;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use pgcards_core::ProfileTheme;

use crate::filters;
use crate::middleware::{auth_rate_limiter, upload_rate_limiter};
use crate::services::image_crop::MAX_UPLOAD_BYTES;
use crate::state::AppState;

/// Multipart bodies carry at most one image plus form fields.
const MULTIPART_BODY_LIMIT: usize = MAX_UPLOAD_BYTES + 64 * 1024;

/// Whether the request came from HTMX.
#[must_use]
pub fn is_htmx(headers: &HeaderMap) -> bool {
    headers.contains_key("hx-request")
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    let router = Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/google", post(auth::google))
        .route(
            "/forgot-password",
            get(auth::forgot_password_page).post(auth::forgot_password),
        );

    // Logout stays outside the limiter
    rate_limited(router).route("/logout", post(auth::logout))
}

/// Create the password reset router (emailed links land here).
pub fn reset_password_routes() -> Router<AppState> {
    rate_limited(Router::new().route(
        "/reset-password/{token}",
        get(auth::reset_password_page).post(auth::reset_password),
    ))
}

fn rate_limited(router: Router<AppState>) -> Router<AppState> {
    match auth_rate_limiter() {
        Some(limiter) => router.layer(limiter),
        None => {
            tracing::warn!("Auth rate limiter could not be built, continuing without it");
            router
        }
    }
}

/// Create the shop routes router.
pub fn shop_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(shop::index))
        .route("/{id}", get(shop::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/remove", post(cart::remove))
        .route("/count", get(cart::count))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    let upload = Router::new()
        .route("/upload", post(checkout::upload))
        .layer(DefaultBodyLimit::max(MULTIPART_BODY_LIMIT));
    let upload = match upload_rate_limiter() {
        Some(limiter) => upload.layer(limiter),
        None => upload,
    };

    Router::new()
        .route("/", get(checkout::show))
        .route("/profile", post(checkout::save_profile))
        .route("/preview", post(checkout::preview))
        .route("/template", post(checkout::select_template))
        .route("/coupon", post(checkout::apply_coupon))
        .route("/payment", post(checkout::create_payment))
        .route("/confirm", post(checkout::confirm_payment))
        .merge(upload)
}

/// Create the QR generator routes router.
pub fn qr_routes() -> Router<AppState> {
    let router = Router::new()
        .route("/", get(qr::index))
        .route("/preview", post(qr::preview))
        .route("/export", post(qr::download))
        .layer(DefaultBodyLimit::max(MULTIPART_BODY_LIMIT));
    match upload_rate_limiter() {
        Some(limiter) => router.layer(limiter),
        None => router,
    }
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/addresses",
            get(account::addresses).post(account::create_address),
        )
        .route("/addresses/new", get(account::new_address))
        .route("/addresses/{id}", post(account::update_address))
        .route("/addresses/{id}/edit", get(account::edit_address))
        .route("/addresses/{id}/delete", post(account::delete_address))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(admin::index))
        .route("/users", get(admin::users))
        .route("/users/{id}/delete", post(admin::delete_user))
        .route(
            "/products",
            get(admin::products).post(admin::create_product),
        )
        .route("/products/new", get(admin::new_product))
        .route("/products/{id}", post(admin::update_product))
        .route("/products/{id}/edit", get(admin::edit_product))
        .route("/products/{id}/delete", post(admin::delete_product))
        .route("/orders", get(admin::orders))
        .route("/orders/{id}/status", post(admin::update_order_status))
}

/// Create the profile routes router.
pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(profile::own_profile))
        .route("/{id}", get(profile::show))
        .route("/{id}/vcard", get(profile::vcard))
}

/// Public viewer routes: `/standard/{id}`, `/modern/{id}`, `/epic/{id}`.
fn public_profile_routes() -> Router<AppState> {
    ProfileTheme::ALL
        .iter()
        .fold(Router::new(), |router, theme| {
            router.route(
                &format!("/{}/{{id}}", theme.as_str()),
                get(profile::public_profile),
            )
        })
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .nest("/shop", shop_routes())
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .route(
            "/customize",
            get(customize::show).post(customize::save),
        )
        .route("/customize/preview", post(customize::preview))
        .route("/dashboard", get(dashboard::show))
        .nest("/profile", profile_routes())
        .merge(public_profile_routes())
        .nest("/create-qr", qr_routes())
        .route("/create-qrCode", get(qr::index))
        .route("/orders", get(account::orders))
        .nest("/account", account_routes())
        .nest("/admin", admin_routes())
        .nest("/auth", auth_routes())
        .merge(reset_password_routes())
        .nest("/blog", blog::router())
}

/// Not-found page template.
#[derive(Template, WebTemplate)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub page: PageContext,
}

/// Fallback for unknown paths.
pub async fn not_found(page: PageContext) -> impl IntoResponse {
    (StatusCode::NOT_FOUND, NotFoundTemplate { page })
}
