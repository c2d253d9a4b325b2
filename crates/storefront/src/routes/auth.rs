//! Authentication route handlers.
//!
//! Handles login, registration, Google sign-in, logout and password reset
//! against the REST backend. The returned bearer token is kept in the
//! session next to the user record.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use pgcards_core::Email;
use serde::Deserialize;
use tower_sessions::Session;
use tower_sessions::cookie::Cookie;
use tracing::instrument;

use super::PageContext;
use crate::backend::AuthResponse;
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{CspNonce, OptionalAuth, login_url};
use crate::models::{CurrentUser, Flash};
use crate::state::AppState;

/// Minimum password length accepted on registration and reset.
const MIN_PASSWORD_LEN: usize = 8;

/// Where to land after signing in when no `next` is given.
const DEFAULT_LANDING: &str = "/dashboard";

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    #[serde(default)]
    pub next: Option<String>,
}

/// Google Identity Services redirect-mode post.
#[derive(Debug, Deserialize)]
pub struct GoogleForm {
    pub credential: String,
    #[serde(default)]
    pub g_csrf_token: String,
}

/// Forgot password form data.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordForm {
    pub email: String,
}

/// Reset password form data.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordForm {
    pub password: String,
    pub password_confirm: String,
}

/// `?next=` on auth pages.
#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    pub next: String,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub page: PageContext,
    pub next: String,
}

/// Forgot password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/forgot_password.html")]
pub struct ForgotPasswordTemplate {
    pub page: PageContext,
}

/// Reset password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/reset_password.html")]
pub struct ResetPasswordTemplate {
    pub page: PageContext,
    pub action: String,
}

// =============================================================================
// Helpers
// =============================================================================

/// Only same-site paths are followed after sign-in.
fn safe_next(next: Option<&str>) -> String {
    match next.map(str::trim) {
        Some(path)
            if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') =>
        {
            path.to_string()
        }
        _ => DEFAULT_LANDING.to_string(),
    }
}

/// Read one cookie from the request headers.
fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(axum::http::header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_string())
}

fn validate_password(password: &str, confirm: &str) -> Result<(), &'static str> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err("Password must be at least 8 characters");
    }
    if password != confirm {
        return Err("Passwords do not match");
    }
    Ok(())
}

/// Store the signed-in user and tag Sentry events with them.
async fn sign_in(session: &Session, auth: AuthResponse) -> Result<CurrentUser, ()> {
    let user = CurrentUser::from(auth);
    if let Err(e) = user.save(session).await {
        tracing::error!("Failed to store user in session: {e}");
        return Err(());
    }
    set_sentry_user(&user.id, Some(&user.email));
    tracing::info!(user_id = %user.id, "User signed in");
    Ok(user)
}

async fn signed_in_page(session: &Session) -> Option<Redirect> {
    CurrentUser::load(session)
        .await
        .map(|_| Redirect::to(DEFAULT_LANDING))
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    Query(query): Query<NextQuery>,
) -> Response {
    if let Some(redirect) = signed_in_page(&session).await {
        return redirect.into_response();
    }
    LoginTemplate {
        page: PageContext::build(&state, &session, "/auth/login", nonce.0).await,
        next: safe_next(query.next.as_deref()),
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Redirect {
    let next = safe_next(form.next.as_deref());
    match state
        .backend()
        .login(form.email.trim(), &form.password)
        .await
    {
        Ok(auth) => {
            if sign_in(&session, auth).await.is_err() {
                Flash::error(&session, "Could not sign you in, please try again").await;
                return Redirect::to(&login_url(&next));
            }
            Redirect::to(&next)
        }
        Err(e) => {
            tracing::info!("Login failed: {e}");
            Flash::error(&session, e.user_message()).await;
            Redirect::to(&login_url(&next))
        }
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    Query(query): Query<NextQuery>,
) -> Response {
    if let Some(redirect) = signed_in_page(&session).await {
        return redirect.into_response();
    }
    RegisterTemplate {
        page: PageContext::build(&state, &session, "/auth/register", nonce.0).await,
        next: safe_next(query.next.as_deref()),
    }
    .into_response()
}

/// Handle registration form submission. New accounts are signed in.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Redirect {
    let next = safe_next(form.next.as_deref());
    let back = format!("/auth/register?next={}", urlencoding::encode(&next));

    let name = form.name.trim();
    if name.is_empty() {
        Flash::error(&session, "Please tell us your name").await;
        return Redirect::to(&back);
    }
    let email = match Email::parse(&form.email) {
        Ok(email) => email,
        Err(e) => {
            Flash::error(&session, e.to_string()).await;
            return Redirect::to(&back);
        }
    };
    if let Err(message) = validate_password(&form.password, &form.password_confirm) {
        Flash::error(&session, message).await;
        return Redirect::to(&back);
    }

    match state
        .backend()
        .register(name, email.as_str(), &form.password)
        .await
    {
        Ok(auth) => {
            if sign_in(&session, auth).await.is_err() {
                Flash::info(&session, "Account created, please sign in").await;
                return Redirect::to(&login_url(&next));
            }
            Flash::success(&session, "Welcome to PG Cards").await;
            Redirect::to(&next)
        }
        Err(e) => {
            tracing::info!("Registration failed: {e}");
            Flash::error(&session, e.user_message()).await;
            Redirect::to(&back)
        }
    }
}

// =============================================================================
// Google Sign-In
// =============================================================================

/// Handle the Google Identity Services credential post.
///
/// Google sets `g_csrf_token` as both a cookie and a form field; the two
/// must match.
#[instrument(skip_all)]
pub async fn google(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(current): OptionalAuth,
    headers: HeaderMap,
    Form(form): Form<GoogleForm>,
) -> Redirect {
    if current.is_some() {
        return Redirect::to(DEFAULT_LANDING);
    }

    let cookie_token = cookie_value(&headers, "g_csrf_token");
    if form.g_csrf_token.is_empty() || cookie_token.as_deref() != Some(form.g_csrf_token.as_str())
    {
        tracing::warn!("Google sign-in CSRF token mismatch");
        Flash::error(&session, "Google sign-in failed, please try again").await;
        return Redirect::to("/auth/login");
    }

    match state.backend().google_login(&form.credential).await {
        Ok(auth) => {
            if sign_in(&session, auth).await.is_err() {
                Flash::error(&session, "Could not sign you in, please try again").await;
                return Redirect::to("/auth/login");
            }
            Redirect::to(DEFAULT_LANDING)
        }
        Err(e) => {
            tracing::warn!("Google sign-in rejected: {e}");
            Flash::error(&session, e.user_message()).await;
            Redirect::to("/auth/login")
        }
    }
}

// =============================================================================
// Password Reset Routes
// =============================================================================

/// Display the forgot password page.
pub async fn forgot_password_page(page: PageContext) -> impl IntoResponse {
    ForgotPasswordTemplate { page }
}

/// Handle forgot password form submission.
///
/// Always reports success so the form cannot be used to probe for accounts.
#[instrument(skip_all)]
pub async fn forgot_password(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ForgotPasswordForm>,
) -> Redirect {
    let email = form.email.trim();
    if !email.is_empty()
        && let Err(e) = state.backend().forgot_password(email).await
    {
        tracing::warn!("Password reset request failed: {e}");
    }
    Flash::success(
        &session,
        "If that email has an account, a reset link is on its way",
    )
    .await;
    Redirect::to("/auth/forgot-password")
}

/// Display the reset password page for a token from the reset email.
pub async fn reset_password_page(Path(token): Path<String>, page: PageContext) -> impl IntoResponse {
    ResetPasswordTemplate {
        page,
        action: format!("/reset-password/{}", urlencoding::encode(&token)),
    }
}

/// Handle reset password form submission.
#[instrument(skip_all)]
pub async fn reset_password(
    State(state): State<AppState>,
    session: Session,
    Path(token): Path<String>,
    Form(form): Form<ResetPasswordForm>,
) -> Redirect {
    let back = format!("/reset-password/{}", urlencoding::encode(&token));
    if let Err(message) = validate_password(&form.password, &form.password_confirm) {
        Flash::error(&session, message).await;
        return Redirect::to(&back);
    }

    match state
        .backend()
        .reset_password(&token, &form.password)
        .await
    {
        Ok(_) => {
            Flash::success(&session, "Password updated, please sign in").await;
            Redirect::to("/auth/login")
        }
        Err(e) => {
            tracing::info!("Password reset failed: {e}");
            Flash::error(&session, e.user_message()).await;
            Redirect::to(&back)
        }
    }
}

// =============================================================================
// Logout Route
// =============================================================================

/// Handle logout: drop the user and the rest of the session.
pub async fn logout(session: Session) -> Redirect {
    if let Err(e) = CurrentUser::clear(&session).await {
        tracing::error!("Failed to clear user from session: {e}");
    }
    if let Err(e) = session.flush().await {
        tracing::error!("Failed to flush session: {e}");
    }
    clear_sentry_user();
    Redirect::to("/")
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Some("/checkout?step=payment"), "/checkout?step=payment")]
    #[case(Some("https://evil.example"), "/dashboard")]
    #[case(Some("//evil.example"), "/dashboard")]
    #[case(Some("/\\evil.example"), "/dashboard")]
    #[case(None, "/dashboard")]
    fn test_safe_next(#[case] next: Option<&str>, #[case] expected: &str) {
        assert_eq!(safe_next(next), expected);
    }

    #[test]
    fn test_cookie_value_finds_named_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_static("pgc_session=abc; g_csrf_token=tok123"),
        );
        assert_eq!(cookie_value(&headers, "g_csrf_token").as_deref(), Some("tok123"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn test_cookie_value_skips_malformed_pairs() {
        let mut headers = HeaderMap::new();
        headers.append(
            axum::http::header::COOKIE,
            HeaderValue::from_static("novalue; =empty;;  theme=dark "),
        );
        headers.append(
            axum::http::header::COOKIE,
            HeaderValue::from_static("g_csrf_token=a=b"),
        );
        assert_eq!(cookie_value(&headers, "theme").as_deref(), Some("dark"));
        assert_eq!(cookie_value(&headers, "g_csrf_token").as_deref(), Some("a=b"));
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("short", "short").is_err());
        assert_eq!(
            validate_password("longenough", "different"),
            Err("Passwords do not match")
        );
        assert!(validate_password("longenough", "longenough").is_ok());
    }
}
