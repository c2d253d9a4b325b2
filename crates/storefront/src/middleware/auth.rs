//! Authentication extractors.
//!
//! The signed-in user (and their backend bearer token) lives in the session.
//! Handlers pick one of [`RequireAuth`], [`RequireAdmin`] or [`OptionalAuth`].

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::models::CurrentUser;

/// Extractor that requires a signed-in user.
///
/// Page requests are redirected to the login page with a `next` parameter;
/// HTMX requests get `HX-Redirect` so the whole page navigates.
///
/// ```rust,ignore
/// async fn dashboard(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.display_name())
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Extractor that requires a signed-in admin.
pub struct RequireAdmin(pub CurrentUser);

/// Rejection for the auth extractors.
#[derive(Debug)]
pub enum AuthRejection {
    /// Send the visitor to log in, then back to `next`.
    RedirectToLogin { next: String, htmx: bool },
    /// Signed in, but not an admin.
    Forbidden,
    /// Session layer missing (misconfigured router).
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin { next, htmx } => {
                let target = login_url(&next);
                if htmx {
                    (StatusCode::OK, [("HX-Redirect", target)]).into_response()
                } else {
                    Redirect::to(&target).into_response()
                }
            }
            Self::Forbidden => (StatusCode::FORBIDDEN, "Admins only").into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

/// Login URL that returns to `next` afterwards.
#[must_use]
pub fn login_url(next: &str) -> String {
    if next.is_empty() || next == "/" {
        "/auth/login".to_string()
    } else {
        format!("/auth/login?next={}", urlencoding::encode(next))
    }
}

async fn user_from_parts(parts: &Parts) -> Result<CurrentUser, AuthRejection> {
    let session = parts
        .extensions
        .get::<Session>()
        .ok_or(AuthRejection::Unauthorized)?;

    CurrentUser::load(session).await.ok_or_else(|| {
        // Nested routers strip their prefix from `parts.uri`
        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map_or(&parts.uri, |original| &original.0);
        let next = uri
            .path_and_query()
            .map_or_else(|| "/".to_string(), ToString::to_string);
        AuthRejection::RedirectToLogin {
            next,
            htmx: parts.headers.contains_key("hx-request"),
        }
    })
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = user_from_parts(parts).await?;
        crate::error::set_sentry_user(&user.id, Some(&user.email));
        Ok(Self(user))
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = user_from_parts(parts).await?;
        if !user.is_admin() {
            tracing::warn!(user_id = %user.id, path = %parts.uri.path(), "Non-admin tried admin route");
            return Err(AuthRejection::Forbidden);
        }
        Ok(Self(user))
    }
}

/// Extractor that optionally gets the current user.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => CurrentUser::load(session).await,
            None => None,
        };
        Ok(Self(user))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_login_url_encodes_next() {
        assert_eq!(login_url("/"), "/auth/login");
        assert_eq!(
            login_url("/checkout?step=payment"),
            "/auth/login?next=%2Fcheckout%3Fstep%3Dpayment"
        );
    }

    #[test]
    fn test_htmx_rejection_uses_hx_redirect() {
        let response = AuthRejection::RedirectToLogin {
            next: "/dashboard".to_string(),
            htmx: true,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("HX-Redirect").unwrap(),
            "/auth/login?next=%2Fdashboard"
        );
    }

    #[test]
    fn test_forbidden_status() {
        assert_eq!(
            AuthRejection::Forbidden.into_response().status(),
            StatusCode::FORBIDDEN
        );
    }
}
