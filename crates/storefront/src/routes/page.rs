//! Data every full page needs: navigation state, the signed-in user,
//! pending toasts and the CSP nonce.

use axum::extract::{FromRequestParts, OriginalUri};
use axum::http::request::Parts;
use tower_sessions::Session;

use crate::config::AnalyticsConfig;
use crate::middleware::CspNonce;
use crate::models::{CurrentUser, Flash};
use crate::routing::AppView;
use crate::state::AppState;

/// Header badge for the signed-in user.
#[derive(Debug, Clone)]
pub struct UserBadge {
    pub name: String,
    pub is_admin: bool,
}

/// Shared layout data, rendered by `base.html`.
#[derive(Debug, Clone)]
pub struct PageContext {
    /// Active navigation key (see [`AppView::nav_key`]).
    pub nav: &'static str,
    pub user: Option<UserBadge>,
    pub flashes: Vec<Flash>,
    pub analytics: AnalyticsConfig,
    pub nonce: String,
    pub google_client_id: Option<String>,
}

impl PageContext {
    /// Build the context for `path`, draining queued toasts.
    pub async fn build(state: &AppState, session: &Session, path: &str, nonce: String) -> Self {
        let user = CurrentUser::load(session).await.map(|u| UserBadge {
            name: u.display_name().to_string(),
            is_admin: u.is_admin(),
        });

        Self {
            nav: AppView::from_path(path).nav_key(),
            user,
            flashes: Flash::take(session).await,
            analytics: state.config().analytics.clone(),
            nonce,
            google_client_id: state.config().google_client_id.clone(),
        }
    }

    #[must_use]
    pub const fn signed_in(&self) -> bool {
        self.user.is_some()
    }

    /// True when `key` is the active navigation entry.
    #[must_use]
    pub fn is_nav(&self, key: &str) -> bool {
        self.nav == key
    }
}

impl FromRequestParts<AppState> for PageContext {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let path = parts
            .extensions
            .get::<OriginalUri>()
            .map_or_else(|| parts.uri.path().to_string(), |uri| uri.0.path().to_string());
        let nonce = parts
            .extensions
            .get::<CspNonce>()
            .map(|n| n.value().to_string())
            .unwrap_or_default();

        Ok(match parts.extensions.get::<Session>() {
            Some(session) => Self::build(state, session, &path, nonce).await,
            None => {
                tracing::warn!("Session layer missing, rendering page without user");
                Self {
                    nav: AppView::from_path(&path).nav_key(),
                    user: None,
                    flashes: Vec::new(),
                    analytics: state.config().analytics.clone(),
                    nonce,
                    google_client_id: state.config().google_client_id.clone(),
                }
            }
        })
    }
}
