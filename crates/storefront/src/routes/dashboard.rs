//! Signed-in dashboard: the saved card, its public link and a QR code for it.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use super::PageContext;
use super::account::OrderView;
use super::profile::find_own_profile;
use crate::error::Result;
use crate::filters;
use crate::middleware::{CspNonce, RequireAuth};
use crate::profile::UserProfile;
use crate::qr::{ErrorCorrection, QrOptions, render_svg};
use crate::state::AppState;

/// Orders shown on the dashboard.
const RECENT_ORDERS: usize = 3;

/// Summary of the saved card.
#[derive(Clone)]
pub struct CardSummary {
    pub full_name: String,
    pub headline: String,
    pub initials: String,
    pub profile_picture: Option<String>,
    pub theme: &'static str,
    pub public_url: Option<String>,
    pub vcard_url: Option<String>,
    /// Inline SVG pointing at the public URL.
    pub qr_svg: Option<String>,
}

impl CardSummary {
    fn new(profile: &UserProfile, base_url: &str) -> Self {
        let public_url = profile
            .public_path()
            .map(|path| format!("{}{path}", base_url.trim_end_matches('/')));
        let qr_svg = public_url.as_deref().and_then(|url| {
            let options = QrOptions {
                data: url.to_string(),
                size: 220,
                error_correction: ErrorCorrection::Quartile,
                ..QrOptions::default()
            };
            render_svg(&options)
                .inspect_err(|e| tracing::warn!("Failed to render dashboard QR: {e}"))
                .ok()
        });
        let headline = [profile.designation.trim(), profile.company_name.trim()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" · ");

        Self {
            full_name: profile.full_name.clone(),
            headline,
            initials: profile.initials(),
            profile_picture: Some(profile.profile_picture.trim())
                .filter(|s| !s.is_empty())
                .map(crate::profile::cdn::normalize_cdn_image_url),
            theme: profile.theme.label(),
            vcard_url: profile
                .id
                .as_ref()
                .map(|id| format!("/profile/{}/vcard", urlencoding::encode(id.as_str()))),
            public_url,
            qr_svg,
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub page: PageContext,
    pub card: Option<CardSummary>,
    pub orders: Vec<OrderView>,
    pub error: Option<String>,
}

/// Display the dashboard.
///
/// # Errors
///
/// Returns an error if the page fails to render.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    nonce: CspNonce,
) -> Result<Response> {
    let mut error = None;
    let card = match find_own_profile(&state, &session, &user).await {
        Ok(profile) => profile.map(|p| CardSummary::new(&p, &state.config().base_url)),
        Err(e) => {
            tracing::warn!("Failed to load profile for dashboard: {e}");
            error = Some(e.user_message());
            None
        }
    };

    let orders = state
        .backend()
        .list_orders(&user.token())
        .await
        .map(|orders| orders.iter().take(RECENT_ORDERS).map(OrderView::from).collect())
        .unwrap_or_else(|e| {
            tracing::warn!("Failed to load orders for dashboard: {e}");
            Vec::new()
        });

    // Built last so toasts queued by the lookups above still show
    let page = PageContext::build(&state, &session, "/dashboard", nonce.0).await;
    Ok(DashboardTemplate {
        page,
        card,
        orders,
        error,
    }
    .into_response())
}

#[cfg(test)]
mod tests {
    use pgcards_core::{ProfileId, ProfileTheme};

    use super::*;

    #[test]
    fn test_summary_links_public_card_and_vcard() {
        let profile = UserProfile {
            id: Some(ProfileId::new("abc123")),
            full_name: "Ada Lovelace".to_string(),
            designation: "Analyst".to_string(),
            company_name: "Engines Ltd".to_string(),
            theme: ProfileTheme::Modern,
            ..UserProfile::default()
        };
        let summary = CardSummary::new(&profile, "https://pgcards.com/");
        assert_eq!(
            summary.public_url.as_deref(),
            Some("https://pgcards.com/modern/abc123")
        );
        assert_eq!(summary.vcard_url.as_deref(), Some("/profile/abc123/vcard"));
        assert_eq!(summary.headline, "Analyst · Engines Ltd");
        assert!(summary.qr_svg.is_some_and(|svg| svg.starts_with("<svg")));
    }

    #[test]
    fn test_unsaved_profile_has_no_links() {
        let summary = CardSummary::new(&UserProfile::default(), "https://pgcards.com");
        assert!(summary.public_url.is_none());
        assert!(summary.qr_svg.is_none());
    }
}
