//! Public profile viewer and vCard download.
//!
//! A tapped card opens `/<theme>/<id>`; the theme in the path wins over the
//! stored one, and `?theme=` wins over both.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
};
use pgcards_core::{ProfileId, ProfileTheme};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::PageContext;
use crate::backend::ApiError;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::{CurrentUser, Flash, Preferences};
use crate::profile::preview::{CardView, PreviewInput, render_card_view};
use crate::profile::vcard::{build_vcard, vcard_filename};
use crate::profile::UserProfile;
use crate::state::AppState;

/// Public card page.
#[derive(Template, WebTemplate)]
#[template(path = "profile/show.html")]
pub struct ProfilePageTemplate {
    pub page: PageContext,
    pub title: String,
    pub description: String,
    pub og_image: Option<String>,
    pub canonical_url: String,
    pub card_html: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ThemeQuery {
    pub theme: Option<String>,
}

impl ThemeQuery {
    fn theme(&self) -> Option<ProfileTheme> {
        self.theme.as_deref().and_then(|t| t.parse().ok())
    }
}

/// The signed-in user's profile, by remembered ID first.
///
/// # Errors
///
/// Returns an error if the backend request fails.
pub(crate) async fn find_own_profile(
    state: &AppState,
    session: &Session,
    user: &CurrentUser,
) -> std::result::Result<Option<UserProfile>, ApiError> {
    let mut prefs = Preferences::load(session).await;
    if let Some(id) = &prefs.user_profile_id {
        match state.backend().get_profile(id).await {
            Ok(profile) if profile.user_id.as_ref().is_none_or(|u| u == &user.id) => {
                return Ok(Some(profile));
            }
            Ok(_) | Err(ApiError::NotFound(_)) => {
                tracing::debug!(profile_id = %id, "Remembered profile is gone or not ours");
            }
            Err(e) => return Err(e),
        }
    }

    let found = state
        .backend()
        .get_profile_for_user(&user.token(), &user.id)
        .await?;
    let id = found.as_ref().and_then(|p| p.id.clone());
    if prefs.user_profile_id != id {
        prefs.user_profile_id = id;
        if let Err(e) = prefs.save(session).await {
            tracing::warn!("Failed to remember profile id: {e}");
        }
    }
    Ok(found)
}

/// Send the signed-in user to their public card.
///
/// # Errors
///
/// Returns an error if the backend request fails.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn own_profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
) -> Result<Redirect> {
    match find_own_profile(&state, &session, &user)
        .await?
        .and_then(|p| p.public_path())
    {
        Some(path) => Ok(Redirect::to(&path)),
        None => {
            Flash::info(&session, "Create your card profile first").await;
            Ok(Redirect::to("/checkout"))
        }
    }
}

/// Public card in its stored theme.
///
/// # Errors
///
/// Returns 404 for unknown profiles.
#[instrument(skip(state, page))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ThemeQuery>,
    page: PageContext,
) -> Result<Response> {
    render_public(&state, &ProfileId::new(id), query.theme(), None, page).await
}

/// Public card in the theme named by the path.
///
/// # Errors
///
/// Returns 404 for unknown profiles.
#[instrument(skip(state, page, uri))]
pub async fn public_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ThemeQuery>,
    OriginalUri(uri): OriginalUri,
    page: PageContext,
) -> Result<Response> {
    render_public(
        &state,
        &ProfileId::new(id),
        query.theme(),
        Some(uri.path()),
        page,
    )
    .await
}

async fn load_profile(state: &AppState, id: &ProfileId) -> Result<UserProfile> {
    state.backend().get_profile(id).await.map_err(|e| match e {
        ApiError::NotFound(_) => AppError::NotFound(format!("Profile {id}")),
        other => AppError::Api(other),
    })
}

async fn render_public(
    state: &AppState,
    id: &ProfileId,
    theme_override: Option<ProfileTheme>,
    path: Option<&str>,
    page: PageContext,
) -> Result<Response> {
    let profile = load_profile(state, id).await?;
    let vcard_url = format!("/profile/{}/vcard", urlencoding::encode(id.as_str()));
    let card = CardView::build(&PreviewInput {
        profile: &profile,
        theme_override,
        path,
        accent: None,
        vcard_url: Some(&vcard_url),
    });

    let description = [card.designation.as_str(), card.company_name.as_str()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" at ");
    let canonical_url = format!(
        "{}/{}/{}",
        state.config().base_url.trim_end_matches('/'),
        card.theme.as_str(),
        urlencoding::encode(id.as_str())
    );

    Ok(ProfilePageTemplate {
        page,
        title: card.full_name.clone(),
        description,
        og_image: card.profile_picture.clone(),
        canonical_url,
        card_html: render_card_view(&card)?,
    }
    .into_response())
}

/// Download the card holder's contact as a vCard.
///
/// # Errors
///
/// Returns 404 for unknown profiles.
#[instrument(skip(state))]
pub async fn vcard(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response> {
    let profile = load_profile(&state, &ProfileId::new(id)).await?;
    let disposition = format!("attachment; filename=\"{}\"", vcard_filename(&profile));
    Ok((
        [
            (header::CONTENT_TYPE, "text/vcard; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        build_vcard(&profile),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_query_ignores_unknown_names() {
        let query = ThemeQuery {
            theme: Some("neon".to_string()),
        };
        assert_eq!(query.theme(), None);

        let query = ThemeQuery {
            theme: Some("epic".to_string()),
        };
        assert_eq!(query.theme(), Some(ProfileTheme::Epic));
    }
}
