//! Edit a saved profile outside the checkout wizard.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
};
use pgcards_core::ProfileTheme;
use tower_sessions::Session;
use tracing::instrument;

use super::PageContext;
use super::checkout::save_form;
use super::profile::find_own_profile;
use crate::checkout::CheckoutDraft;
use crate::error::Result;
use crate::filters;
use crate::middleware::{CspNonce, RequireAuth};
use crate::models::{Flash, Preferences};
use crate::profile::preview::{parse_hex_color, render_form_preview};
use crate::profile::{ProfileForm, validate_form};
use crate::state::AppState;

/// Theme radio button.
#[derive(Clone)]
pub struct ThemeOption {
    pub slug: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

fn theme_options(selected: ProfileTheme) -> Vec<ThemeOption> {
    ProfileTheme::ALL
        .iter()
        .map(|&theme| ThemeOption {
            slug: theme.as_str(),
            label: theme.label(),
            selected: theme == selected,
        })
        .collect()
}

#[derive(Template, WebTemplate)]
#[template(path = "customize.html")]
pub struct CustomizeTemplate {
    pub page: PageContext,
    pub form: ProfileForm,
    pub themes: Vec<ThemeOption>,
    pub accent_color: String,
    pub preview_html: String,
    pub public_path: Option<String>,
}

/// Display the editor, prefilled from the saved profile.
///
/// # Errors
///
/// Returns an error if the backend request or rendering fails.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    nonce: CspNonce,
) -> Result<Response> {
    let Some(profile) = find_own_profile(&state, &session, &user).await? else {
        Flash::info(&session, "Create your card profile first").await;
        return Ok(Redirect::to("/checkout").into_response());
    };

    let prefs = Preferences::load(&session).await;
    let mut form = ProfileForm::from_profile(&profile);
    form.accent_color.clone_from(&prefs.selected_accent_color);
    let theme = profile.theme;
    let preview_html = render_form_preview(&form, theme, form.accent_color.as_deref())?;
    let page = PageContext::build(&state, &session, "/customize", nonce.0).await;

    Ok(CustomizeTemplate {
        page,
        themes: theme_options(theme),
        accent_color: form.accent_color.clone().unwrap_or_default(),
        preview_html,
        public_path: profile.public_path(),
        form,
    }
    .into_response())
}

/// Save edits to the existing profile.
///
/// # Errors
///
/// Returns an error if the session cannot be written.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn save(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Redirect> {
    let mut form = ProfileForm::from_pairs(&pairs);
    if let Err(e) = validate_form(&form) {
        Flash::error(&session, e.to_string()).await;
        return Ok(Redirect::to("/customize"));
    }

    let mut prefs = Preferences::load(&session).await;
    let theme = form
        .theme
        .or(prefs.selected_card_template)
        .unwrap_or_default();
    let upload_key = CheckoutDraft::load(&session).await.upload_key;

    match save_form(
        &state,
        &user,
        &mut form,
        &upload_key,
        prefs.user_profile_id.clone(),
        theme,
    )
    .await
    {
        Ok(profile_id) => {
            prefs.user_profile_id = Some(profile_id);
            prefs.selected_card_template = Some(theme);
            prefs.selected_accent_color = form.accent_color.as_deref().and_then(parse_hex_color);
            prefs.save(&session).await?;
            Flash::success(&session, "Your card has been updated").await;
            Ok(Redirect::to("/dashboard"))
        }
        Err(e) => {
            tracing::warn!("Profile update failed: {e}");
            Flash::error(&session, e.public_message()).await;
            Ok(Redirect::to("/customize"))
        }
    }
}

/// Live preview fragment for the editor (HTMX).
///
/// # Errors
///
/// Returns an error if the card fails to render.
pub async fn preview(
    RequireAuth(_user): RequireAuth,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Html<String>> {
    let form = ProfileForm::from_pairs(&pairs);
    let theme = form.theme.unwrap_or_default();
    let accent = form.accent_color.as_deref().and_then(parse_hex_color);
    Ok(Html(render_form_preview(&form, theme, accent.as_deref())?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_options_mark_selection() {
        let options = theme_options(ProfileTheme::Modern);
        assert_eq!(options.len(), ProfileTheme::ALL.len());
        assert_eq!(
            options.iter().filter(|o| o.selected).map(|o| o.slug).collect::<Vec<_>>(),
            vec!["modern"]
        );
    }
}
