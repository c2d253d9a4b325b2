//! Standalone HTML preview of a profile card.

use std::path::{Path, PathBuf};

use pgcards_core::ProfileTheme;
use pgcards_storefront::profile::UserProfile;
use pgcards_storefront::profile::preview::{PreviewInput, render_profile_card};

use super::{CliError, load_profile, write_output};

/// Render the card with an optional theme and accent override.
pub async fn render(
    profile: &Path,
    theme: Option<&str>,
    accent: Option<&str>,
    stylesheet: &str,
    output: Option<PathBuf>,
) -> Result<(), CliError> {
    let theme = theme
        .map(str::parse::<ProfileTheme>)
        .transpose()
        .map_err(|e| CliError::Invalid(e.to_string()))?;
    let profile = load_profile(profile).await?;
    let page = page(&profile, theme, accent, stylesheet)?;
    write_output(output.as_deref(), page.as_bytes()).await?;
    if let Some(path) = output {
        tracing::info!(path = %path.display(), "Preview written");
    }
    Ok(())
}

fn page(
    profile: &UserProfile,
    theme: Option<ProfileTheme>,
    accent: Option<&str>,
    stylesheet: &str,
) -> Result<String, CliError> {
    let card = render_profile_card(&PreviewInput {
        profile,
        theme_override: theme,
        path: None,
        accent,
        vcard_url: None,
    })?;
    let title = if profile.full_name.trim().is_empty() {
        "Card preview"
    } else {
        profile.full_name.trim()
    };
    Ok(format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{}</title>\n<link rel=\"stylesheet\" href=\"{}\">\n</head>\n\
         <body class=\"profile-page\">\n<main>\n{card}\n</main>\n</body>\n</html>\n",
        escape_html(title),
        escape_html(stylesheet),
    ))
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn profile() -> UserProfile {
        UserProfile {
            full_name: "Jane <Q> Public".to_string(),
            company_name: "Acme".to_string(),
            theme: ProfileTheme::Modern,
            ..UserProfile::default()
        }
    }

    #[test]
    fn uses_stored_theme_without_override() {
        let html = page(&profile(), None, None, "/static/css/main.css").unwrap();
        assert!(html.contains("pg-card-modern"));
        assert!(html.contains("<title>Jane &lt;Q&gt; Public</title>"));
    }

    #[test]
    fn override_wins() {
        let html = page(&profile(), Some(ProfileTheme::Epic), None, "main.css").unwrap();
        assert!(html.contains("pg-card-epic"));
        assert!(html.contains("href=\"main.css\""));
    }
}
