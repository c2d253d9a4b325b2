//! Live profile preview rendering.
//!
//! [`render_profile_card`] is a pure function of the profile, the resolved
//! theme and an optional accent colour. The checkout wizard swaps its output
//! in over HTMX as the visitor types or picks a theme; the customize page and
//! the public viewer embed the same markup.

use askama::Template;
use pgcards_core::ProfileTheme;

use super::{ProfileForm, ResolvedImages, UserProfile, build_payload};
use super::cdn::normalize_cdn_image_url;
use crate::routing::AppView;

/// What to render and how.
#[derive(Debug, Clone, Copy)]
pub struct PreviewInput<'a> {
    pub profile: &'a UserProfile,
    /// Explicit theme pick (checkout theme step, `?theme=` query).
    pub theme_override: Option<ProfileTheme>,
    /// Request path, consulted for `/<theme>/<id>` URLs.
    pub path: Option<&'a str>,
    /// `#rgb` / `#rrggbb`; anything else is ignored.
    pub accent: Option<&'a str>,
    /// Where the "Save contact" button points, when the profile is saved.
    pub vcard_url: Option<&'a str>,
}

/// Pick the theme: explicit override, then the URL path segment, then the
/// stored theme, then `standard`.
#[must_use]
pub fn resolve_theme(
    theme_override: Option<ProfileTheme>,
    path: Option<&str>,
    stored: Option<ProfileTheme>,
) -> ProfileTheme {
    theme_override
        .or_else(|| path.and_then(|p| AppView::from_path(p).path_theme()))
        .or(stored)
        .unwrap_or_default()
}

/// Colours for a theme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    pub background: &'static str,
    pub surface: &'static str,
    pub text: &'static str,
    pub muted: &'static str,
    pub accent: String,
}

impl Palette {
    #[must_use]
    pub fn for_theme(theme: ProfileTheme) -> Self {
        match theme {
            ProfileTheme::Standard => Self {
                background: "#f4f5f7",
                surface: "#ffffff",
                text: "#1c1f26",
                muted: "#6b7280",
                accent: "#2563eb".to_string(),
            },
            ProfileTheme::Modern => Self {
                background: "#eef2f0",
                surface: "#ffffff",
                text: "#0f172a",
                muted: "#64748b",
                accent: "#0d9488".to_string(),
            },
            ProfileTheme::Epic => Self {
                background: "#0b0b12",
                surface: "#16161f",
                text: "#f5f5f7",
                muted: "#a1a1aa",
                accent: "#f59e0b".to_string(),
            },
        }
    }

    fn with_accent(mut self, accent: Option<&str>) -> Self {
        if let Some(color) = accent.and_then(parse_hex_color) {
            self.accent = color;
        }
        self
    }
}

/// Accept `#rgb` or `#rrggbb` only, lowercased.
#[must_use]
pub fn parse_hex_color(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let hex = raw.strip_prefix('#')?;
    let valid = matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit());
    valid.then(|| format!("#{}", hex.to_ascii_lowercase()))
}

// =============================================================================
// View model
// =============================================================================

#[derive(Debug, Clone)]
pub struct PhoneLine {
    pub label: String,
    pub display: String,
    pub tel: String,
}

#[derive(Debug, Clone)]
pub struct EmailLine {
    pub label: String,
    pub address: String,
}

#[derive(Debug, Clone)]
pub struct SocialLine {
    pub platform: String,
    pub label: String,
    pub url: String,
}

/// Everything a theme template needs, already normalised.
#[derive(Debug, Clone)]
pub struct CardView {
    pub theme: ProfileTheme,
    pub full_name: String,
    pub initials: String,
    pub company_name: String,
    pub designation: String,
    pub about: String,
    pub phones: Vec<PhoneLine>,
    pub emails: Vec<EmailLine>,
    pub address: String,
    pub map_link: String,
    pub social: Vec<SocialLine>,
    pub profile_picture: Option<String>,
    pub cover_image: Option<String>,
    pub carousel: Vec<String>,
    pub palette: Palette,
    pub vcard_url: Option<String>,
}

impl CardView {
    #[must_use]
    pub fn build(input: &PreviewInput<'_>) -> Self {
        let profile = input.profile;
        let theme = resolve_theme(input.theme_override, input.path, Some(profile.theme));
        let image = |url: &str| {
            let url = url.trim();
            (!url.is_empty()).then(|| normalize_cdn_image_url(url))
        };

        let full_name = if profile.full_name.trim().is_empty() {
            "Your Name".to_string()
        } else {
            profile.full_name.trim().to_string()
        };

        Self {
            theme,
            initials: profile.initials(),
            full_name,
            company_name: profile.company_name.trim().to_string(),
            designation: profile.designation.trim().to_string(),
            about: profile.about.trim().to_string(),
            phones: profile
                .phone_numbers
                .iter()
                .filter(|p| !p.number.trim().is_empty())
                .map(|p| PhoneLine {
                    label: non_empty_or(&p.label, "Mobile"),
                    display: p.combined(),
                    tel: p.tel_uri(),
                })
                .collect(),
            emails: profile
                .emails
                .iter()
                .filter(|e| !e.email_address.trim().is_empty())
                .map(|e| EmailLine {
                    label: non_empty_or(&e.label, "Email"),
                    address: e.email_address.trim().to_string(),
                })
                .collect(),
            address: profile.contact_details.one_line(),
            map_link: safe_link(&profile.contact_details.map_link),
            social: profile
                .social_media
                .iter()
                .filter(|s| !safe_link(&s.url).is_empty())
                .map(|s| SocialLine {
                    platform: s.platform.trim().to_lowercase(),
                    label: social_label(&s.platform),
                    url: safe_link(&s.url),
                })
                .collect(),
            profile_picture: image(&profile.profile_picture),
            cover_image: image(&profile.cover_image),
            carousel: profile
                .carousel_images
                .iter()
                .filter_map(|url| image(url))
                .collect(),
            palette: Palette::for_theme(theme).with_accent(input.accent),
            vcard_url: input.vcard_url.map(str::to_string),
        }
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

/// Only http(s) links make it into `href`s.
fn safe_link(url: &str) -> String {
    let url = url.trim();
    match url::Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => url.to_string(),
        _ => String::new(),
    }
}

fn social_label(platform: &str) -> String {
    match platform.trim().to_lowercase().as_str() {
        "linkedin" => "LinkedIn".to_string(),
        "x" | "twitter" => "X".to_string(),
        "instagram" => "Instagram".to_string(),
        "facebook" => "Facebook".to_string(),
        "youtube" => "YouTube".to_string(),
        "tiktok" => "TikTok".to_string(),
        "github" => "GitHub".to_string(),
        "whatsapp" => "WhatsApp".to_string(),
        "" => "Website".to_string(),
        other => {
            let mut chars = other.chars();
            chars.next().map_or_else(String::new, |c| {
                c.to_uppercase().chain(chars).collect::<String>()
            })
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

#[derive(Template)]
#[template(path = "themes/standard.html")]
struct StandardCardTemplate<'a> {
    card: &'a CardView,
}

#[derive(Template)]
#[template(path = "themes/modern.html")]
struct ModernCardTemplate<'a> {
    card: &'a CardView,
}

#[derive(Template)]
#[template(path = "themes/epic.html")]
struct EpicCardTemplate<'a> {
    card: &'a CardView,
}

/// Render the card markup for a profile.
///
/// # Errors
///
/// Returns a template error if rendering fails.
pub fn render_profile_card(input: &PreviewInput<'_>) -> Result<String, askama::Error> {
    let card = CardView::build(input);
    render_card_view(&card)
}

/// Render an already-built view model.
///
/// # Errors
///
/// Returns a template error if rendering fails.
pub fn render_card_view(card: &CardView) -> Result<String, askama::Error> {
    match card.theme {
        ProfileTheme::Standard => StandardCardTemplate { card }.render(),
        ProfileTheme::Modern => ModernCardTemplate { card }.render(),
        ProfileTheme::Epic => EpicCardTemplate { card }.render(),
    }
}

/// Render the card for an unsaved form, as the wizard and customize page
/// preview it while the visitor types.
///
/// # Errors
///
/// Returns a template error if rendering fails.
pub fn render_form_preview(
    form: &ProfileForm,
    theme: ProfileTheme,
    accent: Option<&str>,
) -> Result<String, askama::Error> {
    let images = ResolvedImages {
        profile_picture: form.profile_picture.clone(),
        cover_image: form.cover_image.clone(),
        carousel_images: form.carousel_images.clone(),
    };
    let profile = build_payload(form, None, None, theme, images);
    render_profile_card(&PreviewInput {
        profile: &profile,
        theme_override: Some(theme),
        path: None,
        accent,
        vcard_url: None,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::profile::{EmailEntry, PhoneEntry, SocialLink};

    fn profile(theme: ProfileTheme) -> UserProfile {
        UserProfile {
            full_name: "Jane Q Public".to_string(),
            company_name: "Acme".to_string(),
            designation: "Engineer".to_string(),
            phone_numbers: vec![PhoneEntry {
                label: "work".to_string(),
                country_code: "+971".to_string(),
                number: "50 000 0000".to_string(),
            }],
            emails: vec![EmailEntry {
                label: String::new(),
                email_address: "jane@acme.com".to_string(),
            }],
            social_media: vec![
                SocialLink {
                    platform: "linkedin".to_string(),
                    url: "https://linkedin.com/in/jane".to_string(),
                },
                SocialLink {
                    platform: "evil".to_string(),
                    url: "javascript:alert(1)".to_string(),
                },
            ],
            profile_picture: "https://res.cloudinary.com/pg/image/upload/v1/jane.heic".to_string(),
            theme,
            ..UserProfile::default()
        }
    }

    fn input<'a>(profile: &'a UserProfile) -> PreviewInput<'a> {
        PreviewInput {
            profile,
            theme_override: None,
            path: None,
            accent: None,
            vcard_url: None,
        }
    }

    #[test]
    fn test_override_beats_profile_theme() {
        assert_eq!(
            resolve_theme(Some(ProfileTheme::Epic), None, Some(ProfileTheme::Modern)),
            ProfileTheme::Epic
        );
    }

    #[test]
    fn test_path_beats_profile_theme() {
        assert_eq!(
            resolve_theme(None, Some("/standard/123"), Some(ProfileTheme::Modern)),
            ProfileTheme::Standard
        );
    }

    #[test]
    fn test_override_beats_path() {
        assert_eq!(
            resolve_theme(Some(ProfileTheme::Modern), Some("/epic/1"), None),
            ProfileTheme::Modern
        );
    }

    #[test]
    fn test_falls_back_to_stored_then_standard() {
        assert_eq!(
            resolve_theme(None, Some("/checkout"), Some(ProfileTheme::Epic)),
            ProfileTheme::Epic
        );
        assert_eq!(resolve_theme(None, None, None), ProfileTheme::Standard);
    }

    #[rstest]
    #[case("#ABC", Some("#abc"))]
    #[case(" #12ab9F ", Some("#12ab9f"))]
    #[case("12ab9f", None)]
    #[case("#12ab9", None)]
    #[case("red;background:url(x)", None)]
    fn test_parse_hex_color(#[case] raw: &str, #[case] expected: Option<&str>) {
        assert_eq!(parse_hex_color(raw).as_deref(), expected);
    }

    #[test]
    fn test_card_view_normalises_content() {
        let p = profile(ProfileTheme::Modern);
        let card = CardView::build(&input(&p));
        assert_eq!(card.theme, ProfileTheme::Modern);
        assert_eq!(card.phones[0].display, "+971 50 000 0000");
        assert_eq!(card.phones[0].tel, "+971500000000");
        assert_eq!(card.emails[0].label, "Email");
        assert_eq!(card.social.len(), 1);
        assert_eq!(
            card.profile_picture.as_deref(),
            Some("https://res.cloudinary.com/pg/image/upload/v1/jane.jpg")
        );
    }

    #[test]
    fn test_accent_override_applies() {
        let p = profile(ProfileTheme::Standard);
        let mut preview = input(&p);
        preview.accent = Some("#FF0066");
        assert_eq!(CardView::build(&preview).palette.accent, "#ff0066");
        preview.accent = Some("not a colour");
        assert_eq!(
            CardView::build(&preview).palette.accent,
            Palette::for_theme(ProfileTheme::Standard).accent
        );
    }

    #[rstest]
    #[case(ProfileTheme::Standard, "pg-card-standard")]
    #[case(ProfileTheme::Modern, "pg-card-modern")]
    #[case(ProfileTheme::Epic, "pg-card-epic")]
    fn test_each_theme_renders_own_layout(#[case] theme: ProfileTheme, #[case] class: &str) {
        let p = profile(ProfileTheme::Standard);
        let mut preview = input(&p);
        preview.theme_override = Some(theme);
        let html = render_profile_card(&preview).unwrap();
        assert!(html.contains(class));
        assert!(html.contains("Jane Q Public"));
        assert!(html.contains("tel:+971500000000"));
        assert!(!html.contains("javascript:"));
    }

    #[test]
    fn test_markup_is_escaped() {
        let mut p = profile(ProfileTheme::Standard);
        p.full_name = "<script>alert(1)</script>".to_string();
        let html = render_profile_card(&input(&p)).unwrap();
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_empty_name_gets_placeholder() {
        let p = UserProfile::default();
        let html = render_profile_card(&input(&p)).unwrap();
        assert!(html.contains("Your Name"));
    }
}
