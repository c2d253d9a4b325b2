//! Digital business-card profiles.
//!
//! - [`UserProfile`]: the persisted record (wire format of the backend).
//! - [`ProfileForm`]: what the checkout and customize forms post, parsed from
//!   repeated form keys.
//! - [`validate_form`] and [`build_payload`]: local checks and normalisation
//!   before the single upsert call.
//!
//! Rendering lives in [`preview`], image URL rewriting in [`cdn`] and contact
//! export in [`vcard`].

pub mod cdn;
pub mod preview;
pub mod vcard;

use chrono::{DateTime, Utc};
use pgcards_core::{Email, ProfileId, ProfileTheme, UserId};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

// =============================================================================
// Persisted profile
// =============================================================================

/// A user's public card profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(
        rename = "_id",
        alias = "id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<ProfileId>,
    #[serde(default, alias = "userId", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub designation: String,
    #[serde(default)]
    pub about: String,
    #[serde(default)]
    pub phone_numbers: Vec<PhoneEntry>,
    #[serde(default)]
    pub emails: Vec<EmailEntry>,
    #[serde(default)]
    pub contact_details: ContactDetails,
    #[serde(default)]
    pub social_media: Vec<SocialLink>,
    #[serde(default)]
    pub profile_picture: String,
    #[serde(default)]
    pub cover_image: String,
    #[serde(default)]
    pub carousel_images: Vec<String>,
    #[serde(default, deserialize_with = "lenient_theme")]
    pub theme: ProfileTheme,
    #[serde(default, skip_serializing)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneEntry {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub country_code: String,
    #[serde(default)]
    pub number: String,
}

impl PhoneEntry {
    /// Dialable number with the country code applied.
    #[must_use]
    pub fn combined(&self) -> String {
        normalize_phone(&self.country_code, &self.number)
    }

    /// `tel:` URI target (no spaces).
    #[must_use]
    pub fn tel_uri(&self) -> String {
        self.combined().chars().filter(|c| !c.is_whitespace()).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailEntry {
    #[serde(default)]
    pub label: String,
    #[serde(default, alias = "email")]
    pub email_address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactDetails {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub map_link: String,
}

impl ContactDetails {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.address.trim().is_empty()
            && self.state.trim().is_empty()
            && self.country.trim().is_empty()
    }

    /// "Address, State, Country" with blanks skipped.
    #[must_use]
    pub fn one_line(&self) -> String {
        [&self.address, &self.state, &self.country]
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLink {
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub url: String,
}

/// Unknown or blank themes from older records fall back to the default.
fn lenient_theme<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ProfileTheme, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw
        .and_then(|s| s.parse::<ProfileTheme>().ok())
        .unwrap_or_default())
}

impl UserProfile {
    /// Given name and family name, split at the first space.
    #[must_use]
    pub fn name_parts(&self) -> (&str, &str) {
        let name = self.full_name.trim();
        match name.split_once(' ') {
            Some((first, rest)) => (first, rest.trim()),
            None => (name, ""),
        }
    }

    /// Up to two initials for avatar placeholders.
    #[must_use]
    pub fn initials(&self) -> String {
        self.full_name
            .split_whitespace()
            .filter_map(|w| w.chars().next())
            .take(2)
            .flat_map(char::to_uppercase)
            .collect()
    }

    /// Public viewer path, e.g. `/modern/6650a1b2`.
    #[must_use]
    pub fn public_path(&self) -> Option<String> {
        self.id
            .as_ref()
            .filter(|id| !id.is_empty())
            .map(|id| format!("/{}/{}", self.theme.as_str(), id))
    }
}

// =============================================================================
// Form input
// =============================================================================

/// Profile form as posted by the checkout wizard and the customize page.
///
/// Repeated keys (`phone_number`, `email`, `social_url`, ...) are zipped by
/// position, so the nth phone label pairs with the nth phone number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileForm {
    pub full_name: String,
    pub company_name: String,
    pub designation: String,
    pub about: String,
    pub phones: Vec<PhoneEntry>,
    pub emails: Vec<EmailEntry>,
    pub contact: ContactDetails,
    pub social: Vec<SocialLink>,
    /// Already-uploaded image URLs carried in hidden fields.
    pub profile_picture: String,
    pub cover_image: String,
    pub carousel_images: Vec<String>,
    pub theme: Option<ProfileTheme>,
    pub accent_color: Option<String>,
}

impl ProfileForm {
    /// Parse from url-encoded pairs, keeping repeated keys in order.
    #[must_use]
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let all = |key: &str| -> Vec<String> {
            pairs
                .iter()
                .filter(|(k, _)| k == key)
                .map(|(_, v)| v.trim().to_string())
                .collect()
        };
        let first = |key: &str| -> String { all(key).into_iter().next().unwrap_or_default() };
        let nth = |list: &[String], i: usize| list.get(i).cloned().unwrap_or_default();

        let phone_labels = all("phone_label");
        let phone_codes = all("phone_country_code");
        let phone_numbers = all("phone_number");
        let phones = (0..phone_numbers.len())
            .map(|i| PhoneEntry {
                label: nth(&phone_labels, i),
                country_code: nth(&phone_codes, i),
                number: nth(&phone_numbers, i),
            })
            .collect();

        let email_labels = all("email_label");
        let emails = all("email")
            .into_iter()
            .enumerate()
            .map(|(i, email_address)| EmailEntry {
                label: nth(&email_labels, i),
                email_address,
            })
            .collect();

        let platforms = all("social_platform");
        let social = all("social_url")
            .into_iter()
            .enumerate()
            .map(|(i, url)| SocialLink {
                platform: nth(&platforms, i),
                url,
            })
            .collect();

        let non_empty = |s: String| if s.is_empty() { None } else { Some(s) };

        Self {
            full_name: first("full_name"),
            company_name: first("company_name"),
            designation: first("designation"),
            about: first("about"),
            phones,
            emails,
            contact: ContactDetails {
                address: first("address"),
                state: first("state"),
                country: first("country"),
                map_link: first("map_link"),
            },
            social,
            profile_picture: first("profile_picture"),
            cover_image: first("cover_image"),
            carousel_images: all("carousel_image"),
            theme: non_empty(first("theme")).and_then(|t| t.parse().ok()),
            accent_color: non_empty(first("accent_color")),
        }
    }

    /// Prefill the form from a saved profile.
    #[must_use]
    pub fn from_profile(profile: &UserProfile) -> Self {
        let phones = profile
            .phone_numbers
            .iter()
            .map(|p| {
                let code = p.country_code.trim();
                let number = if code.is_empty() {
                    p.number.trim()
                } else {
                    p.number.trim().strip_prefix(code).unwrap_or(p.number.trim()).trim()
                };
                PhoneEntry {
                    label: p.label.clone(),
                    country_code: code.to_string(),
                    number: number.to_string(),
                }
            })
            .collect();

        Self {
            full_name: profile.full_name.clone(),
            company_name: profile.company_name.clone(),
            designation: profile.designation.clone(),
            about: profile.about.clone(),
            phones,
            emails: profile.emails.clone(),
            contact: profile.contact_details.clone(),
            social: profile.social_media.clone(),
            profile_picture: profile.profile_picture.clone(),
            cover_image: profile.cover_image.clone(),
            carousel_images: profile.carousel_images.clone(),
            theme: Some(profile.theme),
            accent_color: None,
        }
    }

    /// Form rows to render: at least one (possibly blank) row per list.
    #[must_use]
    pub fn phone_rows(&self) -> Vec<PhoneEntry> {
        non_empty_rows(&self.phones)
    }

    #[must_use]
    pub fn email_rows(&self) -> Vec<EmailEntry> {
        non_empty_rows(&self.emails)
    }

    #[must_use]
    pub fn social_rows(&self) -> Vec<SocialLink> {
        non_empty_rows(&self.social)
    }

    /// Carry resolved image URLs into the hidden fields.
    pub fn apply_images(&mut self, images: &ResolvedImages) {
        self.profile_picture.clone_from(&images.profile_picture);
        self.cover_image.clone_from(&images.cover_image);
        self.carousel_images.clone_from(&images.carousel_images);
    }
}

fn non_empty_rows<T: Clone + Default>(rows: &[T]) -> Vec<T> {
    if rows.is_empty() {
        vec![T::default()]
    } else {
        rows.to_vec()
    }
}

// =============================================================================
// Validation & normalisation
// =============================================================================

/// The first rule a profile form breaks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileValidationError {
    #[error("Full name is required")]
    MissingFullName,
    #[error("Designation is required")]
    MissingDesignation,
    #[error("Company name is required")]
    MissingCompanyName,
    #[error("At least one phone number is required")]
    MissingPhone,
    #[error("At least one email is required")]
    MissingEmail,
    #[error("{0} is not a valid email address")]
    InvalidEmail(String),
}

/// Check required fields before anything is uploaded or saved.
///
/// # Errors
///
/// Returns the first failing rule, in form order.
pub fn validate_form(form: &ProfileForm) -> Result<(), ProfileValidationError> {
    if form.full_name.trim().is_empty() {
        return Err(ProfileValidationError::MissingFullName);
    }
    if form.designation.trim().is_empty() {
        return Err(ProfileValidationError::MissingDesignation);
    }
    if form.company_name.trim().is_empty() {
        return Err(ProfileValidationError::MissingCompanyName);
    }
    if !form.phones.iter().any(|p| !p.number.trim().is_empty()) {
        return Err(ProfileValidationError::MissingPhone);
    }
    let emails: Vec<&str> = form
        .emails
        .iter()
        .map(|e| e.email_address.trim())
        .filter(|e| !e.is_empty())
        .collect();
    if emails.is_empty() {
        return Err(ProfileValidationError::MissingEmail);
    }
    if let Some(bad) = emails.iter().find(|e| Email::parse(e).is_err()) {
        return Err(ProfileValidationError::InvalidEmail((*bad).to_string()));
    }
    Ok(())
}

/// Join a country code and a local number.
///
/// Numbers that already start with `+` and have no separate code pass
/// through, as do numbers that already carry the code.
#[must_use]
pub fn normalize_phone(country_code: &str, number: &str) -> String {
    let code = country_code.trim();
    let number = number.trim();
    if number.is_empty() {
        return String::new();
    }
    if code.is_empty() || number.starts_with(code) {
        return number.to_string();
    }
    format!("{code} {number}")
}

/// Image URLs resolved for a save (uploads done or retried).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedImages {
    pub profile_picture: String,
    pub cover_image: String,
    pub carousel_images: Vec<String>,
}

/// Build the upsert payload from a validated form.
#[must_use]
pub fn build_payload(
    form: &ProfileForm,
    id: Option<ProfileId>,
    user_id: Option<UserId>,
    theme: ProfileTheme,
    images: ResolvedImages,
) -> UserProfile {
    let phone_numbers = form
        .phones
        .iter()
        .filter(|p| !p.number.trim().is_empty())
        .map(|p| PhoneEntry {
            label: p.label.trim().to_string(),
            country_code: p.country_code.trim().to_string(),
            number: p.combined(),
        })
        .collect();

    let emails = form
        .emails
        .iter()
        .filter(|e| !e.email_address.trim().is_empty())
        .map(|e| EmailEntry {
            label: e.label.trim().to_string(),
            email_address: e.email_address.trim().to_string(),
        })
        .collect();

    let social_media = form
        .social
        .iter()
        .filter(|s| !s.url.trim().is_empty())
        .map(|s| SocialLink {
            platform: s.platform.trim().to_lowercase(),
            url: s.url.trim().to_string(),
        })
        .collect();

    UserProfile {
        id,
        user_id,
        full_name: form.full_name.trim().to_string(),
        company_name: form.company_name.trim().to_string(),
        designation: form.designation.trim().to_string(),
        about: form.about.trim().to_string(),
        phone_numbers,
        emails,
        contact_details: ContactDetails {
            address: form.contact.address.trim().to_string(),
            state: form.contact.state.trim().to_string(),
            country: form.contact.country.trim().to_string(),
            map_link: form.contact.map_link.trim().to_string(),
        },
        social_media,
        profile_picture: images.profile_picture,
        cover_image: images.cover_image,
        carousel_images: images
            .carousel_images
            .into_iter()
            .filter(|url| !url.is_empty())
            .collect(),
        theme,
        created_at: None,
        updated_at: None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use rstest::rstest;

    use super::*;

    pub(crate) fn complete_form() -> ProfileForm {
        ProfileForm {
            full_name: "Jane Q Public".to_string(),
            company_name: "Acme".to_string(),
            designation: "Engineer".to_string(),
            phones: vec![PhoneEntry {
                label: "work".to_string(),
                country_code: "+1".to_string(),
                number: "5551234".to_string(),
            }],
            emails: vec![EmailEntry {
                label: String::new(),
                email_address: "a@b.com".to_string(),
            }],
            ..ProfileForm::default()
        }
    }

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_complete_form_is_valid() {
        assert_eq!(validate_form(&complete_form()), Ok(()));
    }

    #[rstest]
    #[case::full_name(|f: &mut ProfileForm| f.full_name.clear(), ProfileValidationError::MissingFullName)]
    #[case::designation(|f: &mut ProfileForm| f.designation = "  ".into(), ProfileValidationError::MissingDesignation)]
    #[case::company(|f: &mut ProfileForm| f.company_name.clear(), ProfileValidationError::MissingCompanyName)]
    #[case::phone(|f: &mut ProfileForm| f.phones[0].number.clear(), ProfileValidationError::MissingPhone)]
    #[case::email(|f: &mut ProfileForm| f.emails.clear(), ProfileValidationError::MissingEmail)]
    fn test_single_missing_field_rejected(
        #[case] mutate: fn(&mut ProfileForm),
        #[case] expected: ProfileValidationError,
    ) {
        let mut form = complete_form();
        mutate(&mut form);
        assert_eq!(validate_form(&form), Err(expected));
    }

    #[test]
    fn test_validation_messages() {
        assert_eq!(
            ProfileValidationError::MissingFullName.to_string(),
            "Full name is required"
        );
        assert_eq!(
            ProfileValidationError::MissingPhone.to_string(),
            "At least one phone number is required"
        );
        assert_eq!(
            ProfileValidationError::MissingEmail.to_string(),
            "At least one email is required"
        );
    }

    #[test]
    fn test_malformed_email_rejected() {
        let mut form = complete_form();
        form.emails[0].email_address = "not-an-email".to_string();
        assert!(matches!(
            validate_form(&form),
            Err(ProfileValidationError::InvalidEmail(_))
        ));
    }

    #[rstest]
    #[case("+971", "50 000 0000", "+971 50 000 0000")]
    #[case("", "+971500000000", "+971500000000")]
    #[case("", "0500000000", "0500000000")]
    #[case("+971", "+971 50 000 0000", "+971 50 000 0000")]
    #[case("+1", "   ", "")]
    fn test_normalize_phone(#[case] code: &str, #[case] number: &str, #[case] expected: &str) {
        assert_eq!(normalize_phone(code, number), expected);
    }

    #[test]
    fn test_from_pairs_zips_repeated_keys() {
        let form = ProfileForm::from_pairs(&pairs(&[
            ("full_name", " Jane Q Public "),
            ("phone_label", "work"),
            ("phone_country_code", "+971"),
            ("phone_number", "50 000 0000"),
            ("phone_label", "home"),
            ("phone_country_code", ""),
            ("phone_number", "+44 20 7946 0000"),
            ("email_label", "work"),
            ("email", "jane@acme.com"),
            ("social_platform", "linkedin"),
            ("social_url", "https://linkedin.com/in/jane"),
            ("carousel_image", "https://res.cloudinary.com/x/image/upload/a.jpg"),
            ("theme", "epic"),
            ("accent_color", ""),
        ]));
        assert_eq!(form.full_name, "Jane Q Public");
        assert_eq!(form.phones.len(), 2);
        assert_eq!(form.phones[1].label, "home");
        assert_eq!(form.phones[0].combined(), "+971 50 000 0000");
        assert_eq!(form.emails[0].label, "work");
        assert_eq!(form.social[0].platform, "linkedin");
        assert_eq!(form.carousel_images.len(), 1);
        assert_eq!(form.theme, Some(ProfileTheme::Epic));
        assert_eq!(form.accent_color, None);
    }

    #[test]
    fn test_build_payload_filters_and_normalises() {
        let mut form = complete_form();
        form.phones.push(PhoneEntry::default());
        form.emails.push(EmailEntry::default());
        form.social = vec![
            SocialLink {
                platform: "LinkedIn".to_string(),
                url: "https://linkedin.com/in/jane".to_string(),
            },
            SocialLink {
                platform: "x".to_string(),
                url: " ".to_string(),
            },
        ];
        let payload = build_payload(
            &form,
            None,
            Some(UserId::new("u1")),
            ProfileTheme::Modern,
            ResolvedImages {
                profile_picture: String::new(),
                cover_image: "https://cdn/cover.jpg".to_string(),
                carousel_images: vec!["https://cdn/1.jpg".to_string(), String::new()],
            },
        );
        assert_eq!(payload.phone_numbers.len(), 1);
        assert_eq!(payload.phone_numbers[0].number, "+1 5551234");
        assert_eq!(payload.emails.len(), 1);
        assert_eq!(payload.social_media.len(), 1);
        assert_eq!(payload.social_media[0].platform, "linkedin");
        assert_eq!(payload.carousel_images, vec!["https://cdn/1.jpg".to_string()]);
        assert_eq!(payload.theme, ProfileTheme::Modern);
    }

    #[test]
    fn test_saved_number_round_trips_through_form() {
        let payload = build_payload(
            &complete_form(),
            None,
            None,
            ProfileTheme::Standard,
            ResolvedImages::default(),
        );
        let form = ProfileForm::from_profile(&payload);
        assert_eq!(form.phones[0].number, "5551234");
        assert_eq!(form.phones[0].combined(), "+1 5551234");
    }

    #[test]
    fn test_name_parts_and_initials() {
        let profile = UserProfile {
            full_name: "Jane Q Public".to_string(),
            ..UserProfile::default()
        };
        assert_eq!(profile.name_parts(), ("Jane", "Q Public"));
        assert_eq!(profile.initials(), "JQ");

        let single = UserProfile {
            full_name: "Cher".to_string(),
            ..UserProfile::default()
        };
        assert_eq!(single.name_parts(), ("Cher", ""));
    }

    #[test]
    fn test_apply_images_keeps_retried_urls() {
        let mut form = complete_form();
        form.carousel_images = vec!["https://cdn/old.jpg".to_string()];
        form.apply_images(&ResolvedImages {
            profile_picture: "https://cdn/me.png".to_string(),
            cover_image: String::new(),
            carousel_images: vec![
                "https://cdn/old.jpg".to_string(),
                "https://cdn/retried.jpg".to_string(),
            ],
        });
        assert_eq!(form.profile_picture, "https://cdn/me.png");
        assert_eq!(form.cover_image, "");
        assert_eq!(form.carousel_images.len(), 2);

        let again = build_payload(
            &form,
            None,
            None,
            ProfileTheme::Standard,
            ResolvedImages {
                profile_picture: form.profile_picture.clone(),
                cover_image: form.cover_image.clone(),
                carousel_images: form.carousel_images.clone(),
            },
        );
        assert_eq!(again.profile_picture, "https://cdn/me.png");
    }

    #[test]
    fn test_unknown_theme_falls_back_to_standard() {
        let profile: UserProfile =
            serde_json::from_value(serde_json::json!({ "_id": "p1", "theme": "retro" })).unwrap();
        assert_eq!(profile.theme, ProfileTheme::Standard);
        assert_eq!(profile.public_path().as_deref(), Some("/standard/p1"));
    }
}
