//! vCard 3.0 export so visitors can save a card holder to their contacts.

use std::fmt::Write as _;

use super::UserProfile;
use super::cdn::normalize_cdn_image_url;

const CRLF: &str = "\r\n";

/// Build a vCard 3.0 document with CRLF line endings.
///
/// Text values are escaped per RFC 2426 (backslash, comma, semicolon,
/// newline). Empty fields are omitted rather than emitted blank.
#[must_use]
pub fn build_vcard(profile: &UserProfile) -> String {
    let mut card = VCardWriter::default();
    card.line("BEGIN:VCARD");
    card.line("VERSION:3.0");

    let (first, last) = profile.name_parts();
    card.line(&format!("N:{};{};;;", escape(last), escape(first)));
    card.line(&format!("FN:{}", escape(profile.full_name.trim())));

    card.optional("ORG", &profile.company_name);
    card.optional("TITLE", &profile.designation);

    for phone in &profile.phone_numbers {
        let number = phone.combined();
        if number.is_empty() {
            continue;
        }
        card.line(&format!(
            "TEL;type={};type=VOICE:{}",
            type_param(&phone.label, "CELL"),
            escape(&number)
        ));
    }

    for email in &profile.emails {
        let address = email.email_address.trim();
        if address.is_empty() {
            continue;
        }
        card.line(&format!(
            "EMAIL;type=INTERNET;type={}:{}",
            type_param(&email.label, "WORK"),
            escape(address)
        ));
    }

    let contact = &profile.contact_details;
    if !contact.is_empty() {
        // ADR: PO box; extended; street; locality; region; postal code; country
        card.line(&format!(
            "ADR;type=WORK:;;{};;{};;{}",
            escape(contact.address.trim()),
            escape(contact.state.trim()),
            escape(contact.country.trim())
        ));
    }
    card.optional("URL", &contact.map_link);

    for social in &profile.social_media {
        let url = social.url.trim();
        if url.is_empty() {
            continue;
        }
        let platform = social.platform.trim().to_lowercase();
        let platform = if platform.is_empty() { "other" } else { &platform };
        card.line(&format!(
            "X-SOCIALPROFILE;type={}:{}",
            param_safe(platform),
            url
        ));
    }

    if !profile.profile_picture.trim().is_empty() {
        card.line(&format!(
            "PHOTO;VALUE=URI:{}",
            normalize_cdn_image_url(&profile.profile_picture)
        ));
    }
    card.optional("NOTE", &profile.about);

    card.line("END:VCARD");
    card.finish()
}

/// Download file name derived from the holder's name.
#[must_use]
pub fn vcard_filename(profile: &UserProfile) -> String {
    let slug: String = profile
        .full_name
        .split_whitespace()
        .map(|w| {
            w.chars()
                .filter(char::is_ascii_alphanumeric)
                .collect::<String>()
        })
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    if slug.is_empty() {
        "contact.vcf".to_string()
    } else {
        format!("{slug}.vcf")
    }
}

#[derive(Default)]
struct VCardWriter {
    out: String,
}

impl VCardWriter {
    fn line(&mut self, line: &str) {
        let _ = write!(self.out, "{line}{CRLF}");
    }

    fn optional(&mut self, name: &str, value: &str) {
        let value = value.trim();
        if !value.is_empty() {
            self.line(&format!("{name}:{}", escape(value)));
        }
    }

    fn finish(self) -> String {
        self.out
    }
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ',' => out.push_str("\\,"),
            ';' => out.push_str("\\;"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            other => out.push(other),
        }
    }
    out
}

fn type_param(label: &str, default: &str) -> String {
    let label = param_safe(label.trim());
    if label.is_empty() {
        default.to_string()
    } else {
        label.to_uppercase()
    }
}

/// Parameter values cannot carry `;`, `:` or `,`.
fn param_safe(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, ';' | ':' | ',' | '"') && !c.is_control())
        .collect()
}
