//! Top-level view resolution from a request path.
//!
//! The router serves every page; this mapping tells templates which view is
//! active (navigation highlighting) and lets the profile renderer read a
//! theme out of public viewer URLs such as `/epic/6650a1b2`.

use pgcards_core::{ProfileId, ProfileTheme};

/// The page a path belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppView {
    Landing,
    Customize,
    Dashboard,
    ResetPassword,
    Blog,
    CreateQr,
    Checkout,
    Shop,
    Cart,
    Admin,
    Profile,
    Orders,
    Account,
    Auth,
    /// `/<theme>/<id>`: the page a tapped card opens.
    PublicProfile { theme: ProfileTheme, id: ProfileId },
    NotFound,
}

impl AppView {
    /// Resolve a pathname (query string ignored).
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let mut segments = path.split('/').filter(|s| !s.is_empty());
        let Some(first) = segments.next() else {
            return Self::Landing;
        };
        let second = segments.next();

        if let Ok(theme) = first.parse::<ProfileTheme>()
            && first == theme.as_str()
        {
            return match (second, segments.next()) {
                (Some(id), None) => Self::PublicProfile {
                    theme,
                    id: ProfileId::new(id),
                },
                _ => Self::NotFound,
            };
        }

        match first {
            "customize" => Self::Customize,
            "dashboard" => Self::Dashboard,
            "reset-password" => Self::ResetPassword,
            "blog" => Self::Blog,
            "create-qr" | "create-qrCode" => Self::CreateQr,
            "checkout" => Self::Checkout,
            "shop" => Self::Shop,
            "cart" => Self::Cart,
            "admin" => Self::Admin,
            "profile" => Self::Profile,
            "orders" => Self::Orders,
            "account" => Self::Account,
            "auth" => Self::Auth,
            _ => Self::NotFound,
        }
    }

    /// Theme carried by the path, for public profile URLs only.
    #[must_use]
    pub const fn path_theme(&self) -> Option<ProfileTheme> {
        match self {
            Self::PublicProfile { theme, .. } => Some(*theme),
            _ => None,
        }
    }

    /// Short name used by templates for `aria-current` on nav links.
    #[must_use]
    pub const fn nav_key(&self) -> &'static str {
        match self {
            Self::Landing => "home",
            Self::Customize => "customize",
            Self::Dashboard => "dashboard",
            Self::ResetPassword | Self::Auth => "auth",
            Self::Blog => "blog",
            Self::CreateQr => "qr",
            Self::Checkout => "checkout",
            Self::Shop => "shop",
            Self::Cart => "cart",
            Self::Admin => "admin",
            Self::Profile | Self::PublicProfile { .. } => "profile",
            Self::Orders => "orders",
            Self::Account => "account",
            Self::NotFound => "",
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("/", AppView::Landing)]
    #[case("", AppView::Landing)]
    #[case("/customize", AppView::Customize)]
    #[case("/dashboard", AppView::Dashboard)]
    #[case("/reset-password", AppView::ResetPassword)]
    #[case("/reset-password/abc123", AppView::ResetPassword)]
    #[case("/blog", AppView::Blog)]
    #[case("/create-qr", AppView::CreateQr)]
    #[case("/create-qrCode", AppView::CreateQr)]
    #[case("/checkout", AppView::Checkout)]
    #[case("/shop/p1?variant=v2", AppView::Shop)]
    #[case("/admin", AppView::Admin)]
    #[case("/profile", AppView::Profile)]
    #[case("/orders", AppView::Orders)]
    #[case("/nope", AppView::NotFound)]
    fn test_from_path(#[case] path: &str, #[case] expected: AppView) {
        assert_eq!(AppView::from_path(path), expected);
    }

    #[rstest]
    #[case("/standard/123", ProfileTheme::Standard)]
    #[case("/modern/abc", ProfileTheme::Modern)]
    #[case("/epic/6650a1b2/", ProfileTheme::Epic)]
    fn test_public_profile_paths(#[case] path: &str, #[case] theme: ProfileTheme) {
        let view = AppView::from_path(path);
        assert_eq!(view.path_theme(), Some(theme));
        assert!(matches!(view, AppView::PublicProfile { .. }));
    }

    #[test]
    fn test_theme_without_id_is_not_found() {
        assert_eq!(AppView::from_path("/epic"), AppView::NotFound);
        assert_eq!(AppView::from_path("/epic/1/extra"), AppView::NotFound);
        assert_eq!(AppView::from_path("/Epic/1"), AppView::NotFound);
    }
}
