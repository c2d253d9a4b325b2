//! Card themes a digital profile can be rendered with.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error for theme identifiers outside the fixed set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown card theme: {0}")]
pub struct UnknownTheme(pub String);

/// One of the three fixed card layouts.
///
/// The identifier doubles as the first URL path segment of the public
/// profile page (`/standard/:id`, `/modern/:id`, `/epic/:id`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProfileTheme {
    #[default]
    Standard,
    Modern,
    Epic,
}

impl ProfileTheme {
    /// All themes in picker order.
    pub const ALL: [Self; 3] = [Self::Standard, Self::Modern, Self::Epic];

    /// Lower-case identifier used on the wire and in URLs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Modern => "modern",
            Self::Epic => "epic",
        }
    }

    /// Human-readable name for the template picker.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Standard => "Standard",
            Self::Modern => "Modern",
            Self::Epic => "Epic",
        }
    }
}

impl fmt::Display for ProfileTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileTheme {
    type Err = UnknownTheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|theme| theme.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownTheme(s.to_owned()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_themes() {
        assert_eq!("Modern".parse::<ProfileTheme>().unwrap(), ProfileTheme::Modern);
        assert_eq!(" epic ".parse::<ProfileTheme>().unwrap(), ProfileTheme::Epic);
    }

    #[test]
    fn test_parse_unknown_theme() {
        assert_eq!(
            "retro".parse::<ProfileTheme>().unwrap_err(),
            UnknownTheme("retro".to_string())
        );
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&ProfileTheme::Epic).unwrap(),
            "\"epic\""
        );
    }
}
