//! Command implementations.

pub mod preview;
pub mod qr;
pub mod vcard;

use std::path::{Path, PathBuf};

use pgcards_storefront::profile::UserProfile;
use pgcards_storefront::qr::QrError;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path}: invalid profile: {message}")]
    Profile { path: PathBuf, message: String },

    #[error(transparent)]
    Qr(#[from] QrError),

    #[error("{0}")]
    Invalid(String),

    #[error("render failed: {0}")]
    Render(#[from] askama::Error),
}

/// Read a profile saved as JSON, or as YAML when the extension says so.
pub async fn load_profile(path: &Path) -> Result<UserProfile, CliError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CliError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    parse_profile(path, &raw)
}

fn parse_profile(path: &Path, raw: &str) -> Result<UserProfile, CliError> {
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
    let parsed = if is_yaml {
        serde_yaml::from_str(raw).map_err(|e| e.to_string())
    } else {
        serde_json::from_str(raw).map_err(|e| e.to_string())
    };
    parsed.map_err(|message| CliError::Profile {
        path: path.to_path_buf(),
        message,
    })
}

/// Write bytes to `output`, or to stdout when there is none.
pub async fn write_output(output: Option<&Path>, bytes: &[u8]) -> Result<(), CliError> {
    match output {
        Some(path) => tokio::fs::write(path, bytes)
            .await
            .map_err(|source| CliError::Io {
                path: path.to_path_buf(),
                source,
            }),
        None => {
            let mut stdout = tokio::io::stdout();
            let result = async {
                stdout.write_all(bytes).await?;
                stdout.flush().await
            }
            .await;
            result.map_err(|source| CliError::Io {
                path: PathBuf::from("<stdout>"),
                source,
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pgcards_core::ProfileTheme;

    use super::*;

    #[test]
    fn parses_json_profile_with_backend_names() {
        let raw = r#"{"_id":"64f1","fullName":"Jane Public","companyName":"Acme","theme":"modern"}"#;
        let profile = parse_profile(Path::new("jane.json"), raw).unwrap();
        assert_eq!(profile.full_name, "Jane Public");
        assert_eq!(profile.company_name, "Acme");
        assert_eq!(profile.theme, ProfileTheme::Modern);
    }

    #[test]
    fn parses_yaml_profile() {
        let raw = "fullName: Jane Public\ndesignation: Founder\n";
        let profile = parse_profile(Path::new("jane.yml"), raw).unwrap();
        assert_eq!(profile.designation, "Founder");
    }

    #[test]
    fn reports_the_file_on_bad_input() {
        let err = parse_profile(Path::new("broken.json"), "{").unwrap_err();
        assert!(err.to_string().starts_with("broken.json: invalid profile"));
    }
}
