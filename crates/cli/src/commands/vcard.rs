//! vCard export from a saved profile.

use std::path::{Path, PathBuf};

use pgcards_storefront::profile::vcard::{build_vcard, vcard_filename};
use tracing::info;

use super::{CliError, load_profile, write_output};

/// Write the profile's vCard next to the working directory, or to `output`.
pub async fn export(profile: &Path, output: Option<PathBuf>) -> Result<(), CliError> {
    let profile = load_profile(profile).await?;
    if profile.full_name.trim().is_empty() {
        return Err(CliError::Invalid(
            "the profile has no full name to put on the card".to_string(),
        ));
    }

    let output = output.unwrap_or_else(|| PathBuf::from(vcard_filename(&profile)));
    write_output(Some(&output), build_vcard(&profile).as_bytes()).await?;
    info!(path = %output.display(), "vCard written");
    Ok(())
}
