//! Digital profile persistence.
//!
//! Profiles are created through a single upsert and never deleted from the
//! storefront. Reads by ID are public because tapped cards land on them.

use pgcards_core::{ProfileId, ProfileTheme, UserId};
use reqwest::Method;
use secrecy::SecretString;
use serde::Serialize;
use tracing::instrument;

use super::types::object_from;
use super::{ApiError, BackendClient};
use crate::profile::UserProfile;

#[derive(Debug, Serialize)]
struct ThemeUpdate {
    theme: ProfileTheme,
}

impl BackendClient {
    /// Create or replace the user's profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the response has no ID.
    #[instrument(skip_all, fields(profile_id = ?profile.id))]
    pub async fn upsert_profile(
        &self,
        token: &SecretString,
        profile: &UserProfile,
    ) -> Result<UserProfile, ApiError> {
        let value: serde_json::Value = self
            .execute(
                self.request(Method::POST, "/user-profile", Some(token))
                    .json(profile),
            )
            .await?;
        let saved: UserProfile = object_from(value, "profile")?;
        if saved.id.as_ref().is_none_or(ProfileId::is_empty) {
            return Err(ApiError::Unexpected(
                "profile saved without an id".to_string(),
            ));
        }
        Ok(saved)
    }

    /// Public read of a profile by ID.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for unknown IDs.
    #[instrument(skip(self), fields(profile_id = %id))]
    pub async fn get_profile(&self, id: &ProfileId) -> Result<UserProfile, ApiError> {
        let path = format!("/user-profile/{}", urlencoding::encode(id.as_str()));
        let value: serde_json::Value = self.execute(self.request(Method::GET, &path, None)).await?;
        object_from(value, "profile")
    }

    /// The profile owned by a user, if they have created one.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails for a reason other than
    /// the profile not existing.
    #[instrument(skip(self, token), fields(user_id = %user_id))]
    pub async fn get_profile_for_user(
        &self,
        token: &SecretString,
        user_id: &UserId,
    ) -> Result<Option<UserProfile>, ApiError> {
        let path = format!("/user-profile/user/{}", urlencoding::encode(user_id.as_str()));
        match self
            .execute::<serde_json::Value>(self.request(Method::GET, &path, Some(token)))
            .await
        {
            Ok(serde_json::Value::Null) => Ok(None),
            Ok(value) => object_from(value, "profile").map(Some),
            Err(ApiError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Partial update that only changes the theme.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(profile_id = %id, theme = %theme))]
    pub async fn update_profile_theme(
        &self,
        token: &SecretString,
        id: &ProfileId,
        theme: ProfileTheme,
    ) -> Result<(), ApiError> {
        let path = format!("/user-profile/{}", urlencoding::encode(id.as_str()));
        self.execute_empty(
            self.request(Method::PATCH, &path, Some(token))
                .json(&ThemeUpdate { theme }),
        )
        .await
    }
}
