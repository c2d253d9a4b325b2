//! Session-related types.
//!
//! Everything the browser used to keep in local storage (auth token, user
//! ID, saved profile ID, selected template and accent colour) lives in the
//! server-side session, loaded and saved explicitly through these types.

use pgcards_core::{ProfileId, ProfileTheme, UserId, UserRole};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::backend::AuthResponse;

/// Session keys.
pub mod keys {
    /// Signed-in user and bearer token.
    pub const CURRENT_USER: &str = "pgcards.user";

    /// Saved profile ID, selected template and accent colour.
    pub const PREFERENCES: &str = "pgcards.preferences";

    /// Checkout wizard state and draft.
    pub const CHECKOUT: &str = "pgcards.checkout";

    /// Pending toast messages.
    pub const FLASH: &str = "pgcards.flash";

    /// Where to go after signing in.
    pub const RETURN_TO: &str = "pgcards.return_to";
}

// =============================================================================
// Current user
// =============================================================================

/// Session-stored user identity and backend bearer token.
#[derive(Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    token: String,
}

impl std::fmt::Debug for CurrentUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentUser")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl CurrentUser {
    #[must_use]
    pub fn new(id: UserId, name: String, email: String, role: UserRole, token: String) -> Self {
        Self {
            id,
            name,
            email,
            role,
            token,
        }
    }

    /// Bearer token for backend calls.
    #[must_use]
    pub fn token(&self) -> SecretString {
        SecretString::from(self.token.clone())
    }

    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Name for the header greeting, falling back to the email's local part.
    #[must_use]
    pub fn display_name(&self) -> &str {
        let name = self.name.trim();
        if name.is_empty() {
            self.email.split('@').next().unwrap_or_default()
        } else {
            name
        }
    }

    /// Load from the session.
    pub async fn load(session: &Session) -> Option<Self> {
        session
            .get::<Self>(keys::CURRENT_USER)
            .await
            .ok()
            .flatten()
    }

    /// Store in the session, cycling the session ID against fixation.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn save(&self, session: &Session) -> Result<(), tower_sessions::session::Error> {
        session.cycle_id().await?;
        session.insert(keys::CURRENT_USER, self).await
    }

    /// Remove from the session (logout).
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn clear(session: &Session) -> Result<(), tower_sessions::session::Error> {
        session.remove::<Self>(keys::CURRENT_USER).await?;
        Ok(())
    }
}

impl From<AuthResponse> for CurrentUser {
    fn from(auth: AuthResponse) -> Self {
        Self::new(
            auth.user.id,
            auth.user.name,
            auth.user.email,
            auth.user.role,
            auth.token,
        )
    }
}

// =============================================================================
// Preferences
// =============================================================================

/// Choices that survive across checkout visits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub user_profile_id: Option<ProfileId>,
    pub selected_card_template: Option<ProfileTheme>,
    pub selected_accent_color: Option<String>,
}

impl Preferences {
    /// Load from the session; missing or unreadable data yields defaults.
    pub async fn load(session: &Session) -> Self {
        session
            .get::<Self>(keys::PREFERENCES)
            .await
            .ok()
            .flatten()
            .unwrap_or_default()
    }

    /// Persist to the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn save(&self, session: &Session) -> Result<(), tower_sessions::session::Error> {
        session.insert(keys::PREFERENCES, self).await
    }
}

// =============================================================================
// Flash messages
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
    Info,
}

impl FlashKind {
    /// CSS modifier for the toast.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
        }
    }
}

/// A toast shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    /// Queue a toast for the next page render.
    pub async fn push(session: &Session, kind: FlashKind, message: impl Into<String>) {
        let mut pending: Vec<Self> = session
            .get(keys::FLASH)
            .await
            .ok()
            .flatten()
            .unwrap_or_default();
        pending.push(Self {
            kind,
            message: message.into(),
        });
        if let Err(e) = session.insert(keys::FLASH, pending).await {
            tracing::warn!(error = %e, "Failed to store flash message");
        }
    }

    pub async fn success(session: &Session, message: impl Into<String>) {
        Self::push(session, FlashKind::Success, message).await;
    }

    pub async fn error(session: &Session, message: impl Into<String>) {
        Self::push(session, FlashKind::Error, message).await;
    }

    pub async fn info(session: &Session, message: impl Into<String>) {
        Self::push(session, FlashKind::Info, message).await;
    }

    /// Drain pending toasts.
    pub async fn take(session: &Session) -> Vec<Self> {
        session
            .remove::<Vec<Self>>(keys::FLASH)
            .await
            .ok()
            .flatten()
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn user() -> CurrentUser {
        CurrentUser::new(
            UserId::new("u1"),
            String::new(),
            "jane@acme.com".to_string(),
            UserRole::User,
            "tok_123".to_string(),
        )
    }

    #[test]
    fn test_debug_redacts_token() {
        let debug = format!("{:?}", user());
        assert!(!debug.contains("tok_123"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        assert_eq!(user().display_name(), "jane");
    }

    #[tokio::test]
    async fn test_preferences_round_trip() {
        let session = session();
        assert_eq!(Preferences::load(&session).await, Preferences::default());

        let prefs = Preferences {
            user_profile_id: Some(ProfileId::new("p1")),
            selected_card_template: Some(ProfileTheme::Epic),
            selected_accent_color: Some("#ff0066".to_string()),
        };
        prefs.save(&session).await.unwrap();
        assert_eq!(Preferences::load(&session).await, prefs);
    }

    #[tokio::test]
    async fn test_flash_is_drained_once() {
        let session = session();
        Flash::error(&session, "Payment failed").await;
        Flash::success(&session, "Saved").await;

        let flashes = Flash::take(&session).await;
        assert_eq!(flashes.len(), 2);
        assert_eq!(flashes[0].kind, FlashKind::Error);
        assert!(Flash::take(&session).await.is_empty());
    }

    #[tokio::test]
    async fn test_current_user_save_and_clear() {
        let session = session();
        user().save(&session).await.unwrap();
        assert_eq!(CurrentUser::load(&session).await.unwrap().id.as_str(), "u1");
        CurrentUser::clear(&session).await.unwrap();
        assert!(CurrentUser::load(&session).await.is_none());
    }
}
