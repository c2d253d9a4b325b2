//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::backend::ApiError;
use crate::checkout::CheckoutError;
use crate::profile::ProfileValidationError;
use crate::qr::QrError;
use crate::services::image_crop::ImageError;
use crate::services::image_host::ImageHostError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// REST backend call failed.
    #[error("Backend error: {0}")]
    Api(#[from] ApiError),

    /// Image CDN upload failed.
    #[error("Image host error: {0}")]
    ImageHost(#[from] ImageHostError),

    /// Decoding, cropping or encoding an image failed.
    #[error("Image error: {0}")]
    Image(#[from] ImageError),

    /// QR generation or export failed.
    #[error("QR error: {0}")]
    Qr(#[from] QrError),

    /// Checkout wizard rejected the action.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Profile form failed validation.
    #[error("Validation error: {0}")]
    Validation(#[from] ProfileValidationError),

    /// Template rendering failed.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User is authenticated but lacks the role.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status this error maps to.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Internal(_) | Self::Template(_) | Self::Session(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Api(err) => match err {
                ApiError::NotFound(_) => StatusCode::NOT_FOUND,
                ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
                ApiError::Rejected { .. } => StatusCode::BAD_REQUEST,
                ApiError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
                _ => StatusCode::BAD_GATEWAY,
            },
            Self::ImageHost(_) => StatusCode::BAD_GATEWAY,
            Self::Image(_) | Self::Qr(_) | Self::Validation(_) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Checkout(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// Message safe to show the visitor.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Internal(_) | Self::Template(_) | Self::Session(_) => {
                "Internal server error".to_string()
            }
            Self::Api(err) => err.user_message(),
            Self::ImageHost(_) => "Image upload failed, please try again".to_string(),
            Self::Image(err) => err.to_string(),
            Self::Qr(err) => err.to_string(),
            Self::Validation(err) => err.to_string(),
            Self::Checkout(_) => "That checkout step is not available yet".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = %status, "Request rejected");
        }

        (status, self.public_message()).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// ```rust,ignore
/// add_breadcrumb("checkout", "Selected template", Some(&[("theme", "epic")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("profile abc".to_string());
        assert_eq!(err.to_string(), "Not found: profile abc");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            status_of(AppError::NotFound("x".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(AppError::Forbidden("admin only".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(status_of(AppError::RateLimited), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            status_of(AppError::Api(ApiError::Status {
                status: 502,
                message: "upstream".to_string()
            })),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(AppError::Validation(ProfileValidationError::MissingFullName)),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_internal_details_hidden() {
        let err = AppError::Internal("db password leaked in message".to_string());
        assert_eq!(err.public_message(), "Internal server error");
    }
}
