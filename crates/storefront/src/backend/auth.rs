//! Account endpoints: login, registration, Google sign-in, password reset.

use reqwest::Method;
use tracing::instrument;

use super::types::{
    AuthResponse, ForgotPasswordRequest, GoogleLoginRequest, LoginRequest, MessageResponse,
    RegisterRequest, ResetPasswordRequest,
};
use super::{ApiError, BackendClient};

impl BackendClient {
    /// Exchange email and password for a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected`/`Unauthorized` for bad credentials.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let body = LoginRequest { email, password };
        self.execute(self.request(Method::POST, "/auth/login", None).json(&body))
            .await
    }

    /// Create an account and sign in.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` when the email is already registered.
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, ApiError> {
        let body = RegisterRequest {
            name,
            email,
            password,
        };
        self.execute(self.request(Method::POST, "/auth/register", None).json(&body))
            .await
    }

    /// Forward a Google Identity Services credential (ID token).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the credential.
    #[instrument(skip_all)]
    pub async fn google_login(&self, credential: &str) -> Result<AuthResponse, ApiError> {
        let body = GoogleLoginRequest { credential };
        self.execute(self.request(Method::POST, "/auth/google", None).json(&body))
            .await
    }

    /// Ask the backend to email a reset link.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn forgot_password(&self, email: &str) -> Result<MessageResponse, ApiError> {
        let body = ForgotPasswordRequest { email };
        self.execute(
            self.request(Method::POST, "/auth/forgot-password", None)
                .json(&body),
        )
        .await
    }

    /// Set a new password using the token from the reset email.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` when the token is invalid or expired.
    #[instrument(skip_all)]
    pub async fn reset_password(
        &self,
        token: &str,
        password: &str,
    ) -> Result<MessageResponse, ApiError> {
        let path = format!("/auth/reset-password/{}", urlencoding::encode(token));
        let body = ResetPasswordRequest { password };
        self.execute(self.request(Method::POST, &path, None).json(&body))
            .await
    }
}
