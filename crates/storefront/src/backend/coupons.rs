//! Coupon codes.

use reqwest::Method;
use rust_decimal::Decimal;
use secrecy::SecretString;
use tracing::instrument;

use super::types::{ApplyCouponRequest, CouponResponse};
use super::{ApiError, BackendClient};

impl BackendClient {
    /// Ask the backend what a coupon takes off `amount`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` for unknown or expired codes.
    #[instrument(skip(self, token))]
    pub async fn apply_coupon(
        &self,
        token: &SecretString,
        code: &str,
        amount: Decimal,
    ) -> Result<CouponResponse, ApiError> {
        let body = ApplyCouponRequest { code, amount };
        self.execute(
            self.request(Method::POST, "/coupon/apply", Some(token))
                .json(&body),
        )
        .await
    }
}
