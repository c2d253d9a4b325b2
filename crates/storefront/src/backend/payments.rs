//! Payment intent creation and confirmation.
//!
//! Card details never touch the storefront: the browser SDK tokenises the card
//! against the client secret, then posts the intent ID back for confirmation.

use pgcards_core::{CurrencyCode, OrderId, PaymentIntentId};
use reqwest::Method;
use secrecy::SecretString;
use tracing::instrument;

use super::types::{
    ConfirmPaymentRequest, ConfirmPaymentResponse, CreatePaymentIntentRequest, PaymentIntent,
    PaymentIntentResponse,
};
use super::{ApiError, BackendClient};

/// Message the backend sends alongside a freshly created intent.
pub const INTENT_CREATED_MSG: &str = "Order Created & Payment Intent Generated";

impl BackendClient {
    /// Create an order and its payment intent.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unexpected` when the response carries no client
    /// secret, or any transport/status error.
    #[instrument(skip(self, token, request), fields(amount = request.amount, product_id = %request.product_id))]
    pub async fn create_payment_intent(
        &self,
        token: &SecretString,
        request: &CreatePaymentIntentRequest<'_>,
        currency: CurrencyCode,
    ) -> Result<PaymentIntent, ApiError> {
        let response: PaymentIntentResponse = self
            .execute(
                self.request(Method::POST, "/payment/create-payment-intent", Some(token))
                    .json(request),
            )
            .await?;
        payment_intent_from_response(response, request.amount, currency)
    }

    /// Ask the backend for the final status of a payment intent.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(payment_intent_id = %payment_intent_id, order_id = %order_id))]
    pub async fn confirm_payment(
        &self,
        token: &SecretString,
        payment_intent_id: &PaymentIntentId,
        order_id: &OrderId,
    ) -> Result<ConfirmPaymentResponse, ApiError> {
        let body = ConfirmPaymentRequest {
            payment_intent_id,
            order_id,
        };
        self.execute(
            self.request(Method::POST, "/payment/confirm-payment", Some(token))
                .json(&body),
        )
        .await
    }
}

/// Decide success from the structured fields, not the message text.
pub(crate) fn payment_intent_from_response(
    response: PaymentIntentResponse,
    amount: i64,
    currency: CurrencyCode,
) -> Result<PaymentIntent, ApiError> {
    let PaymentIntentResponse {
        msg,
        order_id,
        client_secret,
        payment_intent_id,
    } = response;

    let client_secret = client_secret
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::Unexpected(non_empty_or(msg.clone(), "no client secret")))?;
    let order_id = order_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::Unexpected("payment intent without order id".to_string()))?;
    // `pi_123_secret_abc` carries the intent ID as its prefix.
    let payment_intent_id = payment_intent_id
        .filter(|id| !id.is_empty())
        .or_else(|| {
            client_secret
                .split_once("_secret_")
                .map(|(id, _)| PaymentIntentId::new(id))
        })
        .ok_or_else(|| ApiError::Unexpected("payment intent without id".to_string()))?;

    if msg != INTENT_CREATED_MSG {
        tracing::warn!(
            msg = %msg,
            order_id = %order_id,
            "Payment intent created with unexpected message"
        );
    }

    Ok(PaymentIntent {
        order_id,
        client_secret,
        payment_intent_id,
        amount,
        currency,
    })
}

fn non_empty_or(msg: String, fallback: &str) -> String {
    if msg.trim().is_empty() {
        fallback.to_string()
    } else {
        msg
    }
}
