//! Checkout wizard state.
//!
//! The wizard walks a visitor from profile details to a theme pick to card
//! payment. Progress is a single tagged enum stored in the session next to
//! the draft form, so a step can only be reached from the step before it.
//!
//! ```text
//! ProfileIncomplete
//!   --save_profile--> ProfileComplete
//! ProfileComplete | TemplateSelected | PaymentShown
//!   --select_template--> TemplateSelected
//! TemplateSelected
//!   --show_payment--> PaymentShown
//! PaymentShown
//!   --payment_succeeded--> PaymentSucceeded
//! ```

pub mod cart;

use std::fmt;

use pgcards_core::{
    OrderId, PaymentIntentStatus, Price, ProductId, ProfileId, ProfileTheme, VariantId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_sessions::Session;

use crate::backend::{PaymentIntent, Product};
use crate::models::session_keys as keys;
use crate::profile::ProfileForm;

/// Something the visitor asked the wizard to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutAction {
    SaveProfile,
    SelectTemplate,
    ShowPayment,
    PaymentSucceeded,
}

impl fmt::Display for CheckoutAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SaveProfile => "save profile",
            Self::SelectTemplate => "select template",
            Self::ShowPayment => "show payment",
            Self::PaymentSucceeded => "complete payment",
        })
    }
}

/// Errors raised by wizard transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    #[error("cannot {action} from step {from}")]
    InvalidTransition {
        from: &'static str,
        action: CheckoutAction,
    },

    #[error("no card selected for checkout")]
    NoProductSelected,
}

/// Where the visitor is in the wizard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum CheckoutState {
    #[default]
    ProfileIncomplete,
    ProfileComplete {
        profile_id: ProfileId,
    },
    TemplateSelected {
        profile_id: ProfileId,
        theme: ProfileTheme,
    },
    PaymentShown {
        profile_id: ProfileId,
        theme: ProfileTheme,
        intent: PaymentIntent,
    },
    PaymentSucceeded {
        order_id: OrderId,
    },
}

/// What the payment step should do on entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentStep<'a> {
    /// An intent is already held; show the card form for it.
    Reuse(&'a PaymentIntent),
    /// Create a new intent for this profile and theme.
    Create {
        profile_id: &'a ProfileId,
        theme: ProfileTheme,
    },
}

impl CheckoutState {
    /// Step name for logs and error messages.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ProfileIncomplete => "profile_incomplete",
            Self::ProfileComplete { .. } => "profile_complete",
            Self::TemplateSelected { .. } => "template_selected",
            Self::PaymentShown { .. } => "payment_shown",
            Self::PaymentSucceeded { .. } => "payment_succeeded",
        }
    }

    /// 1-based step for the progress bar (profile, template, payment, done).
    #[must_use]
    pub const fn step_number(&self) -> u8 {
        match self {
            Self::ProfileIncomplete => 1,
            Self::ProfileComplete { .. } => 2,
            Self::TemplateSelected { .. } | Self::PaymentShown { .. } => 3,
            Self::PaymentSucceeded { .. } => 4,
        }
    }

    #[must_use]
    pub const fn profile_id(&self) -> Option<&ProfileId> {
        match self {
            Self::ProfileComplete { profile_id }
            | Self::TemplateSelected { profile_id, .. }
            | Self::PaymentShown { profile_id, .. } => Some(profile_id),
            Self::ProfileIncomplete | Self::PaymentSucceeded { .. } => None,
        }
    }

    #[must_use]
    pub const fn theme(&self) -> Option<ProfileTheme> {
        match self {
            Self::TemplateSelected { theme, .. } | Self::PaymentShown { theme, .. } => {
                Some(*theme)
            }
            _ => None,
        }
    }

    #[must_use]
    pub const fn intent(&self) -> Option<&PaymentIntent> {
        match self {
            Self::PaymentShown { intent, .. } => Some(intent),
            _ => None,
        }
    }

    const fn invalid(&self, action: CheckoutAction) -> CheckoutError {
        CheckoutError::InvalidTransition {
            from: self.name(),
            action,
        }
    }

    /// Record a saved profile.
    ///
    /// Saving again from a later step keeps that step and swaps in the new
    /// profile ID.
    ///
    /// # Errors
    ///
    /// Fails once payment has succeeded.
    pub fn save_profile(self, profile_id: ProfileId) -> Result<Self, CheckoutError> {
        let invalid = self.invalid(CheckoutAction::SaveProfile);
        match self {
            Self::ProfileIncomplete | Self::ProfileComplete { .. } => {
                Ok(Self::ProfileComplete { profile_id })
            }
            Self::TemplateSelected { theme, .. } => Ok(Self::TemplateSelected { profile_id, theme }),
            Self::PaymentShown { theme, intent, .. } => Ok(Self::PaymentShown {
                profile_id,
                theme,
                intent,
            }),
            Self::PaymentSucceeded { .. } => Err(invalid),
        }
    }

    /// Record the chosen card theme.
    ///
    /// Picking a theme while a payment form is open drops the held intent,
    /// so the next payment step creates one for the new theme.
    ///
    /// # Errors
    ///
    /// Fails before the profile is saved or after payment succeeded.
    pub fn select_template(self, theme: ProfileTheme) -> Result<Self, CheckoutError> {
        let invalid = self.invalid(CheckoutAction::SelectTemplate);
        match self {
            Self::ProfileComplete { profile_id }
            | Self::TemplateSelected { profile_id, .. }
            | Self::PaymentShown { profile_id, .. } => {
                Ok(Self::TemplateSelected { profile_id, theme })
            }
            Self::ProfileIncomplete | Self::PaymentSucceeded { .. } => Err(invalid),
        }
    }

    /// Decide whether entering the payment step needs a new intent.
    ///
    /// # Errors
    ///
    /// Fails before a template is selected or after payment succeeded.
    pub fn begin_payment(&self) -> Result<PaymentStep<'_>, CheckoutError> {
        match self {
            Self::TemplateSelected { profile_id, theme } => Ok(PaymentStep::Create {
                profile_id,
                theme: *theme,
            }),
            Self::PaymentShown { intent, .. } => Ok(PaymentStep::Reuse(intent)),
            _ => Err(self.invalid(CheckoutAction::ShowPayment)),
        }
    }

    /// Hold a freshly created payment intent.
    ///
    /// # Errors
    ///
    /// Fails unless a template is selected.
    pub fn show_payment(self, intent: PaymentIntent) -> Result<Self, CheckoutError> {
        let invalid = self.invalid(CheckoutAction::ShowPayment);
        match self {
            Self::TemplateSelected { profile_id, theme } => Ok(Self::PaymentShown {
                profile_id,
                theme,
                intent,
            }),
            _ => Err(invalid),
        }
    }

    /// Finish the wizard.
    ///
    /// # Errors
    ///
    /// Fails unless the card form is showing.
    pub fn payment_succeeded(self) -> Result<Self, CheckoutError> {
        let invalid = self.invalid(CheckoutAction::PaymentSucceeded);
        match self {
            Self::PaymentShown { intent, .. } => Ok(Self::PaymentSucceeded {
                order_id: intent.order_id,
            }),
            _ => Err(invalid),
        }
    }
}

// =============================================================================
// Wizard pages
// =============================================================================

/// Page of the wizard to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WizardStep {
    Profile,
    Template,
    Payment,
    Done,
}

impl WizardStep {
    /// Parse the `?step=` query value.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "profile" => Some(Self::Profile),
            "template" => Some(Self::Template),
            "payment" => Some(Self::Payment),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::Template => "template",
            Self::Payment => "payment",
            Self::Done => "done",
        }
    }

    /// Furthest page `state` allows.
    #[must_use]
    pub const fn furthest(state: &CheckoutState) -> Self {
        match state {
            CheckoutState::ProfileIncomplete => Self::Profile,
            CheckoutState::ProfileComplete { .. } => Self::Template,
            CheckoutState::TemplateSelected { .. } | CheckoutState::PaymentShown { .. } => {
                Self::Payment
            }
            CheckoutState::PaymentSucceeded { .. } => Self::Done,
        }
    }

    /// Page to show for `state` when the visitor asked for `requested`.
    ///
    /// Earlier pages can be revisited; later ones cannot be skipped to.
    #[must_use]
    pub fn resolve(state: &CheckoutState, requested: Option<Self>) -> Self {
        let furthest = Self::furthest(state);
        match requested {
            _ if furthest == Self::Done => Self::Done,
            Some(step) if step <= furthest => step,
            _ => furthest,
        }
    }
}

/// What a confirmed payment status means for the visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Succeeded,
    NeedsAuthentication,
    RetryWithAnotherCard,
    StillProcessing,
}

impl ConfirmOutcome {
    #[must_use]
    pub const fn from_status(status: &PaymentIntentStatus) -> Self {
        match status {
            PaymentIntentStatus::Succeeded => Self::Succeeded,
            PaymentIntentStatus::RequiresAction => Self::NeedsAuthentication,
            PaymentIntentStatus::RequiresPaymentMethod => Self::RetryWithAnotherCard,
            PaymentIntentStatus::Processing | PaymentIntentStatus::Other(_) => {
                Self::StillProcessing
            }
        }
    }

    /// Message shown to the visitor when payment is not finished.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Succeeded => "Payment received. Your card is on its way.",
            Self::NeedsAuthentication => "Please complete the authentication step for your card.",
            Self::RetryWithAnotherCard => "Your card was declined. Please try another card.",
            Self::StillProcessing => {
                "Your payment is still processing. We'll email you once it clears."
            }
        }
    }
}

// =============================================================================
// Session draft
// =============================================================================

/// Coupon accepted by the backend for this checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedCoupon {
    pub code: String,
    pub discount: Decimal,
}

/// Everything the wizard keeps between requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutDraft {
    pub state: CheckoutState,
    pub form: ProfileForm,
    pub product_id: Option<ProductId>,
    pub variant_id: Option<VariantId>,
    pub coupon: Option<AppliedCoupon>,
    /// Groups retained upload bytes for this wizard run.
    pub upload_key: String,
}

impl Default for CheckoutDraft {
    fn default() -> Self {
        Self {
            state: CheckoutState::default(),
            form: ProfileForm::default(),
            product_id: None,
            variant_id: None,
            coupon: None,
            upload_key: uuid::Uuid::new_v4().simple().to_string(),
        }
    }
}

impl CheckoutDraft {
    /// Load from the session, starting a fresh draft when none exists.
    ///
    /// A fresh draft is stored straight away so its upload key stays the
    /// same across requests.
    pub async fn load(session: &Session) -> Self {
        if let Ok(Some(draft)) = session.get::<Self>(keys::CHECKOUT).await {
            return draft;
        }
        let draft = Self::default();
        if let Err(e) = draft.save(session).await {
            tracing::warn!(error = %e, "failed to store new checkout draft");
        }
        draft
    }

    /// Persist to the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn save(&self, session: &Session) -> Result<(), tower_sessions::session::Error> {
        session.insert(keys::CHECKOUT, self).await
    }

    /// Drop the draft entirely.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn clear(session: &Session) -> Result<(), tower_sessions::session::Error> {
        session.remove::<Self>(keys::CHECKOUT).await.map(|_| ())
    }

    /// Point the checkout at a product, discarding any held intent.
    pub fn select_product(&mut self, product_id: ProductId, variant_id: Option<VariantId>) {
        let changed = self.product_id.as_ref() != Some(&product_id) || self.variant_id != variant_id;
        self.product_id = Some(product_id);
        self.variant_id = variant_id;
        if changed {
            self.coupon = None;
            self.release_intent();
        }
    }

    /// Forget a held payment intent because the amount changed.
    ///
    /// A finished checkout restarts from the profile step.
    pub fn release_intent(&mut self) {
        self.state = match std::mem::take(&mut self.state) {
            CheckoutState::PaymentShown {
                profile_id, theme, ..
            } => CheckoutState::TemplateSelected { profile_id, theme },
            CheckoutState::PaymentSucceeded { .. } => CheckoutState::ProfileIncomplete,
            other => other,
        };
    }

    /// Amount to charge for `product`: variant price over base price,
    /// quantity one, minus any coupon.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::NoProductSelected` when `product` is not the
    /// selected one.
    pub fn amount_for(&self, product: &Product) -> Result<Price, CheckoutError> {
        if self.product_id.as_ref() != Some(&product.id) {
            return Err(CheckoutError::NoProductSelected);
        }
        let price = product.price_for(self.variant_id.as_ref());
        Ok(match &self.coupon {
            Some(coupon) => price.discounted_by(coupon.discount),
            None => price,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use pgcards_core::{CurrencyCode, PaymentIntentId};
    use tower_sessions::MemoryStore;

    use super::*;
    use crate::backend::Variant;

    fn intent() -> PaymentIntent {
        PaymentIntent {
            order_id: OrderId::new("ord_1"),
            client_secret: "pi_1_secret_abc".to_string(),
            payment_intent_id: PaymentIntentId::new("pi_1"),
            amount: 9900,
            currency: CurrencyCode::AED,
        }
    }

    fn pid(id: &str) -> ProfileId {
        ProfileId::new(id)
    }

    #[test]
    fn test_happy_path() {
        let state = CheckoutState::default()
            .save_profile(pid("p1"))
            .unwrap()
            .select_template(ProfileTheme::Epic)
            .unwrap();
        assert!(matches!(
            state.begin_payment().unwrap(),
            PaymentStep::Create { theme: ProfileTheme::Epic, .. }
        ));

        let state = state.show_payment(intent()).unwrap();
        assert_eq!(state.step_number(), 3);
        assert!(matches!(state.begin_payment().unwrap(), PaymentStep::Reuse(i) if i == &intent()));

        let done = state.payment_succeeded().unwrap();
        assert_eq!(
            done,
            CheckoutState::PaymentSucceeded {
                order_id: OrderId::new("ord_1")
            }
        );
    }

    #[test]
    fn test_template_before_profile_rejected() {
        let err = CheckoutState::default()
            .select_template(ProfileTheme::Modern)
            .unwrap_err();
        assert_eq!(
            err,
            CheckoutError::InvalidTransition {
                from: "profile_incomplete",
                action: CheckoutAction::SelectTemplate
            }
        );
    }

    #[test]
    fn test_payment_requires_template() {
        let state = CheckoutState::ProfileComplete {
            profile_id: pid("p1"),
        };
        assert!(state.begin_payment().is_err());
        assert!(state.show_payment(intent()).is_err());
    }

    #[test]
    fn test_success_requires_payment_shown() {
        let state = CheckoutState::TemplateSelected {
            profile_id: pid("p1"),
            theme: ProfileTheme::Standard,
        };
        assert!(state.payment_succeeded().is_err());
    }

    #[test]
    fn test_resave_keeps_later_step() {
        let state = CheckoutState::PaymentShown {
            profile_id: pid("old"),
            theme: ProfileTheme::Modern,
            intent: intent(),
        };
        let state = state.save_profile(pid("new")).unwrap();
        assert_eq!(state.profile_id(), Some(&pid("new")));
        assert_eq!(state.theme(), Some(ProfileTheme::Modern));
        assert_eq!(state.intent(), Some(&intent()));
    }

    #[test]
    fn test_theme_change_from_payment_drops_intent() {
        let state = CheckoutState::PaymentShown {
            profile_id: pid("p1"),
            theme: ProfileTheme::Modern,
            intent: intent(),
        };
        let state = state.select_template(ProfileTheme::Epic).unwrap();
        assert_eq!(
            state,
            CheckoutState::TemplateSelected {
                profile_id: pid("p1"),
                theme: ProfileTheme::Epic
            }
        );
        assert!(state.intent().is_none());
        assert!(matches!(
            state.begin_payment().unwrap(),
            PaymentStep::Create { theme: ProfileTheme::Epic, .. }
        ));
    }

    #[test]
    fn test_nothing_after_success() {
        let done = CheckoutState::PaymentSucceeded {
            order_id: OrderId::new("o"),
        };
        assert!(done.clone().save_profile(pid("p")).is_err());
        assert!(done.select_template(ProfileTheme::Epic).is_err());
    }

    fn product() -> Product {
        Product {
            id: ProductId::new("prod_1"),
            title: "Metal Card".to_string(),
            description: String::new(),
            category: "metal".to_string(),
            material: "steel".to_string(),
            base_price: Decimal::from(899),
            currency: CurrencyCode::AED,
            features: Vec::new(),
            variants: vec![Variant {
                id: VariantId::new("gold"),
                color: "Gold".to_string(),
                finish: "Brushed".to_string(),
                price: Some(Decimal::from(999)),
                images: Vec::new(),
            }],
            images: Vec::new(),
        }
    }

    #[test]
    fn test_amount_uses_variant_price_and_coupon() {
        let mut draft = CheckoutDraft::default();
        draft.select_product(ProductId::new("prod_1"), Some(VariantId::new("gold")));
        assert_eq!(draft.amount_for(&product()).unwrap().amount, Decimal::from(999));

        draft.coupon = Some(AppliedCoupon {
            code: "WELCOME".to_string(),
            discount: Decimal::from(100),
        });
        assert_eq!(draft.amount_for(&product()).unwrap().amount, Decimal::from(899));
    }

    #[test]
    fn test_amount_for_other_product_rejected() {
        let draft = CheckoutDraft::default();
        assert_eq!(
            draft.amount_for(&product()).unwrap_err(),
            CheckoutError::NoProductSelected
        );
    }

    #[test]
    fn test_changing_product_drops_held_intent() {
        let mut draft = CheckoutDraft {
            state: CheckoutState::PaymentShown {
                profile_id: pid("p1"),
                theme: ProfileTheme::Epic,
                intent: intent(),
            },
            product_id: Some(ProductId::new("prod_1")),
            ..CheckoutDraft::default()
        };
        draft.select_product(ProductId::new("prod_1"), Some(VariantId::new("gold")));
        assert_eq!(
            draft.state,
            CheckoutState::TemplateSelected {
                profile_id: pid("p1"),
                theme: ProfileTheme::Epic
            }
        );
    }

    #[test]
    fn test_wizard_step_cannot_skip_ahead() {
        let state = CheckoutState::ProfileComplete {
            profile_id: pid("p1"),
        };
        assert_eq!(
            WizardStep::resolve(&state, Some(WizardStep::Payment)),
            WizardStep::Template
        );
        assert_eq!(
            WizardStep::resolve(&state, Some(WizardStep::Profile)),
            WizardStep::Profile
        );
        assert_eq!(WizardStep::resolve(&state, None), WizardStep::Template);
        assert_eq!(
            WizardStep::resolve(&CheckoutState::default(), WizardStep::parse("template")),
            WizardStep::Profile
        );
    }

    #[test]
    fn test_wizard_step_done_is_sticky() {
        let done = CheckoutState::PaymentSucceeded {
            order_id: OrderId::new("o"),
        };
        assert_eq!(
            WizardStep::resolve(&done, Some(WizardStep::Profile)),
            WizardStep::Done
        );
    }

    #[test]
    fn test_confirm_outcome_from_status() {
        assert_eq!(
            ConfirmOutcome::from_status(&PaymentIntentStatus::Succeeded),
            ConfirmOutcome::Succeeded
        );
        assert_eq!(
            ConfirmOutcome::from_status(&PaymentIntentStatus::RequiresPaymentMethod),
            ConfirmOutcome::RetryWithAnotherCard
        );
        assert_eq!(
            ConfirmOutcome::from_status(&PaymentIntentStatus::Other("canceled".to_string())),
            ConfirmOutcome::StillProcessing
        );
    }

    #[test]
    fn test_release_intent_after_coupon() {
        let mut draft = CheckoutDraft {
            state: CheckoutState::PaymentShown {
                profile_id: pid("p1"),
                theme: ProfileTheme::Modern,
                intent: intent(),
            },
            ..CheckoutDraft::default()
        };
        draft.release_intent();
        assert!(draft.state.intent().is_none());
        assert_eq!(draft.state.theme(), Some(ProfileTheme::Modern));
    }

    #[tokio::test]
    async fn test_fresh_draft_keeps_upload_key() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let first = CheckoutDraft::load(&session).await;
        let second = CheckoutDraft::load(&session).await;
        assert_eq!(first.upload_key, second.upload_key);
    }

    #[tokio::test]
    async fn test_draft_round_trips_through_session() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let first = CheckoutDraft::load(&session).await;
        let mut draft = first.clone();
        draft.state = CheckoutState::ProfileComplete {
            profile_id: pid("p9"),
        };
        draft.save(&session).await.unwrap();

        let loaded = CheckoutDraft::load(&session).await;
        assert_eq!(loaded, draft);
        assert_eq!(loaded.upload_key, first.upload_key);

        CheckoutDraft::clear(&session).await.unwrap();
        assert_eq!(
            CheckoutDraft::load(&session).await.state,
            CheckoutState::ProfileIncomplete
        );
    }
}
