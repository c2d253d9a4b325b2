//! Checkout wizard route handlers.
//!
//! Three pages share one session draft: profile details, theme pick with a
//! live preview, and the card form. Payment itself runs in Stripe.js; the
//! browser posts the intent ID back to `/checkout/confirm` and the backend
//! has the final word on its status.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Multipart, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use pgcards_core::{Price, ProductId, ProfileId, ProfileTheme, VariantId};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::PageContext;
use crate::backend::{CreatePaymentIntentRequest, Product};
use crate::checkout::{
    AppliedCoupon, CheckoutDraft, CheckoutState, ConfirmOutcome, PaymentStep, WizardStep,
};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::{CurrentUser, Flash, Preferences};
use crate::profile::preview::{parse_hex_color, render_form_preview};
use crate::profile::{ProfileForm, UserProfile, build_payload, validate_form};
use crate::services::{
    CropRect, CropTarget, ImageHost, ImageSlot, WriteOutcome, crop_image, resolve_images,
    upload_all,
};
use crate::state::AppState;

// =============================================================================
// Views
// =============================================================================

/// Progress bar entry.
#[derive(Clone)]
pub struct StepLink {
    pub number: u8,
    pub label: &'static str,
    pub href: String,
    pub current: bool,
    pub reachable: bool,
}

fn step_links(current: WizardStep, state: &CheckoutState) -> Vec<StepLink> {
    let furthest = WizardStep::furthest(state);
    [
        (WizardStep::Profile, "Your details"),
        (WizardStep::Template, "Choose a theme"),
        (WizardStep::Payment, "Payment"),
    ]
    .into_iter()
    .zip(1u8..)
    .map(|((step, label), number)| StepLink {
        number,
        label,
        href: step_url(step),
        current: step == current,
        reachable: step <= furthest && furthest != WizardStep::Done,
    })
    .collect()
}

fn step_url(step: WizardStep) -> String {
    format!("/checkout?step={}", step.as_str())
}

fn to_step(step: WizardStep) -> Redirect {
    Redirect::to(&step_url(step))
}

/// Order summary shown beside every step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProductSummary {
    pub title: String,
    pub variant_label: Option<String>,
    pub image: Option<String>,
    pub price: String,
    pub discount: Option<String>,
    pub coupon_code: Option<String>,
    pub total: String,
}

impl ProductSummary {
    fn new(product: &Product, draft: &CheckoutDraft) -> Self {
        let price = product.price_for(draft.variant_id.as_ref());
        let total = draft.amount_for(product).unwrap_or(price);
        Self {
            title: product.title.clone(),
            variant_label: draft
                .variant_id
                .as_ref()
                .and_then(|id| product.variant(id))
                .map(crate::backend::Variant::label),
            image: product
                .image_for(draft.variant_id.as_ref())
                .map(str::to_string),
            discount: draft.coupon.as_ref().map(|c| {
                Price {
                    amount: c.discount,
                    currency_code: price.currency_code,
                }
                .to_string()
            }),
            coupon_code: draft.coupon.as_ref().map(|c| c.code.clone()),
            price: price.to_string(),
            total: total.to_string(),
        }
    }
}

async fn load_summary(state: &AppState, draft: &CheckoutDraft) -> Option<ProductSummary> {
    let product_id = draft.product_id.as_ref()?;
    match state.backend().get_product(product_id).await {
        Ok(product) => Some(ProductSummary::new(&product, draft)),
        Err(e) => {
            tracing::warn!(product_id = %product_id, "Failed to load checkout product: {e}");
            None
        }
    }
}

/// A theme choice with its rendered preview.
#[derive(Clone)]
pub struct ThemeChoice {
    pub slug: &'static str,
    pub label: &'static str,
    pub selected: bool,
    pub preview_html: String,
}

// =============================================================================
// Templates
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "checkout/profile.html")]
pub struct ProfileStepTemplate {
    pub page: PageContext,
    pub steps: Vec<StepLink>,
    pub form: ProfileForm,
    pub preview_html: String,
    pub summary: Option<ProductSummary>,
}

#[derive(Template, WebTemplate)]
#[template(path = "checkout/template.html")]
pub struct TemplateStepTemplate {
    pub page: PageContext,
    pub steps: Vec<StepLink>,
    pub themes: Vec<ThemeChoice>,
    pub accent_color: String,
    pub summary: Option<ProductSummary>,
}

#[derive(Template, WebTemplate)]
#[template(path = "checkout/payment.html")]
pub struct PaymentStepTemplate {
    pub page: PageContext,
    pub steps: Vec<StepLink>,
    pub summary: Option<ProductSummary>,
    /// Set once an intent is held; the card form mounts against it.
    pub client_secret: Option<String>,
    pub payment_intent_id: Option<String>,
    pub publishable_key: String,
    pub trial: bool,
}

#[derive(Template, WebTemplate)]
#[template(path = "checkout/success.html")]
pub struct SuccessTemplate {
    pub page: PageContext,
    pub order_id: String,
    pub public_url: Option<String>,
}

/// Hidden inputs (and thumbnails) for freshly uploaded images.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/upload_result.html")]
pub struct UploadResultTemplate {
    pub field: &'static str,
    pub urls: Vec<String>,
    /// Uploads kept for a retry when the profile is saved.
    pub retained: usize,
}

// =============================================================================
// Show
// =============================================================================

/// Checkout query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct CheckoutQuery {
    pub product: Option<String>,
    pub variant: Option<String>,
    pub step: Option<String>,
    /// Any value discards the current draft.
    pub new: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Display the current wizard step.
///
/// # Errors
///
/// Returns an error if the session cannot be written or a page fails to render.
#[instrument(skip(state, user, session, page))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Query(query): Query<CheckoutQuery>,
    page: PageContext,
) -> Result<Response> {
    if query.new.is_some() {
        CheckoutDraft::clear(&session).await?;
    }
    let mut draft = CheckoutDraft::load(&session).await;
    let mut prefs = Preferences::load(&session).await;

    if let Some(product) = non_blank(query.product) {
        draft.select_product(
            ProductId::new(product),
            non_blank(query.variant).map(VariantId::new),
        );
    }

    if draft.form == ProfileForm::default() && draft.state == CheckoutState::ProfileIncomplete {
        match state
            .backend()
            .get_profile_for_user(&user.token(), &user.id)
            .await
        {
            Ok(Some(profile)) => {
                draft.form = ProfileForm::from_profile(&profile);
                if let Some(id) = profile.id {
                    prefs.user_profile_id = Some(id);
                    prefs.save(&session).await?;
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(user_id = %user.id, "Failed to prefill profile: {e}"),
        }
    }
    draft.save(&session).await?;

    let requested = query.step.as_deref().and_then(WizardStep::parse);
    let step = WizardStep::resolve(&draft.state, requested);
    let steps = step_links(step, &draft.state);

    let response = match step {
        WizardStep::Profile => {
            let theme = wizard_theme(&draft, &prefs);
            let preview_html =
                render_form_preview(&draft.form, theme, prefs.selected_accent_color.as_deref())?;
            ProfileStepTemplate {
                page,
                steps,
                summary: load_summary(&state, &draft).await,
                form: draft.form,
                preview_html,
            }
            .into_response()
        }
        WizardStep::Template => {
            let selected = wizard_theme(&draft, &prefs);
            let accent = prefs.selected_accent_color.clone();
            let themes = ProfileTheme::ALL
                .iter()
                .map(|&theme| {
                    Ok(ThemeChoice {
                        slug: theme.as_str(),
                        label: theme.label(),
                        selected: theme == selected,
                        preview_html: render_form_preview(&draft.form, theme, accent.as_deref())?,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            TemplateStepTemplate {
                page,
                steps,
                themes,
                accent_color: accent.unwrap_or_default(),
                summary: load_summary(&state, &draft).await,
            }
            .into_response()
        }
        WizardStep::Payment => {
            let intent = draft.state.intent();
            PaymentStepTemplate {
                page,
                steps,
                summary: load_summary(&state, &draft).await,
                client_secret: intent.map(|i| i.client_secret.clone()),
                payment_intent_id: intent.map(|i| i.payment_intent_id.to_string()),
                publishable_key: state.config().payments.publishable_key.clone(),
                trial: state.config().payments.trial_mode,
            }
            .into_response()
        }
        WizardStep::Done => {
            let order_id = match &draft.state {
                CheckoutState::PaymentSucceeded { order_id } => order_id.to_string(),
                _ => String::new(),
            };
            SuccessTemplate {
                page,
                order_id,
                public_url: public_url(&state, &prefs),
            }
            .into_response()
        }
    };
    Ok(response)
}

/// Theme for previews: the wizard's pick, then the form, then preferences.
fn wizard_theme(draft: &CheckoutDraft, prefs: &Preferences) -> ProfileTheme {
    draft
        .state
        .theme()
        .or(draft.form.theme)
        .or(prefs.selected_card_template)
        .unwrap_or_default()
}

fn public_url(state: &AppState, prefs: &Preferences) -> Option<String> {
    let id = prefs.user_profile_id.as_ref()?;
    let theme = prefs.selected_card_template.unwrap_or_default();
    Some(format!(
        "{}/{}/{}",
        state.config().base_url.trim_end_matches('/'),
        theme.as_str(),
        urlencoding::encode(id.as_str())
    ))
}

// =============================================================================
// Profile
// =============================================================================

/// Validate and save the profile, then move on to the theme step.
///
/// # Errors
///
/// Returns an error if the session cannot be written.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn save_profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Redirect> {
    let mut draft = CheckoutDraft::load(&session).await;
    let mut prefs = Preferences::load(&session).await;
    draft.form = ProfileForm::from_pairs(&pairs);
    draft.save(&session).await?;

    if let Err(e) = validate_form(&draft.form) {
        Flash::error(&session, e.to_string()).await;
        return Ok(to_step(WizardStep::Profile));
    }

    let theme = draft
        .form
        .theme
        .or_else(|| draft.state.theme())
        .or(prefs.selected_card_template)
        .unwrap_or_default();
    let existing = draft
        .state
        .profile_id()
        .cloned()
        .or_else(|| prefs.user_profile_id.clone());

    let saved = save_form(&state, &user, &mut draft.form, &draft.upload_key, existing, theme).await;
    draft.save(&session).await?;

    match saved {
        Ok(profile_id) => {
            draft.state = draft.state.clone().save_profile(profile_id.clone())?;
            draft.save(&session).await?;
            prefs.user_profile_id = Some(profile_id);
            prefs.selected_card_template = Some(theme);
            prefs.save(&session).await?;
            Flash::success(&session, "Profile saved").await;
            Ok(to_step(WizardStep::Template))
        }
        Err(e) => {
            tracing::warn!("Profile save failed: {e}");
            Flash::error(&session, e.public_message()).await;
            Ok(to_step(WizardStep::Profile))
        }
    }
}

/// Resolve images and upsert the profile, returning its ID.
///
/// Retried image URLs are written back into `form` before the upsert, so a
/// failed save keeps them for the next attempt.
///
/// Writes for an existing profile go through the per-profile queue so an
/// older in-flight write can never land after this one.
pub(crate) async fn save_form(
    state: &AppState,
    user: &CurrentUser,
    form: &mut ProfileForm,
    upload_key: &str,
    existing: Option<ProfileId>,
    theme: ProfileTheme,
) -> Result<ProfileId> {
    let images = resolve_images(state.images(), state.pending_uploads(), upload_key, form).await;
    form.apply_images(&images);
    let payload = build_payload(
        form,
        existing.clone(),
        Some(user.id.clone()),
        theme,
        images,
    );
    let token = user.token();

    let saved: UserProfile = match &existing {
        Some(id) => {
            let outcome = state
                .profile_writes()
                .submit(id, || state.backend().upsert_profile(&token, &payload))
                .await?;
            match outcome {
                WriteOutcome::Applied(saved) => saved,
                WriteOutcome::Superseded => payload,
            }
        }
        None => state.backend().upsert_profile(&token, &payload).await?,
    };

    saved
        .id
        .or(existing)
        .ok_or_else(|| AppError::Internal("saved profile has no id".to_string()))
}

/// Live preview fragment (HTMX).
///
/// Full profile forms preview what was typed; theme-only posts preview the
/// saved draft.
///
/// # Errors
///
/// Returns an error if the card fails to render.
pub async fn preview(
    RequireAuth(_user): RequireAuth,
    session: Session,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Html<String>> {
    let draft = CheckoutDraft::load(&session).await;
    let prefs = Preferences::load(&session).await;
    let posted = ProfileForm::from_pairs(&pairs);
    let has_profile = pairs.iter().any(|(k, _)| k == "full_name");

    let theme = posted
        .theme
        .unwrap_or_else(|| wizard_theme(&draft, &prefs));
    let accent = posted
        .accent_color
        .as_deref()
        .and_then(parse_hex_color)
        .or_else(|| prefs.selected_accent_color.clone());
    let form = if has_profile { &posted } else { &draft.form };

    Ok(Html(render_form_preview(form, theme, accent.as_deref())?))
}

// =============================================================================
// Template
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct TemplateForm {
    pub theme: String,
    #[serde(default)]
    pub accent_color: Option<String>,
}

/// Record the theme, persisting it to the backend in the background.
///
/// # Errors
///
/// Returns an error if the session cannot be written.
#[instrument(skip_all, fields(user_id = %user.id, theme = %form.theme))]
pub async fn select_template(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Form(form): Form<TemplateForm>,
) -> Result<Redirect> {
    let Ok(theme) = form.theme.parse::<ProfileTheme>() else {
        Flash::error(&session, "Please choose one of the themes").await;
        return Ok(to_step(WizardStep::Template));
    };

    let mut draft = CheckoutDraft::load(&session).await;
    let next = match draft.state.clone().select_template(theme) {
        Ok(next) => next,
        Err(e) => {
            tracing::debug!("Template rejected: {e}");
            Flash::error(&session, "Save your details before choosing a theme").await;
            return Ok(to_step(WizardStep::Profile));
        }
    };
    draft.state = next;
    draft.form.theme = Some(theme);
    let accent = form.accent_color.as_deref().and_then(parse_hex_color);
    draft.form.accent_color.clone_from(&accent);
    draft.save(&session).await?;

    let mut prefs = Preferences::load(&session).await;
    prefs.selected_card_template = Some(theme);
    prefs.selected_accent_color = accent;
    prefs.save(&session).await?;

    if let Some(profile_id) = draft.state.profile_id().cloned() {
        // Reserve the version now so a later save cannot be overtaken
        let ticket = state.profile_writes().ticket(&profile_id).await;
        let token = user.token();
        let state = state.clone();
        tokio::spawn(async move {
            let result = state
                .profile_writes()
                .apply(ticket, || {
                    state
                        .backend()
                        .update_profile_theme(&token, &profile_id, theme)
                })
                .await;
            match result {
                Ok(outcome) => tracing::debug!(
                    profile_id = %profile_id,
                    applied = outcome.is_applied(),
                    "Theme write finished"
                ),
                Err(e) => tracing::warn!(profile_id = %profile_id, "Theme update failed: {e}"),
            }
        });
    }

    Ok(to_step(WizardStep::Payment))
}

// =============================================================================
// Coupon & payment
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CouponForm {
    pub code: String,
}

/// Apply a coupon to the selected card.
///
/// # Errors
///
/// Returns an error if the session cannot be written.
#[instrument(skip_all, fields(code = %form.code))]
pub async fn apply_coupon(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Form(form): Form<CouponForm>,
) -> Result<Redirect> {
    let code = form.code.trim().to_uppercase();
    let mut draft = CheckoutDraft::load(&session).await;
    let Some(product_id) = draft.product_id.clone() else {
        Flash::error(&session, "Choose a card before adding a coupon").await;
        return Ok(Redirect::to("/shop"));
    };
    if code.is_empty() {
        Flash::error(&session, "Enter a coupon code").await;
        return Ok(to_step(WizardStep::Payment));
    }

    let product = state.backend().get_product(&product_id).await?;
    let price = product.price_for(draft.variant_id.as_ref());
    match state
        .backend()
        .apply_coupon(&user.token(), &code, price.amount)
        .await
    {
        Ok(applied) => {
            draft.coupon = Some(AppliedCoupon {
                code,
                discount: applied.discount,
            });
            // The held intent was for the old amount
            draft.release_intent();
            draft.save(&session).await?;
            let message = if applied.msg.trim().is_empty() {
                "Coupon applied".to_string()
            } else {
                applied.msg
            };
            Flash::success(&session, message).await;
        }
        Err(e) => {
            tracing::debug!("Coupon rejected: {e}");
            Flash::error(&session, e.user_message()).await;
        }
    }
    Ok(to_step(WizardStep::Payment))
}

/// Create the payment intent, or reuse the one already held.
///
/// # Errors
///
/// Returns an error if the session cannot be written.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn create_payment(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
) -> Result<Redirect> {
    let mut draft = CheckoutDraft::load(&session).await;
    match draft.state.begin_payment() {
        Ok(PaymentStep::Reuse(intent)) => {
            tracing::debug!(payment_intent_id = %intent.payment_intent_id, "Reusing payment intent");
            return Ok(to_step(WizardStep::Payment));
        }
        Ok(PaymentStep::Create { .. }) => {}
        Err(e) => {
            tracing::debug!("Payment step rejected: {e}");
            Flash::error(&session, "Choose a theme before paying").await;
            return Ok(Redirect::to("/checkout"));
        }
    }

    let Some(product_id) = draft.product_id.clone() else {
        Flash::error(&session, "Choose a card to buy first").await;
        return Ok(Redirect::to("/shop"));
    };

    let intent = async {
        let product = state.backend().get_product(&product_id).await?;
        let price = draft.amount_for(&product)?;
        let amount = price
            .to_minor_units()
            .map_err(|e| AppError::Internal(format!("amount out of range: {e}")))?;
        let request = CreatePaymentIntentRequest {
            amount,
            user_id: &user.id,
            product_id: &product.id,
            variant_id: draft.variant_id.as_ref(),
            is_trial: state.config().payments.trial_mode,
        };
        Ok::<_, AppError>(
            state
                .backend()
                .create_payment_intent(&user.token(), &request, price.currency_code)
                .await?,
        )
    }
    .await;

    match intent {
        Ok(intent) => {
            add_breadcrumb(
                "checkout",
                "Payment intent created",
                Some(&[("order_id", intent.order_id.as_str())][..]),
            );
            draft.state = draft.state.clone().show_payment(intent)?;
            draft.save(&session).await?;
        }
        Err(e) => {
            tracing::warn!(product_id = %product_id, "Failed to create payment intent: {e}");
            Flash::error(&session, e.public_message()).await;
        }
    }
    Ok(to_step(WizardStep::Payment))
}

#[derive(Debug, Deserialize)]
pub struct ConfirmForm {
    pub payment_intent_id: String,
}

/// Ask the backend for the final payment status after Stripe.js returns.
///
/// # Errors
///
/// Returns an error if the session cannot be written.
#[instrument(skip_all, fields(payment_intent_id = %form.payment_intent_id))]
pub async fn confirm_payment(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Form(form): Form<ConfirmForm>,
) -> Result<Redirect> {
    let mut draft = CheckoutDraft::load(&session).await;
    let Some(intent) = draft.state.intent().cloned() else {
        Flash::error(&session, "There is no payment in progress").await;
        return Ok(Redirect::to("/checkout"));
    };
    if intent.payment_intent_id.as_str() != form.payment_intent_id.trim() {
        tracing::warn!(held = %intent.payment_intent_id, "Confirmation for a different payment intent");
        Flash::error(&session, "That payment does not match this checkout").await;
        return Ok(to_step(WizardStep::Payment));
    }

    let response = match state
        .backend()
        .confirm_payment(&user.token(), &intent.payment_intent_id, &intent.order_id)
        .await
    {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(
                payment_intent_id = %intent.payment_intent_id,
                order_id = %intent.order_id,
                "Payment confirmation failed: {e}"
            );
            Flash::error(&session, e.user_message()).await;
            return Ok(to_step(WizardStep::Payment));
        }
    };

    let outcome = ConfirmOutcome::from_status(&response.status);
    match outcome {
        ConfirmOutcome::Succeeded => {
            draft.state = draft.state.clone().payment_succeeded()?;
            draft.coupon = None;
            draft.save(&session).await?;
            tracing::info!(order_id = %intent.order_id, "Checkout completed");
            Flash::success(&session, outcome.message()).await;
            Ok(Redirect::to("/checkout"))
        }
        ConfirmOutcome::RetryWithAnotherCard => {
            Flash::error(&session, outcome.message()).await;
            Ok(to_step(WizardStep::Payment))
        }
        ConfirmOutcome::NeedsAuthentication | ConfirmOutcome::StillProcessing => {
            tracing::info!(status = %response.status.as_str(), "Payment not final yet");
            Flash::info(&session, outcome.message()).await;
            Ok(to_step(WizardStep::Payment))
        }
    }
}

// =============================================================================
// Uploads
// =============================================================================

/// Fields read from an upload form.
#[derive(Debug, Default)]
struct UploadRequest {
    target: Option<String>,
    rect: CropRect,
    /// First carousel slot these files fill.
    carousel_start: usize,
    files: Vec<Vec<u8>>,
}

async fn read_upload(mut multipart: Multipart) -> Result<UploadRequest> {
    let mut request = UploadRequest::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            if !bytes.is_empty() {
                request.files.push(bytes.to_vec());
            }
            continue;
        }
        let value = field
            .text()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        let number = || value.trim().parse::<u32>().unwrap_or(0);
        match name.as_str() {
            "target" => request.target = Some(value.trim().to_string()),
            "x" => request.rect.x = number(),
            "y" => request.rect.y = number(),
            "width" => request.rect.width = number(),
            "height" => request.rect.height = number(),
            "carousel_start" => request.carousel_start = number() as usize,
            _ => {}
        }
    }
    Ok(request)
}

/// Crop and upload profile images (multipart).
///
/// Uploads that fail are kept for a retry when the profile is saved, so the
/// visitor can carry on.
///
/// # Errors
///
/// Returns 400 for unreadable images or an unknown target.
#[instrument(skip_all)]
pub async fn upload(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    session: Session,
    multipart: Multipart,
) -> Result<Response> {
    let request = read_upload(multipart).await?;
    let target: CropTarget = request.target.as_deref().unwrap_or_default().parse()?;
    if request.files.is_empty() {
        return Err(AppError::BadRequest("Choose an image to upload".to_string()));
    }
    let draft = CheckoutDraft::load(&session).await;

    let mut cropped = Vec::with_capacity(request.files.len());
    for bytes in request.files {
        let rect = request.rect;
        let stem = format!("{}-{}", target.field(), uuid::Uuid::new_v4().simple());
        let file = tokio::task::spawn_blocking(move || crop_image(&bytes, rect, target, &stem))
            .await
            .map_err(|e| AppError::Internal(format!("crop task failed: {e}")))??;
        cropped.push(file);
    }

    let results = match target {
        CropTarget::Carousel => upload_all(state.images(), cropped.clone()).await,
        CropTarget::ProfilePicture | CropTarget::Cover => {
            let mut results = Vec::with_capacity(cropped.len());
            for file in &cropped {
                results.push(state.images().upload(file.clone()).await);
            }
            results
        }
    };

    let mut urls = Vec::new();
    let mut retained = 0;
    for (offset, (file, result)) in cropped.into_iter().zip(results).enumerate() {
        let slot = slot_for(target, request.carousel_start + offset);
        match result {
            Ok(url) => {
                state
                    .pending_uploads()
                    .clear(&draft.upload_key, slot)
                    .await;
                urls.push(url);
            }
            Err(e) => {
                tracing::warn!(target = target.field(), "Image upload failed, keeping it for retry: {e}");
                state
                    .pending_uploads()
                    .retain(&draft.upload_key, slot, file)
                    .await;
                retained += 1;
            }
        }
    }

    Ok(UploadResultTemplate {
        field: target.field(),
        urls,
        retained,
    }
    .into_response())
}

const fn slot_for(target: CropTarget, index: usize) -> ImageSlot {
    match target {
        CropTarget::ProfilePicture => ImageSlot::ProfilePicture,
        CropTarget::Cover => ImageSlot::Cover,
        CropTarget::Carousel => ImageSlot::Carousel(index),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pgcards_core::{CurrencyCode, OrderId};
    use rust_decimal::Decimal;

    use super::*;
    use crate::backend::Variant;

    fn product() -> Product {
        Product {
            id: ProductId::new("prod_1"),
            title: "Wood Card".to_string(),
            description: String::new(),
            category: "wood".to_string(),
            material: "Walnut".to_string(),
            base_price: Decimal::from(499),
            currency: CurrencyCode::AED,
            features: Vec::new(),
            variants: vec![Variant {
                id: VariantId::new("dark"),
                color: "Dark".to_string(),
                finish: "Oiled".to_string(),
                price: Some(Decimal::from(549)),
                images: Vec::new(),
            }],
            images: vec!["https://cdn/wood.png".to_string()],
        }
    }

    #[test]
    fn test_summary_applies_coupon_to_variant_price() {
        let mut draft = CheckoutDraft::default();
        draft.select_product(ProductId::new("prod_1"), Some(VariantId::new("dark")));
        draft.coupon = Some(AppliedCoupon {
            code: "TAP50".to_string(),
            discount: Decimal::from(50),
        });

        let summary = ProductSummary::new(&product(), &draft);
        assert_eq!(summary.price, "AED 549.00");
        assert_eq!(summary.discount.as_deref(), Some("AED 50.00"));
        assert_eq!(summary.total, "AED 499.00");
        assert_eq!(summary.variant_label.as_deref(), Some("Dark / Oiled"));
    }

    #[test]
    fn test_step_links_mark_reachable_steps() {
        let state = CheckoutState::ProfileComplete {
            profile_id: ProfileId::new("p1"),
        };
        let links = step_links(WizardStep::Profile, &state);
        assert_eq!(links.len(), 3);
        assert!(links[0].current);
        assert!(links[1].reachable);
        assert!(!links[2].reachable);
        assert_eq!(links[2].href, "/checkout?step=payment");
    }

    #[test]
    fn test_nothing_reachable_after_success() {
        let state = CheckoutState::PaymentSucceeded {
            order_id: OrderId::new("o1"),
        };
        assert!(step_links(WizardStep::Done, &state).iter().all(|l| !l.reachable));
    }

    #[test]
    fn test_wizard_theme_prefers_state_then_form() {
        let mut draft = CheckoutDraft::default();
        let prefs = Preferences {
            selected_card_template: Some(ProfileTheme::Modern),
            ..Preferences::default()
        };
        assert_eq!(wizard_theme(&draft, &prefs), ProfileTheme::Modern);

        draft.form.theme = Some(ProfileTheme::Standard);
        assert_eq!(wizard_theme(&draft, &prefs), ProfileTheme::Standard);

        draft.state = CheckoutState::TemplateSelected {
            profile_id: ProfileId::new("p1"),
            theme: ProfileTheme::Epic,
        };
        assert_eq!(wizard_theme(&draft, &prefs), ProfileTheme::Epic);
    }

    #[test]
    fn test_carousel_slots_are_indexed() {
        assert_eq!(slot_for(CropTarget::Carousel, 3), ImageSlot::Carousel(3));
        assert_eq!(slot_for(CropTarget::Cover, 3), ImageSlot::Cover);
    }
}
