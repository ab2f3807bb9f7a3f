/// Payment processor webhook handler
///
/// The processor pushes subscription lifecycle changes here; this feed
/// reconciles the local rows with what actually got billed. The route
/// is unauthenticated (the processor has no JWT) and is instead
/// guarded by the HMAC signature over the raw body.
///
/// Events we do not handle are acknowledged with 200 anyway, otherwise
/// the processor would retry them forever.
use crate::app::AppState;
use crate::error::ApiError;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use bouwdesk_shared::billing::catalog::PlanType;
use bouwdesk_shared::models::company::Company;
use bouwdesk_shared::models::subscription::{Subscription, SubscriptionStatus};
use chrono::{DateTime, Utc};
use serde::Deserialize;

const SIGNATURE_HEADER: &str = "Stripe-Signature";

#[derive(Debug, Deserialize)]
struct WebhookEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: WebhookData,
}

#[derive(Debug, Deserialize)]
struct WebhookData {
    object: WebhookObject,
}

#[derive(Debug, Deserialize)]
struct WebhookObject {
    /// Processor-side subscription id
    #[serde(default)]
    id: Option<String>,

    /// For invoice events, the subscription the invoice belongs to
    #[serde(default)]
    subscription: Option<String>,

    #[serde(default)]
    status: Option<String>,

    #[serde(default)]
    current_period_start: Option<i64>,

    #[serde(default)]
    current_period_end: Option<i64>,
}

/// **Endpoint**: `POST /stripe/webhook`
///
/// # Errors
///
/// - 401 on a missing or invalid signature
/// - 400 on an unparseable payload
pub async fn handle(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing webhook signature".to_string()))?;

    state
        .processor
        .verify_webhook_signature(&body, signature)
        .map_err(|_| ApiError::Unauthorized("Invalid webhook signature".to_string()))?;

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid webhook payload: {}", e)))?;

    match event.event_type.as_str() {
        "customer.subscription.updated" => subscription_updated(&state, &event.data.object).await?,
        "customer.subscription.deleted" => subscription_deleted(&state, &event.data.object).await?,
        "invoice.payment_failed" => payment_failed(&state, &event.data.object).await?,
        other => {
            tracing::debug!(event_type = other, "ignoring unhandled webhook event");
        }
    }

    Ok(StatusCode::OK)
}

async fn subscription_updated(state: &AppState, object: &WebhookObject) -> Result<(), ApiError> {
    let Some(subscription) = find_subscription(state, object.id.as_deref()).await? else {
        return Ok(());
    };

    if let Some(status) = object.status.as_deref().and_then(SubscriptionStatus::from_str) {
        Subscription::set_status(&state.db, subscription.id, status).await?;
        Company::set_plan(
            &state.db,
            subscription.company_id,
            subscription.plan(),
            status.as_str(),
        )
        .await?;
    }

    // Renewal: the processor sends the new billing period.
    if let (Some(start), Some(end)) = (object.current_period_start, object.current_period_end) {
        if let (Some(start), Some(end)) = (
            DateTime::<Utc>::from_timestamp(start, 0),
            DateTime::<Utc>::from_timestamp(end, 0),
        ) {
            Subscription::set_period(&state.db, subscription.id, start, end).await?;
        }
    }

    Ok(())
}

async fn subscription_deleted(state: &AppState, object: &WebhookObject) -> Result<(), ApiError> {
    let Some(subscription) = find_subscription(state, object.id.as_deref()).await? else {
        return Ok(());
    };

    Subscription::set_status(&state.db, subscription.id, SubscriptionStatus::Canceled).await?;
    Company::set_plan(
        &state.db,
        subscription.company_id,
        PlanType::Free,
        "canceled",
    )
    .await?;

    Ok(())
}

async fn payment_failed(state: &AppState, object: &WebhookObject) -> Result<(), ApiError> {
    let Some(subscription) = find_subscription(state, object.subscription.as_deref()).await?
    else {
        return Ok(());
    };

    Subscription::set_status(&state.db, subscription.id, SubscriptionStatus::PastDue).await?;
    Company::set_plan(
        &state.db,
        subscription.company_id,
        subscription.plan(),
        "past_due",
    )
    .await?;

    Ok(())
}

/// Looks the local subscription up by the processor's id
///
/// Unknown ids are logged and swallowed: the event may refer to a
/// subscription created before this system, and a 2xx stops retries.
async fn find_subscription(
    state: &AppState,
    processor_id: Option<&str>,
) -> Result<Option<Subscription>, ApiError> {
    let Some(processor_id) = processor_id else {
        return Ok(None);
    };

    let subscription = Subscription::find_by_processor_id(&state.db, processor_id).await?;
    if subscription.is_none() {
        tracing::warn!(processor_id, "webhook for unknown subscription");
    }

    Ok(subscription)
}
