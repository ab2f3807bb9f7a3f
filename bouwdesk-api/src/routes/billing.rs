/// Billing and subscription routes
///
/// The local subscription row is the source of truth; the payment
/// processor mirrors it. A processor outage therefore degrades to
/// local-only bookkeeping instead of blocking plan changes, and the
/// webhook feed reconciles the mirror later.
use crate::app::AppState;
use crate::error::ApiError;
use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use bouwdesk_shared::auth::middleware::AuthContext;
use bouwdesk_shared::billing::catalog::{PlanPricing, PlanType};
use bouwdesk_shared::models::subscription::{
    BillingInterval, CreateSubscription, Subscription, SubscriptionStatus,
};
use bouwdesk_shared::models::user::GlobalRole;
use chrono::{Duration, Utc};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ChangePlanRequest {
    /// One of free, basic, professional, enterprise
    pub plan: String,

    /// "month" (default) or "year"
    pub interval: Option<String>,
}

/// **Endpoint**: `GET /v1/billing/plans`
///
/// Public plan catalog with prices and limits. No authentication.
pub async fn plans() -> Json<Vec<PlanPricing>> {
    Json(PlanPricing::catalog())
}

/// **Endpoint**: `GET /v1/billing/subscription`
pub async fn get_subscription(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Subscription>, ApiError> {
    let company_id = require_billing_admin(&auth)?;

    let subscription = Subscription::find_current_for_company(&state.db, company_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("No active subscription".to_string()))?;

    Ok(Json(subscription))
}

/// **Endpoint**: `POST /v1/billing/subscription`
///
/// Switches the company to a new plan. When the processor already
/// tracks the subscription it is re-priced in place and its remote ids
/// carry over to the new local row; otherwise a fresh remote
/// subscription is created. Both processor calls are best-effort: a
/// failure is logged and the plan change still goes through locally.
pub async fn change_plan(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<ChangePlanRequest>,
) -> Result<(StatusCode, Json<Subscription>), ApiError> {
    let company_id = require_billing_admin(&auth)?;
    let user_id = auth
        .user_id
        .ok_or_else(|| ApiError::Forbidden("Requires a user token".to_string()))?;

    let plan = PlanType::from_str(&req.plan)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown plan: {}", req.plan)))?;

    let interval = match req.interval.as_deref() {
        None | Some("month") => BillingInterval::Month,
        Some("year") => BillingInterval::Year,
        Some(other) => {
            return Err(ApiError::BadRequest(format!(
                "Unknown billing interval: {}",
                other
            )))
        }
    };

    let current = Subscription::find_current_for_company(&state.db, company_id).await?;

    if let Some(current) = &current {
        if current.plan() == plan && current.interval == interval.as_str() {
            return Err(ApiError::Conflict(
                "Company is already on this plan".to_string(),
            ));
        }
    }

    let pricing = PlanPricing::for_plan(plan);
    let amount_eur = pricing.price_for_interval(interval);

    let tracked = current
        .as_ref()
        .and_then(|c| c.processor_subscription_id.as_deref().map(|id| (c, id)));

    let (processor_customer_id, processor_subscription_id) = match tracked {
        Some((current, processor_id)) => {
            if let Err(err) = state
                .processor
                .update_subscription_amount(processor_id, amount_eur)
                .await
            {
                tracing::warn!(
                    subscription_id = %current.id,
                    processor_id,
                    error = %err,
                    "failed to re-price subscription at the payment processor, continuing locally"
                );
            }
            (
                current.processor_customer_id.clone(),
                current.processor_subscription_id.clone(),
            )
        }
        None => match state
            .processor
            .create_subscription(company_id, plan, interval, amount_eur)
            .await
        {
            Ok(Some(remote)) => (Some(remote.customer_id), Some(remote.id)),
            Ok(None) => (None, None),
            Err(err) => {
                tracing::warn!(
                    %company_id,
                    plan = plan.as_str(),
                    error = %err,
                    "payment processor rejected subscription creation, continuing locally"
                );
                (None, None)
            }
        },
    };

    // The old local row is superseded, not canceled remotely: a tracked
    // remote subscription was re-priced above and lives on.
    if let Some(current) = &current {
        Subscription::set_status(&state.db, current.id, SubscriptionStatus::Canceled).await?;
    }

    let period = match interval {
        BillingInterval::Month => Duration::days(30),
        BillingInterval::Year => Duration::days(365),
    };
    let now = Utc::now();

    let subscription = Subscription::create(
        &state.db,
        CreateSubscription {
            company_id,
            created_by: user_id,
            plan_type: plan,
            interval,
            amount_cents: i64::from(amount_eur) * 100,
            current_period_start: now,
            current_period_end: now + period,
            processor_customer_id,
            processor_subscription_id,
        },
    )
    .await?;

    bouwdesk_shared::models::company::Company::set_plan(&state.db, company_id, plan, "active")
        .await?;

    Ok((StatusCode::CREATED, Json(subscription)))
}

/// **Endpoint**: `DELETE /v1/billing/subscription`
///
/// Cancels the current subscription and drops the company back to the
/// free plan.
pub async fn cancel_subscription(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Subscription>, ApiError> {
    let company_id = require_billing_admin(&auth)?;

    let current = Subscription::find_current_for_company(&state.db, company_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("No active subscription".to_string()))?;

    cancel_remote(&state, &current).await;

    Subscription::set_status(&state.db, current.id, SubscriptionStatus::Canceled).await?;
    bouwdesk_shared::models::company::Company::set_plan(
        &state.db,
        company_id,
        PlanType::Free,
        "canceled",
    )
    .await?;

    Ok(Json(Subscription {
        status: SubscriptionStatus::Canceled.as_str().to_string(),
        ..current
    }))
}

/// Best-effort remote cancellation; failures are logged, never fatal
async fn cancel_remote(state: &AppState, subscription: &Subscription) {
    let Some(processor_id) = subscription.processor_subscription_id.as_deref() else {
        return;
    };

    if let Err(err) = state.processor.cancel_subscription(processor_id).await {
        tracing::warn!(
            subscription_id = %subscription.id,
            processor_id,
            error = %err,
            "failed to cancel subscription at the payment processor"
        );
    }
}

fn require_billing_admin(auth: &AuthContext) -> Result<Uuid, ApiError> {
    if !auth.role.has_at_least(GlobalRole::CompanyAdmin) {
        return Err(ApiError::Forbidden(
            "Requires company admin role".to_string(),
        ));
    }

    auth.company_id
        .ok_or_else(|| ApiError::BadRequest("User does not belong to a company".to_string()))
}
