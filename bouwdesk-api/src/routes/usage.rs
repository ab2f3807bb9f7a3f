/// Usage and quota reporting routes
///
/// Two views: plan quota consumption (how close the company is to its
/// limits) and request metrics aggregated from the request log.
use crate::app::AppState;
use crate::error::ApiError;
use axum::{
    extract::{Extension, Query, State},
    Json,
};
use bouwdesk_shared::auth::middleware::AuthContext;
use bouwdesk_shared::gateway::analytics::{AnalyticsService, MetricsPeriod, UsageMetrics};
use bouwdesk_shared::quota::{QuotaCheckResult, QuotaType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct QuotaUsageResponse {
    pub plan: String,
    pub projects: QuotaCheckResult,
    pub seats: QuotaCheckResult,
}

#[derive(Debug, Deserialize)]
pub struct MetricsQuery {
    /// One of hour, day, week, month; defaults to day
    pub period: Option<String>,
}

/// **Endpoint**: `GET /v1/usage/quota`
///
/// Current consumption against the plan limits.
pub async fn quota(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<QuotaUsageResponse>, ApiError> {
    let company_id = require_company(&auth)?;

    let company = bouwdesk_shared::models::company::Company::find_by_id(&state.db, company_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Company not found".to_string()))?;

    let projects = state
        .quota
        .check(company_id, QuotaType::Projects, None)
        .await?;
    let seats = state.quota.check(company_id, QuotaType::Seats, None).await?;

    Ok(Json(QuotaUsageResponse {
        plan: company.plan().as_str().to_string(),
        projects,
        seats,
    }))
}

/// **Endpoint**: `GET /v1/usage/metrics?period=day`
///
/// Request counts and average latency over the chosen window,
/// aggregated from the request log.
pub async fn metrics(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<MetricsQuery>,
) -> Result<Json<UsageMetrics>, ApiError> {
    let company_id = require_company(&auth)?;

    let period = MetricsPeriod::from_param(query.period.as_deref().unwrap_or("day"));

    let metrics = AnalyticsService::new(state.db.clone())
        .company_metrics(company_id, period)
        .await?;

    Ok(Json(metrics))
}

fn require_company(auth: &AuthContext) -> Result<Uuid, ApiError> {
    auth.company_id
        .ok_or_else(|| ApiError::BadRequest("User does not belong to a company".to_string()))
}
