/// Rate limiting middleware
///
/// Runs after authentication: the actor is the authenticated user or API
/// key, the caps come from the company's plan (API keys additionally
/// carry their own per-minute cap). Counts are kept per endpoint, so a
/// burst against one route does not starve the rest.
///
/// Every response gets `X-RateLimit-Limit`, `X-RateLimit-Remaining` and
/// `X-RateLimit-Reset` headers; exceedance returns 429 with Retry-After.
use crate::app::AppState;
use crate::error::ApiError;
use axum::{
    extract::{Extension, Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use bouwdesk_shared::auth::middleware::AuthContext;
use bouwdesk_shared::billing::catalog::PlanType;
use bouwdesk_shared::gateway::rate_limit::RateLimitDecision;
use bouwdesk_shared::models::company::Company;
use std::time::{SystemTime, UNIX_EPOCH};

pub async fn rate_limit_layer(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // Companyless users (fresh accounts) get the free plan caps.
    let plan = match auth.company_id {
        Some(company_id) => Company::find_by_id(&state.db, company_id)
            .await?
            .map(|c| c.plan())
            .unwrap_or(PlanType::Free),
        None => PlanType::Free,
    };

    let actor = auth
        .api_key_id
        .map(|id| format!("key:{}", id))
        .or_else(|| auth.user_id.map(|id| format!("user:{}", id)))
        .unwrap_or_else(|| "anonymous".to_string());

    let endpoint = format!("{} {}", request.method(), request.uri().path());

    let minute_override = auth.rate_limit_per_minute.map(u64::from);

    let decision = state
        .rate_limiter
        .check(&actor, plan, &endpoint, minute_override)
        .await;

    if !decision.allowed {
        let retry_after = decision.reset_time.saturating_sub(unix_now()).max(1);
        return Err(ApiError::RateLimitExceeded {
            retry_after,
            message: format!("Rate limit exceeded. Try again in {} seconds", retry_after),
        });
    }

    let mut response = next.run(request).await;
    apply_headers(&mut response, &decision);

    Ok(response)
}

fn apply_headers(response: &mut Response, decision: &RateLimitDecision) {
    let headers = response.headers_mut();

    if let Ok(value) = HeaderValue::from_str(&decision.limit.to_string()) {
        headers.insert("X-RateLimit-Limit", value);
    }
    if let Ok(value) = HeaderValue::from_str(&decision.remaining.to_string()) {
        headers.insert("X-RateLimit-Remaining", value);
    }
    if let Ok(value) = HeaderValue::from_str(&decision.reset_time.to_string()) {
        headers.insert("X-RateLimit-Reset", value);
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// End-to-end behavior (429s, headers, exemptions) is covered by the
// integration tests in tests/.
