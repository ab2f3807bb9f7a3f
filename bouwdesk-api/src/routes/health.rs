/// Health check endpoint
///
/// Unauthenticated and exempt from rate limiting so load balancers can
/// probe it freely.
use crate::app::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
}

/// **Endpoint**: `GET /health`
///
/// Returns 200 with `status: healthy` when the database answers, 503
/// with `status: degraded` when it does not.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database_ok = sqlx::query("SELECT 1")
        .execute(&state.db)
        .await
        .is_ok();

    let (status_code, status, database) = if database_ok {
        (StatusCode::OK, "healthy", "connected")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded", "unreachable")
    };

    (
        status_code,
        Json(HealthResponse {
            status: status.to_string(),
            version: bouwdesk_shared::VERSION.to_string(),
            database: database.to_string(),
        }),
    )
}
