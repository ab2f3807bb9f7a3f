/// Request logging middleware
///
/// Records every request as a request_logs row for the usage analytics
/// endpoints. The write happens on a spawned task after the response is
/// built and can never fail the request itself.
use crate::app::AppState;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use bouwdesk_shared::auth::middleware::AuthContext;
use bouwdesk_shared::gateway::analytics::RequestLogger;
use bouwdesk_shared::models::request_log::CreateRequestLog;
use std::net::SocketAddr;
use std::time::Instant;

pub async fn request_log_layer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();

    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    let ip_address = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string());

    let response = next.run(request).await;

    // The auth middleware runs deeper in the stack and copies the
    // context onto the response; unauthenticated routes have none.
    let auth = response.extensions().get::<AuthContext>().cloned();

    let log = CreateRequestLog {
        method,
        path,
        user_id: auth.as_ref().and_then(|a| a.user_id),
        company_id: auth.as_ref().and_then(|a| a.company_id),
        response_status: response.status().as_u16() as i32,
        processing_time_ms: started.elapsed().as_millis() as i64,
        user_agent,
        ip_address,
    };

    let logger = RequestLogger::new(state.db.clone());
    tokio::spawn(async move {
        logger.log_request(log).await;
    });

    response
}
