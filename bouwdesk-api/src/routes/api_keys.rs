/// API key management routes
///
/// Keys authenticate programmatic access to the read-only `/v1/api`
/// surface. The plaintext is returned exactly once at creation; only
/// its SHA-256 hash is stored, so listing can never reveal a key.
use crate::app::AppState;
use crate::error::ApiError;
use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use bouwdesk_shared::auth::api_key::{generate_api_key, parse_scopes};
use bouwdesk_shared::auth::middleware::AuthContext;
use bouwdesk_shared::models::api_key::{ApiKey, CreateApiKey};
use bouwdesk_shared::models::user::GlobalRole;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateApiKeyRequest {
    #[validate(length(min = 1, max = 100, message = "Key name is required"))]
    pub name: String,

    /// Comma-separated scopes, e.g. "projects:read, documents:read"
    #[validate(length(min = 1, message = "At least one scope is required"))]
    pub scopes: String,

    /// Per-key requests-per-minute override (default 60)
    #[validate(range(min = 1, max = 10000, message = "Rate limit must be 1-10000"))]
    pub rate_limit_per_minute: Option<i32>,

    #[validate(range(min = 1, max = 365, message = "Expiry must be 1-365 days"))]
    pub expires_in_days: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CreatedApiKeyResponse {
    /// Full plaintext key; shown only in this response
    pub key: String,

    #[serde(flatten)]
    pub details: ApiKey,
}

/// **Endpoint**: `POST /v1/api-keys`
///
/// Requires company admin. Returns the plaintext key once; it cannot
/// be recovered afterwards.
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateApiKeyRequest>,
) -> Result<(StatusCode, Json<CreatedApiKeyResponse>), ApiError> {
    req.validate()?;

    let (company_id, user_id) = require_key_admin(&auth)?;

    let scopes = parse_scopes(&req.scopes);
    if scopes.is_empty() {
        return Err(ApiError::BadRequest(
            "At least one scope is required".to_string(),
        ));
    }

    let (plaintext, key_hash) = generate_api_key();

    let api_key = ApiKey::create(
        &state.db,
        CreateApiKey {
            company_id,
            created_by: user_id,
            name: req.name,
            key_hash,
            scopes,
            rate_limit_per_minute: req.rate_limit_per_minute.unwrap_or(60),
            expires_at: req
                .expires_in_days
                .map(|days| Utc::now() + Duration::days(days)),
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedApiKeyResponse {
            key: plaintext,
            details: api_key,
        }),
    ))
}

/// **Endpoint**: `GET /v1/api-keys`
///
/// Lists the company's keys. Hashes are never serialized, so this only
/// exposes names, scopes and usage metadata.
pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<ApiKey>>, ApiError> {
    let (company_id, _) = require_key_admin(&auth)?;

    let keys = ApiKey::list_by_company(&state.db, company_id).await?;

    Ok(Json(keys))
}

/// **Endpoint**: `DELETE /v1/api-keys/:id`
///
/// Revokes a key. The row is kept for audit; the key stops
/// authenticating immediately. Keys of other companies 404.
pub async fn revoke(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(key_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let (company_id, _) = require_key_admin(&auth)?;

    let revoked = ApiKey::revoke(&state.db, key_id, company_id).await?;
    if !revoked {
        return Err(ApiError::NotFound("API key not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

fn require_key_admin(auth: &AuthContext) -> Result<(Uuid, Uuid), ApiError> {
    if !auth.role.has_at_least(GlobalRole::CompanyAdmin) {
        return Err(ApiError::Forbidden(
            "Requires company admin role".to_string(),
        ));
    }

    let company_id = auth
        .company_id
        .ok_or_else(|| ApiError::BadRequest("User does not belong to a company".to_string()))?;
    let user_id = auth
        .user_id
        .ok_or_else(|| ApiError::Forbidden("Requires a user token".to_string()))?;

    Ok((company_id, user_id))
}
