/// Error handling for the API server
///
/// Handlers return `Result<T, ApiError>`; the `IntoResponse` impl maps
/// each variant to a status code and a JSON body with a stable machine
/// code. Permission denials keep their engine code (`not_a_team_member`,
/// `project_archived`, ...) so clients can branch on it. Internal errors
/// are logged with a correlation id and never leak detail.
///
/// # Example
///
/// ```ignore
/// use bouwdesk_api::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::json;
///
/// async fn handler() -> ApiResult<Json<serde_json::Value>> {
///     let data = fetch_data().await?;
///     Ok(Json(json!({ "data": data })))
/// }
/// ```
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use bouwdesk_shared::auth::middleware::AuthError;
use bouwdesk_shared::auth::permissions::{PermissionDenied, PermissionError};
use bouwdesk_shared::models::team_member::TeamMemberError;
use bouwdesk_shared::quota::QuotaError;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403), generic
    Forbidden(String),

    /// Forbidden (403) with the permission engine's stable code
    PermissionDenied(PermissionDenied),

    /// Forbidden (403), a plan limit was hit
    QuotaExceeded(String),

    /// Not found (404)
    NotFound(String),

    /// Conflict (409), e.g. duplicate email
    Conflict(String),

    /// Unprocessable entity (422), validation errors
    ValidationError(Vec<ValidationErrorDetail>),

    /// Too many requests (429)
    RateLimitExceeded { retry_after: u64, message: String },

    /// Internal server error (500)
    InternalError(String),

    /// Bad gateway (502), upstream billing provider failed
    UpstreamError(String),

    /// Service unavailable (503)
    ServiceUnavailable(String),
}

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    pub field: String,
    pub message: String,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable machine code (e.g. "not_a_team_member")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,

    /// Correlation id, present on internal errors only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<Uuid>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::PermissionDenied(denied) => write!(f, "Forbidden: {}", denied),
            ApiError::QuotaExceeded(msg) => write!(f, "Quota exceeded: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::RateLimitExceeded { message, .. } => {
                write!(f, "Rate limit exceeded: {}", message)
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::UpstreamError(msg) => write!(f, "Upstream error: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Rate limits carry a Retry-After header
        if let ApiError::RateLimitExceeded {
            retry_after,
            message,
        } = &self
        {
            let body = Json(ErrorResponse {
                error: "rate_limit_exceeded".to_string(),
                message: message.clone(),
                details: None,
                correlation_id: None,
            });

            let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
            if let Ok(value) = axum::http::HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert("Retry-After", value);
            }
            return response;
        }

        let (status, error_code, message, details, correlation_id) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None, None),
            ApiError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, "unauthorized", msg, None, None)
            }
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None, None),
            ApiError::PermissionDenied(denied) => (
                StatusCode::FORBIDDEN,
                denied.code(),
                denied.to_string(),
                None,
                None,
            ),
            ApiError::QuotaExceeded(msg) => {
                (StatusCode::FORBIDDEN, "quota_exceeded", msg, None, None)
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None, None),
            ApiError::ValidationError(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
                None,
            ),
            ApiError::RateLimitExceeded { message, .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limit_exceeded",
                message,
                None,
                None,
            ),
            ApiError::InternalError(msg) => {
                let correlation_id = Uuid::new_v4();
                tracing::error!(%correlation_id, "internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                    Some(correlation_id),
                )
            }
            ApiError::UpstreamError(msg) => {
                tracing::error!("upstream error: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "upstream_error",
                    "Payment provider request failed".to_string(),
                    None,
                    None,
                )
            }
            ApiError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                msg,
                None,
                None,
            ),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
            correlation_id,
        });

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => {
                if let Some(constraint) = db_err.constraint() {
                    if constraint.contains("email") {
                        return ApiError::Conflict("Email already registered".to_string());
                    }
                    if constraint.contains("team_members") {
                        return ApiError::Conflict(
                            "User is already a member of this team".to_string(),
                        );
                    }
                    return ApiError::Conflict(format!("Constraint violation: {}", constraint));
                }

                ApiError::InternalError(format!("Database error: {}", db_err))
            }
            _ => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

impl From<PermissionDenied> for ApiError {
    fn from(denied: PermissionDenied) -> Self {
        ApiError::PermissionDenied(denied)
    }
}

impl From<PermissionError> for ApiError {
    fn from(err: PermissionError) -> Self {
        match err {
            PermissionError::ProjectNotFound => {
                ApiError::NotFound("Project not found".to_string())
            }
            PermissionError::Denied(denied) => ApiError::PermissionDenied(denied),
            PermissionError::Database(err) => err.into(),
        }
    }
}

impl From<QuotaError> for ApiError {
    fn from(err: QuotaError) -> Self {
        match err {
            QuotaError::LimitExceeded { .. } => ApiError::QuotaExceeded(err.to_string()),
            QuotaError::CompanyNotFound(_) => ApiError::NotFound("Company not found".to_string()),
            QuotaError::Database(err) => err.into(),
        }
    }
}

impl From<TeamMemberError> for ApiError {
    fn from(err: TeamMemberError) -> Self {
        match err {
            TeamMemberError::LastOwner => ApiError::Conflict(err.to_string()),
            TeamMemberError::NotFound => ApiError::NotFound("Team member not found".to_string()),
            TeamMemberError::Database(err) => err.into(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => {
                ApiError::Unauthorized("Missing credentials".to_string())
            }
            AuthError::InvalidFormat(msg) => ApiError::BadRequest(msg),
            AuthError::InvalidToken(msg) => ApiError::Unauthorized(msg),
            AuthError::InvalidApiKey(msg) => ApiError::Unauthorized(msg),
            AuthError::DatabaseError(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<bouwdesk_shared::auth::password::PasswordError> for ApiError {
    fn from(err: bouwdesk_shared::auth::password::PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

impl From<bouwdesk_shared::auth::jwt::JwtError> for ApiError {
    fn from(err: bouwdesk_shared::auth::jwt::JwtError) -> Self {
        match err {
            bouwdesk_shared::auth::jwt::JwtError::Expired => {
                ApiError::Unauthorized("Token expired".to_string())
            }
            _ => ApiError::Unauthorized(format!("Invalid token: {}", err)),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| ValidationErrorDetail {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "is invalid".to_string()),
                })
            })
            .collect();

        ApiError::ValidationError(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::NotFound("User not found".to_string());
        assert_eq!(err.to_string(), "Not found: User not found");
    }

    #[test]
    fn test_permission_denied_keeps_stable_code() {
        let response =
            ApiError::PermissionDenied(PermissionDenied::ProjectArchived).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_quota_maps_to_forbidden() {
        let response = ApiError::QuotaExceeded("Project limit exceeded (3/3)".to_string())
            .into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_rate_limit_sets_retry_after() {
        let response = ApiError::RateLimitExceeded {
            retry_after: 42,
            message: "Too many requests".to_string(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get("Retry-After").unwrap(), "42");
    }

    #[test]
    fn test_validation_error() {
        let errors = vec![
            ValidationErrorDetail {
                field: "email".to_string(),
                message: "Invalid email format".to_string(),
            },
            ValidationErrorDetail {
                field: "password".to_string(),
                message: "Password too short".to_string(),
            },
        ];

        let err = ApiError::ValidationError(errors);
        assert_eq!(err.to_string(), "Validation failed: 2 errors");
    }
}
