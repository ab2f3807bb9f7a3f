/// Authentication middleware for Axum
///
/// Two entry points into the API: JWT bearer tokens for interactive
/// clients and `X-Api-Key` headers for machine integrations. Both attach
/// an [`AuthContext`] to the request extensions on success.
///
/// # Example
///
/// ```no_run
/// use axum::{Extension, Router, routing::get, middleware};
/// use bouwdesk_shared::auth::middleware::{create_jwt_middleware, AuthContext};
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("company: {:?}", auth.company_id)
/// }
///
/// let app: Router = Router::new()
///     .route("/protected", get(handler))
///     .layer(middleware::from_fn(create_jwt_middleware("secret-at-least-32-bytes-long!!")));
/// ```
use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::jwt::{validate_access_token, JwtError};
use super::permissions::Actor;
use crate::models::api_key::ApiKey;
use crate::models::user::GlobalRole;

/// How the request authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    Jwt,
    ApiKey,
}

/// Authentication context added to request extensions
///
/// Handlers extract it with Axum's `Extension` extractor. API key auth
/// carries no user identity, only a company and scope set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user (None for API key auth)
    pub user_id: Option<Uuid>,

    /// Global role from the token (Viewer for API keys)
    pub role: GlobalRole,

    /// Company context
    pub company_id: Option<Uuid>,

    pub method: AuthMethod,

    /// API key scopes (only for API key auth)
    pub scopes: Option<Vec<String>>,

    /// API key ID, for rate limiting and request logging
    pub api_key_id: Option<Uuid>,

    /// Per-minute rate limit carried by the API key, if any
    pub rate_limit_per_minute: Option<u32>,
}

impl AuthContext {
    pub fn from_claims(claims: &super::jwt::Claims) -> Self {
        Self {
            user_id: Some(claims.sub),
            role: claims.role,
            company_id: claims.company_id,
            method: AuthMethod::Jwt,
            scopes: None,
            api_key_id: None,
            rate_limit_per_minute: None,
        }
    }

    pub fn from_api_key(api_key: &ApiKey) -> Self {
        Self {
            user_id: None,
            role: GlobalRole::Viewer,
            company_id: Some(api_key.company_id),
            method: AuthMethod::ApiKey,
            scopes: Some(api_key.scopes.clone()),
            api_key_id: Some(api_key.id),
            rate_limit_per_minute: Some(api_key.rate_limit_per_minute as u32),
        }
    }

    /// The identity fed into the project permission engine
    ///
    /// None for API key requests; keys never act on projects directly.
    pub fn actor(&self) -> Option<Actor> {
        self.user_id.map(|user_id| Actor {
            user_id,
            role: self.role,
            company_id: self.company_id,
        })
    }

    /// Scope check; JWT sessions carry every scope
    pub fn has_scope(&self, required_scope: &str) -> bool {
        match self.method {
            AuthMethod::Jwt => true,
            AuthMethod::ApiKey => self
                .scopes
                .as_deref()
                .map(|scopes| super::api_key::has_scope(scopes, required_scope))
                .unwrap_or(false),
        }
    }
}

/// Error type for authentication middleware
#[derive(Debug)]
pub enum AuthError {
    MissingCredentials,
    InvalidFormat(String),
    InvalidToken(String),
    InvalidApiKey(String),
    DatabaseError(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::MissingCredentials => {
                (StatusCode::UNAUTHORIZED, "Missing credentials").into_response()
            }
            AuthError::InvalidFormat(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            AuthError::InvalidToken(msg) => (StatusCode::UNAUTHORIZED, msg).into_response(),
            AuthError::InvalidApiKey(msg) => (StatusCode::UNAUTHORIZED, msg).into_response(),
            AuthError::DatabaseError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}

/// Validates `Authorization: Bearer <token>` and attaches [`AuthContext`]
///
/// # Errors
///
/// Returns 401 when the header is absent, the token is malformed, the
/// signature doesn't verify, or the token has expired.
pub async fn jwt_auth_middleware(
    secret: String,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

    let claims = validate_access_token(token, &secret).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        _ => AuthError::InvalidToken(format!("Invalid token: {}", e)),
    })?;

    let auth_context = AuthContext::from_claims(&claims);
    req.extensions_mut().insert(auth_context.clone());

    let mut response = next.run(req).await;
    // Outer layers (request logging) read the context off the response.
    response.extensions_mut().insert(auth_context);

    Ok(response)
}

/// Validates the `X-Api-Key` header and attaches [`AuthContext`]
///
/// The key format is checked before any database work; only well-formed
/// keys cost a hash lookup. A found key must still be active and not
/// past its expiry. Last-used is updated best-effort.
///
/// # Errors
///
/// Returns 401 when the header is absent, malformed, unknown, revoked or
/// expired.
pub async fn api_key_auth_middleware(
    pool: PgPool,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let api_key_header = req
        .headers()
        .get("X-Api-Key")
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    if !super::api_key::validate_api_key_format(api_key_header) {
        return Err(AuthError::InvalidFormat("Invalid API key format".to_string()));
    }

    let hash = super::api_key::hash_api_key(api_key_header);
    let api_key = ApiKey::find_by_hash(&pool, &hash)
        .await
        .map_err(|e| AuthError::DatabaseError(format!("Database error: {}", e)))?
        .ok_or_else(|| AuthError::InvalidApiKey("Invalid or revoked API key".to_string()))?;

    if !api_key.is_usable() {
        return Err(AuthError::InvalidApiKey(
            "API key is revoked or expired".to_string(),
        ));
    }

    if let Err(e) = ApiKey::touch_last_used(&pool, api_key.id).await {
        tracing::warn!(api_key_id = %api_key.id, error = %e, "failed to update key last_used_at");
    }

    let auth_context = AuthContext::from_api_key(&api_key);
    req.extensions_mut().insert(auth_context.clone());

    let mut response = next.run(req).await;
    response.extensions_mut().insert(auth_context);

    Ok(response)
}

/// Wraps [`jwt_auth_middleware`] with a captured secret for `from_fn`
pub fn create_jwt_middleware(
    secret: impl Into<String>,
) -> impl Fn(
    Request,
    Next,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, AuthError>> + Send>>
       + Clone {
    let secret = secret.into();
    move |req, next| {
        let secret = secret.clone();
        Box::pin(jwt_auth_middleware(secret, req, next))
    }
}

/// Wraps [`api_key_auth_middleware`] with a captured pool for `from_fn`
pub fn create_api_key_middleware(
    pool: PgPool,
) -> impl Fn(
    Request,
    Next,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, AuthError>> + Send>>
       + Clone {
    move |req, next| {
        let pool = pool.clone();
        Box::pin(api_key_auth_middleware(pool, req, next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{Claims, TokenType};

    #[test]
    fn test_auth_context_from_claims() {
        let claims = Claims::new(
            Uuid::new_v4(),
            "pm@example.nl".to_string(),
            GlobalRole::ProjectManager,
            Some(Uuid::new_v4()),
            TokenType::Access,
        );

        let context = AuthContext::from_claims(&claims);

        assert_eq!(context.user_id, Some(claims.sub));
        assert_eq!(context.role, GlobalRole::ProjectManager);
        assert_eq!(context.company_id, claims.company_id);
        assert_eq!(context.method, AuthMethod::Jwt);
        assert!(context.scopes.is_none());
        assert!(context.api_key_id.is_none());

        let actor = context.actor().unwrap();
        assert_eq!(actor.user_id, claims.sub);
        assert_eq!(actor.role, GlobalRole::ProjectManager);
    }

    #[test]
    fn test_jwt_context_has_every_scope() {
        let claims = Claims::new(
            Uuid::new_v4(),
            "pm@example.nl".to_string(),
            GlobalRole::Viewer,
            None,
            TokenType::Access,
        );
        let context = AuthContext::from_claims(&claims);

        assert!(context.has_scope("projects:read"));
        assert!(context.has_scope("billing:manage"));
    }

    #[test]
    fn test_api_key_context_scope_check() {
        let mut context = AuthContext::from_claims(&Claims::new(
            Uuid::new_v4(),
            "pm@example.nl".to_string(),
            GlobalRole::Viewer,
            Some(Uuid::new_v4()),
            TokenType::Access,
        ));
        context.method = AuthMethod::ApiKey;
        context.user_id = None;
        context.scopes = Some(vec!["projects:*".to_string()]);

        assert!(context.has_scope("projects:read"));
        assert!(context.has_scope("projects:write"));
        assert!(!context.has_scope("documents:read"));

        // Keys never act as a project team member
        assert!(context.actor().is_none());
    }

    #[test]
    fn test_auth_error_into_response() {
        let response = AuthError::MissingCredentials.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = AuthError::InvalidFormat("test".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = AuthError::DatabaseError("test".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
