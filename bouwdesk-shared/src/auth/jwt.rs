/// JWT token generation and validation
///
/// Tokens are signed with HS256 and carry the user's identity, global
/// role and company context so most requests never touch the users table.
/// The role claim deserializes into [`GlobalRole`]; a token carrying an
/// unknown role string fails validation outright rather than mapping to
/// some default.
///
/// # Token Types
///
/// - **Access**: short-lived (24 h), authenticates API requests
/// - **Refresh**: long-lived (30 d), exchanged for new access tokens and
///   backed by a session row
///
/// # Example
///
/// ```
/// use bouwdesk_shared::auth::jwt::{create_token, validate_access_token, Claims, TokenType};
/// use bouwdesk_shared::models::user::GlobalRole;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let claims = Claims::new(
///     Uuid::new_v4(),
///     "pm@example.nl".to_string(),
///     GlobalRole::ProjectManager,
///     Some(Uuid::new_v4()),
///     TokenType::Access,
/// );
/// let secret = "your-secret-key-at-least-32-bytes-long";
/// let token = create_token(&claims, secret)?;
/// let validated = validate_access_token(&token, secret)?;
/// assert_eq!(validated.role, GlobalRole::ProjectManager);
/// # Ok(())
/// # }
/// ```
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::GlobalRole;

const ISSUER: &str = "bouwdesk";

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Failed to create token: {0}")]
    CreateError(String),

    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    #[error("Token has expired")]
    Expired,

    #[error("Invalid token format: {0}")]
    InvalidFormat(String),
}

/// Token type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    /// Default lifetime per token type
    pub fn default_expiration(&self) -> Duration {
        match self {
            TokenType::Access => Duration::hours(24),
            TokenType::Refresh => Duration::days(30),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// JWT claims
///
/// Standard claims (`sub`, `iss`, `iat`, `exp`, `nbf`) plus the identity
/// context the API needs on every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: user ID
    pub sub: Uuid,

    /// Issuer, always "bouwdesk"
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    /// User email at issue time
    pub email: String,

    /// Global role at issue time; refreshed tokens pick up role changes
    pub role: GlobalRole,

    /// Company context, if the user belongs to one
    pub company_id: Option<Uuid>,

    /// Access or refresh
    pub token_type: TokenType,
}

impl Claims {
    /// Creates claims with the default lifetime for the token type
    pub fn new(
        user_id: Uuid,
        email: String,
        role: GlobalRole,
        company_id: Option<Uuid>,
        token_type: TokenType,
    ) -> Self {
        Self::with_expiration(
            user_id,
            email,
            role,
            company_id,
            token_type,
            token_type.default_expiration(),
        )
    }

    /// Creates claims with a custom lifetime
    ///
    /// Used for refresh tokens, whose lifetime depends on `remember_me`.
    pub fn with_expiration(
        user_id: Uuid,
        email: String,
        role: GlobalRole,
        company_id: Option<Uuid>,
        token_type: TokenType,
        expires_in: Duration,
    ) -> Self {
        let now = Utc::now();
        let expiration = now + expires_in;

        Self {
            sub: user_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            nbf: now.timestamp(),
            email,
            role,
            company_id,
            token_type,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    pub fn time_until_expiration(&self) -> Option<Duration> {
        let now = Utc::now().timestamp();
        if self.exp > now {
            Some(Duration::seconds(self.exp - now))
        } else {
            None
        }
    }
}

/// Signs claims into a JWT with HS256
///
/// The secret must be at least 32 bytes; config loading enforces this.
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Validates signature, expiry, nbf and issuer, and extracts claims
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
    })?;

    Ok(token_data.claims)
}

/// Validates a token and requires it to be an access token
pub fn validate_access_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let claims = validate_token(token, secret)?;

    if claims.token_type != TokenType::Access {
        return Err(JwtError::ValidationError(
            "Expected access token, got refresh token".to_string(),
        ));
    }

    Ok(claims)
}

/// Validates a token and requires it to be a refresh token
pub fn validate_refresh_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let claims = validate_token(token, secret)?;

    if claims.token_type != TokenType::Refresh {
        return Err(JwtError::ValidationError(
            "Expected refresh token, got access token".to_string(),
        ));
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn claims(token_type: TokenType) -> Claims {
        Claims::new(
            Uuid::new_v4(),
            "pm@example.nl".to_string(),
            GlobalRole::ProjectManager,
            Some(Uuid::new_v4()),
            token_type,
        )
    }

    #[test]
    fn test_token_type_expiration() {
        assert_eq!(TokenType::Access.default_expiration(), Duration::hours(24));
        assert_eq!(TokenType::Refresh.default_expiration(), Duration::days(30));
    }

    #[test]
    fn test_create_and_validate_token() {
        let claims = claims(TokenType::Access);
        let token = create_token(&claims, SECRET).expect("Should create token");

        let validated = validate_token(&token, SECRET).expect("Should validate token");
        assert_eq!(validated.sub, claims.sub);
        assert_eq!(validated.email, claims.email);
        assert_eq!(validated.role, GlobalRole::ProjectManager);
        assert_eq!(validated.company_id, claims.company_id);
        assert_eq!(validated.iss, "bouwdesk");
    }

    #[test]
    fn test_validate_with_wrong_secret() {
        let token = create_token(&claims(TokenType::Access), SECRET).unwrap();
        assert!(validate_token(&token, "another-secret-also-32-bytes-long!").is_err());
    }

    #[test]
    fn test_validate_expired_token() {
        let claims = Claims::with_expiration(
            Uuid::new_v4(),
            "late@example.nl".to_string(),
            GlobalRole::Viewer,
            None,
            TokenType::Access,
            Duration::seconds(-3600),
        );

        assert!(claims.is_expired());
        assert!(claims.time_until_expiration().is_none());

        let token = create_token(&claims, SECRET).unwrap();
        let result = validate_token(&token, SECRET);

        assert!(matches!(result.unwrap_err(), JwtError::Expired));
    }

    #[test]
    fn test_token_type_checks() {
        let access_token = create_token(&claims(TokenType::Access), SECRET).unwrap();
        let refresh_token = create_token(&claims(TokenType::Refresh), SECRET).unwrap();

        assert!(validate_access_token(&access_token, SECRET).is_ok());
        assert!(validate_access_token(&refresh_token, SECRET).is_err());

        assert!(validate_refresh_token(&refresh_token, SECRET).is_ok());
        assert!(validate_refresh_token(&access_token, SECRET).is_err());
    }

    #[test]
    fn test_company_id_absent() {
        let claims = Claims::new(
            Uuid::new_v4(),
            "solo@example.nl".to_string(),
            GlobalRole::Viewer,
            None,
            TokenType::Access,
        );
        let token = create_token(&claims, SECRET).unwrap();
        let validated = validate_token(&token, SECRET).unwrap();
        assert!(validated.company_id.is_none());
    }

    #[test]
    fn test_unknown_role_claim_rejected() {
        // Hand-roll a token whose role claim is not a known GlobalRole.
        use jsonwebtoken::{encode, EncodingKey, Header};
        use serde_json::json;

        let now = Utc::now().timestamp();
        let payload = json!({
            "sub": Uuid::new_v4(),
            "iss": "bouwdesk",
            "iat": now,
            "exp": now + 3600,
            "nbf": now,
            "email": "odd@example.nl",
            "role": "superuser",
            "company_id": null,
            "token_type": "access",
        });

        let token = encode(
            &Header::new(Algorithm::HS256),
            &payload,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(validate_token(&token, SECRET).is_err());
    }
}
