/// Authentication routes
///
/// Registration with a company name creates the company and its first
/// user in one flow: the company row goes in first, and if the user
/// insert then fails the company is deleted again so no orphan tenant
/// is left behind. Without a company name the user starts companyless
/// as a viewer.
///
/// Login failures for an unknown email and for a wrong password return
/// the exact same message, so the endpoint cannot be used to probe
/// which addresses have accounts.
use crate::app::AppState;
use crate::error::ApiError;
use axum::{
    extract::{ConnectInfo, Extension, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use bouwdesk_shared::auth::jwt::{create_token, validate_refresh_token, Claims, TokenType};
use bouwdesk_shared::auth::middleware::AuthContext;
use bouwdesk_shared::auth::password::{hash_password, validate_password_strength, verify_password};
use bouwdesk_shared::models::company::{Company, CompanyType, CreateCompany};
use bouwdesk_shared::models::session::{CreateSession, Session};
use bouwdesk_shared::models::user::{CreateUser, GlobalRole, User, UserStatus};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use validator::Validate;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,

    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,

    pub phone: Option<String>,

    /// Registering without a company creates a companyless viewer
    #[validate(length(min = 1, message = "Company name cannot be empty"))]
    pub company_name: Option<String>,

    /// Industry segment; unknown values map to "other"
    pub company_type: Option<String>,

    pub kvk_number: Option<String>,
    pub vat_number: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    /// Extends the refresh token lifetime from 1 to 30 days
    #[serde(default)]
    pub remember_me: bool,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// **Endpoint**: `POST /v1/auth/register`
///
/// With a company name, creates the company and its first user, then
/// logs the user in. The company insert happens before the user insert
/// because the user row references the company; a failed user insert
/// (most commonly a duplicate email) rolls the company back by deleting
/// it.
///
/// Without a company name the user is created companyless as an active
/// viewer; they gain a tenant when an admin assigns one.
pub async fn register(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    req.validate()?;
    validate_password_strength(&req.password).map_err(ApiError::BadRequest)?;

    let password_hash = hash_password(&req.password)?;

    let company = match req.company_name {
        Some(company_name) => {
            let company_type = req
                .company_type
                .as_deref()
                .and_then(CompanyType::from_str)
                .unwrap_or(CompanyType::Other);

            Some(
                Company::create(
                    &state.db,
                    CreateCompany {
                        name: company_name,
                        company_type,
                        kvk_number: req.kvk_number,
                        vat_number: req.vat_number,
                        address: None,
                        city: None,
                        postal_code: None,
                        country: None,
                        website: None,
                        phone: None,
                    },
                )
                .await?,
            )
        }
        None => None,
    };

    // A company founder normally becomes the company admin with an
    // active account; deployments that activate accounts out of band
    // can disable the promotion. Companyless users start as plain
    // viewers.
    let (role, status) = match &company {
        Some(_) if state.config.registration.promote_company_owner => {
            (GlobalRole::CompanyAdmin, UserStatus::Active)
        }
        Some(_) => (GlobalRole::Viewer, UserStatus::Pending),
        None => (GlobalRole::Viewer, UserStatus::Active),
    };

    let user = match User::create(
        &state.db,
        CreateUser {
            email: req.email,
            password_hash,
            first_name: req.first_name,
            last_name: req.last_name,
            phone: req.phone,
            role,
            status,
            company_id: company.as_ref().map(|c| c.id),
        },
    )
    .await
    {
        Ok(user) => user,
        Err(err) => {
            // Compensate: don't leave an ownerless company behind.
            if let Some(company) = &company {
                if let Err(cleanup_err) = Company::delete(&state.db, company.id).await {
                    tracing::error!(
                        company_id = %company.id,
                        error = %cleanup_err,
                        "failed to clean up company after user creation failure"
                    );
                }
            }
            return Err(err.into());
        }
    };

    if let Some(company) = &company {
        Company::set_owner(&state.db, company.id, user.id).await?;
    }

    let meta = SessionMeta::from_request_parts(&headers, connect_info.as_ref());
    let response = issue_tokens(&state, &user, false, meta).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// **Endpoint**: `POST /v1/auth/login`
///
/// # Errors
///
/// - 401 with one fixed message for unknown email or wrong password
/// - 403 when the account is not active
pub async fn login(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    req.validate()?;

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    if !verify_password(&req.password, &user.password_hash)? {
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    check_account_active(&user)?;

    User::update_last_login(&state.db, user.id).await?;

    let meta = SessionMeta::from_request_parts(&headers, connect_info.as_ref());
    let response = issue_tokens(&state, &user, req.remember_me, meta).await?;
    Ok(Json(response))
}

/// **Endpoint**: `POST /v1/auth/refresh`
///
/// Exchanges a refresh token for a new access token. The refresh token
/// itself is not rotated; an expired session row is deleted on sight.
/// Claims are rebuilt from the current user row, so role and company
/// changes take effect at the next refresh.
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>, ApiError> {
    validate_refresh_token(&req.refresh_token, state.jwt_secret())
        .map_err(|_| ApiError::Unauthorized("Invalid refresh token".to_string()))?;

    let session = Session::find_by_token(&state.db, &req.refresh_token)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Session not found".to_string()))?;

    if session.is_expired() {
        Session::delete(&state.db, session.id).await?;
        return Err(ApiError::Unauthorized("Session expired".to_string()));
    }

    let user = User::find_by_id(&state.db, session.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User no longer exists".to_string()))?;

    check_account_active(&user)?;

    Session::touch(&state.db, session.id).await?;

    let claims = Claims::new(
        user.id,
        user.email.clone(),
        user.role,
        user.company_id,
        TokenType::Access,
    );
    let access_token = create_token(&claims, state.jwt_secret())?;

    Ok(Json(RefreshResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: TokenType::Access.default_expiration().num_seconds(),
    }))
}

/// **Endpoint**: `POST /v1/auth/logout`
///
/// Deletes the session behind the given refresh token. Succeeds even if
/// the token is unknown, so logout is idempotent.
pub async fn logout(
    State(state): State<AppState>,
    Json(req): Json<LogoutRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    Session::delete_by_token(&state.db, &req.refresh_token).await?;

    Ok(Json(MessageResponse {
        message: "Logged out".to_string(),
    }))
}

/// **Endpoint**: `POST /v1/auth/logout-all`
///
/// Deletes every session of the authenticated user.
pub async fn logout_all(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user_id = auth
        .user_id
        .ok_or_else(|| ApiError::Forbidden("Requires a user token".to_string()))?;

    let deleted = Session::delete_all_for_user(&state.db, user_id).await?;

    Ok(Json(MessageResponse {
        message: format!("Logged out of {} sessions", deleted),
    }))
}

/// **Endpoint**: `POST /v1/auth/change-password`
///
/// Changing the password revokes every session, so stolen refresh
/// tokens stop working immediately.
pub async fn change_password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    req.validate()?;

    let user_id = auth
        .user_id
        .ok_or_else(|| ApiError::Forbidden("Requires a user token".to_string()))?;

    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if !verify_password(&req.current_password, &user.password_hash)? {
        return Err(ApiError::Unauthorized(
            "Current password is incorrect".to_string(),
        ));
    }

    validate_password_strength(&req.new_password).map_err(ApiError::BadRequest)?;

    let password_hash = hash_password(&req.new_password)?;
    User::update(
        &state.db,
        user.id,
        bouwdesk_shared::models::user::UpdateUser {
            password_hash: Some(password_hash),
            ..Default::default()
        },
    )
    .await?;

    Session::delete_all_for_user(&state.db, user.id).await?;

    Ok(Json(MessageResponse {
        message: "Password changed".to_string(),
    }))
}

fn check_account_active(user: &User) -> Result<(), ApiError> {
    match user.status {
        UserStatus::Active => Ok(()),
        UserStatus::Pending => Err(ApiError::Forbidden(
            "Account is awaiting activation".to_string(),
        )),
        UserStatus::Inactive | UserStatus::Suspended => {
            Err(ApiError::Forbidden("Account is disabled".to_string()))
        }
    }
}

/// Client metadata stored on the session row for audit
#[derive(Debug, Default)]
struct SessionMeta {
    user_agent: Option<String>,
    ip_address: Option<String>,
}

impl SessionMeta {
    fn from_request_parts(
        headers: &HeaderMap,
        connect_info: Option<&ConnectInfo<SocketAddr>>,
    ) -> Self {
        Self {
            user_agent: headers
                .get(header::USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string()),
            ip_address: connect_info.map(|info| info.0.ip().to_string()),
        }
    }
}

/// Signs an access/refresh token pair and records the refresh session
async fn issue_tokens(
    state: &AppState,
    user: &User,
    remember_me: bool,
    meta: SessionMeta,
) -> Result<AuthResponse, ApiError> {
    let access_claims = Claims::new(
        user.id,
        user.email.clone(),
        user.role,
        user.company_id,
        TokenType::Access,
    );
    let access_token = create_token(&access_claims, state.jwt_secret())?;

    let refresh_lifetime = if remember_me {
        TokenType::Refresh.default_expiration()
    } else {
        Duration::days(1)
    };
    let refresh_claims = Claims::with_expiration(
        user.id,
        user.email.clone(),
        user.role,
        user.company_id,
        TokenType::Refresh,
        refresh_lifetime,
    );
    let refresh_token = create_token(&refresh_claims, state.jwt_secret())?;

    Session::create(
        &state.db,
        CreateSession {
            user_id: user.id,
            token: refresh_token.clone(),
            user_agent: meta.user_agent,
            ip_address: meta.ip_address,
            expires_at: Utc::now() + refresh_lifetime,
        },
    )
    .await?;

    Ok(AuthResponse {
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: TokenType::Access.default_expiration().num_seconds(),
        user: user.clone(),
    })
}
