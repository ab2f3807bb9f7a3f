/// User management routes
///
/// `/me` endpoints work for any authenticated user; the company-wide
/// endpoints are gated on the global role hierarchy. Company admins
/// only ever see and touch users inside their own company.
use crate::app::AppState;
use crate::error::ApiError;
use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use bouwdesk_shared::auth::middleware::AuthContext;
use bouwdesk_shared::models::user::{GlobalRole, UpdateUser, User, UserStatus};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMeRequest {
    #[validate(length(min = 1, message = "First name cannot be empty"))]
    pub first_name: Option<String>,

    #[validate(length(min = 1, message = "Last name cannot be empty"))]
    pub last_name: Option<String>,

    pub phone: Option<Option<String>>,
    pub avatar_url: Option<Option<String>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: GlobalRole,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// **Endpoint**: `GET /v1/users/me`
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<User>, ApiError> {
    let user_id = require_user(&auth)?;

    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// **Endpoint**: `PATCH /v1/users/me`
pub async fn update_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<UpdateMeRequest>,
) -> Result<Json<User>, ApiError> {
    req.validate()?;
    let user_id = require_user(&auth)?;

    let user = User::update(
        &state.db,
        user_id,
        UpdateUser {
            first_name: req.first_name,
            last_name: req.last_name,
            phone: req.phone,
            avatar_url: req.avatar_url,
            ..Default::default()
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// **Endpoint**: `GET /v1/users`
///
/// Lists the caller's company users. Requires company admin.
pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<User>>, ApiError> {
    require_company_admin(&auth)?;
    let company_id = require_company(&auth)?;

    let limit = query.limit.clamp(1, 100);
    let users = User::list_by_company(&state.db, company_id, limit, query.offset.max(0)).await?;

    Ok(Json(users))
}

/// **Endpoint**: `PATCH /v1/users/:id/role`
///
/// Company admins can hand out any role up to company admin inside
/// their own company; the platform admin role can only be granted by a
/// platform admin.
pub async fn update_role(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<UpdateRoleRequest>,
) -> Result<Json<User>, ApiError> {
    require_company_admin(&auth)?;

    if req.role == GlobalRole::Admin && auth.role != GlobalRole::Admin {
        return Err(ApiError::Forbidden(
            "Only platform admins can grant the admin role".to_string(),
        ));
    }

    let target = find_in_scope(&state, &auth, user_id).await?;

    let user = User::update(
        &state.db,
        target.id,
        UpdateUser {
            role: Some(req.role),
            ..Default::default()
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// **Endpoint**: `POST /v1/users/:id/activate`
///
/// Activates a pending account (used when owner promotion is disabled
/// and accounts are vetted by an admin).
pub async fn activate(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<User>, ApiError> {
    require_company_admin(&auth)?;
    let target = find_in_scope(&state, &auth, user_id).await?;

    let user = User::update(
        &state.db,
        target.id,
        UpdateUser {
            status: Some(UserStatus::Active),
            ..Default::default()
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// **Endpoint**: `DELETE /v1/users/:id`
///
/// Soft delete: the account is marked inactive, never removed.
pub async fn deactivate(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<User>, ApiError> {
    require_company_admin(&auth)?;

    if auth.user_id == Some(user_id) {
        return Err(ApiError::BadRequest(
            "Cannot deactivate your own account".to_string(),
        ));
    }

    let target = find_in_scope(&state, &auth, user_id).await?;

    User::deactivate(&state.db, target.id).await?;

    let user = User::find_by_id(&state.db, target.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

fn require_user(auth: &AuthContext) -> Result<Uuid, ApiError> {
    auth.user_id
        .ok_or_else(|| ApiError::Forbidden("Requires a user token".to_string()))
}

fn require_company(auth: &AuthContext) -> Result<Uuid, ApiError> {
    auth.company_id
        .ok_or_else(|| ApiError::BadRequest("User does not belong to a company".to_string()))
}

fn require_company_admin(auth: &AuthContext) -> Result<(), ApiError> {
    if auth.role.has_at_least(GlobalRole::CompanyAdmin) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "Requires company admin role".to_string(),
        ))
    }
}

/// Loads the target user and checks tenant scope
///
/// Platform admins may touch any user; company admins only users in
/// their own company.
async fn find_in_scope(
    state: &AppState,
    auth: &AuthContext,
    user_id: Uuid,
) -> Result<User, ApiError> {
    let target = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if auth.role != GlobalRole::Admin && target.company_id != auth.company_id {
        // Hidden, not forbidden: don't leak that the user exists.
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    Ok(target)
}
