/// Project routes
///
/// Creation is quota-checked against the company plan; everything that
/// touches an existing project goes through the permission engine,
/// which folds team role, tenant boundary and project lifecycle into
/// one decision.
use crate::app::AppState;
use crate::error::{ApiError, ValidationErrorDetail};
use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use bouwdesk_shared::auth::middleware::AuthContext;
use bouwdesk_shared::auth::permissions::{require_project_permission, ProjectAction};
use bouwdesk_shared::models::project::{
    CreateProject, Project, ProjectCounter, UpdateProject,
};
use bouwdesk_shared::models::team_member::{CreateTeamMember, ProjectRole, TeamMember};
use bouwdesk_shared::quota::QuotaType;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 200, message = "Project name is required"))]
    pub name: String,

    pub description: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub budget_cents: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, max = 200, message = "Project name cannot be empty"))]
    pub name: Option<String>,

    pub description: Option<Option<String>>,
    pub address: Option<Option<String>>,
    pub city: Option<Option<String>>,
    pub start_date: Option<Option<NaiveDate>>,
    pub end_date: Option<Option<NaiveDate>>,
    pub budget_cents: Option<Option<i64>>,
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

fn check_date_order(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<(), ApiError> {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(ApiError::ValidationError(vec![ValidationErrorDetail {
                field: "end_date".to_string(),
                message: "End date must not be before the start date".to_string(),
            }]));
        }
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct ProjectStats {
    pub document_count: i32,
    pub task_count: i32,
    pub team_member_count: i32,
    pub calculation_count: i32,
}

/// **Endpoint**: `POST /v1/projects`
///
/// The creator automatically becomes the project owner, so every
/// project starts with exactly one active owner.
///
/// # Errors
///
/// - 403 `quota_exceeded` when the plan's project limit is reached
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<Project>), ApiError> {
    req.validate()?;
    check_date_order(req.start_date, req.end_date)?;

    let actor = require_actor(&auth)?;
    let company_id = actor
        .company_id
        .ok_or_else(|| ApiError::BadRequest("User does not belong to a company".to_string()))?;

    state
        .quota
        .enforce(company_id, QuotaType::Projects)
        .await?;

    let project = Project::create(
        &state.db,
        CreateProject {
            company_id,
            name: req.name,
            description: req.description,
            address: req.address,
            city: req.city,
            start_date: req.start_date,
            end_date: req.end_date,
            budget_cents: req.budget_cents,
            created_by: actor.user_id,
        },
    )
    .await?;

    TeamMember::add(
        &state.db,
        CreateTeamMember {
            project_id: project.id,
            user_id: actor.user_id,
            role: ProjectRole::Owner,
            invited_by: actor.user_id,
        },
    )
    .await?;
    Project::adjust_counter(&state.db, project.id, ProjectCounter::TeamMembers, 1).await?;

    // Re-read so the response carries the bumped counter.
    let project = Project::find_by_id(&state.db, project.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    Ok((StatusCode::CREATED, Json(project)))
}

/// **Endpoint**: `GET /v1/projects`
///
/// Lists the caller's company projects, newest first. Listing is not a
/// per-project permission: membership filtering happens when a project
/// is opened.
pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Project>>, ApiError> {
    let company_id = auth
        .company_id
        .ok_or_else(|| ApiError::BadRequest("User does not belong to a company".to_string()))?;

    let limit = query.limit.clamp(1, 100);
    let projects =
        Project::list_by_company(&state.db, company_id, limit, query.offset.max(0)).await?;

    Ok(Json(projects))
}

/// **Endpoint**: `GET /v1/projects/:id`
pub async fn get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Project>, ApiError> {
    let actor = require_actor(&auth)?;
    let project =
        require_project_permission(&state.db, &actor, project_id, ProjectAction::View).await?;

    Ok(Json(project))
}

/// **Endpoint**: `PATCH /v1/projects/:id`
///
/// Lifecycle transitions are not accepted here; archiving and
/// completing have their own endpoints with stricter grants.
pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<UpdateProjectRequest>,
) -> Result<Json<Project>, ApiError> {
    req.validate()?;
    // Only checked when the request carries both dates; comparing a new
    // date against the stored one would need the row first.
    check_date_order(req.start_date.flatten(), req.end_date.flatten())?;

    let actor = require_actor(&auth)?;
    require_project_permission(&state.db, &actor, project_id, ProjectAction::Edit).await?;

    let project = Project::update(
        &state.db,
        project_id,
        UpdateProject {
            name: req.name,
            description: req.description,
            address: req.address,
            city: req.city,
            start_date: req.start_date,
            end_date: req.end_date,
            budget_cents: req.budget_cents,
            status: None,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    Ok(Json(project))
}

/// **Endpoint**: `DELETE /v1/projects/:id`
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let actor = require_actor(&auth)?;
    require_project_permission(&state.db, &actor, project_id, ProjectAction::Delete).await?;

    Project::delete(&state.db, project_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// **Endpoint**: `POST /v1/projects/:id/archive`
///
/// Freezes the project. After this only viewing still works for the
/// team; unarchiving requires a platform admin restoring it directly.
pub async fn archive(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Project>, ApiError> {
    let actor = require_actor(&auth)?;
    require_project_permission(&state.db, &actor, project_id, ProjectAction::Archive).await?;

    let project = Project::archive(&state.db, project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    Ok(Json(project))
}

/// **Endpoint**: `POST /v1/projects/:id/complete`
pub async fn complete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Project>, ApiError> {
    let actor = require_actor(&auth)?;
    require_project_permission(&state.db, &actor, project_id, ProjectAction::ChangeSettings)
        .await?;

    let project = Project::complete(&state.db, project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    Ok(Json(project))
}

/// **Endpoint**: `GET /v1/projects/:id/stats`
///
/// Returns the denormalized counters without loading any related rows.
pub async fn stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<ProjectStats>, ApiError> {
    let actor = require_actor(&auth)?;
    let project =
        require_project_permission(&state.db, &actor, project_id, ProjectAction::View).await?;

    Ok(Json(ProjectStats {
        document_count: project.document_count,
        task_count: project.task_count,
        team_member_count: project.team_member_count,
        calculation_count: project.calculation_count,
    }))
}

pub(crate) fn require_actor(
    auth: &AuthContext,
) -> Result<bouwdesk_shared::auth::permissions::Actor, ApiError> {
    auth.actor()
        .ok_or_else(|| ApiError::Forbidden("Requires a user token".to_string()))
}
