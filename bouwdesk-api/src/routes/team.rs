/// Project team routes
///
/// Adding a member requires two separate things: the manage-team grant
/// on the project, and an inviter rank at or above the role being
/// handed out. Company and platform admins act without a membership,
/// so the rank rule only applies to inviters who have one.
use crate::app::AppState;
use crate::error::ApiError;
use crate::routes::projects::require_actor;
use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use bouwdesk_shared::auth::middleware::AuthContext;
use bouwdesk_shared::auth::permissions::{require_project_permission, ProjectAction};
use bouwdesk_shared::models::project::{Project, ProjectCounter};
use bouwdesk_shared::models::team_member::{CreateTeamMember, ProjectRole, TeamMember};
use bouwdesk_shared::models::user::User;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub user_id: Uuid,
    pub role: ProjectRole,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMemberRoleRequest {
    pub role: ProjectRole,
}

/// **Endpoint**: `GET /v1/projects/:id/team`
pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<TeamMember>>, ApiError> {
    let actor = require_actor(&auth)?;
    require_project_permission(&state.db, &actor, project_id, ProjectAction::View).await?;

    let members = TeamMember::list_active(&state.db, project_id).await?;

    Ok(Json(members))
}

/// **Endpoint**: `POST /v1/projects/:id/team`
///
/// # Errors
///
/// - 403 `insufficient_team_role` without the manage-team grant
/// - 403 when the inviter's rank is below the role being granted
/// - 404 when the invitee is not a user of the same company
/// - 409 when the user is already on the team
pub async fn add(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<AddMemberRequest>,
) -> Result<(StatusCode, Json<TeamMember>), ApiError> {
    let actor = require_actor(&auth)?;
    let project =
        require_project_permission(&state.db, &actor, project_id, ProjectAction::ManageTeam)
            .await?;

    // Inviters with a membership can only grant roles at or below
    // their own rank. Admins without one passed the engine's admin
    // paths and skip this check.
    if let Some(membership) = TeamMember::find(&state.db, project_id, actor.user_id).await? {
        if membership.is_active && !membership.role.can_invite(req.role) {
            return Err(ApiError::Forbidden(format!(
                "Cannot grant the {} role from the {} role",
                req.role.as_str(),
                membership.role.as_str()
            )));
        }
    }

    let invitee = User::find_by_id(&state.db, req.user_id)
        .await?
        .filter(|u| u.company_id == Some(project.company_id))
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let member = TeamMember::add(
        &state.db,
        CreateTeamMember {
            project_id,
            user_id: invitee.id,
            role: req.role,
            invited_by: actor.user_id,
        },
    )
    .await?;
    Project::adjust_counter(&state.db, project_id, ProjectCounter::TeamMembers, 1).await?;

    Ok((StatusCode::CREATED, Json(member)))
}

/// **Endpoint**: `PATCH /v1/projects/:id/team/:member_id`
///
/// Changes a member's project role. Demoting the only active owner is
/// refused so the project always keeps one.
pub async fn update_role(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, member_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateMemberRoleRequest>,
) -> Result<Json<TeamMember>, ApiError> {
    let actor = require_actor(&auth)?;
    require_project_permission(&state.db, &actor, project_id, ProjectAction::ManageTeam).await?;

    if let Some(membership) = TeamMember::find(&state.db, project_id, actor.user_id).await? {
        if membership.is_active && !membership.role.can_invite(req.role) {
            return Err(ApiError::Forbidden(format!(
                "Cannot grant the {} role from the {} role",
                req.role.as_str(),
                membership.role.as_str()
            )));
        }
    }

    let member = TeamMember::find_by_id(&state.db, member_id)
        .await?
        .filter(|m| m.project_id == project_id)
        .ok_or_else(|| ApiError::NotFound("Team member not found".to_string()))?;

    if member.role == ProjectRole::Owner && req.role != ProjectRole::Owner {
        let owners = TeamMember::count_active_owners(&state.db, project_id).await?;
        if owners <= 1 {
            return Err(ApiError::Conflict(
                "Cannot demote the last owner of a project".to_string(),
            ));
        }
    }

    let member = TeamMember::update_role(&state.db, member.id, req.role)
        .await?
        .ok_or_else(|| ApiError::NotFound("Team member not found".to_string()))?;

    Ok(Json(member))
}

/// **Endpoint**: `DELETE /v1/projects/:id/team/:member_id`
pub async fn remove(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, member_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let actor = require_actor(&auth)?;
    require_project_permission(&state.db, &actor, project_id, ProjectAction::ManageTeam).await?;

    let member = TeamMember::find_by_id(&state.db, member_id)
        .await?
        .filter(|m| m.project_id == project_id)
        .ok_or_else(|| ApiError::NotFound("Team member not found".to_string()))?;

    TeamMember::remove(&state.db, member.id).await?;
    Project::adjust_counter(&state.db, project_id, ProjectCounter::TeamMembers, -1).await?;

    Ok(StatusCode::NO_CONTENT)
}
