/// Cost calculation routes
///
/// Calculations are priced estimates in cents, attached to a project
/// and gated by the manage-calculations grant.
use crate::app::AppState;
use crate::error::ApiError;
use crate::routes::projects::require_actor;
use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use bouwdesk_shared::auth::middleware::AuthContext;
use bouwdesk_shared::auth::permissions::{require_project_permission, ProjectAction};
use bouwdesk_shared::models::calculation::{Calculation, CreateCalculation};
use bouwdesk_shared::models::project::{Project, ProjectCounter};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCalculationRequest {
    #[validate(length(min = 1, max = 200, message = "Calculation name is required"))]
    pub name: String,

    #[validate(range(min = 0, message = "Total cost cannot be negative"))]
    pub total_cost_cents: i64,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    100
}

/// **Endpoint**: `GET /v1/projects/:id/calculations`
pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Calculation>>, ApiError> {
    let actor = require_actor(&auth)?;
    require_project_permission(&state.db, &actor, project_id, ProjectAction::View).await?;

    let limit = query.limit.clamp(1, 200);
    let calculations =
        Calculation::list_by_project(&state.db, project_id, limit, query.offset.max(0)).await?;

    Ok(Json(calculations))
}

/// **Endpoint**: `POST /v1/projects/:id/calculations`
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<CreateCalculationRequest>,
) -> Result<(StatusCode, Json<Calculation>), ApiError> {
    req.validate()?;

    let actor = require_actor(&auth)?;
    require_project_permission(
        &state.db,
        &actor,
        project_id,
        ProjectAction::ManageCalculations,
    )
    .await?;

    let calculation = Calculation::create(
        &state.db,
        CreateCalculation {
            project_id,
            name: req.name,
            total_cost_cents: req.total_cost_cents,
            created_by: actor.user_id,
        },
    )
    .await?;
    Project::adjust_counter(&state.db, project_id, ProjectCounter::Calculations, 1).await?;

    Ok((StatusCode::CREATED, Json(calculation)))
}

/// **Endpoint**: `GET /v1/projects/:id/calculations/:calculation_id`
pub async fn get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, calculation_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Calculation>, ApiError> {
    let actor = require_actor(&auth)?;
    require_project_permission(&state.db, &actor, project_id, ProjectAction::View).await?;

    let calculation = Calculation::find_by_id(&state.db, calculation_id)
        .await?
        .filter(|c| c.project_id == project_id)
        .ok_or_else(|| ApiError::NotFound("Calculation not found".to_string()))?;

    Ok(Json(calculation))
}

/// **Endpoint**: `DELETE /v1/projects/:id/calculations/:calculation_id`
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, calculation_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let actor = require_actor(&auth)?;
    require_project_permission(
        &state.db,
        &actor,
        project_id,
        ProjectAction::ManageCalculations,
    )
    .await?;

    let calculation = Calculation::find_by_id(&state.db, calculation_id)
        .await?
        .filter(|c| c.project_id == project_id)
        .ok_or_else(|| ApiError::NotFound("Calculation not found".to_string()))?;

    Calculation::delete(&state.db, calculation.id).await?;
    Project::adjust_counter(&state.db, project_id, ProjectCounter::Calculations, -1).await?;

    Ok(StatusCode::NO_CONTENT)
}
