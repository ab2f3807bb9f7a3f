/// Programmatic API surface, authenticated by API key
///
/// Read-only by design: keys identify a company, not a user, so there
/// is no actor to run write permissions against. Each endpoint checks
/// the key's scopes; `projects:*` or `*` wildcards also pass.
use crate::app::AppState;
use crate::error::ApiError;
use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use bouwdesk_shared::auth::middleware::AuthContext;
use bouwdesk_shared::models::document::Document;
use bouwdesk_shared::models::project::Project;
use serde::Deserialize;
use uuid::Uuid;

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

/// **Endpoint**: `GET /v1/api/projects`
///
/// Requires the `projects:read` scope.
pub async fn list_projects(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Project>>, ApiError> {
    require_scope(&auth, "projects:read")?;
    let company_id = require_company(&auth)?;

    let limit = query.limit.clamp(1, 100);
    let projects =
        Project::list_by_company(&state.db, company_id, limit, query.offset.max(0)).await?;

    Ok(Json(projects))
}

/// **Endpoint**: `GET /v1/api/projects/:id`
pub async fn get_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Project>, ApiError> {
    require_scope(&auth, "projects:read")?;
    let company_id = require_company(&auth)?;

    let project = Project::find_by_id(&state.db, project_id)
        .await?
        .filter(|p| p.company_id == company_id)
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    Ok(Json(project))
}

/// **Endpoint**: `GET /v1/api/projects/:id/documents`
///
/// Requires the `documents:read` scope.
pub async fn list_documents(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Document>>, ApiError> {
    require_scope(&auth, "documents:read")?;
    let company_id = require_company(&auth)?;

    // Tenant check via the owning project.
    Project::find_by_id(&state.db, project_id)
        .await?
        .filter(|p| p.company_id == company_id)
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    let limit = query.limit.clamp(1, 200);
    let documents =
        Document::list_by_project(&state.db, project_id, limit, query.offset.max(0)).await?;

    Ok(Json(documents))
}

fn require_scope(auth: &AuthContext, scope: &str) -> Result<(), ApiError> {
    if auth.has_scope(scope) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!(
            "API key is missing the {} scope",
            scope
        )))
    }
}

fn require_company(auth: &AuthContext) -> Result<Uuid, ApiError> {
    auth.company_id
        .ok_or_else(|| ApiError::Forbidden("API key has no company".to_string()))
}
