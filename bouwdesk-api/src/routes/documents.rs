/// Project document routes
///
/// Documents are metadata rows; the file bytes live in object storage
/// and only the storage path is recorded here. Uploads count against
/// the plan's per-project document quota.
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
use bouwdesk_shared::models::document::{CreateDocument, Document, DocumentType};
use bouwdesk_shared::models::project::{Project, ProjectCounter};
use bouwdesk_shared::quota::QuotaType;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDocumentRequest {
    #[validate(length(min = 1, max = 200, message = "Document name is required"))]
    pub name: String,

    /// One of drawing, report, contract, permit, invoice, specification;
    /// anything else is stored as "other"
    pub document_type: Option<String>,

    #[validate(length(min = 1, message = "File path is required"))]
    pub file_path: String,

    #[validate(range(min = 1, message = "File size must be positive"))]
    pub file_size: i64,

    #[validate(length(min = 1, message = "MIME type is required"))]
    pub mime_type: String,
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

/// **Endpoint**: `GET /v1/projects/:id/documents`
pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let actor = require_actor(&auth)?;
    require_project_permission(&state.db, &actor, project_id, ProjectAction::View).await?;

    let limit = query.limit.clamp(1, 200);
    let documents =
        Document::list_by_project(&state.db, project_id, limit, query.offset.max(0)).await?;

    Ok(Json(documents))
}

/// **Endpoint**: `POST /v1/projects/:id/documents`
///
/// # Errors
///
/// - 403 `quota_exceeded` when the per-project document limit is hit
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<Document>), ApiError> {
    req.validate()?;

    let actor = require_actor(&auth)?;
    let project =
        require_project_permission(&state.db, &actor, project_id, ProjectAction::ManageDocuments)
            .await?;

    state
        .quota
        .enforce_for_project(
            project.company_id,
            QuotaType::DocumentsPerProject,
            Some(project_id),
        )
        .await?;

    let document_type = req
        .document_type
        .as_deref()
        .and_then(DocumentType::from_str)
        .unwrap_or(DocumentType::Other);

    let document = Document::create(
        &state.db,
        CreateDocument {
            project_id,
            name: req.name,
            document_type,
            file_path: req.file_path,
            file_size: req.file_size,
            mime_type: req.mime_type,
            uploaded_by: actor.user_id,
        },
    )
    .await?;
    Project::adjust_counter(&state.db, project_id, ProjectCounter::Documents, 1).await?;

    Ok((StatusCode::CREATED, Json(document)))
}

/// **Endpoint**: `GET /v1/projects/:id/documents/:document_id`
pub async fn get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, document_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Document>, ApiError> {
    let actor = require_actor(&auth)?;
    require_project_permission(&state.db, &actor, project_id, ProjectAction::View).await?;

    let document = Document::find_by_id(&state.db, document_id)
        .await?
        .filter(|d| d.project_id == project_id)
        .ok_or_else(|| ApiError::NotFound("Document not found".to_string()))?;

    Ok(Json(document))
}

/// **Endpoint**: `DELETE /v1/projects/:id/documents/:document_id`
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, document_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let actor = require_actor(&auth)?;
    require_project_permission(&state.db, &actor, project_id, ProjectAction::ManageDocuments)
        .await?;

    let document = Document::find_by_id(&state.db, document_id)
        .await?
        .filter(|d| d.project_id == project_id)
        .ok_or_else(|| ApiError::NotFound("Document not found".to_string()))?;

    Document::delete(&state.db, document.id).await?;
    Project::adjust_counter(&state.db, project_id, ProjectCounter::Documents, -1).await?;

    Ok(StatusCode::NO_CONTENT)
}
