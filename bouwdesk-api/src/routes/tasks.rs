/// Project task routes
///
/// Task access rides on the project: viewing tasks needs the view
/// grant, any mutation the manage-tasks grant. The permission engine
/// also applies the lifecycle locks, so tasks in an archived project
/// are frozen along with everything else.
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
use bouwdesk_shared::models::project::{Project, ProjectCounter};
use bouwdesk_shared::models::task::{CreateTask, Task, TaskStatus, UpdateTask};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 200, message = "Task title is required"))]
    pub title: String,

    pub description: Option<String>,
    pub assigned_to: Option<Uuid>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 200, message = "Task title cannot be empty"))]
    pub title: Option<String>,

    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub assigned_to: Option<Option<Uuid>>,
    pub due_date: Option<Option<NaiveDate>>,
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

/// **Endpoint**: `GET /v1/projects/:id/tasks`
pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let actor = require_actor(&auth)?;
    require_project_permission(&state.db, &actor, project_id, ProjectAction::View).await?;

    let limit = query.limit.clamp(1, 200);
    let tasks = Task::list_by_project(&state.db, project_id, limit, query.offset.max(0)).await?;

    Ok(Json(tasks))
}

/// **Endpoint**: `POST /v1/projects/:id/tasks`
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    req.validate()?;

    let actor = require_actor(&auth)?;
    require_project_permission(&state.db, &actor, project_id, ProjectAction::ManageTasks).await?;

    let task = Task::create(
        &state.db,
        CreateTask {
            project_id,
            title: req.title,
            description: req.description,
            assigned_to: req.assigned_to,
            due_date: req.due_date,
            created_by: actor.user_id,
        },
    )
    .await?;
    Project::adjust_counter(&state.db, project_id, ProjectCounter::Tasks, 1).await?;

    Ok((StatusCode::CREATED, Json(task)))
}

/// **Endpoint**: `PATCH /v1/projects/:id/tasks/:task_id`
pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, task_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<Json<Task>, ApiError> {
    req.validate()?;

    let actor = require_actor(&auth)?;
    require_project_permission(&state.db, &actor, project_id, ProjectAction::ManageTasks).await?;

    // Scope check before the write so a task id from another project 404s.
    Task::find_by_id(&state.db, task_id)
        .await?
        .filter(|t| t.project_id == project_id)
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    let task = Task::update(
        &state.db,
        task_id,
        UpdateTask {
            title: req.title,
            description: req.description,
            status: req.status,
            assigned_to: req.assigned_to,
            due_date: req.due_date,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    Ok(Json(task))
}

/// **Endpoint**: `DELETE /v1/projects/:id/tasks/:task_id`
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, task_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let actor = require_actor(&auth)?;
    require_project_permission(&state.db, &actor, project_id, ProjectAction::ManageTasks).await?;

    let task = Task::find_by_id(&state.db, task_id)
        .await?
        .filter(|t| t.project_id == project_id)
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    Task::delete(&state.db, task.id).await?;
    Project::adjust_counter(&state.db, project_id, ProjectCounter::Tasks, -1).await?;

    Ok(StatusCode::NO_CONTENT)
}
