//! Task CRUD handlers.

use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::history::{TaskFilter, TaskPatch, validate_description, validate_title};
use crate::server::AppState;
use crate::server::auth::AuthUser;
use crate::server::types::{
    ApiError, CreateTaskRequest, ListTasksQuery, TaskListResponse, TaskResponse,
    UpdateTaskRequest,
};

pub async fn create_task(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(body): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<TaskResponse>), ApiError> {
    let title = validate_title(&body.title)?;
    let description = validate_description(body.description.as_deref())?;

    let task = state.store.create_task(&user_id, title, description).await?;
    Ok((StatusCode::CREATED, Json(task.into())))
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Query(query): Query<ListTasksQuery>,
) -> Result<Json<TaskListResponse>, ApiError> {
    let filter = match query.status.as_deref() {
        Some(raw) => raw.parse::<TaskFilter>()?,
        None => TaskFilter::All,
    };

    let tasks = state.store.list_tasks(&user_id, filter).await?;
    let count = tasks.len();
    Ok(Json(TaskListResponse {
        tasks: tasks.into_iter().map(TaskResponse::from).collect(),
        count,
    }))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<TaskResponse>, ApiError> {
    let task = state
        .store
        .get_task(id, &user_id)
        .await?
        .ok_or(ApiError::NotFound("task not found"))?;
    Ok(Json(task.into()))
}

pub async fn update_task(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateTaskRequest>,
) -> Result<Json<TaskResponse>, ApiError> {
    let title = body.title.as_deref().map(validate_title).transpose()?;
    let description = validate_description(body.description.as_deref())?;

    let patch = TaskPatch { title, description };
    if patch.is_empty() {
        return Err(ApiError::BadRequest(
            "nothing to update: provide a title or description".to_string(),
        ));
    }

    let task = state
        .store
        .update_task(id, &user_id, patch)
        .await?
        .ok_or(ApiError::NotFound("task not found"))?;
    Ok(Json(task.into()))
}

pub async fn complete_task(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<TaskResponse>, ApiError> {
    let task = state
        .store
        .set_task_completed(id, &user_id, true)
        .await?
        .ok_or(ApiError::NotFound("task not found"))?;
    Ok(Json(task.into()))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.store.delete_task(id, &user_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("task not found"))
    }
}
