use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::rest::error::{ApiError, ApiResult};
use crate::api::rest::middleware::{ensure_owner, AuthContext};
use crate::shared::models::{
    AppState, CreateTaskRequest, StatusFilter, Task, TaskLookup, UpdateTaskRequest,
};

#[derive(Debug, Default, Deserialize)]
pub struct ListTasksQuery {
    pub status: Option<String>,
}

fn lookup_to_task(lookup: TaskLookup, access_hint: &str) -> Result<Task, ApiError> {
    match lookup {
        TaskLookup::Found(task) => Ok(task),
        TaskLookup::Missing => Err(ApiError::NotFound("Task not found".to_string())),
        TaskLookup::Denied => Err(ApiError::Forbidden(format!(
            "Access denied: You can only {} your own tasks",
            access_hint
        ))),
    }
}

pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListTasksQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    ensure_owner(&auth, &user_id)?;

    let filter = StatusFilter::from_arg(query.status.as_deref());
    let tasks = Task::list_for_owner(&state.db, &user_id, filter).await?;
    let count = tasks.len();

    Ok(Json(serde_json::json!({
        "tasks": tasks,
        "count": count,
    })))
}

pub async fn create_task(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<Json<Task>> {
    ensure_owner(&auth, &user_id)?;

    let title = req.title.trim();
    if title.is_empty() {
        return Err(ApiError::BadRequest("title must not be empty".to_string()));
    }

    let task = Task::create(&state.db, &user_id, title, req.description.as_deref()).await?;

    Ok(Json(task))
}

pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Path((user_id, task_id)): Path<(String, i64)>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Task>> {
    ensure_owner(&auth, &user_id)?;

    let lookup = Task::find_for_owner(&state.db, task_id, &user_id).await?;
    Ok(Json(lookup_to_task(lookup, "access")?))
}

pub async fn update_task(
    State(state): State<Arc<AppState>>,
    Path((user_id, task_id)): Path<(String, i64)>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    ensure_owner(&auth, &user_id)?;

    let lookup = Task::update_for_owner(&state.db, task_id, &user_id, &req).await?;
    Ok(Json(lookup_to_task(lookup, "update")?))
}

pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    Path((user_id, task_id)): Path<(String, i64)>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<serde_json::Value>> {
    ensure_owner(&auth, &user_id)?;

    let lookup = Task::delete_for_owner(&state.db, task_id, &user_id).await?;
    let task = lookup_to_task(lookup, "delete")?;

    Ok(Json(serde_json::json!({
        "message": format!("Task '{}' has been deleted successfully", task.title),
        "deleted_task_id": task.id,
    })))
}
