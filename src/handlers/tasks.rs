use axum::{extract::State, Json};

use crate::{
    error::AppError,
    extract::{AppJson, AppPath},
    middleware::CurrentUser,
    models::{MessageResponse, NewTask, Task, TaskUpdate},
    store::TaskStore,
};

#[utoipa::path(
    get,
    path = "/todos",
    tag = "tasks",
    responses(
        (status = 200, description = "Tasks visible to the caller", body = Vec<Task>),
        (status = 401, description = "Invalid or expired token", body = crate::models::ErrorResponse),
        (status = 403, description = "Missing token", body = crate::models::ErrorResponse)
    ),
    security(
        ("bearer" = [])
    )
)]
pub async fn list_todos(
    State(tasks): State<TaskStore>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<Vec<Task>>, AppError> {
    let tasks = tasks.list(session.principal_id).await?;
    Ok(Json(tasks))
}

#[utoipa::path(
    post,
    path = "/todos",
    tag = "tasks",
    request_body = NewTask,
    responses(
        (status = 200, description = "Task created", body = Task),
        (status = 400, description = "Empty title", body = crate::models::ErrorResponse),
        (status = 401, description = "Invalid or expired token", body = crate::models::ErrorResponse),
        (status = 403, description = "Missing token", body = crate::models::ErrorResponse)
    ),
    security(
        ("bearer" = [])
    )
)]
pub async fn create_todo(
    State(tasks): State<TaskStore>,
    CurrentUser(session): CurrentUser,
    AppJson(payload): AppJson<NewTask>,
) -> Result<Json<Task>, AppError> {
    let task = tasks.add(&payload.title, session.principal_id).await?;
    Ok(Json(task))
}

#[utoipa::path(
    put,
    path = "/todos/{id}",
    tag = "tasks",
    params(
        ("id" = i64, Path, description = "Task ID")
    ),
    request_body = TaskUpdate,
    responses(
        (status = 200, description = "Task updated", body = Task),
        (status = 400, description = "Malformed id, empty title or missing `completed`", body = crate::models::ErrorResponse),
        (status = 404, description = "Task not found or not owned by caller", body = crate::models::ErrorResponse),
        (status = 401, description = "Invalid or expired token", body = crate::models::ErrorResponse),
        (status = 403, description = "Missing token", body = crate::models::ErrorResponse)
    ),
    security(
        ("bearer" = [])
    )
)]
pub async fn update_todo(
    State(tasks): State<TaskStore>,
    CurrentUser(session): CurrentUser,
    AppPath(id): AppPath<i64>,
    AppJson(payload): AppJson<TaskUpdate>,
) -> Result<Json<Task>, AppError> {
    let completed = payload.completed.ok_or_else(|| {
        AppError::ValidationError("Field `completed` is required".to_string())
    })?;
    let task = tasks
        .update(id, &payload.title, completed, session.principal_id)
        .await?;
    Ok(Json(task))
}

#[utoipa::path(
    delete,
    path = "/todos/{id}",
    tag = "tasks",
    params(
        ("id" = i64, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Task deleted", body = MessageResponse),
        (status = 404, description = "Task not found or not owned by caller", body = crate::models::ErrorResponse),
        (status = 401, description = "Invalid or expired token", body = crate::models::ErrorResponse),
        (status = 403, description = "Missing token", body = crate::models::ErrorResponse)
    ),
    security(
        ("bearer" = [])
    )
)]
pub async fn delete_todo(
    State(tasks): State<TaskStore>,
    CurrentUser(session): CurrentUser,
    AppPath(id): AppPath<i64>,
) -> Result<Json<MessageResponse>, AppError> {
    tasks.delete(id, session.principal_id).await?;

    Ok(Json(MessageResponse {
        message: "Todo deleted".to_string(),
    }))
}
