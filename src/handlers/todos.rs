use super::common::{
    created_response, no_content_response, success_response, validate_input, AppJson, AppPath,
    AppQuery,
};
use crate::{
    errors::ApiError,
    handlers::AppState,
    services::todos::{CreateTodo, TodoListParams, TodoResponse, UpdateTodo},
};
use axum::{extract::State, response::Response, routing::get, Router};

#[utoipa::path(
    post,
    path = "/api/v1/todos",
    summary = "Create todo",
    request_body = CreateTodo,
    responses(
        (status = 201, description = "Todo created", body = TodoResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 422, description = "Validation error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Todos"
)]
pub async fn create_todo(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateTodo>,
) -> Result<Response, ApiError> {
    validate_input(&payload)?;
    let todo = state.services.todos.create_todo(payload).await?;
    Ok(created_response(todo))
}

#[utoipa::path(
    get,
    path = "/api/v1/todos",
    summary = "List todos",
    params(TodoListParams),
    responses(
        (status = 200, description = "Todos ordered by id", body = [TodoResponse]),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Todos"
)]
pub async fn list_todos(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<TodoListParams>,
) -> Result<Response, ApiError> {
    let todos = state.services.todos.list_todos(params).await?;
    Ok(success_response(todos))
}

#[utoipa::path(
    get,
    path = "/api/v1/todos/{id}",
    summary = "Get todo",
    params(("id" = i32, Path, description = "Todo id")),
    responses(
        (status = 200, description = "Todo found", body = TodoResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Todo not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Todos"
)]
pub async fn get_todo(
    State(state): State<AppState>,
    AppPath(todo_id): AppPath<i32>,
) -> Result<Response, ApiError> {
    let todo = state.services.todos.get_todo(todo_id).await?;
    Ok(success_response(todo))
}

#[utoipa::path(
    patch,
    path = "/api/v1/todos/{id}",
    summary = "Update todo",
    params(("id" = i32, Path, description = "Todo id")),
    request_body = UpdateTodo,
    responses(
        (status = 200, description = "Todo updated", body = TodoResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Todo not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Validation error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Todos"
)]
pub async fn update_todo(
    State(state): State<AppState>,
    AppPath(todo_id): AppPath<i32>,
    AppJson(payload): AppJson<UpdateTodo>,
) -> Result<Response, ApiError> {
    validate_input(&payload)?;
    let todo = state.services.todos.update_todo(todo_id, payload).await?;
    Ok(success_response(todo))
}

#[utoipa::path(
    delete,
    path = "/api/v1/todos/{id}",
    summary = "Delete todo",
    params(("id" = i32, Path, description = "Todo id")),
    responses(
        (status = 204, description = "Todo deleted"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Todo not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Todos"
)]
pub async fn delete_todo(
    State(state): State<AppState>,
    AppPath(todo_id): AppPath<i32>,
) -> Result<Response, ApiError> {
    state.services.todos.delete_todo(todo_id).await?;
    Ok(no_content_response())
}

pub fn todo_routes() -> Router<AppState> {
    Router::new()
        .route("/todos", get(list_todos).post(create_todo))
        .route(
            "/todos/:id",
            get(get_todo).patch(update_todo).delete(delete_todo),
        )
}
