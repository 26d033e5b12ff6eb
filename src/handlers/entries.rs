use super::common::{
    created_response, no_content_response, success_response, validate_input, AppJson, AppPath,
    AppQuery,
};
use crate::{
    errors::ApiError,
    handlers::AppState,
    services::entries::{CreateEntry, CreateEntryByName, EntryFilter, EntryResponse, UpdateEntry},
};
use axum::{
    extract::State,
    response::Response,
    routing::{get, post},
    Router,
};

#[utoipa::path(
    post,
    path = "/api/v1/entries",
    summary = "Record a milk delivery",
    request_body = CreateEntry,
    responses(
        (status = 201, description = "Entry recorded", body = EntryResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Supplier not found or inactive", body = crate::errors::ErrorResponse),
        (status = 422, description = "Validation error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Entries"
)]
pub async fn create_entry(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateEntry>,
) -> Result<Response, ApiError> {
    validate_input(&payload)?;
    let entry = state.services.entries.create_entry(payload).await?;
    Ok(created_response(entry))
}

#[utoipa::path(
    post,
    path = "/api/v1/entries/by-name",
    summary = "Record a milk delivery by supplier name",
    request_body = CreateEntryByName,
    responses(
        (status = 201, description = "Entry recorded", body = EntryResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Supplier not found or inactive", body = crate::errors::ErrorResponse),
        (status = 422, description = "Validation error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Entries"
)]
pub async fn create_entry_by_name(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateEntryByName>,
) -> Result<Response, ApiError> {
    validate_input(&payload)?;
    let entry = state.services.entries.create_entry_by_name(payload).await?;
    Ok(created_response(entry))
}

#[utoipa::path(
    get,
    path = "/api/v1/entries",
    summary = "List milk entries",
    description = "Newest first. Both bounds are inclusive and optional.",
    params(EntryFilter),
    responses(
        (status = 200, description = "Entries", body = [EntryResponse]),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 422, description = "Malformed date", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Entries"
)]
pub async fn list_entries(
    State(state): State<AppState>,
    AppQuery(filter): AppQuery<EntryFilter>,
) -> Result<Response, ApiError> {
    let entries = state.services.entries.list_entries(filter).await?;
    Ok(success_response(entries))
}

#[utoipa::path(
    get,
    path = "/api/v1/entries/{id}",
    summary = "Get milk entry",
    params(("id" = i32, Path, description = "Entry id")),
    responses(
        (status = 200, description = "Entry found", body = EntryResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Entry not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Entries"
)]
pub async fn get_entry(
    State(state): State<AppState>,
    AppPath(entry_id): AppPath<i32>,
) -> Result<Response, ApiError> {
    let entry = state.services.entries.get_entry(entry_id).await?;
    Ok(success_response(entry))
}

#[utoipa::path(
    patch,
    path = "/api/v1/entries/{id}",
    summary = "Update milk entry",
    params(("id" = i32, Path, description = "Entry id")),
    request_body = UpdateEntry,
    responses(
        (status = 200, description = "Entry updated", body = EntryResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Entry or new supplier not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Validation error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Entries"
)]
pub async fn update_entry(
    State(state): State<AppState>,
    AppPath(entry_id): AppPath<i32>,
    AppJson(payload): AppJson<UpdateEntry>,
) -> Result<Response, ApiError> {
    validate_input(&payload)?;
    let entry = state
        .services
        .entries
        .update_entry(entry_id, payload)
        .await?;
    Ok(success_response(entry))
}

#[utoipa::path(
    delete,
    path = "/api/v1/entries/{id}",
    summary = "Delete milk entry",
    params(("id" = i32, Path, description = "Entry id")),
    responses(
        (status = 204, description = "Entry deleted"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Entry not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Entries"
)]
pub async fn delete_entry(
    State(state): State<AppState>,
    AppPath(entry_id): AppPath<i32>,
) -> Result<Response, ApiError> {
    state.services.entries.delete_entry(entry_id).await?;
    Ok(no_content_response())
}

pub fn entry_routes() -> Router<AppState> {
    Router::new()
        .route("/entries", get(list_entries).post(create_entry))
        .route("/entries/by-name", post(create_entry_by_name))
        .route(
            "/entries/:id",
            get(get_entry).patch(update_entry).delete(delete_entry),
        )
}
