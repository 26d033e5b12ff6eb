use super::common::{
    created_response, no_content_response, success_response, validate_input, AppJson, AppPath,
};
use crate::{
    auth::CurrentUser,
    errors::ApiError,
    handlers::AppState,
    services::suppliers::{CreateSupplier, SupplierResponse, UpdateSupplier},
};
use axum::{
    extract::State,
    response::Response,
    routing::get,
    Router,
};
use tracing::info;

#[utoipa::path(
    post,
    path = "/api/v1/suppliers",
    summary = "Create supplier",
    request_body = CreateSupplier,
    responses(
        (status = 201, description = "Supplier created", body = SupplierResponse),
        (status = 400, description = "Supplier name already taken", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 422, description = "Validation error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Suppliers"
)]
pub async fn create_supplier(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(payload): AppJson<CreateSupplier>,
) -> Result<Response, ApiError> {
    validate_input(&payload)?;
    let supplier = state.services.suppliers.create_supplier(payload).await?;
    info!(supplier_id = supplier.id, user_id = user.id, "supplier created via API");
    Ok(created_response(supplier))
}

#[utoipa::path(
    get,
    path = "/api/v1/suppliers",
    summary = "List active suppliers",
    responses(
        (status = 200, description = "Active suppliers ordered by id", body = [SupplierResponse]),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Suppliers"
)]
pub async fn list_suppliers(State(state): State<AppState>) -> Result<Response, ApiError> {
    let suppliers = state.services.suppliers.list_suppliers().await?;
    Ok(success_response(suppliers))
}

#[utoipa::path(
    get,
    path = "/api/v1/suppliers/{id}",
    summary = "Get supplier",
    params(("id" = i32, Path, description = "Supplier id")),
    responses(
        (status = 200, description = "Supplier found", body = SupplierResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Supplier not found or inactive", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Suppliers"
)]
pub async fn get_supplier(
    State(state): State<AppState>,
    AppPath(supplier_id): AppPath<i32>,
) -> Result<Response, ApiError> {
    let supplier = state.services.suppliers.get_supplier(supplier_id).await?;
    Ok(success_response(supplier))
}

#[utoipa::path(
    get,
    path = "/api/v1/suppliers/by-name/{name}",
    summary = "Get supplier by exact name",
    params(("name" = String, Path, description = "Supplier name")),
    responses(
        (status = 200, description = "Supplier found", body = SupplierResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Supplier not found or inactive", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Suppliers"
)]
pub async fn get_supplier_by_name(
    State(state): State<AppState>,
    AppPath(name): AppPath<String>,
) -> Result<Response, ApiError> {
    let supplier = state.services.suppliers.get_supplier_by_name(&name).await?;
    Ok(success_response(supplier))
}

#[utoipa::path(
    patch,
    path = "/api/v1/suppliers/{id}",
    summary = "Update supplier",
    description = "Partial update. Inactive suppliers can be reactivated with `is_active: true`.",
    params(("id" = i32, Path, description = "Supplier id")),
    request_body = UpdateSupplier,
    responses(
        (status = 200, description = "Supplier updated", body = SupplierResponse),
        (status = 400, description = "Supplier name already taken", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Supplier not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Validation error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Suppliers"
)]
pub async fn update_supplier(
    State(state): State<AppState>,
    AppPath(supplier_id): AppPath<i32>,
    AppJson(payload): AppJson<UpdateSupplier>,
) -> Result<Response, ApiError> {
    validate_input(&payload)?;
    let supplier = state
        .services
        .suppliers
        .update_supplier(supplier_id, payload)
        .await?;
    Ok(success_response(supplier))
}

#[utoipa::path(
    delete,
    path = "/api/v1/suppliers/{id}",
    summary = "Deactivate supplier",
    description = "Soft delete: the supplier disappears from lookups and reports, its entries are kept.",
    params(("id" = i32, Path, description = "Supplier id")),
    responses(
        (status = 204, description = "Supplier deactivated"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Supplier not found or already inactive", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Suppliers"
)]
pub async fn delete_supplier(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(supplier_id): AppPath<i32>,
) -> Result<Response, ApiError> {
    state
        .services
        .suppliers
        .deactivate_supplier(supplier_id)
        .await?;
    info!(supplier_id, user_id = user.id, "supplier deactivated via API");
    Ok(no_content_response())
}

pub fn supplier_routes() -> Router<AppState> {
    Router::new()
        .route("/suppliers", get(list_suppliers).post(create_supplier))
        .route("/suppliers/by-name/:name", get(get_supplier_by_name))
        .route(
            "/suppliers/:id",
            get(get_supplier)
                .patch(update_supplier)
                .delete(delete_supplier),
        )
}
