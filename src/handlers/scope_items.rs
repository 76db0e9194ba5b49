use axum::{
    body::Bytes,
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use super::common::{created_response, file_response, no_content_response};
use crate::auth::AuthUser;
use crate::entities::scope_item;
use crate::errors::ServiceError;
use crate::excel::ImportReport;
use crate::services::scope_items::{
    BulkOutcome, BulkUpdateRequest, CreateScopeItemRequest, UpdateProgressRequest,
    UpdateScopeItemRequest,
};
use crate::services::transfer::XLSX_CONTENT_TYPE;
use crate::{ApiResponse, ApiResult, AppState};

/// List a project's scope items
#[utoipa::path(
    get,
    path = "/api/v1/projects/{id}/scope-items",
    params(("id" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Scope items; cost fields are null for roles without cost visibility",
            body = ApiResponse<Vec<scope_item::Model>>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Project not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Scope Items"
)]
pub async fn list_scope_items(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    user: AuthUser,
) -> ApiResult<Vec<scope_item::Model>> {
    let items = state.services.scope_items.list(&user, project_id).await?;
    Ok(Json(ApiResponse::success(items)))
}

/// Get a scope item
#[utoipa::path(
    get,
    path = "/api/v1/scope-items/{id}",
    params(("id" = Uuid, Path, description = "Scope item ID")),
    responses(
        (status = 200, description = "Scope item", body = ApiResponse<scope_item::Model>),
        (status = 404, description = "Scope item not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Scope Items"
)]
pub async fn get_scope_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
) -> ApiResult<scope_item::Model> {
    let item = state.services.scope_items.get(&user, id).await?;
    Ok(Json(ApiResponse::success(item)))
}

/// Create a scope item
#[utoipa::path(
    post,
    path = "/api/v1/projects/{id}/scope-items",
    params(("id" = Uuid, Path, description = "Project ID")),
    request_body = CreateScopeItemRequest,
    responses(
        (status = 201, description = "Scope item created", body = ApiResponse<scope_item::Model>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 409, description = "Item code already used in project", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Scope Items"
)]
pub async fn create_scope_item(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    user: AuthUser,
    Json(request): Json<CreateScopeItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let item = state
        .services
        .scope_items
        .create(&user, project_id, request)
        .await?;
    Ok(created_response(item))
}

/// Update a scope item. Initial cost fields cannot be changed.
#[utoipa::path(
    put,
    path = "/api/v1/scope-items/{id}",
    params(("id" = Uuid, Path, description = "Scope item ID")),
    request_body = UpdateScopeItemRequest,
    responses(
        (status = 200, description = "Scope item updated", body = ApiResponse<scope_item::Model>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Scope Items"
)]
pub async fn update_scope_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
    Json(request): Json<UpdateScopeItemRequest>,
) -> ApiResult<scope_item::Model> {
    let item = state.services.scope_items.update(&user, id, request).await?;
    Ok(Json(ApiResponse::success(item)))
}

/// Record production progress
#[utoipa::path(
    put,
    path = "/api/v1/scope-items/{id}/progress",
    params(("id" = Uuid, Path, description = "Scope item ID")),
    request_body = UpdateProgressRequest,
    responses(
        (status = 200, description = "Progress recorded", body = ApiResponse<scope_item::Model>),
        (status = 400, description = "Percentage outside 0-100", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Scope Items"
)]
pub async fn update_progress(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
    Json(request): Json<UpdateProgressRequest>,
) -> ApiResult<scope_item::Model> {
    let item = state
        .services
        .scope_items
        .update_progress(&user, id, request)
        .await?;
    Ok(Json(ApiResponse::success(item)))
}

/// Soft-delete a scope item
#[utoipa::path(
    delete,
    path = "/api/v1/scope-items/{id}",
    params(("id" = Uuid, Path, description = "Scope item ID")),
    responses(
        (status = 204, description = "Scope item deleted"),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Scope item not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Scope Items"
)]
pub async fn delete_scope_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.scope_items.delete(&user, id).await?;
    Ok(no_content_response())
}

/// Apply status/progress changes to many items; each row succeeds or fails on its own
#[utoipa::path(
    post,
    path = "/api/v1/projects/{id}/scope-items/bulk",
    params(("id" = Uuid, Path, description = "Project ID")),
    request_body = BulkUpdateRequest,
    responses(
        (status = 200, description = "Per-row outcome", body = ApiResponse<BulkOutcome>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Scope Items"
)]
pub async fn bulk_update(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    user: AuthUser,
    Json(request): Json<BulkUpdateRequest>,
) -> ApiResult<BulkOutcome> {
    let outcome = state
        .services
        .scope_items
        .bulk_update(&user, project_id, request)
        .await?;
    Ok(Json(ApiResponse::success(outcome)))
}

/// Import scope items from an `.xlsx` body
#[utoipa::path(
    post,
    path = "/api/v1/projects/{id}/scope-items/import",
    params(("id" = Uuid, Path, description = "Project ID")),
    request_body(content = Vec<u8>, content_type = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
    responses(
        (status = 200, description = "Import report with row-level warnings and errors", body = ApiResponse<ImportReport>),
        (status = 400, description = "Unreadable workbook or missing required columns", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Scope Items"
)]
pub async fn import_scope_items(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    user: AuthUser,
    body: Bytes,
) -> ApiResult<ImportReport> {
    let report = state
        .services
        .transfer
        .import_scope_items(&user, project_id, body)
        .await?;
    Ok(Json(ApiResponse::success(report)))
}

/// Download a project's scope items as `.xlsx`
#[utoipa::path(
    get,
    path = "/api/v1/projects/{id}/scope-items/export",
    params(("id" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Workbook", content_type = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet", body = Vec<u8>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Scope Items"
)]
pub async fn export_scope_items(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    let (file_name, bytes) = state
        .services
        .transfer
        .export_scope_items(&user, project_id)
        .await?;
    Ok(file_response(&file_name, XLSX_CONTENT_TYPE, bytes))
}
