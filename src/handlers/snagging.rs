use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use super::common::{created_response, no_content_response};
use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::services::snagging::{CreateSnagRequest, SnagView, UpdateSnagRequest};
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SnagFilter {
    /// Only unresolved snags
    #[serde(default)]
    pub open_only: bool,
}

/// List a project's snags
#[utoipa::path(
    get,
    path = "/api/v1/projects/{id}/snags",
    params(("id" = Uuid, Path, description = "Project ID"), SnagFilter),
    responses(
        (status = 200, description = "Snags, newest first", body = ApiResponse<Vec<SnagView>>)
    ),
    security(("Bearer" = [])),
    tag = "Snagging"
)]
pub async fn list_snags(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Query(filter): Query<SnagFilter>,
    user: AuthUser,
) -> ApiResult<Vec<SnagView>> {
    let snags = state
        .services
        .snagging
        .list(&user, project_id, filter.open_only)
        .await?;
    Ok(Json(ApiResponse::success(snags)))
}

/// Report a snag
#[utoipa::path(
    post,
    path = "/api/v1/projects/{id}/snags",
    params(("id" = Uuid, Path, description = "Project ID")),
    request_body = CreateSnagRequest,
    responses(
        (status = 201, description = "Snag recorded", body = ApiResponse<SnagView>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Snagging"
)]
pub async fn create_snag(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    user: AuthUser,
    Json(request): Json<CreateSnagRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let snag = state
        .services
        .snagging
        .create(&user, project_id, request)
        .await?;
    Ok(created_response(snag))
}

/// Update a snag
#[utoipa::path(
    put,
    path = "/api/v1/snags/{id}",
    params(("id" = Uuid, Path, description = "Snag ID")),
    request_body = UpdateSnagRequest,
    responses((status = 200, description = "Snag updated", body = ApiResponse<SnagView>)),
    security(("Bearer" = [])),
    tag = "Snagging"
)]
pub async fn update_snag(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
    Json(request): Json<UpdateSnagRequest>,
) -> ApiResult<SnagView> {
    let snag = state.services.snagging.update(&user, id, request).await?;
    Ok(Json(ApiResponse::success(snag)))
}

/// Mark a snag resolved
#[utoipa::path(
    post,
    path = "/api/v1/snags/{id}/resolve",
    params(("id" = Uuid, Path, description = "Snag ID")),
    responses((status = 200, description = "Snag resolved", body = ApiResponse<SnagView>)),
    security(("Bearer" = [])),
    tag = "Snagging"
)]
pub async fn resolve_snag(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
) -> ApiResult<SnagView> {
    let snag = state.services.snagging.set_resolved(&user, id, true).await?;
    Ok(Json(ApiResponse::success(snag)))
}

/// Reopen a resolved snag
#[utoipa::path(
    post,
    path = "/api/v1/snags/{id}/reopen",
    params(("id" = Uuid, Path, description = "Snag ID")),
    responses((status = 200, description = "Snag reopened", body = ApiResponse<SnagView>)),
    security(("Bearer" = [])),
    tag = "Snagging"
)]
pub async fn reopen_snag(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
) -> ApiResult<SnagView> {
    let snag = state.services.snagging.set_resolved(&user, id, false).await?;
    Ok(Json(ApiResponse::success(snag)))
}

/// Soft-delete a snag
#[utoipa::path(
    delete,
    path = "/api/v1/snags/{id}",
    params(("id" = Uuid, Path, description = "Snag ID")),
    responses((status = 204, description = "Snag deleted")),
    security(("Bearer" = [])),
    tag = "Snagging"
)]
pub async fn delete_snag(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.snagging.delete(&user, id).await?;
    Ok(no_content_response())
}
