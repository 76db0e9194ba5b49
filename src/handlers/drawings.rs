use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use super::common::created_response;
use crate::auth::AuthUser;
use crate::entities::{drawing, drawing_revision};
use crate::errors::ServiceError;
use crate::services::drawings::{
    ClientDecisionRequest, DrawingView, OverrideRequest, UploadDrawingRequest,
};
use crate::{ApiResponse, ApiResult, AppState};

/// Drawing state, revision history and the actions currently allowed
#[utoipa::path(
    get,
    path = "/api/v1/scope-items/{id}/drawing",
    params(("id" = Uuid, Path, description = "Scope item ID")),
    responses(
        (status = 200, description = "Drawing view", body = ApiResponse<DrawingView>),
        (status = 400, description = "Item is on the procurement path", body = crate::errors::ErrorResponse),
        (status = 404, description = "Scope item not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Drawings"
)]
pub async fn get_item_drawing(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
    user: AuthUser,
) -> ApiResult<DrawingView> {
    let view = state.services.drawings.for_item(&user, item_id).await?;
    Ok(Json(ApiResponse::success(view)))
}

/// Upload a new drawing revision
#[utoipa::path(
    post,
    path = "/api/v1/scope-items/{id}/drawing/revisions",
    params(("id" = Uuid, Path, description = "Scope item ID")),
    request_body = UploadDrawingRequest,
    responses(
        (status = 201, description = "Revision recorded", body = ApiResponse<drawing::Model>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 409, description = "Upload not allowed in current status", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Drawings"
)]
pub async fn upload_revision(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
    user: AuthUser,
    Json(request): Json<UploadDrawingRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let drawing = state.services.drawings.upload(&user, item_id, request).await?;
    Ok(created_response(drawing))
}

/// Approve a drawing without client sign-off
#[utoipa::path(
    post,
    path = "/api/v1/scope-items/{id}/drawing/override",
    params(("id" = Uuid, Path, description = "Scope item ID")),
    request_body = OverrideRequest,
    responses(
        (status = 200, description = "Drawing approved by override", body = ApiResponse<drawing::Model>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 409, description = "Drawing already approved", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Drawings"
)]
pub async fn override_drawing(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
    user: AuthUser,
    Json(request): Json<OverrideRequest>,
) -> ApiResult<drawing::Model> {
    let drawing = state
        .services
        .drawings
        .override_approval(&user, item_id, request)
        .await?;
    Ok(Json(ApiResponse::success(drawing)))
}

/// Revision history, oldest first
#[utoipa::path(
    get,
    path = "/api/v1/drawings/{id}/revisions",
    params(("id" = Uuid, Path, description = "Drawing ID")),
    responses(
        (status = 200, description = "Revisions", body = ApiResponse<Vec<drawing_revision::Model>>),
        (status = 404, description = "Drawing not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Drawings"
)]
pub async fn list_revisions(
    State(state): State<AppState>,
    Path(drawing_id): Path<Uuid>,
    user: AuthUser,
) -> ApiResult<Vec<drawing_revision::Model>> {
    let revisions = state.services.drawings.revisions(&user, drawing_id).await?;
    Ok(Json(ApiResponse::success(revisions)))
}

/// Send the current revision to the client
#[utoipa::path(
    post,
    path = "/api/v1/drawings/{id}/send",
    params(("id" = Uuid, Path, description = "Drawing ID")),
    responses(
        (status = 200, description = "Drawing sent", body = ApiResponse<drawing::Model>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 409, description = "Nothing uploaded to send", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Drawings"
)]
pub async fn send_drawing(
    State(state): State<AppState>,
    Path(drawing_id): Path<Uuid>,
    user: AuthUser,
) -> ApiResult<drawing::Model> {
    let drawing = state.services.drawings.send_to_client(&user, drawing_id).await?;
    Ok(Json(ApiResponse::success(drawing)))
}

/// Record the client's decision on a drawing
#[utoipa::path(
    post,
    path = "/api/v1/drawings/{id}/decision",
    params(("id" = Uuid, Path, description = "Drawing ID")),
    request_body = ClientDecisionRequest,
    responses(
        (status = 200, description = "Decision recorded", body = ApiResponse<drawing::Model>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 409, description = "Drawing is not awaiting a decision", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Drawings"
)]
pub async fn record_decision(
    State(state): State<AppState>,
    Path(drawing_id): Path<Uuid>,
    user: AuthUser,
    Json(request): Json<ClientDecisionRequest>,
) -> ApiResult<drawing::Model> {
    let drawing = state
        .services
        .drawings
        .record_decision(&user, drawing_id, request)
        .await?;
    Ok(Json(ApiResponse::success(drawing)))
}
