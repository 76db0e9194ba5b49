use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use super::common::{created_response, no_content_response};
use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::services::milestones::{CreateMilestoneRequest, MilestoneView, UpdateMilestoneRequest};
use crate::{ApiResponse, ApiResult, AppState};

/// List a project's milestones with overdue flags
#[utoipa::path(
    get,
    path = "/api/v1/projects/{id}/milestones",
    params(("id" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Milestones ordered by due date", body = ApiResponse<Vec<MilestoneView>>)
    ),
    security(("Bearer" = [])),
    tag = "Milestones"
)]
pub async fn list_milestones(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    user: AuthUser,
) -> ApiResult<Vec<MilestoneView>> {
    let milestones = state.services.milestones.list(&user, project_id).await?;
    Ok(Json(ApiResponse::success(milestones)))
}

/// Create a milestone
#[utoipa::path(
    post,
    path = "/api/v1/projects/{id}/milestones",
    params(("id" = Uuid, Path, description = "Project ID")),
    request_body = CreateMilestoneRequest,
    responses(
        (status = 201, description = "Milestone created", body = ApiResponse<MilestoneView>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Milestones"
)]
pub async fn create_milestone(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    user: AuthUser,
    Json(request): Json<CreateMilestoneRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let milestone = state
        .services
        .milestones
        .create(&user, project_id, request)
        .await?;
    Ok(created_response(milestone))
}

/// Update a milestone
#[utoipa::path(
    put,
    path = "/api/v1/milestones/{id}",
    params(("id" = Uuid, Path, description = "Milestone ID")),
    request_body = UpdateMilestoneRequest,
    responses(
        (status = 200, description = "Milestone updated", body = ApiResponse<MilestoneView>)
    ),
    security(("Bearer" = [])),
    tag = "Milestones"
)]
pub async fn update_milestone(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
    Json(request): Json<UpdateMilestoneRequest>,
) -> ApiResult<MilestoneView> {
    let milestone = state.services.milestones.update(&user, id, request).await?;
    Ok(Json(ApiResponse::success(milestone)))
}

/// Mark a milestone complete
#[utoipa::path(
    post,
    path = "/api/v1/milestones/{id}/complete",
    params(("id" = Uuid, Path, description = "Milestone ID")),
    responses(
        (status = 200, description = "Milestone completed", body = ApiResponse<MilestoneView>)
    ),
    security(("Bearer" = [])),
    tag = "Milestones"
)]
pub async fn complete_milestone(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
) -> ApiResult<MilestoneView> {
    let milestone = state.services.milestones.set_completed(&user, id, true).await?;
    Ok(Json(ApiResponse::success(milestone)))
}

/// Reopen a completed milestone
#[utoipa::path(
    post,
    path = "/api/v1/milestones/{id}/reopen",
    params(("id" = Uuid, Path, description = "Milestone ID")),
    responses(
        (status = 200, description = "Milestone reopened", body = ApiResponse<MilestoneView>)
    ),
    security(("Bearer" = [])),
    tag = "Milestones"
)]
pub async fn reopen_milestone(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
) -> ApiResult<MilestoneView> {
    let milestone = state.services.milestones.set_completed(&user, id, false).await?;
    Ok(Json(ApiResponse::success(milestone)))
}

/// Soft-delete a milestone
#[utoipa::path(
    delete,
    path = "/api/v1/milestones/{id}",
    params(("id" = Uuid, Path, description = "Milestone ID")),
    responses((status = 204, description = "Milestone deleted")),
    security(("Bearer" = [])),
    tag = "Milestones"
)]
pub async fn delete_milestone(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.milestones.delete(&user, id).await?;
    Ok(no_content_response())
}
