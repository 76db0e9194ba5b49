use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use super::common::LimitParams;
use crate::auth::AuthUser;
use crate::entities::activity_log;
use crate::{ApiResponse, ApiResult, AppState};

/// Project activity feed, newest first
#[utoipa::path(
    get,
    path = "/api/v1/projects/{id}/activity",
    params(("id" = Uuid, Path, description = "Project ID"), LimitParams),
    responses(
        (status = 200, description = "Activity entries", body = ApiResponse<Vec<activity_log::Model>>),
        (status = 404, description = "Project not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Activity"
)]
pub async fn project_activity(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Query(params): Query<LimitParams>,
    user: AuthUser,
) -> ApiResult<Vec<activity_log::Model>> {
    let rows = state
        .services
        .activity
        .for_project(&user, project_id, params.clamped())
        .await?;
    Ok(Json(ApiResponse::success(rows)))
}
