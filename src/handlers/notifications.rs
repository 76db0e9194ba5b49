use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::entities::notification;
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NotificationFilter {
    #[serde(default)]
    pub unread_only: bool,
    /// Maximum rows to return (1-200, default 50)
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_limit() -> u64 {
    50
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MarkedRead {
    pub updated: u64,
}

/// The caller's in-app notifications, newest first
#[utoipa::path(
    get,
    path = "/api/v1/notifications",
    params(NotificationFilter),
    responses(
        (status = 200, description = "Notifications", body = ApiResponse<Vec<notification::Model>>)
    ),
    security(("Bearer" = [])),
    tag = "Notifications"
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    Query(filter): Query<NotificationFilter>,
    user: AuthUser,
) -> ApiResult<Vec<notification::Model>> {
    let rows = state
        .services
        .notifications
        .list(&user, filter.unread_only, filter.limit)
        .await?;
    Ok(Json(ApiResponse::success(rows)))
}

#[utoipa::path(
    post,
    path = "/api/v1/notifications/{id}/read",
    params(("id" = Uuid, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Marked read", body = ApiResponse<notification::Model>),
        (status = 404, description = "Not the caller's notification", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Notifications"
)]
pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
) -> ApiResult<notification::Model> {
    let row = state.services.notifications.mark_read(&user, id).await?;
    Ok(Json(ApiResponse::success(row)))
}

#[utoipa::path(
    post,
    path = "/api/v1/notifications/read-all",
    responses((status = 200, description = "Rows updated", body = ApiResponse<MarkedRead>)),
    security(("Bearer" = [])),
    tag = "Notifications"
)]
pub async fn mark_all_read(State(state): State<AppState>, user: AuthUser) -> ApiResult<MarkedRead> {
    let updated = state.services.notifications.mark_all_read(&user).await?;
    Ok(Json(ApiResponse::success(MarkedRead { updated })))
}
