use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::storage::{object_path, StorageBucket};
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UploadPathQuery {
    pub bucket: StorageBucket,
    pub entity_id: Uuid,
    pub file_name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadPath {
    pub bucket: StorageBucket,
    pub path: String,
}

/// Object key the client should upload to before saving the URL on a row
#[utoipa::path(
    get,
    path = "/api/v1/projects/{id}/upload-path",
    params(("id" = Uuid, Path, description = "Project ID"), UploadPathQuery),
    responses(
        (status = 200, description = "Storage path", body = ApiResponse<UploadPath>),
        (status = 404, description = "Project not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Storage"
)]
pub async fn upload_path(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Query(query): Query<UploadPathQuery>,
    user: AuthUser,
) -> ApiResult<UploadPath> {
    state.services.access.ensure(&user, project_id).await?;
    let path = object_path(
        query.bucket,
        project_id,
        query.entity_id,
        &query.file_name,
        chrono::Utc::now(),
    );
    Ok(Json(ApiResponse::success(UploadPath {
        bucket: query.bucket,
        path,
    })))
}
