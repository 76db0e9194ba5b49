use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use super::common::{created_response, no_content_response};
use crate::auth::AuthUser;
use crate::entities::{project, project_assignment};
use crate::errors::ServiceError;
use crate::services::projects::{
    AssignUserRequest, AssignmentView, CreateProjectRequest, UpdateProjectRequest,
};
use crate::{ApiResponse, ApiResult, AppState};

/// List visible projects
#[utoipa::path(
    get,
    path = "/api/v1/projects",
    responses(
        (status = 200, description = "Projects the caller can see", body = ApiResponse<Vec<project::Model>>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Projects"
)]
pub async fn list_projects(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Vec<project::Model>> {
    let projects = state.services.projects.list(&user).await?;
    Ok(Json(ApiResponse::success(projects)))
}

/// Get a project
#[utoipa::path(
    get,
    path = "/api/v1/projects/{id}",
    params(("id" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Project", body = ApiResponse<project::Model>),
        (status = 403, description = "Not assigned to this project", body = crate::errors::ErrorResponse),
        (status = 404, description = "Project not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Projects"
)]
pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
) -> ApiResult<project::Model> {
    let project = state.services.projects.get(&user, id).await?;
    Ok(Json(ApiResponse::success(project)))
}

/// Create a project
#[utoipa::path(
    post,
    path = "/api/v1/projects",
    request_body = CreateProjectRequest,
    responses(
        (status = 201, description = "Project created", body = ApiResponse<project::Model>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 409, description = "Project code already used", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Projects"
)]
pub async fn create_project(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateProjectRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let project = state.services.projects.create(&user, request).await?;
    Ok(created_response(project))
}

/// Update a project
#[utoipa::path(
    put,
    path = "/api/v1/projects/{id}",
    params(("id" = Uuid, Path, description = "Project ID")),
    request_body = UpdateProjectRequest,
    responses(
        (status = 200, description = "Project updated", body = ApiResponse<project::Model>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Project not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Projects"
)]
pub async fn update_project(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
    Json(request): Json<UpdateProjectRequest>,
) -> ApiResult<project::Model> {
    let project = state.services.projects.update(&user, id, request).await?;
    Ok(Json(ApiResponse::success(project)))
}

/// Soft-delete a project
#[utoipa::path(
    delete,
    path = "/api/v1/projects/{id}",
    params(("id" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 204, description = "Project deleted"),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Project not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Projects"
)]
pub async fn delete_project(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.projects.delete(&user, id).await?;
    Ok(no_content_response())
}

/// List users assigned to a project
#[utoipa::path(
    get,
    path = "/api/v1/projects/{id}/assignments",
    params(("id" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Assigned users", body = ApiResponse<Vec<AssignmentView>>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Projects"
)]
pub async fn list_assignments(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
) -> ApiResult<Vec<AssignmentView>> {
    let assignments = state.services.projects.assignments(&user, id).await?;
    Ok(Json(ApiResponse::success(assignments)))
}

/// Assign a user to a project
#[utoipa::path(
    post,
    path = "/api/v1/projects/{id}/assignments",
    params(("id" = Uuid, Path, description = "Project ID")),
    request_body = AssignUserRequest,
    responses(
        (status = 201, description = "User assigned", body = ApiResponse<project_assignment::Model>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 409, description = "Already assigned", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Projects"
)]
pub async fn assign_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
    Json(request): Json<AssignUserRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let assignment = state.services.projects.assign(&user, id, request).await?;
    Ok(created_response(assignment))
}

/// Remove a user from a project
#[utoipa::path(
    delete,
    path = "/api/v1/projects/{id}/assignments/{user_id}",
    params(
        ("id" = Uuid, Path, description = "Project ID"),
        ("user_id" = Uuid, Path, description = "User ID"),
    ),
    responses(
        (status = 204, description = "User unassigned"),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Assignment not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Projects"
)]
pub async fn unassign_user(
    State(state): State<AppState>,
    Path((id, member_id)): Path<(Uuid, Uuid)>,
    user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.projects.unassign(&user, id, member_id).await?;
    Ok(no_content_response())
}
