use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use super::common::{created_response, no_content_response};
use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::services::materials::{
    CreateMaterialRequest, LinkItemsRequest, MaterialDecisionRequest, MaterialView,
    UpdateMaterialRequest,
};
use crate::{ApiResponse, ApiResult, AppState};

/// List a project's materials
#[utoipa::path(
    get,
    path = "/api/v1/projects/{id}/materials",
    params(("id" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Materials", body = ApiResponse<Vec<MaterialView>>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Materials"
)]
pub async fn list_materials(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    user: AuthUser,
) -> ApiResult<Vec<MaterialView>> {
    let materials = state.services.materials.list(&user, project_id).await?;
    Ok(Json(ApiResponse::success(materials)))
}

/// Create a material
#[utoipa::path(
    post,
    path = "/api/v1/projects/{id}/materials",
    params(("id" = Uuid, Path, description = "Project ID")),
    request_body = CreateMaterialRequest,
    responses(
        (status = 201, description = "Material created", body = ApiResponse<MaterialView>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Materials"
)]
pub async fn create_material(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    user: AuthUser,
    Json(request): Json<CreateMaterialRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let material = state
        .services
        .materials
        .create(&user, project_id, request)
        .await?;
    Ok(created_response(material))
}

/// Get a material
#[utoipa::path(
    get,
    path = "/api/v1/materials/{id}",
    params(("id" = Uuid, Path, description = "Material ID")),
    responses(
        (status = 200, description = "Material", body = ApiResponse<MaterialView>),
        (status = 404, description = "Material not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Materials"
)]
pub async fn get_material(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
) -> ApiResult<MaterialView> {
    let material = state.services.materials.get(&user, id).await?;
    Ok(Json(ApiResponse::success(material)))
}

/// Update an undecided material
#[utoipa::path(
    put,
    path = "/api/v1/materials/{id}",
    params(("id" = Uuid, Path, description = "Material ID")),
    request_body = UpdateMaterialRequest,
    responses(
        (status = 200, description = "Material updated", body = ApiResponse<MaterialView>),
        (status = 409, description = "Material already decided", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Materials"
)]
pub async fn update_material(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
    Json(request): Json<UpdateMaterialRequest>,
) -> ApiResult<MaterialView> {
    let material = state.services.materials.update(&user, id, request).await?;
    Ok(Json(ApiResponse::success(material)))
}

/// Soft-delete a material
#[utoipa::path(
    delete,
    path = "/api/v1/materials/{id}",
    params(("id" = Uuid, Path, description = "Material ID")),
    responses(
        (status = 204, description = "Material deleted"),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Materials"
)]
pub async fn delete_material(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.materials.delete(&user, id).await?;
    Ok(no_content_response())
}

/// Link scope items to a material
#[utoipa::path(
    post,
    path = "/api/v1/materials/{id}/items",
    params(("id" = Uuid, Path, description = "Material ID")),
    request_body = LinkItemsRequest,
    responses(
        (status = 200, description = "Links updated", body = ApiResponse<MaterialView>),
        (status = 400, description = "Item belongs to another project", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Materials"
)]
pub async fn link_items(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
    Json(request): Json<LinkItemsRequest>,
) -> ApiResult<MaterialView> {
    let material = state.services.materials.link_items(&user, id, request).await?;
    Ok(Json(ApiResponse::success(material)))
}

/// Unlink a scope item from a material
#[utoipa::path(
    delete,
    path = "/api/v1/materials/{id}/items/{item_id}",
    params(
        ("id" = Uuid, Path, description = "Material ID"),
        ("item_id" = Uuid, Path, description = "Scope item ID"),
    ),
    responses(
        (status = 200, description = "Link removed", body = ApiResponse<MaterialView>)
    ),
    security(("Bearer" = [])),
    tag = "Materials"
)]
pub async fn unlink_item(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
    user: AuthUser,
) -> ApiResult<MaterialView> {
    let material = state.services.materials.unlink_item(&user, id, item_id).await?;
    Ok(Json(ApiResponse::success(material)))
}

/// Send a material sample to the client
#[utoipa::path(
    post,
    path = "/api/v1/materials/{id}/send",
    params(("id" = Uuid, Path, description = "Material ID")),
    responses(
        (status = 200, description = "Material sent", body = ApiResponse<MaterialView>),
        (status = 409, description = "Material is not pending", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Materials"
)]
pub async fn send_material(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
) -> ApiResult<MaterialView> {
    let material = state.services.materials.send_to_client(&user, id).await?;
    Ok(Json(ApiResponse::success(material)))
}

/// Approve or reject a material
#[utoipa::path(
    post,
    path = "/api/v1/materials/{id}/decision",
    params(("id" = Uuid, Path, description = "Material ID")),
    request_body = MaterialDecisionRequest,
    responses(
        (status = 200, description = "Decision recorded", body = ApiResponse<MaterialView>),
        (status = 403, description = "Direct decision needs PM rights", body = crate::errors::ErrorResponse),
        (status = 409, description = "Material already decided", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Materials"
)]
pub async fn decide_material(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
    Json(request): Json<MaterialDecisionRequest>,
) -> ApiResult<MaterialView> {
    let material = state.services.materials.decide(&user, id, request).await?;
    Ok(Json(ApiResponse::success(material)))
}
