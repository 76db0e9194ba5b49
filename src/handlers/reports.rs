use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use super::common::{created_response, file_response, no_content_response};
use crate::auth::AuthUser;
use crate::entities::report;
use crate::errors::ServiceError;
use crate::services::reports::{
    CreateReportRequest, ReorderLinesRequest, ReportLineRequest, ReportView, UpdateReportRequest,
};
use crate::{ApiResponse, ApiResult, AppState};

/// List the reports visible to the caller
#[utoipa::path(
    get,
    path = "/api/v1/projects/{id}/reports",
    params(("id" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Reports", body = ApiResponse<Vec<report::Model>>)
    ),
    security(("Bearer" = [])),
    tag = "Reports"
)]
pub async fn list_reports(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    user: AuthUser,
) -> ApiResult<Vec<report::Model>> {
    let reports = state.services.reports.list(&user, project_id).await?;
    Ok(Json(ApiResponse::success(reports)))
}

/// Create a draft report
#[utoipa::path(
    post,
    path = "/api/v1/projects/{id}/reports",
    params(("id" = Uuid, Path, description = "Project ID")),
    request_body = CreateReportRequest,
    responses(
        (status = 201, description = "Report created", body = ApiResponse<ReportView>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Reports"
)]
pub async fn create_report(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    user: AuthUser,
    Json(request): Json<CreateReportRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let report = state
        .services
        .reports
        .create(&user, project_id, request)
        .await?;
    Ok(created_response(report))
}

/// Get a report with its lines
#[utoipa::path(
    get,
    path = "/api/v1/reports/{id}",
    params(("id" = Uuid, Path, description = "Report ID")),
    responses(
        (status = 200, description = "Report", body = ApiResponse<ReportView>),
        (status = 404, description = "Report not found or not visible", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Reports"
)]
pub async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
) -> ApiResult<ReportView> {
    let report = state.services.reports.get(&user, id).await?;
    Ok(Json(ApiResponse::success(report)))
}

/// Update report metadata
#[utoipa::path(
    put,
    path = "/api/v1/reports/{id}",
    params(("id" = Uuid, Path, description = "Report ID")),
    request_body = UpdateReportRequest,
    responses((status = 200, description = "Report updated", body = ApiResponse<ReportView>)),
    security(("Bearer" = [])),
    tag = "Reports"
)]
pub async fn update_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
    Json(request): Json<UpdateReportRequest>,
) -> ApiResult<ReportView> {
    let report = state.services.reports.update(&user, id, request).await?;
    Ok(Json(ApiResponse::success(report)))
}

/// Soft-delete a report
#[utoipa::path(
    delete,
    path = "/api/v1/reports/{id}",
    params(("id" = Uuid, Path, description = "Report ID")),
    responses((status = 204, description = "Report deleted")),
    security(("Bearer" = [])),
    tag = "Reports"
)]
pub async fn delete_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.reports.delete(&user, id).await?;
    Ok(no_content_response())
}

/// Append a line
#[utoipa::path(
    post,
    path = "/api/v1/reports/{id}/lines",
    params(("id" = Uuid, Path, description = "Report ID")),
    request_body = ReportLineRequest,
    responses((status = 201, description = "Line added", body = ApiResponse<ReportView>)),
    security(("Bearer" = [])),
    tag = "Reports"
)]
pub async fn add_line(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
    Json(request): Json<ReportLineRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let report = state.services.reports.add_line(&user, id, request).await?;
    Ok(created_response(report))
}

/// Replace every line at once
#[utoipa::path(
    put,
    path = "/api/v1/reports/{id}/lines",
    params(("id" = Uuid, Path, description = "Report ID")),
    request_body = Vec<ReportLineRequest>,
    responses((status = 200, description = "Lines replaced", body = ApiResponse<ReportView>)),
    security(("Bearer" = [])),
    tag = "Reports"
)]
pub async fn replace_lines(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
    Json(lines): Json<Vec<ReportLineRequest>>,
) -> ApiResult<ReportView> {
    let report = state.services.reports.replace_lines(&user, id, lines).await?;
    Ok(Json(ApiResponse::success(report)))
}

/// Update one line
#[utoipa::path(
    put,
    path = "/api/v1/reports/{id}/lines/{line_id}",
    params(
        ("id" = Uuid, Path, description = "Report ID"),
        ("line_id" = Uuid, Path, description = "Line ID"),
    ),
    request_body = ReportLineRequest,
    responses((status = 200, description = "Line updated", body = ApiResponse<ReportView>)),
    security(("Bearer" = [])),
    tag = "Reports"
)]
pub async fn update_line(
    State(state): State<AppState>,
    Path((id, line_id)): Path<(Uuid, Uuid)>,
    user: AuthUser,
    Json(request): Json<ReportLineRequest>,
) -> ApiResult<ReportView> {
    let report = state
        .services
        .reports
        .update_line(&user, id, line_id, request)
        .await?;
    Ok(Json(ApiResponse::success(report)))
}

/// Delete one line
#[utoipa::path(
    delete,
    path = "/api/v1/reports/{id}/lines/{line_id}",
    params(
        ("id" = Uuid, Path, description = "Report ID"),
        ("line_id" = Uuid, Path, description = "Line ID"),
    ),
    responses((status = 200, description = "Line removed", body = ApiResponse<ReportView>)),
    security(("Bearer" = [])),
    tag = "Reports"
)]
pub async fn delete_line(
    State(state): State<AppState>,
    Path((id, line_id)): Path<(Uuid, Uuid)>,
    user: AuthUser,
) -> ApiResult<ReportView> {
    let report = state.services.reports.delete_line(&user, id, line_id).await?;
    Ok(Json(ApiResponse::success(report)))
}

/// Reorder lines; the body must list every line exactly once
#[utoipa::path(
    post,
    path = "/api/v1/reports/{id}/lines/reorder",
    params(("id" = Uuid, Path, description = "Report ID")),
    request_body = ReorderLinesRequest,
    responses(
        (status = 200, description = "Lines reordered", body = ApiResponse<ReportView>),
        (status = 400, description = "Line set mismatch", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Reports"
)]
pub async fn reorder_lines(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
    Json(request): Json<ReorderLinesRequest>,
) -> ApiResult<ReportView> {
    let report = state.services.reports.reorder_lines(&user, id, request).await?;
    Ok(Json(ApiResponse::success(report)))
}

/// Publish a report
#[utoipa::path(
    post,
    path = "/api/v1/reports/{id}/publish",
    params(("id" = Uuid, Path, description = "Report ID")),
    responses(
        (status = 200, description = "Report published", body = ApiResponse<ReportView>),
        (status = 409, description = "Already published", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Reports"
)]
pub async fn publish_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
) -> ApiResult<ReportView> {
    let report = state.services.reports.publish(&user, id).await?;
    Ok(Json(ApiResponse::success(report)))
}

/// Return a published report to draft
#[utoipa::path(
    post,
    path = "/api/v1/reports/{id}/unpublish",
    params(("id" = Uuid, Path, description = "Report ID")),
    responses((status = 200, description = "Report unpublished", body = ApiResponse<ReportView>)),
    security(("Bearer" = [])),
    tag = "Reports"
)]
pub async fn unpublish_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
) -> ApiResult<ReportView> {
    let report = state.services.reports.unpublish(&user, id).await?;
    Ok(Json(ApiResponse::success(report)))
}

/// Download the report as PDF
#[utoipa::path(
    get,
    path = "/api/v1/reports/{id}/pdf",
    params(("id" = Uuid, Path, description = "Report ID")),
    responses(
        (status = 200, description = "PDF document", content_type = "application/pdf", body = Vec<u8>),
        (status = 404, description = "Report not found or not visible", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Reports"
)]
pub async fn report_pdf(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    let (file_name, bytes) = state.services.reports.render_pdf(&user, id).await?;
    Ok(file_response(&file_name, "application/pdf", bytes))
}
