use axum::{extract::State, Json};

use crate::auth::AuthUser;
use crate::services::dashboard::DashboardBundle;
use crate::{ApiResponse, ApiResult, AppState};

/// Role-shaped dashboard for the caller
///
/// Sections that fail to load come back empty instead of failing the request.
#[utoipa::path(
    get,
    path = "/api/v1/dashboard",
    responses(
        (status = 200, description = "Dashboard bundle", body = ApiResponse<DashboardBundle>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Dashboard"
)]
pub async fn get_dashboard(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<DashboardBundle> {
    let bundle = state.services.dashboard.for_user(&user).await?;
    Ok(Json(ApiResponse::success(bundle)))
}
