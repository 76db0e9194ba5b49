//! Millwork API library
//!
//! Project management backend for contract furniture manufacturing: scope
//! items, shop drawings, material samples, milestones, reports and snagging.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod excel;
pub mod handlers;
pub mod metrics;
pub mod middleware_helpers;
pub mod migrator;
pub mod notifications;
pub mod openapi;
pub mod pdf;
pub mod services;
pub mod storage;
pub mod telemetry;
pub mod workflow;

use axum::{
    extract::DefaultBodyLimit,
    response::Json,
    routing::{delete, get, post, put},
    Extension, Router,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer};
use utoipa::ToSchema;

use crate::auth::{AuthRouterExt, AuthService, Capability};
use crate::db::DbPool;

/// Largest spreadsheet accepted by the import endpoint.
pub const MAX_IMPORT_BYTES: usize = 10 * 1024 * 1024;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: telemetry::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// `/api/v1` routes. Each group is gated on the capability its writes need;
/// services re-check capabilities and project membership.
pub fn api_v1_routes() -> Router<AppState> {
    use handlers::{
        activity, dashboard, drawings, materials, milestones, notifications, projects, reports,
        scope_items, snagging, storage,
    };

    let reads = Router::new()
        .route("/dashboard", get(dashboard::get_dashboard))
        .route("/projects", get(projects::list_projects))
        .route("/projects/:id", get(projects::get_project))
        .route("/projects/:id/assignments", get(projects::list_assignments))
        .route("/projects/:id/scope-items", get(scope_items::list_scope_items))
        .route(
            "/projects/:id/scope-items/export",
            get(scope_items::export_scope_items),
        )
        .route(
            "/projects/:id/scope-items/bulk",
            post(scope_items::bulk_update),
        )
        .route("/projects/:id/materials", get(materials::list_materials))
        .route("/projects/:id/milestones", get(milestones::list_milestones))
        .route("/projects/:id/reports", get(reports::list_reports))
        .route("/projects/:id/snags", get(snagging::list_snags))
        .route("/projects/:id/activity", get(activity::project_activity))
        .route("/projects/:id/upload-path", get(storage::upload_path))
        .route("/scope-items/:id", get(scope_items::get_scope_item))
        .route("/scope-items/:id/drawing", get(drawings::get_item_drawing))
        .route("/drawings/:id/revisions", get(drawings::list_revisions))
        .route("/materials/:id", get(materials::get_material))
        .route("/reports/:id", get(reports::get_report))
        .route("/reports/:id/pdf", get(reports::report_pdf))
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/:id/read", post(notifications::mark_read))
        .route("/notifications/read-all", post(notifications::mark_all_read))
        .with_auth();

    let project_admin = Router::new()
        .route("/projects", post(projects::create_project))
        .route(
            "/projects/:id",
            put(projects::update_project).delete(projects::delete_project),
        )
        .route("/projects/:id/assignments", post(projects::assign_user))
        .route(
            "/projects/:id/assignments/:user_id",
            delete(projects::unassign_user),
        )
        .with_capability(Capability::ManageProjects);

    let scope_writes = Router::new()
        .route(
            "/projects/:id/scope-items",
            post(scope_items::create_scope_item),
        )
        .route(
            "/scope-items/:id",
            put(scope_items::update_scope_item).delete(scope_items::delete_scope_item),
        )
        .with_capability(Capability::ManageScopeItems);

    let production = Router::new()
        .route("/scope-items/:id/progress", put(scope_items::update_progress))
        .with_capability(Capability::UpdateProduction);

    let import = Router::new()
        .route(
            "/projects/:id/scope-items/import",
            post(scope_items::import_scope_items),
        )
        .layer(DefaultBodyLimit::max(MAX_IMPORT_BYTES))
        .with_capability(Capability::ImportExport);

    let drawing_upload = Router::new()
        .route(
            "/scope-items/:id/drawing/revisions",
            post(drawings::upload_revision),
        )
        .with_capability(Capability::UploadDrawings);

    let drawing_send = Router::new()
        .route("/drawings/:id/send", post(drawings::send_drawing))
        .with_capability(Capability::SendDrawingsToClient);

    let drawing_decision = Router::new()
        .route("/drawings/:id/decision", post(drawings::record_decision))
        .with_capability(Capability::RecordClientDecision);

    let drawing_override = Router::new()
        .route(
            "/scope-items/:id/drawing/override",
            post(drawings::override_drawing),
        )
        .with_capability(Capability::OverrideDrawing);

    let material_writes = Router::new()
        .route("/projects/:id/materials", post(materials::create_material))
        .route(
            "/materials/:id",
            put(materials::update_material).delete(materials::delete_material),
        )
        .route("/materials/:id/items", post(materials::link_items))
        .route(
            "/materials/:id/items/:item_id",
            delete(materials::unlink_item),
        )
        .route("/materials/:id/send", post(materials::send_material))
        .with_capability(Capability::ManageMaterials);

    let material_decision = Router::new()
        .route("/materials/:id/decision", post(materials::decide_material))
        .with_capability(Capability::DecideMaterial);

    let milestone_writes = Router::new()
        .route(
            "/projects/:id/milestones",
            post(milestones::create_milestone),
        )
        .route(
            "/milestones/:id",
            put(milestones::update_milestone).delete(milestones::delete_milestone),
        )
        .route("/milestones/:id/complete", post(milestones::complete_milestone))
        .route("/milestones/:id/reopen", post(milestones::reopen_milestone))
        .with_capability(Capability::ManageMilestones);

    let report_writes = Router::new()
        .route("/projects/:id/reports", post(reports::create_report))
        .route(
            "/reports/:id",
            put(reports::update_report).delete(reports::delete_report),
        )
        .route(
            "/reports/:id/lines",
            post(reports::add_line).put(reports::replace_lines),
        )
        .route("/reports/:id/lines/reorder", post(reports::reorder_lines))
        .route(
            "/reports/:id/lines/:line_id",
            put(reports::update_line).delete(reports::delete_line),
        )
        .with_capability(Capability::ManageReports);

    let report_publishing = Router::new()
        .route("/reports/:id/publish", post(reports::publish_report))
        .route("/reports/:id/unpublish", post(reports::unpublish_report))
        .with_capability(Capability::PublishReports);

    let snag_writes = Router::new()
        .route("/projects/:id/snags", post(snagging::create_snag))
        .route(
            "/snags/:id",
            put(snagging::update_snag).delete(snagging::delete_snag),
        )
        .route("/snags/:id/resolve", post(snagging::resolve_snag))
        .route("/snags/:id/reopen", post(snagging::reopen_snag))
        .with_capability(Capability::ManageSnagging);

    Router::new()
        .merge(reads)
        .merge(project_admin)
        .merge(scope_writes)
        .merge(production)
        .merge(import)
        .merge(drawing_upload)
        .merge(drawing_send)
        .merge(drawing_decision)
        .merge(drawing_override)
        .merge(material_writes)
        .merge(material_decision)
        .merge(milestone_writes)
        .merge(report_writes)
        .merge(report_publishing)
        .merge(snag_writes)
}

async fn api_status() -> ApiResult<Value> {
    Ok(Json(ApiResponse::success(json!({
        "status": "ok",
        "service": "millwork-api",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
    }))))
}

/// Full HTTP application: probes, metrics, docs and the v1 API, wrapped in
/// the shared middleware stack.
pub fn app(state: AppState, auth: Arc<AuthService>, cors: CorsLayer) -> Router {
    Router::<AppState>::new()
        .route("/", get(|| async { "millwork-api up" }))
        .route("/status", get(api_status))
        .route("/metrics", get(metrics::metrics_handler))
        .merge(handlers::health::health_routes())
        .nest("/api/v1", api_v1_routes())
        .merge(openapi::swagger_ui())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(telemetry::configure_http_tracing())
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(Extension(auth))
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn success_response_includes_request_metadata() {
        let response = telemetry::scope_request_id(telemetry::RequestId::new("meta-123"), async {
            ApiResponse::success("ok")
        })
        .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-123"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }

    #[test]
    fn message_is_optional() {
        let response = ApiResponse::success(3).with_message("imported");
        assert_eq!(response.message.as_deref(), Some("imported"));
        assert!(response.success);
    }
}
