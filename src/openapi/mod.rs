use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Millwork API",
        version = "1.0.0",
        description = r#"
# Millwork Project Management API

Backend for contract furniture and joinery projects: scope items, shop
drawings, material samples, milestones, site reports and snagging.

## Authentication

Every `/api/v1` endpoint expects a bearer token from the identity provider:

```
Authorization: Bearer <jwt>
```

The token's `role` claim decides what the caller may do. Clients never see
cost fields; only admin and management see financial totals.

## Errors

Failures share one body shape:

```json
{
  "error": "Conflict",
  "message": "Invalid transition: cannot send_to_client a drawing in status not_uploaded",
  "request_id": "4f1c...",
  "timestamp": "2026-01-01T00:00:00Z"
}
```
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers((url = "http://localhost:8080", description = "Local development")),
    modifiers(&SecurityAddon),
    tags(
        (name = "Projects", description = "Projects and team assignments"),
        (name = "Scope Items", description = "Bill of scope, progress and spreadsheet transfer"),
        (name = "Drawings", description = "Shop drawing approval workflow"),
        (name = "Materials", description = "Material sample approval workflow"),
        (name = "Milestones", description = "Project milestones"),
        (name = "Reports", description = "Site and progress reports"),
        (name = "Snagging", description = "Defect tracking"),
        (name = "Dashboard", description = "Role-shaped overview"),
        (name = "Notifications", description = "In-app notifications"),
        (name = "Activity", description = "Project activity feed"),
        (name = "Storage", description = "Upload path conventions"),
        (name = "Health", description = "Health check endpoints")
    ),
    paths(
        crate::handlers::projects::list_projects,
        crate::handlers::projects::get_project,
        crate::handlers::projects::create_project,
        crate::handlers::projects::update_project,
        crate::handlers::projects::delete_project,
        crate::handlers::projects::list_assignments,
        crate::handlers::projects::assign_user,
        crate::handlers::projects::unassign_user,

        crate::handlers::scope_items::list_scope_items,
        crate::handlers::scope_items::get_scope_item,
        crate::handlers::scope_items::create_scope_item,
        crate::handlers::scope_items::update_scope_item,
        crate::handlers::scope_items::update_progress,
        crate::handlers::scope_items::delete_scope_item,
        crate::handlers::scope_items::bulk_update,
        crate::handlers::scope_items::import_scope_items,
        crate::handlers::scope_items::export_scope_items,

        crate::handlers::drawings::get_item_drawing,
        crate::handlers::drawings::upload_revision,
        crate::handlers::drawings::override_drawing,
        crate::handlers::drawings::list_revisions,
        crate::handlers::drawings::send_drawing,
        crate::handlers::drawings::record_decision,

        crate::handlers::materials::list_materials,
        crate::handlers::materials::create_material,
        crate::handlers::materials::get_material,
        crate::handlers::materials::update_material,
        crate::handlers::materials::delete_material,
        crate::handlers::materials::link_items,
        crate::handlers::materials::unlink_item,
        crate::handlers::materials::send_material,
        crate::handlers::materials::decide_material,

        crate::handlers::milestones::list_milestones,
        crate::handlers::milestones::create_milestone,
        crate::handlers::milestones::update_milestone,
        crate::handlers::milestones::complete_milestone,
        crate::handlers::milestones::reopen_milestone,
        crate::handlers::milestones::delete_milestone,

        crate::handlers::reports::list_reports,
        crate::handlers::reports::create_report,
        crate::handlers::reports::get_report,
        crate::handlers::reports::update_report,
        crate::handlers::reports::delete_report,
        crate::handlers::reports::add_line,
        crate::handlers::reports::replace_lines,
        crate::handlers::reports::update_line,
        crate::handlers::reports::delete_line,
        crate::handlers::reports::reorder_lines,
        crate::handlers::reports::publish_report,
        crate::handlers::reports::unpublish_report,
        crate::handlers::reports::report_pdf,

        crate::handlers::snagging::list_snags,
        crate::handlers::snagging::create_snag,
        crate::handlers::snagging::update_snag,
        crate::handlers::snagging::resolve_snag,
        crate::handlers::snagging::reopen_snag,
        crate::handlers::snagging::delete_snag,

        crate::handlers::dashboard::get_dashboard,
        crate::handlers::notifications::list_notifications,
        crate::handlers::notifications::mark_read,
        crate::handlers::notifications::mark_all_read,
        crate::handlers::activity::project_activity,
        crate::handlers::storage::upload_path,
        crate::handlers::health::liveness,
        crate::handlers::health::readiness,
    ),
    components(
        schemas(
            crate::ResponseMeta,
            crate::errors::ErrorResponse,
            crate::auth::Role,
            crate::storage::StorageBucket,

            crate::entities::project::Model,
            crate::entities::project::ProjectStatus,
            crate::entities::project_assignment::Model,
            crate::entities::scope_item::Model,
            crate::entities::scope_item::ScopeItemStatus,
            crate::entities::scope_item::ItemPath,
            crate::entities::drawing::Model,
            crate::entities::drawing_revision::Model,
            crate::entities::report::Model,
            crate::entities::report::ReportType,
            crate::entities::notification::Model,
            crate::entities::activity_log::Model,
            crate::workflow::drawing::DrawingStatus,
            crate::workflow::drawing::ClientDecision,
            crate::workflow::material::MaterialStatus,
            crate::workflow::material::MaterialDecision,

            crate::services::projects::CreateProjectRequest,
            crate::services::projects::UpdateProjectRequest,
            crate::services::projects::AssignUserRequest,
            crate::services::projects::AssignmentView,
            crate::services::scope_items::CreateScopeItemRequest,
            crate::services::scope_items::UpdateScopeItemRequest,
            crate::services::scope_items::UpdateProgressRequest,
            crate::services::scope_items::BulkItemUpdate,
            crate::services::scope_items::BulkUpdateRequest,
            crate::services::scope_items::BulkFailure,
            crate::services::scope_items::BulkOutcome,
            crate::excel::ImportReport,
            crate::excel::RowIssue,
            crate::services::drawings::UploadDrawingRequest,
            crate::services::drawings::ClientDecisionRequest,
            crate::services::drawings::OverrideRequest,
            crate::services::drawings::DrawingView,
            crate::services::materials::CreateMaterialRequest,
            crate::services::materials::UpdateMaterialRequest,
            crate::services::materials::MaterialDecisionRequest,
            crate::services::materials::LinkItemsRequest,
            crate::services::materials::MaterialView,
            crate::services::milestones::CreateMilestoneRequest,
            crate::services::milestones::UpdateMilestoneRequest,
            crate::services::milestones::MilestoneView,
            crate::services::reports::CreateReportRequest,
            crate::services::reports::UpdateReportRequest,
            crate::services::reports::ReportLineRequest,
            crate::services::reports::ReorderLinesRequest,
            crate::services::reports::ReportLineView,
            crate::services::reports::ReportView,
            crate::services::snagging::CreateSnagRequest,
            crate::services::snagging::UpdateSnagRequest,
            crate::services::snagging::SnagView,
            crate::services::dashboard::DashboardBundle,
            crate::services::dashboard::DashboardCounts,
            crate::services::dashboard::StatusCount,
            crate::services::dashboard::ProjectSummary,
            crate::services::dashboard::FinancialTotals,
            crate::services::dashboard::PendingApprovals,
            crate::services::dashboard::PendingDrawing,
            crate::services::dashboard::PendingMaterial,
            crate::services::dashboard::ActivityItem,
            crate::handlers::notifications::MarkedRead,
            crate::handlers::storage::UploadPath,
            crate::handlers::health::HealthResponse,
            crate::handlers::health::ComponentHealth,
            crate::handlers::health::ComponentStatus,
        )
    )
)]
pub struct ApiDocV1;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "Bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_workflow_paths() {
        let json = serde_json::to_string_pretty(&ApiDocV1::openapi()).unwrap();
        assert!(json.contains("Millwork API"));
        assert!(json.contains("/api/v1/drawings/{id}/decision"));
        assert!(json.contains("/api/v1/projects/{id}/scope-items/import"));
        assert!(json.contains("\"Bearer\""));
    }
}
