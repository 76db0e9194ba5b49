//! Removals through the API flag rows instead of deleting them.

mod common;

use assert_matches::assert_matches;
use common::TestApp;
use millwork_api::{
    auth::Role,
    entities::{item_material, project_assignment, report::ReportType, report_line},
    errors::ServiceError,
    services::materials::{CreateMaterialRequest, LinkItemsRequest},
    services::projects::AssignUserRequest,
    services::reports::{CreateReportRequest, ReportLineRequest},
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

fn line(title: &str) -> ReportLineRequest {
    ReportLineRequest {
        title: title.into(),
        description: None,
        photo_urls: vec![],
        line_order: None,
    }
}

#[tokio::test]
async fn unassigning_keeps_a_flagged_row_and_revokes_access() {
    let app = TestApp::new().await;
    let project = app.project("SD-100").await;
    let admin = app.admin().await;
    let pm = app.member(project.id, Role::Pm).await;
    let projects = &app.state.services.projects;

    assert!(projects.get(&pm, project.id).await.is_ok());
    projects.unassign(&admin, project.id, pm.user_id).await.unwrap();

    let row = project_assignment::Entity::find()
        .filter(project_assignment::Column::ProjectId.eq(project.id))
        .filter(project_assignment::Column::UserId.eq(pm.user_id))
        .one(app.state.db.as_ref())
        .await
        .unwrap()
        .expect("assignment row is kept");
    assert!(row.is_deleted);
    assert!(row.deleted_at.is_some());

    assert_matches!(projects.get(&pm, project.id).await, Err(ServiceError::Forbidden(_)));
    assert!(projects
        .assignments(&admin, project.id)
        .await
        .unwrap()
        .iter()
        .all(|a| a.user_id != pm.user_id));
    assert_matches!(
        projects.unassign(&admin, project.id, pm.user_id).await,
        Err(ServiceError::NotFound(_))
    );

    // Re-assigning revives the same row.
    let revived = projects
        .assign(&admin, project.id, AssignUserRequest { user_id: pm.user_id })
        .await
        .unwrap();
    assert_eq!(revived.id, row.id);
    assert!(!revived.is_deleted);
    assert!(revived.deleted_at.is_none());
    assert!(projects.get(&pm, project.id).await.is_ok());
}

#[tokio::test]
async fn unlinking_an_item_flags_the_link() {
    let app = TestApp::new().await;
    let project = app.project("SD-200").await;
    let item = app.item(project.id, "WD-01").await;
    let procurement = app.member(project.id, Role::Procurement).await;
    let materials = &app.state.services.materials;

    let material = materials
        .create(
            &procurement,
            project.id,
            CreateMaterialRequest {
                material_code: "MAT-WAL".into(),
                name: "Walnut".into(),
                specification: None,
                supplier: None,
                image_urls: vec![],
                item_ids: vec![item.id],
            },
        )
        .await
        .unwrap();

    let unlinked = materials.unlink_item(&procurement, material.id, item.id).await.unwrap();
    assert!(unlinked.item_ids.is_empty());

    let links = item_material::Entity::find()
        .filter(item_material::Column::MaterialId.eq(material.id))
        .all(app.state.db.as_ref())
        .await
        .unwrap();
    assert_eq!(links.len(), 1);
    assert!(links[0].is_deleted);
    assert!(links[0].deleted_at.is_some());

    let relinked = materials
        .link_items(&procurement, material.id, LinkItemsRequest { item_ids: vec![item.id] })
        .await
        .unwrap();
    assert_eq!(relinked.item_ids, vec![item.id]);

    let links = item_material::Entity::find()
        .filter(item_material::Column::MaterialId.eq(material.id))
        .all(app.state.db.as_ref())
        .await
        .unwrap();
    assert_eq!(links.len(), 1);
    assert!(!links[0].is_deleted);
}

#[tokio::test]
async fn removed_report_lines_are_flagged_not_dropped() {
    let app = TestApp::new().await;
    let project = app.project("SD-300").await;
    let pm = app.member(project.id, Role::Pm).await;
    let reports = &app.state.services.reports;

    let report = reports
        .create(
            &pm,
            project.id,
            CreateReportRequest {
                title: "Weekly progress".into(),
                report_type: ReportType::SiteVisit,
                share_internal: None,
                share_with_client: Some(false),
            },
        )
        .await
        .unwrap();
    reports.add_line(&pm, report.id, line("Carcasses")).await.unwrap();
    let view = reports.add_line(&pm, report.id, line("Doors")).await.unwrap();
    let doors = view.lines[1].id;

    let view = reports.delete_line(&pm, report.id, doors).await.unwrap();
    assert_eq!(view.lines.len(), 1);
    assert_eq!(view.lines[0].title, "Carcasses");
    assert_matches!(
        reports.delete_line(&pm, report.id, doors).await,
        Err(ServiceError::NotFound(_))
    );

    let view = reports
        .replace_lines(&pm, report.id, vec![line("Install"), line("Handover")])
        .await
        .unwrap();
    let titles: Vec<&str> = view.lines.iter().map(|l| l.title.as_str()).collect();
    assert_eq!(titles, ["Install", "Handover"]);

    let rows = report_line::Entity::find()
        .filter(report_line::Column::ReportId.eq(report.id))
        .all(app.state.db.as_ref())
        .await
        .unwrap();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows.iter().filter(|r| r.is_deleted).count(), 2);
    assert!(rows.iter().filter(|r| r.is_deleted).all(|r| r.deleted_at.is_some()));
}
