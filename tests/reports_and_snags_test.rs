//! Report publishing, visibility and snag tracking.

mod common;

use assert_matches::assert_matches;
use axum::http::{header, Method, StatusCode};
use common::TestApp;
use millwork_api::{
    auth::Role,
    entities::report::ReportType,
    errors::ServiceError,
    services::reports::{CreateReportRequest, ReorderLinesRequest, ReportLineRequest},
    services::snagging::CreateSnagRequest,
};

fn line(title: &str) -> ReportLineRequest {
    ReportLineRequest {
        title: title.into(),
        description: Some(format!("{title} notes")),
        photo_urls: vec![],
        line_order: None,
    }
}

fn site_visit(share_with_client: bool) -> CreateReportRequest {
    CreateReportRequest {
        title: "Site visit 12".into(),
        report_type: ReportType::SiteVisit,
        share_internal: None,
        share_with_client: Some(share_with_client),
    }
}

#[tokio::test]
async fn drafts_stay_hidden_until_published() {
    let app = TestApp::new().await;
    let project = app.project("R-100").await;
    let pm = app.member(project.id, Role::Pm).await;
    let client = app.member(project.id, Role::Client).await;
    let production = app.member(project.id, Role::Production).await;
    let reports = &app.state.services.reports;

    let draft = reports.create(&pm, project.id, site_visit(true)).await.unwrap();
    assert!(!draft.is_published);
    assert!(reports.list(&client, project.id).await.unwrap().is_empty());
    assert!(reports.list(&production, project.id).await.unwrap().is_empty());
    assert_matches!(
        reports.get(&client, draft.id).await,
        Err(ServiceError::NotFound(_))
    );

    let empty_publish = reports.publish(&pm, draft.id).await;
    assert_matches!(empty_publish, Err(ServiceError::ValidationError(_)));

    reports.add_line(&pm, draft.id, line("Joinery delivered")).await.unwrap();
    let published = reports.publish(&pm, draft.id).await.unwrap();
    assert!(published.is_published);
    assert!(published.published_at.is_some());

    assert_eq!(reports.list(&client, project.id).await.unwrap().len(), 1);
    assert_eq!(reports.list(&production, project.id).await.unwrap().len(), 1);

    let inbox = app.state.services.notifications.list(&client, true, 10).await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].kind, "report_published");
}

#[tokio::test]
async fn internal_reports_never_reach_clients() {
    let app = TestApp::new().await;
    let project = app.project("R-200").await;
    let pm = app.member(project.id, Role::Pm).await;
    let client = app.member(project.id, Role::Client).await;
    let reports = &app.state.services.reports;

    let report = reports.create(&pm, project.id, site_visit(false)).await.unwrap();
    reports.add_line(&pm, report.id, line("Snag walk")).await.unwrap();
    reports.publish(&pm, report.id).await.unwrap();

    assert!(reports.list(&client, project.id).await.unwrap().is_empty());
    assert!(app
        .state
        .services
        .notifications
        .list(&client, false, 10)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn lines_are_appended_and_reordered() {
    let app = TestApp::new().await;
    let project = app.project("R-300").await;
    let pm = app.member(project.id, Role::Pm).await;
    let reports = &app.state.services.reports;

    let report = reports.create(&pm, project.id, site_visit(false)).await.unwrap();
    reports.add_line(&pm, report.id, line("First")).await.unwrap();
    reports.add_line(&pm, report.id, line("Second")).await.unwrap();
    let view = reports.add_line(&pm, report.id, line("Third")).await.unwrap();
    let orders: Vec<i32> = view.lines.iter().map(|l| l.line_order).collect();
    assert_eq!(orders, vec![0, 1, 2]);

    let mut ids: Vec<_> = view.lines.iter().map(|l| l.id).collect();
    ids.reverse();
    let reordered = reports
        .reorder_lines(&pm, report.id, ReorderLinesRequest { line_ids: ids.clone() })
        .await
        .unwrap();
    let titles: Vec<&str> = reordered.lines.iter().map(|l| l.title.as_str()).collect();
    assert_eq!(titles, vec!["Third", "Second", "First"]);

    let partial = reports
        .reorder_lines(&pm, report.id, ReorderLinesRequest { line_ids: ids[..2].to_vec() })
        .await;
    assert_matches!(partial, Err(ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn published_report_downloads_as_pdf() {
    let app = TestApp::new().await;
    let project = app.project("R-400").await;
    let pm = app.member(project.id, Role::Pm).await;
    let reports = &app.state.services.reports;

    let report = reports.create(&pm, project.id, site_visit(true)).await.unwrap();
    reports.add_line(&pm, report.id, line("Reception desk installed")).await.unwrap();
    reports.publish(&pm, report.id).await.unwrap();

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/reports/{}/pdf", report.id),
            Some(&pm),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/pdf"
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn snags_resolve_and_reopen() {
    let app = TestApp::new().await;
    let project = app.project("R-500").await;
    let item = app.item(project.id, "WD-01").await;
    let production = app.member(project.id, Role::Production).await;
    let pm = app.member(project.id, Role::Pm).await;
    let snags = &app.state.services.snagging;

    let snag = snags
        .create(
            &production,
            project.id,
            CreateSnagRequest {
                title: "Chipped edge".into(),
                description: None,
                location: Some("Level 2 lobby".into()),
                item_id: Some(item.id),
                photo_urls: vec![],
            },
        )
        .await
        .unwrap();
    assert!(!snag.is_resolved);

    let inbox = app.state.services.notifications.list(&pm, true, 10).await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].message, "Reported at Level 2 lobby");

    let resolved = snags.set_resolved(&production, snag.id, true).await.unwrap();
    assert!(resolved.is_resolved);
    assert_eq!(resolved.resolved_by, Some(production.user_id));
    assert!(snags.list(&pm, project.id, true).await.unwrap().is_empty());
    assert_eq!(snags.list(&pm, project.id, false).await.unwrap().len(), 1);

    let reopened = snags.set_resolved(&pm, snag.id, false).await.unwrap();
    assert!(!reopened.is_resolved);
    assert!(reopened.resolved_by.is_none());
}

#[tokio::test]
async fn clients_cannot_report_snags() {
    let app = TestApp::new().await;
    let project = app.project("R-600").await;
    let client = app.member(project.id, Role::Client).await;

    let result = app
        .state
        .services
        .snagging
        .create(
            &client,
            project.id,
            CreateSnagRequest {
                title: "Scratch".into(),
                description: None,
                location: None,
                item_id: None,
                photo_urls: vec![],
            },
        )
        .await;
    assert_matches!(result, Err(ServiceError::Forbidden(_)));
}
