//! Scope item spreadsheet export and import.

mod common;

use assert_matches::assert_matches;
use axum::http::{header, Method, StatusCode};
use bytes::Bytes;
use common::{item_request, TestApp};
use millwork_api::{
    auth::Role,
    entities::scope_item::{ItemPath, ScopeItemStatus},
    errors::ServiceError,
};
use rust_xlsxwriter::Workbook;

fn sheet(rows: &[[&str; 4]]) -> Bytes {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            worksheet.write_string(r as u32, c as u16, *value).unwrap();
        }
    }
    Bytes::from(workbook.save_to_buffer().unwrap())
}

#[tokio::test]
async fn export_then_import_into_another_project() {
    let app = TestApp::new().await;
    let source = app.project("X-100").await;
    let target = app.project("X-200").await;
    let admin = app.admin().await;
    let items = &app.state.services.scope_items;

    let mut cabinet = item_request("CB-01");
    cabinet.status = ScopeItemStatus::InProduction;
    cabinet.production_percentage = 60;
    cabinet.description = Some("Bar back cabinet".into());
    items.create(&admin, source.id, cabinet).await.unwrap();

    let mut handles = item_request("HW-01");
    handles.item_path = ItemPath::Procurement;
    handles.quantity = 40.0;
    handles.initial_unit_cost = Some(12.5);
    items.create(&admin, source.id, handles).await.unwrap();

    let transfer = &app.state.services.transfer;
    let (file_name, bytes) = transfer.export_scope_items(&admin, source.id).await.unwrap();
    assert_eq!(file_name, "X-100_scope_items.xlsx");

    let report = transfer
        .import_scope_items(&admin, target.id, Bytes::from(bytes))
        .await
        .unwrap();
    assert_eq!(report.imported, 2);
    assert!(report.errors.is_empty(), "{:?}", report.errors);
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);

    let imported = items.list(&admin, target.id).await.unwrap();
    assert_eq!(imported.len(), 2);
    let cabinet = imported.iter().find(|i| i.item_code == "CB-01").unwrap();
    assert_eq!(cabinet.status, "in_production");
    assert_eq!(cabinet.production_percentage, 60);
    assert_eq!(cabinet.description.as_deref(), Some("Bar back cabinet"));
    assert_eq!(cabinet.initial_total_cost, Some(400.0));

    let handles = imported.iter().find(|i| i.item_code == "HW-01").unwrap();
    assert_eq!(handles.item_path, "procurement");
    assert_eq!(handles.quantity, 40.0);
    assert_eq!(handles.initial_unit_cost, Some(12.5));
    assert_eq!(handles.initial_total_cost, Some(500.0));
}

#[tokio::test]
async fn padded_codes_and_names_are_stored_trimmed() {
    let app = TestApp::new().await;
    let source = app.project("X-150").await;
    let target = app.project("X-160").await;
    let admin = app.admin().await;
    let items = &app.state.services.scope_items;

    let mut bench = item_request(" WD-01 ");
    bench.name = "  Oak bench ".into();
    let created = items.create(&admin, source.id, bench).await.unwrap();
    assert_eq!(created.item_code, "WD-01");
    assert_eq!(created.name, "Oak bench");

    let clash = items.create(&admin, source.id, item_request("WD-01  ")).await;
    assert_matches!(clash, Err(ServiceError::Conflict(_)));
    let blank = items.create(&admin, source.id, item_request("   ")).await;
    assert_matches!(blank, Err(ServiceError::ValidationError(_)));

    let transfer = &app.state.services.transfer;
    let (_, bytes) = transfer.export_scope_items(&admin, source.id).await.unwrap();
    let report = transfer
        .import_scope_items(&admin, target.id, Bytes::from(bytes))
        .await
        .unwrap();
    assert_eq!(report.imported, 1);

    let payload = sheet(&[
        ["Item Code", "Name", "Unit", "Notes"],
        ["  WD-01", "Oak bench  ", "pcs", ""],
        [" WD-02 ", " Walnut shelf ", "pcs", ""],
    ]);
    let report = transfer.import_scope_items(&admin, target.id, payload).await.unwrap();
    assert_eq!(report.imported, 1);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].row, 2);

    let imported = items.list(&admin, target.id).await.unwrap();
    let pairs: Vec<(&str, &str)> = imported
        .iter()
        .map(|i| (i.item_code.as_str(), i.name.as_str()))
        .collect();
    assert_eq!(pairs, [("WD-01", "Oak bench"), ("WD-02", "Walnut shelf")]);
}

#[tokio::test]
async fn unknown_status_falls_back_with_a_warning() {
    let app = TestApp::new().await;
    let project = app.project("X-300").await;
    let pm = app.member(project.id, Role::Pm).await;

    let payload = sheet(&[
        ["Item Code", "Name", "Status", "Quantity"],
        ["WD-01", "Wall panel", "bogus", "3"],
    ]);
    let report = app
        .state
        .services
        .transfer
        .import_scope_items(&pm, project.id, payload)
        .await
        .unwrap();
    assert_eq!(report.imported, 1);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].row, 2);
    assert!(report.warnings[0].message.contains("bogus"));

    let items = app.state.services.scope_items.list(&pm, project.id).await.unwrap();
    assert_eq!(items[0].status, "pending");
    assert_eq!(items[0].quantity, 3.0);
}

#[tokio::test]
async fn bad_rows_do_not_block_good_ones() {
    let app = TestApp::new().await;
    let project = app.project("X-400").await;
    let admin = app.admin().await;
    app.item(project.id, "WD-01").await;

    let payload = sheet(&[
        ["Item Code", "Name", "Unit", "Notes"],
        ["WD-01", "Already there", "pcs", ""],
        ["", "No code", "pcs", ""],
        ["WD-02", "Mirror", "pcs", "bevelled"],
        ["WD-02", "Mirror again", "pcs", ""],
    ]);
    let report = app
        .state
        .services
        .transfer
        .import_scope_items(&admin, project.id, payload)
        .await
        .unwrap();
    assert_eq!(report.imported, 1);
    let failed_rows: Vec<usize> = report.errors.iter().map(|e| e.row).collect();
    assert_eq!(failed_rows, vec![2, 3, 5]);
}

#[tokio::test]
async fn sheet_without_required_headers_is_rejected() {
    let app = TestApp::new().await;
    let project = app.project("X-500").await;
    let admin = app.admin().await;

    let payload = sheet(&[["Code", "Title", "Status", "Quantity"], ["A", "B", "pending", "1"]]);
    let result = app
        .state
        .services
        .transfer
        .import_scope_items(&admin, project.id, payload)
        .await;
    assert_matches!(result, Err(ServiceError::ImportError(_)));

    let garbage = app
        .state
        .services
        .transfer
        .import_scope_items(&admin, project.id, Bytes::from_static(b"not a workbook"))
        .await;
    assert_matches!(garbage, Err(ServiceError::ImportError(_)));
}

#[tokio::test]
async fn export_download_over_http() {
    let app = TestApp::new().await;
    let project = app.project("X-600").await;
    app.item(project.id, "WD-01").await;
    let client = app.member(project.id, Role::Client).await;

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/projects/{}/scope-items/export", project.id),
            Some(&client),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(disposition.contains("X-600_scope_items.xlsx"));

    let import = app
        .request(
            Method::POST,
            &format!("/api/v1/projects/{}/scope-items/import", project.id),
            Some(&client),
            None,
        )
        .await;
    assert_eq!(import.status(), StatusCode::FORBIDDEN);
}
