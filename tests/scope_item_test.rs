//! Scope item edits, cost recalculation and bulk updates.

mod common;

use assert_matches::assert_matches;
use axum::http::{Method, StatusCode};
use common::{item_request, response_json, TestApp};
use millwork_api::{
    auth::Role,
    entities::scope_item::ScopeItemStatus,
    errors::ServiceError,
    services::scope_items::{BulkItemUpdate, BulkUpdateRequest, UpdateScopeItemRequest},
};
use serde_json::json;

#[tokio::test]
async fn initial_costs_cannot_be_edited() {
    let app = TestApp::new().await;
    let project = app.project("S-100").await;
    let item = app.item(project.id, "WD-01").await;
    let pm = app.member(project.id, Role::Pm).await;

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/scope-items/{}", item.id),
            Some(&pm),
            Some(json!({ "initial_unit_cost": 1.0 })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let unchanged = app.state.services.scope_items.get(&pm, item.id).await.unwrap();
    assert_eq!(unchanged.initial_unit_cost, Some(100.0));
}

#[tokio::test]
async fn actual_and_sales_totals_follow_quantity() {
    let app = TestApp::new().await;
    let project = app.project("S-200").await;
    let item = app.item(project.id, "WD-02").await;
    let pm = app.member(project.id, Role::Pm).await;
    let items = &app.state.services.scope_items;

    let updated = items
        .update(
            &pm,
            item.id,
            UpdateScopeItemRequest {
                actual_unit_cost: Some(90.0),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.actual_total_cost, Some(360.0));
    assert_eq!(updated.initial_total_cost, Some(400.0));

    let updated = items
        .update(
            &pm,
            item.id,
            UpdateScopeItemRequest {
                quantity: Some(10.0),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.actual_total_cost, Some(900.0));
    assert_eq!(updated.total_sales_price, Some(1_500.0));
    assert_eq!(updated.initial_total_cost, Some(400.0));
}

#[tokio::test]
async fn duplicate_codes_conflict_within_a_project() {
    let app = TestApp::new().await;
    let first = app.project("S-300").await;
    let second = app.project("S-301").await;
    let admin = app.admin().await;
    let items = &app.state.services.scope_items;

    items.create(&admin, first.id, item_request("WD-03")).await.unwrap();
    let duplicate = items.create(&admin, first.id, item_request("WD-03")).await;
    assert_matches!(duplicate, Err(ServiceError::Conflict(_)));

    items.create(&admin, second.id, item_request("WD-03")).await.unwrap();
}

#[tokio::test]
async fn deleted_items_disappear() {
    let app = TestApp::new().await;
    let project = app.project("S-400").await;
    let item = app.item(project.id, "WD-04").await;
    let pm = app.member(project.id, Role::Pm).await;
    let items = &app.state.services.scope_items;

    items.delete(&pm, item.id).await.unwrap();
    assert_matches!(items.get(&pm, item.id).await, Err(ServiceError::NotFound(_)));
    assert!(items.list(&pm, project.id).await.unwrap().is_empty());

    let readded = items.create(&pm, project.id, item_request("WD-04")).await;
    assert!(readded.is_ok());
}

#[tokio::test]
async fn progress_outside_range_is_rejected() {
    let app = TestApp::new().await;
    let project = app.project("S-500").await;
    let item = app.item(project.id, "WD-05").await;
    let production = app.member(project.id, Role::Production).await;

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/scope-items/{}/progress", item.id),
            Some(&production),
            Some(json!({ "production_percentage": 101 })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bulk_rows_fail_independently() {
    let app = TestApp::new().await;
    let project = app.project("S-600").await;
    let first = app.item(project.id, "WD-06").await;
    let second = app.item(project.id, "WD-07").await;
    let third = app.item(project.id, "WD-08").await;
    let pm = app.member(project.id, Role::Pm).await;
    let items = &app.state.services.scope_items;

    let outcome = items
        .bulk_update(
            &pm,
            project.id,
            BulkUpdateRequest {
                items: vec![
                    BulkItemUpdate {
                        id: first.id,
                        status: Some(ScopeItemStatus::InProduction),
                        production_percentage: Some(20),
                    },
                    BulkItemUpdate {
                        id: second.id,
                        status: None,
                        production_percentage: Some(150),
                    },
                    BulkItemUpdate {
                        id: third.id,
                        status: Some(ScopeItemStatus::OnHold),
                        production_percentage: None,
                    },
                ],
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome.succeeded, vec![first.id, third.id]);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].id, second.id);

    let first = items.get(&pm, first.id).await.unwrap();
    assert_eq!(first.status, "in_production");
    assert_eq!(first.production_percentage, 20);
    let second = items.get(&pm, second.id).await.unwrap();
    assert_eq!(second.production_percentage, 0);
    let third = items.get(&pm, third.id).await.unwrap();
    assert_eq!(third.status, "on_hold");
}

#[tokio::test]
async fn bulk_status_change_needs_item_rights() {
    let app = TestApp::new().await;
    let project = app.project("S-700").await;
    let item = app.item(project.id, "WD-09").await;
    let production = app.member(project.id, Role::Production).await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/projects/{}/scope-items/bulk", project.id),
            Some(&production),
            Some(json!({ "items": [{ "id": item.id, "status": "complete" }] })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/projects/{}/scope-items/bulk", project.id),
            Some(&production),
            Some(json!({ "items": [{ "id": item.id, "production_percentage": 70 }] })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["succeeded"][0], item.id.to_string());
}
