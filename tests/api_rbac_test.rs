//! Route gating, project scoping and cost redaction over HTTP.

mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp};
use millwork_api::auth::Role;
use serde_json::json;

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, "/api/v1/projects", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = response_json(response).await;
    assert_eq!(body["code"], "AUTH_MISSING");
}

#[tokio::test]
async fn health_and_metrics_are_public() {
    let app = TestApp::new().await;
    let health = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(health.status(), StatusCode::OK);

    let ready = app.request(Method::GET, "/health/ready", None, None).await;
    assert_eq!(ready.status(), StatusCode::OK);
    let body = response_json(ready).await;
    assert_eq!(body["database"]["status"], "up");

    let metrics = app.request(Method::GET, "/metrics", None, None).await;
    assert_eq!(metrics.status(), StatusCode::OK);
}

#[tokio::test]
async fn client_cannot_create_projects() {
    let app = TestApp::new().await;
    let client = app.user(Role::Client).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/projects",
            Some(&client),
            Some(json!({
                "project_code": "P-100",
                "name": "Lobby",
                "client_name": "Harbour Hotel"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_creates_project_over_http() {
    let app = TestApp::new().await;
    let admin = app.admin().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/projects",
            Some(&admin),
            Some(json!({
                "project_code": "P-101",
                "name": "Lobby",
                "client_name": "Harbour Hotel",
                "contract_value": 1000.0
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["project_code"], "P-101");
    assert_eq!(body["data"]["status"], "tender");
}

#[tokio::test]
async fn unassigned_staff_cannot_read_project() {
    let app = TestApp::new().await;
    let project = app.project("P-200").await;
    let outsider = app.user(Role::Pm).await;

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/projects/{}", project.id),
            Some(&outsider),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let member = app.member(project.id, Role::Pm).await;
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/projects/{}", project.id),
            Some(&member),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn client_sees_items_without_costs() {
    let app = TestApp::new().await;
    let project = app.project("P-300").await;
    app.item(project.id, "WD-01").await;
    let client = app.member(project.id, Role::Client).await;
    let pm = app.member(project.id, Role::Pm).await;

    let uri = format!("/api/v1/projects/{}/scope-items", project.id);

    let body = response_json(app.request(Method::GET, &uri, Some(&client), None).await).await;
    let item = &body["data"][0];
    assert_eq!(item["item_code"], "WD-01");
    assert!(item["initial_unit_cost"].is_null());
    assert!(item["unit_sales_price"].is_null());

    let body = response_json(app.request(Method::GET, &uri, Some(&pm), None).await).await;
    assert_eq!(body["data"][0]["initial_unit_cost"], 100.0);
    assert_eq!(body["data"][0]["initial_total_cost"], 400.0);
}

#[tokio::test]
async fn production_can_update_progress_but_not_edit_items() {
    let app = TestApp::new().await;
    let project = app.project("P-400").await;
    let item = app.item(project.id, "WD-02").await;
    let production = app.member(project.id, Role::Production).await;

    let edit = app
        .request(
            Method::PUT,
            &format!("/api/v1/scope-items/{}", item.id),
            Some(&production),
            Some(json!({ "name": "Renamed" })),
        )
        .await;
    assert_eq!(edit.status(), StatusCode::FORBIDDEN);

    let progress = app
        .request(
            Method::PUT,
            &format!("/api/v1/scope-items/{}/progress", item.id),
            Some(&production),
            Some(json!({ "production_percentage": 40 })),
        )
        .await;
    assert_eq!(progress.status(), StatusCode::OK);
    let body = response_json(progress).await;
    assert_eq!(body["data"]["production_percentage"], 40);
}

#[tokio::test]
async fn unknown_workflow_transition_is_conflict() {
    let app = TestApp::new().await;
    let project = app.project("P-500").await;
    let item = app.item(project.id, "WD-03").await;
    let pm = app.member(project.id, Role::Pm).await;

    let upload = app
        .request(
            Method::POST,
            &format!("/api/v1/scope-items/{}/drawing/revisions", item.id),
            Some(&pm),
            Some(json!({ "file_url": "https://files.example.com/a.pdf", "file_name": "a.pdf" })),
        )
        .await;
    assert_eq!(upload.status(), StatusCode::CREATED);
    let drawing = response_json(upload).await;
    let drawing_id = drawing["data"]["id"].as_str().unwrap().to_string();

    let decision = app
        .request(
            Method::POST,
            &format!("/api/v1/drawings/{}/decision", drawing_id),
            Some(&pm),
            Some(json!({ "decision": "approved" })),
        )
        .await;
    assert_eq!(decision.status(), StatusCode::CONFLICT);
    let body = response_json(decision).await;
    assert!(body["message"].as_str().unwrap().contains("uploaded"));
    assert!(body["request_id"].is_string());
}

#[tokio::test]
async fn responses_echo_request_id() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, "/status", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
}
