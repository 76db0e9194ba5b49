//! Material sample approvals.

mod common;

use assert_matches::assert_matches;
use axum::http::{Method, StatusCode};
use common::{response_json, TestApp};
use millwork_api::{
    auth::Role,
    errors::ServiceError,
    services::materials::{CreateMaterialRequest, MaterialDecisionRequest, UpdateMaterialRequest},
    workflow::material::MaterialDecision,
};
use serde_json::json;
use uuid::Uuid;

fn oak(item_ids: Vec<Uuid>) -> CreateMaterialRequest {
    CreateMaterialRequest {
        material_code: "MAT-OAK".into(),
        name: "Rift oak veneer".into(),
        specification: Some("Crown cut, 0.6mm".into()),
        supplier: Some("Timber Co".into()),
        image_urls: vec!["https://files.example.com/oak.jpg".into()],
        item_ids,
    }
}

fn decision(decision: MaterialDecision) -> MaterialDecisionRequest {
    MaterialDecisionRequest {
        decision,
        comments: None,
    }
}

#[tokio::test]
async fn procurement_sends_and_client_approves() {
    let app = TestApp::new().await;
    let project = app.project("M-100").await;
    let item = app.item(project.id, "WD-01").await;
    let procurement = app.member(project.id, Role::Procurement).await;
    let client = app.member(project.id, Role::Client).await;
    let materials = &app.state.services.materials;

    let created = materials
        .create(&procurement, project.id, oak(vec![item.id]))
        .await
        .unwrap();
    assert_eq!(created.status, "pending");
    assert_eq!(created.item_ids, vec![item.id]);
    assert_eq!(created.image_urls.len(), 1);

    let sent = materials.send_to_client(&procurement, created.id).await.unwrap();
    assert_eq!(sent.status, "sent_to_client");
    assert!(sent.sent_to_client_at.is_some());

    let approved = materials
        .decide(
            &client,
            created.id,
            MaterialDecisionRequest {
                decision: MaterialDecision::Approve,
                comments: Some("Matches the sample board".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(approved.status, "approved");
    assert_eq!(approved.approved_by, Some(client.user_id));
    assert!(approved.client_response_at.is_some());
    assert_eq!(
        approved.client_comments.as_deref(),
        Some("Matches the sample board")
    );
}

#[tokio::test]
async fn direct_decision_needs_elevated_role() {
    let app = TestApp::new().await;
    let project = app.project("M-200").await;
    let procurement = app.member(project.id, Role::Procurement).await;
    let client = app.member(project.id, Role::Client).await;
    let pm = app.member(project.id, Role::Pm).await;
    let materials = &app.state.services.materials;

    let created = materials.create(&procurement, project.id, oak(vec![])).await.unwrap();

    let by_procurement = materials
        .decide(&procurement, created.id, decision(MaterialDecision::Approve))
        .await;
    assert_matches!(by_procurement, Err(ServiceError::Forbidden(_)));

    let by_client = materials
        .decide(&client, created.id, decision(MaterialDecision::Approve))
        .await;
    assert_matches!(by_client, Err(ServiceError::Forbidden(_)));

    let by_pm = materials
        .decide(&pm, created.id, decision(MaterialDecision::Reject))
        .await
        .unwrap();
    assert_eq!(by_pm.status, "rejected");
    assert!(by_pm.client_response_at.is_none());
}

#[tokio::test]
async fn decided_materials_are_final() {
    let app = TestApp::new().await;
    let project = app.project("M-300").await;
    let pm = app.member(project.id, Role::Pm).await;
    let materials = &app.state.services.materials;

    let created = materials.create(&pm, project.id, oak(vec![])).await.unwrap();
    materials
        .decide(&pm, created.id, decision(MaterialDecision::Approve))
        .await
        .unwrap();

    let again = materials
        .decide(&pm, created.id, decision(MaterialDecision::Reject))
        .await;
    assert_matches!(again, Err(ServiceError::InvalidTransition(_)));

    let resend = materials.send_to_client(&pm, created.id).await;
    assert_matches!(resend, Err(ServiceError::InvalidTransition(_)));

    let edit = materials
        .update(
            &pm,
            created.id,
            UpdateMaterialRequest {
                name: Some("Walnut".into()),
                specification: None,
                supplier: None,
                image_urls: None,
            },
        )
        .await;
    assert_matches!(edit, Err(ServiceError::Conflict(_)));
}

#[tokio::test]
async fn items_from_other_projects_cannot_be_linked() {
    let app = TestApp::new().await;
    let project = app.project("M-400").await;
    let other = app.project("M-401").await;
    let foreign = app.item(other.id, "WD-99").await;
    let pm = app.member(project.id, Role::Pm).await;

    let result = app
        .state
        .services
        .materials
        .create(&pm, project.id, oak(vec![foreign.id]))
        .await;
    assert_matches!(result, Err(ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn decision_over_http() {
    let app = TestApp::new().await;
    let project = app.project("M-500").await;
    let procurement = app.member(project.id, Role::Procurement).await;
    let client = app.member(project.id, Role::Client).await;

    let created = app
        .request(
            Method::POST,
            &format!("/api/v1/projects/{}/materials", project.id),
            Some(&procurement),
            Some(json!({ "material_code": "MAT-01", "name": "Brass trim" })),
        )
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let material_id = response_json(created).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let client_send = app
        .request(
            Method::POST,
            &format!("/api/v1/materials/{material_id}/send"),
            Some(&client),
            None,
        )
        .await;
    assert_eq!(client_send.status(), StatusCode::FORBIDDEN);

    let sent = app
        .request(
            Method::POST,
            &format!("/api/v1/materials/{material_id}/send"),
            Some(&procurement),
            None,
        )
        .await;
    assert_eq!(sent.status(), StatusCode::OK);

    let decided = app
        .request(
            Method::POST,
            &format!("/api/v1/materials/{material_id}/decision"),
            Some(&client),
            Some(json!({ "decision": "reject", "comments": "Too yellow" })),
        )
        .await;
    assert_eq!(decided.status(), StatusCode::OK);
    let body = response_json(decided).await;
    assert_eq!(body["data"]["status"], "rejected");
    assert_eq!(body["data"]["client_comments"], "Too yellow");
}
