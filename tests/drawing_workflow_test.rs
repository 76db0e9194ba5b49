//! Shop drawing approval flow through the service layer.

mod common;

use assert_matches::assert_matches;
use common::{item_request, TestApp};
use millwork_api::{
    auth::Role,
    entities::scope_item::ItemPath,
    errors::ServiceError,
    services::drawings::{ClientDecisionRequest, OverrideRequest, UploadDrawingRequest},
    workflow::drawing::ClientDecision,
};

fn upload(name: &str) -> UploadDrawingRequest {
    UploadDrawingRequest {
        file_url: format!("https://files.example.com/drawings/{name}"),
        file_name: name.to_string(),
        file_size: Some(2048),
        notes: None,
    }
}

#[tokio::test]
async fn upload_send_and_approve() {
    let app = TestApp::new().await;
    let project = app.project("D-100").await;
    let item = app.item(project.id, "WD-10").await;
    let pm = app.member(project.id, Role::Pm).await;
    let client = app.member(project.id, Role::Client).await;
    let drawings = &app.state.services.drawings;

    let uploaded = drawings.upload(&pm, item.id, upload("wd10-a.pdf")).await.unwrap();
    assert_eq!(uploaded.status, "uploaded");
    assert_eq!(uploaded.current_revision.as_deref(), Some("A"));

    let reuploaded = drawings.upload(&pm, item.id, upload("wd10-b.pdf")).await.unwrap();
    assert_eq!(reuploaded.current_revision.as_deref(), Some("B"));

    let sent = drawings.send_to_client(&pm, uploaded.id).await.unwrap();
    assert_eq!(sent.status, "sent_to_client");
    assert!(sent.sent_to_client_at.is_some());

    let item_now = app.state.services.scope_items.get(&pm, item.id).await.unwrap();
    assert_eq!(item_now.status, "awaiting_approval");

    let decided = drawings
        .record_decision(
            &client,
            sent.id,
            ClientDecisionRequest {
                decision: ClientDecision::Approved,
                comments: Some("Looks good".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(decided.status, "approved");
    assert_eq!(decided.client_comments.as_deref(), Some("Looks good"));

    let item_now = app.state.services.scope_items.get(&pm, item.id).await.unwrap();
    assert_eq!(item_now.status, "approved");

    let view = drawings.for_item(&pm, item.id).await.unwrap();
    let codes: Vec<_> = view.revisions.iter().map(|r| r.revision.as_str()).collect();
    assert_eq!(codes, vec!["A", "B"]);
}

#[tokio::test]
async fn rejected_drawing_can_be_resubmitted() {
    let app = TestApp::new().await;
    let project = app.project("D-200").await;
    let item = app.item(project.id, "WD-20").await;
    let pm = app.member(project.id, Role::Pm).await;
    let client = app.member(project.id, Role::Client).await;
    let drawings = &app.state.services.drawings;

    let uploaded = drawings.upload(&pm, item.id, upload("wd20.pdf")).await.unwrap();
    drawings.send_to_client(&pm, uploaded.id).await.unwrap();
    let rejected = drawings
        .record_decision(
            &client,
            uploaded.id,
            ClientDecisionRequest {
                decision: ClientDecision::Rejected,
                comments: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(rejected.status, "rejected");

    let item_now = app.state.services.scope_items.get(&pm, item.id).await.unwrap();
    assert_eq!(item_now.status, "awaiting_approval");

    let resent = drawings.send_to_client(&pm, uploaded.id).await.unwrap();
    assert_eq!(resent.status, "sent_to_client");
}

#[tokio::test]
async fn decision_before_sending_is_rejected() {
    let app = TestApp::new().await;
    let project = app.project("D-300").await;
    let item = app.item(project.id, "WD-30").await;
    let pm = app.member(project.id, Role::Pm).await;
    let drawings = &app.state.services.drawings;

    let uploaded = drawings.upload(&pm, item.id, upload("wd30.pdf")).await.unwrap();
    let result = drawings
        .record_decision(
            &pm,
            uploaded.id,
            ClientDecisionRequest {
                decision: ClientDecision::Approved,
                comments: None,
            },
        )
        .await;
    assert_matches!(result, Err(ServiceError::InvalidTransition(_)));
}

#[tokio::test]
async fn override_approves_without_upload() {
    let app = TestApp::new().await;
    let project = app.project("D-400").await;
    let item = app.item(project.id, "WD-40").await;
    let pm = app.member(project.id, Role::Pm).await;
    let drawings = &app.state.services.drawings;

    let approved = drawings
        .override_approval(
            &pm,
            item.id,
            OverrideRequest {
                reason: "Client approved on site".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(approved.status, "approved");
    assert!(approved.pm_override);
    assert_eq!(approved.pm_override_by, Some(pm.user_id));
    assert_eq!(
        approved.pm_override_reason.as_deref(),
        Some("Client approved on site")
    );

    // Nothing was in design review, so the item keeps its status.
    let item_now = app.state.services.scope_items.get(&pm, item.id).await.unwrap();
    assert_eq!(item_now.status, "pending");

    let again = drawings
        .override_approval(&pm, item.id, OverrideRequest { reason: "again".into() })
        .await;
    assert_matches!(again, Err(ServiceError::InvalidTransition(_)));

    let send = drawings.send_to_client(&pm, approved.id).await;
    assert_matches!(send, Err(ServiceError::InvalidTransition(_)));
}

#[tokio::test]
async fn override_of_a_sent_drawing_approves_the_item() {
    let app = TestApp::new().await;
    let project = app.project("D-420").await;
    let item = app.item(project.id, "WD-42").await;
    let pm = app.member(project.id, Role::Pm).await;
    let drawings = &app.state.services.drawings;

    let uploaded = drawings.upload(&pm, item.id, upload("wd42-a.pdf")).await.unwrap();
    drawings.send_to_client(&pm, uploaded.id).await.unwrap();
    let item_now = app.state.services.scope_items.get(&pm, item.id).await.unwrap();
    assert_eq!(item_now.status, "awaiting_approval");

    let approved = drawings
        .override_approval(&pm, item.id, OverrideRequest { reason: "Signed on site".into() })
        .await
        .unwrap();
    assert_eq!(approved.status, "approved");
    let item_now = app.state.services.scope_items.get(&pm, item.id).await.unwrap();
    assert_eq!(item_now.status, "approved");
}

#[tokio::test]
async fn override_needs_a_reason_and_the_capability() {
    let app = TestApp::new().await;
    let project = app.project("D-450").await;
    let item = app.item(project.id, "WD-45").await;
    let pm = app.member(project.id, Role::Pm).await;
    let production = app.member(project.id, Role::Production).await;
    let drawings = &app.state.services.drawings;

    let blank = drawings
        .override_approval(&pm, item.id, OverrideRequest { reason: "   ".into() })
        .await;
    assert_matches!(blank, Err(ServiceError::ValidationError(_)));

    let denied = drawings
        .override_approval(&production, item.id, OverrideRequest { reason: "rush".into() })
        .await;
    assert_matches!(denied, Err(ServiceError::Forbidden(_)));
}

#[tokio::test]
async fn procurement_items_have_no_drawing() {
    let app = TestApp::new().await;
    let project = app.project("D-500").await;
    let admin = app.admin().await;
    let mut request = item_request("HW-01");
    request.item_path = ItemPath::Procurement;
    let item = app
        .state
        .services
        .scope_items
        .create(&admin, project.id, request)
        .await
        .unwrap();

    let result = app
        .state
        .services
        .drawings
        .upload(&admin, item.id, upload("hw01.pdf"))
        .await;
    assert_matches!(result, Err(ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn sending_notifies_assigned_clients() {
    let app = TestApp::new().await;
    let project = app.project("D-600").await;
    let item = app.item(project.id, "WD-60").await;
    let pm = app.member(project.id, Role::Pm).await;
    let client = app.member(project.id, Role::Client).await;
    let bystander = app.user(Role::Client).await;
    let drawings = &app.state.services.drawings;
    let notifications = &app.state.services.notifications;

    let uploaded = drawings.upload(&pm, item.id, upload("wd60.pdf")).await.unwrap();
    drawings.send_to_client(&pm, uploaded.id).await.unwrap();

    let inbox = notifications.list(&client, true, 50).await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].kind, "drawing_sent");
    assert_eq!(inbox[0].project_id, Some(project.id));

    assert!(notifications.list(&bystander, false, 50).await.unwrap().is_empty());
    assert!(notifications.list(&pm, false, 50).await.unwrap().is_empty());

    let read = notifications.mark_read(&client, inbox[0].id).await.unwrap();
    assert!(read.is_read);
    assert!(notifications.list(&client, true, 50).await.unwrap().is_empty());
}

#[tokio::test]
async fn unassigned_client_cannot_decide() {
    let app = TestApp::new().await;
    let project = app.project("D-700").await;
    let item = app.item(project.id, "WD-70").await;
    let pm = app.member(project.id, Role::Pm).await;
    let outsider = app.user(Role::Client).await;
    let drawings = &app.state.services.drawings;

    let uploaded = drawings.upload(&pm, item.id, upload("wd70.pdf")).await.unwrap();
    drawings.send_to_client(&pm, uploaded.id).await.unwrap();

    let result = drawings
        .record_decision(
            &outsider,
            uploaded.id,
            ClientDecisionRequest {
                decision: ClientDecision::Approved,
                comments: None,
            },
        )
        .await;
    assert_matches!(result, Err(ServiceError::Forbidden(_)));
}
