//! Domain events.
//!
//! Services publish on an mpsc channel after a write has committed; a single
//! background loop turns the interesting ones into email. Losing an event
//! never fails the request that produced it.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::Role;
use crate::db::DbPool;
use crate::errors::ServiceError;
use crate::notifications::{self, Mailer, OutgoingEmail};
use crate::services::access::assigned_users;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Event {
    DrawingTransitioned {
        project_id: Uuid,
        drawing_id: Uuid,
        item_code: String,
        action: String,
        status: String,
    },
    MaterialTransitioned {
        project_id: Uuid,
        material_id: Uuid,
        material_code: String,
        action: String,
        status: String,
    },
    ReportPublished {
        project_id: Uuid,
        report_id: Uuid,
        title: String,
        share_with_client: bool,
    },
    UserAssigned {
        project_id: Uuid,
        user_id: Uuid,
    },
    ScopeItemsImported {
        project_id: Uuid,
        imported: usize,
        errors: usize,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::DrawingTransitioned { .. } => "drawing_transitioned",
            Event::MaterialTransitioned { .. } => "material_transitioned",
            Event::ReportPublished { .. } => "report_published",
            Event::UserAssigned { .. } => "user_assigned",
            Event::ScopeItemsImported { .. } => "scope_items_imported",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Channel pair sized for bursty imports.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    pub async fn send(&self, event: Event) -> Result<(), ServiceError> {
        self.sender
            .send(event)
            .await
            .map_err(|e| ServiceError::EventError(format!("failed to send event: {}", e)))
    }

    /// Publishes without surfacing failure to the caller.
    pub async fn publish(&self, event: Event) {
        let name = event.name();
        if let Err(e) = self.send(event).await {
            warn!(event = name, error = %e, "event dropped");
        }
    }
}

/// Email a project's assignees holding `roles`.
async fn email_assignees(
    db: &DbPool,
    mailer: &Arc<dyn Mailer>,
    project_id: Uuid,
    roles: &[Role],
    subject: String,
    body: String,
) {
    match assigned_users(db, project_id, roles).await {
        Ok(users) => {
            let to: Vec<String> = users.into_iter().map(|u| u.email).collect();
            if to.is_empty() {
                debug!(%project_id, subject = %subject, "no recipients for email");
                return;
            }
            notifications::dispatch(mailer.clone(), OutgoingEmail { to, subject, body });
        }
        Err(e) => warn!(%project_id, error = %e, "could not resolve email recipients"),
    }
}

async fn handle_event(db: &DbPool, mailer: &Arc<dyn Mailer>, event: Event) {
    match event {
        Event::DrawingTransitioned {
            project_id,
            item_code,
            status,
            ..
        } if status == "sent_to_client" => {
            email_assignees(
                db,
                mailer,
                project_id,
                &[Role::Client],
                format!("Drawing {} awaits your approval", item_code),
                format!("A new drawing revision for item {} has been sent for your review.", item_code),
            )
            .await;
        }
        Event::MaterialTransitioned {
            project_id,
            material_code,
            status,
            ..
        } if status == "sent_to_client" => {
            email_assignees(
                db,
                mailer,
                project_id,
                &[Role::Client],
                format!("Material {} awaits your approval", material_code),
                format!("Material sample {} has been sent for your decision.", material_code),
            )
            .await;
        }
        Event::ReportPublished {
            project_id,
            title,
            share_with_client: true,
            ..
        } => {
            email_assignees(
                db,
                mailer,
                project_id,
                &[Role::Client],
                format!("New report: {}", title),
                format!("The report \"{}\" has been published to your project.", title),
            )
            .await;
        }
        Event::UserAssigned {
            project_id,
            user_id,
        } => {
            use crate::entities::{project, user};
            use sea_orm::EntityTrait;

            let lookup = tokio::try_join!(
                user::Entity::find_by_id(user_id).one(db),
                project::Entity::find_by_id(project_id).one(db)
            );
            match lookup {
                Ok((Some(user), Some(project))) => notifications::dispatch(
                    mailer.clone(),
                    OutgoingEmail {
                        to: vec![user.email],
                        subject: format!("You have been added to {}", project.project_code),
                        body: format!(
                            "You now have access to project {} ({}).",
                            project.name, project.project_code
                        ),
                    },
                ),
                Ok(_) => debug!(%user_id, %project_id, "assignment target vanished"),
                Err(e) => warn!(error = %e, "could not load assignment for email"),
            }
        }
        Event::ScopeItemsImported {
            project_id,
            imported,
            errors,
        } => {
            info!(%project_id, imported, errors, "scope item import finished");
        }
        other => debug!(event = other.name(), "event has no email"),
    }
}

/// Drains the event channel until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>, db: Arc<DbPool>, mailer: Arc<dyn Mailer>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        debug!(event = event.name(), "received event");
        handle_event(&db, &mailer, event).await;
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_fails_once_receiver_is_gone() {
        let (sender, rx) = EventSender::channel(4);
        drop(rx);
        let result = sender
            .send(Event::UserAssigned {
                project_id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
            })
            .await;
        assert!(matches!(result, Err(ServiceError::EventError(_))));
    }

    #[tokio::test]
    async fn events_arrive_in_order() {
        let (sender, mut rx) = EventSender::channel(4);
        let project_id = Uuid::new_v4();
        sender
            .publish(Event::ScopeItemsImported {
                project_id,
                imported: 3,
                errors: 1,
            })
            .await;
        sender
            .publish(Event::UserAssigned {
                project_id,
                user_id: Uuid::nil(),
            })
            .await;
        assert_eq!(rx.recv().await.map(|e| e.name()), Some("scope_items_imported"));
        assert_eq!(rx.recv().await.map(|e| e.name()), Some("user_assigned"));
    }
}
