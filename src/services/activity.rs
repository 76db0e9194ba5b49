use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::access::{assigned_users, AccessControl, ProjectScope};
use crate::auth::{AuthUser, Role};
use crate::db::DbPool;
use crate::entities::{activity_log, notification};
use crate::errors::ServiceError;

/// One audit row describing a change.
#[derive(Debug, Clone)]
pub struct ActivityEntry {
    pub project_id: Uuid,
    pub entity_type: &'static str,
    pub entity_id: Uuid,
    pub action: String,
    pub details: Value,
}

/// In-app notification fanned out to a project's assignees with the given roles.
#[derive(Debug, Clone)]
pub struct Notice {
    pub roles: &'static [Role],
    pub kind: &'static str,
    pub title: String,
    pub message: String,
}

/// Writes the activity row and, if given, the notification rows. Runs on the
/// caller's connection so it joins any open transaction.
pub async fn record<C: ConnectionTrait>(
    db: &C,
    actor: &AuthUser,
    entry: ActivityEntry,
    notice: Option<Notice>,
) -> Result<(), ServiceError> {
    activity_log::ActiveModel {
        project_id: Set(entry.project_id),
        user_id: Set(actor.user_id),
        entity_type: Set(entry.entity_type.to_string()),
        entity_id: Set(entry.entity_id),
        action: Set(entry.action.clone()),
        details: Set(entry.details.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let Some(notice) = notice else {
        return Ok(());
    };

    let recipients = assigned_users(db, entry.project_id, notice.roles).await?;
    let mut sent = 0usize;
    for recipient in recipients.into_iter().filter(|u| u.id != actor.user_id) {
        notification::ActiveModel {
            user_id: Set(recipient.id),
            project_id: Set(Some(entry.project_id)),
            kind: Set(notice.kind.to_string()),
            title: Set(notice.title.clone()),
            message: Set(notice.message.clone()),
            ..Default::default()
        }
        .insert(db)
        .await?;
        sent += 1;
    }
    debug!(kind = notice.kind, recipients = sent, "notifications queued");
    Ok(())
}

/// Read side of the activity log.
#[derive(Clone)]
pub struct ActivityService {
    db: Arc<DbPool>,
    access: AccessControl,
}

impl ActivityService {
    pub fn new(db: Arc<DbPool>, access: AccessControl) -> Self {
        Self { db, access }
    }

    #[instrument(skip(self, user))]
    pub async fn for_project(
        &self,
        user: &AuthUser,
        project_id: Uuid,
        limit: u64,
    ) -> Result<Vec<activity_log::Model>, ServiceError> {
        self.access.project(user, project_id).await?;
        let rows = activity_log::Entity::find()
            .filter(activity_log::Column::ProjectId.eq(project_id))
            .order_by_desc(activity_log::Column::CreatedAt)
            .limit(limit.clamp(1, 200))
            .all(self.db.as_ref())
            .await?;
        Ok(rows)
    }
}

pub async fn recent_activity<C: ConnectionTrait>(
    db: &C,
    scope: &ProjectScope,
    limit: u64,
) -> Result<Vec<activity_log::Model>, ServiceError> {
    let rows = activity_log::Entity::find()
        .filter(scope.condition(activity_log::Column::ProjectId))
        .order_by_desc(activity_log::Column::CreatedAt)
        .limit(limit)
        .all(db)
        .await?;
    Ok(rows)
}
