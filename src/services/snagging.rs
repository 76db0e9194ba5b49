use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::access::AccessControl;
use super::activity::{self, ActivityEntry, Notice};
use crate::auth::{AuthUser, Capability, Role};
use crate::db::DbPool;
use crate::entities::{decode_url_list, encode_url_list, scope_item, snag};
use crate::errors::ServiceError;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateSnagRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub item_id: Option<Uuid>,
    #[serde(default)]
    pub photo_urls: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateSnagRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub photo_urls: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SnagView {
    pub id: Uuid,
    pub project_id: Uuid,
    pub item_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub photo_urls: Vec<String>,
    pub is_resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<Uuid>,
    pub reported_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<snag::Model> for SnagView {
    fn from(model: snag::Model) -> Self {
        Self {
            photo_urls: decode_url_list(&model.photo_urls),
            id: model.id,
            project_id: model.project_id,
            item_id: model.item_id,
            title: model.title,
            description: model.description,
            location: model.location,
            is_resolved: model.is_resolved,
            resolved_at: model.resolved_at,
            resolved_by: model.resolved_by,
            reported_by: model.reported_by,
            created_at: model.created_at,
        }
    }
}

#[derive(Clone)]
pub struct SnagService {
    db: Arc<DbPool>,
    access: AccessControl,
}

impl SnagService {
    pub fn new(db: Arc<DbPool>, access: AccessControl) -> Self {
        Self { db, access }
    }

    async fn load(&self, user: &AuthUser, id: Uuid) -> Result<snag::Model, ServiceError> {
        let row = snag::Entity::find_by_id(id)
            .filter(snag::Column::IsDeleted.eq(false))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::not_found("snag", id))?;
        self.access.ensure(user, row.project_id).await?;
        Ok(row)
    }

    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn list(
        &self,
        user: &AuthUser,
        project_id: Uuid,
        open_only: bool,
    ) -> Result<Vec<SnagView>, ServiceError> {
        self.access.project(user, project_id).await?;
        let mut query = snag::Entity::find()
            .filter(snag::Column::ProjectId.eq(project_id))
            .filter(snag::Column::IsDeleted.eq(false));
        if open_only {
            query = query.filter(snag::Column::IsResolved.eq(false));
        }
        let rows = query
            .order_by_desc(snag::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?;
        Ok(rows.into_iter().map(SnagView::from).collect())
    }

    #[instrument(skip(self, user, request), fields(user_id = %user.user_id))]
    pub async fn create(
        &self,
        user: &AuthUser,
        project_id: Uuid,
        request: CreateSnagRequest,
    ) -> Result<SnagView, ServiceError> {
        user.require(Capability::ManageSnagging)?;
        request.validate()?;
        self.access.project(user, project_id).await?;

        if let Some(item_id) = request.item_id {
            let belongs = scope_item::Entity::find_by_id(item_id)
                .filter(scope_item::Column::ProjectId.eq(project_id))
                .filter(scope_item::Column::IsDeleted.eq(false))
                .one(self.db.as_ref())
                .await?
                .is_some();
            if !belongs {
                return Err(ServiceError::ValidationError(format!(
                    "scope item {} is not part of project {}",
                    item_id, project_id
                )));
            }
        }

        let created = snag::ActiveModel {
            project_id: Set(project_id),
            item_id: Set(request.item_id),
            title: Set(request.title),
            description: Set(request.description),
            location: Set(request.location),
            photo_urls: Set(encode_url_list(&request.photo_urls)),
            reported_by: Set(user.user_id),
            ..Default::default()
        }
        .insert(self.db.as_ref())
        .await?;

        activity::record(
            self.db.as_ref(),
            user,
            ActivityEntry {
                project_id,
                entity_type: "snag",
                entity_id: created.id,
                action: "created".into(),
                details: serde_json::json!({ "title": created.title, "location": created.location }),
            },
            Some(Notice {
                roles: &[Role::Pm, Role::Production],
                kind: "snag_reported",
                title: format!("New snag: {}", created.title),
                message: created
                    .location
                    .clone()
                    .map(|l| format!("Reported at {}", l))
                    .unwrap_or_else(|| "A new snag was reported.".to_string()),
            }),
        )
        .await?;
        Ok(created.into())
    }

    #[instrument(skip(self, user, request), fields(user_id = %user.user_id))]
    pub async fn update(
        &self,
        user: &AuthUser,
        id: Uuid,
        request: UpdateSnagRequest,
    ) -> Result<SnagView, ServiceError> {
        user.require(Capability::ManageSnagging)?;
        request.validate()?;
        let current = self.load(user, id).await?;

        let mut active: snag::ActiveModel = current.into();
        if let Some(title) = request.title {
            active.title = Set(title);
        }
        if request.description.is_some() {
            active.description = Set(request.description);
        }
        if request.location.is_some() {
            active.location = Set(request.location);
        }
        if let Some(urls) = request.photo_urls {
            active.photo_urls = Set(encode_url_list(&urls));
        }
        Ok(active.update(self.db.as_ref()).await?.into())
    }

    /// Resolves (`resolved = true`) or reopens a snag.
    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn set_resolved(
        &self,
        user: &AuthUser,
        id: Uuid,
        resolved: bool,
    ) -> Result<SnagView, ServiceError> {
        user.require(Capability::ManageSnagging)?;
        let current = self.load(user, id).await?;
        if current.is_resolved == resolved {
            return Ok(current.into());
        }
        let project_id = current.project_id;

        let mut active: snag::ActiveModel = current.into();
        active.is_resolved = Set(resolved);
        active.resolved_at = Set(resolved.then(Utc::now));
        active.resolved_by = Set(resolved.then_some(user.user_id));
        let updated = active.update(self.db.as_ref()).await?;

        activity::record(
            self.db.as_ref(),
            user,
            ActivityEntry {
                project_id,
                entity_type: "snag",
                entity_id: id,
                action: (if resolved { "resolved" } else { "reopened" }).to_string(),
                details: serde_json::json!({}),
            },
            None,
        )
        .await?;
        Ok(updated.into())
    }

    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn delete(&self, user: &AuthUser, id: Uuid) -> Result<(), ServiceError> {
        user.require(Capability::ManageSnagging)?;
        let current = self.load(user, id).await?;
        let project_id = current.project_id;
        let mut active: snag::ActiveModel = current.into();
        active.is_deleted = Set(true);
        active.update(self.db.as_ref()).await?;

        activity::record(
            self.db.as_ref(),
            user,
            ActivityEntry {
                project_id,
                entity_type: "snag",
                entity_id: id,
                action: "deleted".into(),
                details: serde_json::json!({}),
            },
            None,
        )
        .await
    }
}
