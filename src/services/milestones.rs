use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::access::AccessControl;
use super::activity::{self, ActivityEntry};
use crate::auth::{AuthUser, Capability};
use crate::db::DbPool;
use crate::entities::milestone;
use crate::errors::ServiceError;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateMilestoneRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub description: Option<String>,
    pub due_date: DateTime<Utc>,
    #[validate(range(min = 0, max = 365))]
    pub alert_days_before: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateMilestoneRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    #[validate(range(min = 0, max = 365))]
    pub alert_days_before: Option<i32>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MilestoneView {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub due_date: DateTime<Utc>,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub alert_days_before: i32,
    pub is_overdue: bool,
    pub is_due_soon: bool,
}

impl MilestoneView {
    pub fn at(model: milestone::Model, now: DateTime<Utc>) -> Self {
        Self {
            is_overdue: model.is_overdue(now),
            is_due_soon: model.is_due_soon(now),
            id: model.id,
            project_id: model.project_id,
            name: model.name,
            description: model.description,
            due_date: model.due_date,
            is_completed: model.is_completed,
            completed_at: model.completed_at,
            alert_days_before: model.alert_days_before,
        }
    }
}

#[derive(Clone)]
pub struct MilestoneService {
    db: Arc<DbPool>,
    access: AccessControl,
}

impl MilestoneService {
    pub fn new(db: Arc<DbPool>, access: AccessControl) -> Self {
        Self { db, access }
    }

    async fn load(&self, user: &AuthUser, id: Uuid) -> Result<milestone::Model, ServiceError> {
        let row = milestone::Entity::find_by_id(id)
            .filter(milestone::Column::IsDeleted.eq(false))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::not_found("milestone", id))?;
        self.access.ensure(user, row.project_id).await?;
        Ok(row)
    }

    async fn log(&self, user: &AuthUser, row: &milestone::Model, action: &str) -> Result<(), ServiceError> {
        activity::record(
            self.db.as_ref(),
            user,
            ActivityEntry {
                project_id: row.project_id,
                entity_type: "milestone",
                entity_id: row.id,
                action: action.to_string(),
                details: serde_json::json!({ "name": row.name, "due_date": row.due_date }),
            },
            None,
        )
        .await
    }

    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn list(&self, user: &AuthUser, project_id: Uuid) -> Result<Vec<MilestoneView>, ServiceError> {
        self.access.project(user, project_id).await?;
        let rows = milestone::Entity::find()
            .filter(milestone::Column::ProjectId.eq(project_id))
            .filter(milestone::Column::IsDeleted.eq(false))
            .order_by_asc(milestone::Column::DueDate)
            .all(self.db.as_ref())
            .await?;
        let now = Utc::now();
        Ok(rows.into_iter().map(|m| MilestoneView::at(m, now)).collect())
    }

    #[instrument(skip(self, user, request), fields(user_id = %user.user_id))]
    pub async fn create(
        &self,
        user: &AuthUser,
        project_id: Uuid,
        request: CreateMilestoneRequest,
    ) -> Result<MilestoneView, ServiceError> {
        user.require(Capability::ManageMilestones)?;
        request.validate()?;
        self.access.project(user, project_id).await?;

        let mut active = milestone::ActiveModel {
            project_id: Set(project_id),
            name: Set(request.name),
            description: Set(request.description),
            due_date: Set(request.due_date),
            ..Default::default()
        };
        if let Some(days) = request.alert_days_before {
            active.alert_days_before = Set(days);
        }
        let created = active.insert(self.db.as_ref()).await?;
        self.log(user, &created, "created").await?;
        Ok(MilestoneView::at(created, Utc::now()))
    }

    #[instrument(skip(self, user, request), fields(user_id = %user.user_id))]
    pub async fn update(
        &self,
        user: &AuthUser,
        id: Uuid,
        request: UpdateMilestoneRequest,
    ) -> Result<MilestoneView, ServiceError> {
        user.require(Capability::ManageMilestones)?;
        request.validate()?;
        let current = self.load(user, id).await?;

        let mut active: milestone::ActiveModel = current.into();
        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if request.description.is_some() {
            active.description = Set(request.description);
        }
        if let Some(due) = request.due_date {
            active.due_date = Set(due);
        }
        if let Some(days) = request.alert_days_before {
            active.alert_days_before = Set(days);
        }
        let updated = active.update(self.db.as_ref()).await?;
        Ok(MilestoneView::at(updated, Utc::now()))
    }

    /// Marks complete (`completed = true`) or reopens.
    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn set_completed(
        &self,
        user: &AuthUser,
        id: Uuid,
        completed: bool,
    ) -> Result<MilestoneView, ServiceError> {
        user.require(Capability::ManageMilestones)?;
        let current = self.load(user, id).await?;
        if current.is_completed == completed {
            return Ok(MilestoneView::at(current, Utc::now()));
        }

        let mut active: milestone::ActiveModel = current.into();
        active.is_completed = Set(completed);
        active.completed_at = Set(completed.then(Utc::now));
        let updated = active.update(self.db.as_ref()).await?;
        self.log(user, &updated, if completed { "completed" } else { "reopened" })
            .await?;
        Ok(MilestoneView::at(updated, Utc::now()))
    }

    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn delete(&self, user: &AuthUser, id: Uuid) -> Result<(), ServiceError> {
        user.require(Capability::ManageMilestones)?;
        let current = self.load(user, id).await?;
        let mut active: milestone::ActiveModel = current.clone().into();
        active.is_deleted = Set(true);
        active.update(self.db.as_ref()).await?;
        self.log(user, &current, "deleted").await
    }
}
