use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::access::AccessControl;
use super::activity::{self, ActivityEntry};
use crate::auth::{AuthUser, Capability};
use crate::db::DbPool;
use crate::entities::project::{self, ProjectStatus};
use crate::entities::{project_assignment, user};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 50))]
    pub project_code: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 200))]
    pub client_name: String,
    pub status: Option<ProjectStatus>,
    #[serde(default = "default_currency")]
    #[validate(length(equal = 3))]
    pub currency: String,
    #[validate(range(min = 0.0))]
    pub contract_value: Option<f64>,
    pub start_date: Option<DateTime<Utc>>,
    pub installation_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub client_name: Option<String>,
    pub status: Option<ProjectStatus>,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
    #[validate(range(min = 0.0))]
    pub contract_value: Option<f64>,
    pub start_date: Option<DateTime<Utc>>,
    pub installation_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct AssignUserRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AssignmentView {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub assigned_at: DateTime<Utc>,
}

/// Hides the contract value from roles that cannot see costs.
pub fn redact_project(mut project: project::Model, user: &AuthUser) -> project::Model {
    if !user.sees_costs() {
        project.contract_value = None;
    }
    project
}

#[derive(Clone)]
pub struct ProjectService {
    db: Arc<DbPool>,
    access: AccessControl,
    events: EventSender,
}

impl ProjectService {
    pub fn new(db: Arc<DbPool>, access: AccessControl, events: EventSender) -> Self {
        Self { db, access, events }
    }

    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn list(&self, user: &AuthUser) -> Result<Vec<project::Model>, ServiceError> {
        let scope = self.access.scope_for(user).await?;
        let projects = project::Entity::find()
            .filter(project::Column::IsDeleted.eq(false))
            .filter(scope.condition(project::Column::Id))
            .order_by_desc(project::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?;
        Ok(projects
            .into_iter()
            .map(|p| redact_project(p, user))
            .collect())
    }

    pub async fn get(&self, user: &AuthUser, id: Uuid) -> Result<project::Model, ServiceError> {
        let project = self.access.project(user, id).await?;
        Ok(redact_project(project, user))
    }

    #[instrument(skip(self, user, request), fields(user_id = %user.user_id, code = %request.project_code))]
    pub async fn create(
        &self,
        user: &AuthUser,
        request: CreateProjectRequest,
    ) -> Result<project::Model, ServiceError> {
        user.require(Capability::ManageProjects)?;
        request.validate()?;

        let taken = project::Entity::find()
            .filter(project::Column::ProjectCode.eq(request.project_code.as_str()))
            .count(self.db.as_ref())
            .await?;
        if taken > 0 {
            return Err(ServiceError::Conflict(format!(
                "project code {} already exists",
                request.project_code
            )));
        }

        let created = project::ActiveModel {
            project_code: Set(request.project_code),
            name: Set(request.name),
            client_name: Set(request.client_name),
            status: Set(request.status.unwrap_or(ProjectStatus::Tender).to_string()),
            currency: Set(request.currency.to_uppercase()),
            contract_value: Set(request.contract_value),
            start_date: Set(request.start_date),
            installation_date: Set(request.installation_date),
            ..Default::default()
        }
        .insert(self.db.as_ref())
        .await?;

        // Creators without global visibility would otherwise lose sight of their own project.
        if !user.can(Capability::ViewAllProjects) {
            project_assignment::ActiveModel {
                project_id: Set(created.id),
                user_id: Set(user.user_id),
                assigned_by: Set(Some(user.user_id)),
                ..Default::default()
            }
            .insert(self.db.as_ref())
            .await?;
            self.access.forget(user.user_id);
        }

        activity::record(
            self.db.as_ref(),
            user,
            ActivityEntry {
                project_id: created.id,
                entity_type: "project",
                entity_id: created.id,
                action: "created".into(),
                details: serde_json::json!({ "project_code": created.project_code }),
            },
            None,
        )
        .await?;

        info!(project_id = %created.id, "project created");
        Ok(redact_project(created, user))
    }

    #[instrument(skip(self, user, request), fields(user_id = %user.user_id))]
    pub async fn update(
        &self,
        user: &AuthUser,
        id: Uuid,
        request: UpdateProjectRequest,
    ) -> Result<project::Model, ServiceError> {
        user.require(Capability::ManageProjects)?;
        request.validate()?;
        let existing = self.access.project(user, id).await?;

        let mut active: project::ActiveModel = existing.into();
        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(client_name) = request.client_name {
            active.client_name = Set(client_name);
        }
        if let Some(status) = request.status {
            active.status = Set(status.to_string());
        }
        if let Some(currency) = request.currency {
            active.currency = Set(currency.to_uppercase());
        }
        if request.contract_value.is_some() {
            active.contract_value = Set(request.contract_value);
        }
        if request.start_date.is_some() {
            active.start_date = Set(request.start_date);
        }
        if request.installation_date.is_some() {
            active.installation_date = Set(request.installation_date);
        }

        let updated = active.update(self.db.as_ref()).await?;
        Ok(redact_project(updated, user))
    }

    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn delete(&self, user: &AuthUser, id: Uuid) -> Result<(), ServiceError> {
        user.require(Capability::ManageProjects)?;
        let existing = self.access.project(user, id).await?;

        let mut active: project::ActiveModel = existing.into();
        active.is_deleted = Set(true);
        active.update(self.db.as_ref()).await?;

        activity::record(
            self.db.as_ref(),
            user,
            ActivityEntry {
                project_id: id,
                entity_type: "project",
                entity_id: id,
                action: "deleted".into(),
                details: serde_json::json!({}),
            },
            None,
        )
        .await?;
        info!(project_id = %id, "project soft-deleted");
        Ok(())
    }

    pub async fn assignments(
        &self,
        user: &AuthUser,
        project_id: Uuid,
    ) -> Result<Vec<AssignmentView>, ServiceError> {
        self.access.project(user, project_id).await?;
        let rows = project_assignment::Entity::find()
            .filter(project_assignment::Column::ProjectId.eq(project_id))
            .filter(project_assignment::Column::IsDeleted.eq(false))
            .find_also_related(user::Entity)
            .order_by_asc(project_assignment::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(assignment, member)| {
                member.map(|m| AssignmentView {
                    user_id: m.id,
                    name: m.name,
                    email: m.email,
                    role: m.role,
                    assigned_at: assignment.created_at,
                })
            })
            .collect())
    }

    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn assign(
        &self,
        user: &AuthUser,
        project_id: Uuid,
        request: AssignUserRequest,
    ) -> Result<project_assignment::Model, ServiceError> {
        user.require(Capability::ManageProjects)?;
        self.access.project(user, project_id).await?;

        let member = user::Entity::find_by_id(request.user_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::not_found("user", request.user_id))?;
        if !member.is_active {
            return Err(ServiceError::ValidationError(format!(
                "user {} is inactive",
                member.id
            )));
        }

        let existing = project_assignment::Entity::find()
            .filter(project_assignment::Column::ProjectId.eq(project_id))
            .filter(project_assignment::Column::UserId.eq(member.id))
            .one(self.db.as_ref())
            .await?;

        let assignment = match existing {
            Some(row) if !row.is_deleted => {
                return Err(ServiceError::Conflict(format!(
                    "user {} is already assigned to project {}",
                    member.id, project_id
                )));
            }
            Some(row) => {
                let mut active: project_assignment::ActiveModel = row.into();
                active.is_deleted = Set(false);
                active.deleted_at = Set(None);
                active.assigned_by = Set(Some(user.user_id));
                active.update(self.db.as_ref()).await?
            }
            None => {
                project_assignment::ActiveModel {
                    project_id: Set(project_id),
                    user_id: Set(member.id),
                    assigned_by: Set(Some(user.user_id)),
                    ..Default::default()
                }
                .insert(self.db.as_ref())
                .await?
            }
        };
        self.access.forget(member.id);

        activity::record(
            self.db.as_ref(),
            user,
            ActivityEntry {
                project_id,
                entity_type: "project",
                entity_id: project_id,
                action: "user_assigned".into(),
                details: serde_json::json!({ "user_id": member.id, "role": member.role }),
            },
            None,
        )
        .await?;

        self.events
            .publish(Event::UserAssigned {
                project_id,
                user_id: member.id,
            })
            .await;
        Ok(assignment)
    }

    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn unassign(
        &self,
        user: &AuthUser,
        project_id: Uuid,
        member_id: Uuid,
    ) -> Result<(), ServiceError> {
        user.require(Capability::ManageProjects)?;
        self.access.project(user, project_id).await?;

        let now = Utc::now();
        let result = project_assignment::Entity::update_many()
            .col_expr(project_assignment::Column::IsDeleted, Expr::value(true))
            .col_expr(project_assignment::Column::DeletedAt, Expr::value(Some(now)))
            .col_expr(project_assignment::Column::UpdatedAt, Expr::value(now))
            .filter(project_assignment::Column::ProjectId.eq(project_id))
            .filter(project_assignment::Column::UserId.eq(member_id))
            .filter(project_assignment::Column::IsDeleted.eq(false))
            .exec(self.db.as_ref())
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "user {} is not assigned to project {}",
                member_id, project_id
            )));
        }
        self.access.forget(member_id);

        activity::record(
            self.db.as_ref(),
            user,
            ActivityEntry {
                project_id,
                entity_type: "project",
                entity_id: project_id,
                action: "user_unassigned".into(),
                details: serde_json::json!({ "user_id": member_id }),
            },
            None,
        )
        .await?;
        Ok(())
    }
}
