use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::access::AccessControl;
use super::activity::{self, ActivityEntry};
use crate::auth::{AuthUser, Capability};
use crate::db::DbPool;
use crate::entities::scope_item::{self, ItemPath, ScopeItemStatus};
use crate::errors::ServiceError;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateScopeItemRequest {
    #[validate(length(min = 1, max = 50))]
    pub item_code: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub item_path: ItemPath,
    #[serde(default)]
    pub status: ScopeItemStatus,
    #[validate(range(min = 0.0))]
    pub quantity: f64,
    pub unit: Option<String>,
    #[validate(range(min = 0, max = 100))]
    #[serde(default)]
    pub production_percentage: i32,
    #[validate(range(min = 0.0))]
    pub initial_unit_cost: Option<f64>,
    /// Defaults to `initial_unit_cost * quantity`.
    #[validate(range(min = 0.0))]
    pub initial_total_cost: Option<f64>,
    #[validate(range(min = 0.0))]
    pub actual_unit_cost: Option<f64>,
    #[validate(range(min = 0.0))]
    pub unit_sales_price: Option<f64>,
    pub notes: Option<String>,
}

/// Initial cost fields are deliberately absent: the tender baseline never changes.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateScopeItemRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub item_path: Option<ItemPath>,
    pub status: Option<ScopeItemStatus>,
    #[validate(range(min = 0.0))]
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    #[validate(range(min = 0.0))]
    pub actual_unit_cost: Option<f64>,
    #[validate(range(min = 0.0))]
    pub unit_sales_price: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateProgressRequest {
    pub production_percentage: i32,
    pub status: Option<ScopeItemStatus>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct BulkItemUpdate {
    pub id: Uuid,
    pub status: Option<ScopeItemStatus>,
    pub production_percentage: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct BulkUpdateRequest {
    pub items: Vec<BulkItemUpdate>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BulkFailure {
    pub id: Uuid,
    pub reason: String,
}

/// Per-row result of a bulk update. Rows are applied independently; a failed
/// row does not undo the rows before it.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct BulkOutcome {
    pub succeeded: Vec<Uuid>,
    pub failed: Vec<BulkFailure>,
}

fn times(unit: Option<f64>, quantity: f64) -> Option<f64> {
    unit.map(|u| u * quantity)
}

fn check_percentage(value: i32) -> Result<(), ServiceError> {
    if (0..=100).contains(&value) {
        Ok(())
    } else {
        Err(ServiceError::ValidationError(format!(
            "production_percentage must be between 0 and 100, got {}",
            value
        )))
    }
}

/// Clears every cost and price field for roles that cannot see them.
pub fn redact_item(mut item: scope_item::Model, user: &AuthUser) -> scope_item::Model {
    if !user.sees_costs() {
        item.initial_unit_cost = None;
        item.initial_total_cost = None;
        item.actual_unit_cost = None;
        item.actual_total_cost = None;
        item.unit_sales_price = None;
        item.total_sales_price = None;
    }
    item
}

#[derive(Clone)]
pub struct ScopeItemService {
    db: Arc<DbPool>,
    access: AccessControl,
}

impl ScopeItemService {
    pub fn new(db: Arc<DbPool>, access: AccessControl) -> Self {
        Self { db, access }
    }

    /// Loads a live item and checks the user can see its project.
    pub(crate) async fn load(
        &self,
        user: &AuthUser,
        id: Uuid,
    ) -> Result<scope_item::Model, ServiceError> {
        let item = scope_item::Entity::find_by_id(id)
            .filter(scope_item::Column::IsDeleted.eq(false))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::not_found("scope item", id))?;
        self.access.ensure(user, item.project_id).await?;
        Ok(item)
    }

    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn list(
        &self,
        user: &AuthUser,
        project_id: Uuid,
    ) -> Result<Vec<scope_item::Model>, ServiceError> {
        self.access.project(user, project_id).await?;
        let items = scope_item::Entity::find()
            .filter(scope_item::Column::ProjectId.eq(project_id))
            .filter(scope_item::Column::IsDeleted.eq(false))
            .order_by_asc(scope_item::Column::ItemCode)
            .all(self.db.as_ref())
            .await?;
        Ok(items.into_iter().map(|i| redact_item(i, user)).collect())
    }

    pub async fn get(&self, user: &AuthUser, id: Uuid) -> Result<scope_item::Model, ServiceError> {
        let item = self.load(user, id).await?;
        Ok(redact_item(item, user))
    }

    /// Inserts without permission checks; callers have already authorised the project.
    pub(crate) async fn insert(
        &self,
        project_id: Uuid,
        mut request: CreateScopeItemRequest,
    ) -> Result<scope_item::Model, ServiceError> {
        request.item_code = request.item_code.trim().to_string();
        request.name = request.name.trim().to_string();
        request.validate()?;

        let duplicate = scope_item::Entity::find()
            .filter(scope_item::Column::ProjectId.eq(project_id))
            .filter(scope_item::Column::ItemCode.eq(request.item_code.as_str()))
            .filter(scope_item::Column::IsDeleted.eq(false))
            .count(self.db.as_ref())
            .await?;
        if duplicate > 0 {
            return Err(ServiceError::Conflict(format!(
                "item code {} already exists in project",
                request.item_code
            )));
        }

        let quantity = request.quantity;
        let initial_total = request
            .initial_total_cost
            .or_else(|| times(request.initial_unit_cost, quantity));

        let item = scope_item::ActiveModel {
            project_id: Set(project_id),
            item_code: Set(request.item_code),
            name: Set(request.name),
            description: Set(request.description),
            item_path: Set(request.item_path.to_string()),
            status: Set(request.status.to_string()),
            quantity: Set(quantity),
            unit: Set(request.unit),
            production_percentage: Set(request.production_percentage),
            initial_unit_cost: Set(request.initial_unit_cost),
            initial_total_cost: Set(initial_total),
            actual_unit_cost: Set(request.actual_unit_cost),
            actual_total_cost: Set(times(request.actual_unit_cost, quantity)),
            unit_sales_price: Set(request.unit_sales_price),
            total_sales_price: Set(times(request.unit_sales_price, quantity)),
            notes: Set(request.notes),
            ..Default::default()
        }
        .insert(self.db.as_ref())
        .await?;
        Ok(item)
    }

    #[instrument(skip(self, user, request), fields(user_id = %user.user_id, item_code = %request.item_code))]
    pub async fn create(
        &self,
        user: &AuthUser,
        project_id: Uuid,
        request: CreateScopeItemRequest,
    ) -> Result<scope_item::Model, ServiceError> {
        user.require(Capability::ManageScopeItems)?;
        self.access.project(user, project_id).await?;

        let item = self.insert(project_id, request).await?;
        activity::record(
            self.db.as_ref(),
            user,
            ActivityEntry {
                project_id,
                entity_type: "scope_item",
                entity_id: item.id,
                action: "created".into(),
                details: serde_json::json!({ "item_code": item.item_code }),
            },
            None,
        )
        .await?;
        info!(item_id = %item.id, "scope item created");
        Ok(redact_item(item, user))
    }

    #[instrument(skip(self, user, request), fields(user_id = %user.user_id))]
    pub async fn update(
        &self,
        user: &AuthUser,
        id: Uuid,
        mut request: UpdateScopeItemRequest,
    ) -> Result<scope_item::Model, ServiceError> {
        user.require(Capability::ManageScopeItems)?;
        request.name = request.name.map(|name| name.trim().to_string());
        request.validate()?;
        let item = self.load(user, id).await?;

        let quantity = request.quantity.unwrap_or(item.quantity);
        let actual_unit = request.actual_unit_cost.or(item.actual_unit_cost);
        let sales_unit = request.unit_sales_price.or(item.unit_sales_price);

        let mut active: scope_item::ActiveModel = item.into();
        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if request.description.is_some() {
            active.description = Set(request.description);
        }
        if let Some(path) = request.item_path {
            active.item_path = Set(path.to_string());
        }
        if let Some(status) = request.status {
            active.status = Set(status.to_string());
        }
        if request.unit.is_some() {
            active.unit = Set(request.unit);
        }
        if request.notes.is_some() {
            active.notes = Set(request.notes);
        }
        active.quantity = Set(quantity);
        active.actual_unit_cost = Set(actual_unit);
        active.actual_total_cost = Set(times(actual_unit, quantity));
        active.unit_sales_price = Set(sales_unit);
        active.total_sales_price = Set(times(sales_unit, quantity));

        let updated = active.update(self.db.as_ref()).await?;
        Ok(redact_item(updated, user))
    }

    #[instrument(skip(self, user, request), fields(user_id = %user.user_id))]
    pub async fn update_progress(
        &self,
        user: &AuthUser,
        id: Uuid,
        request: UpdateProgressRequest,
    ) -> Result<scope_item::Model, ServiceError> {
        user.require(Capability::UpdateProduction)?;
        check_percentage(request.production_percentage)?;
        let item = self.load(user, id).await?;
        let project_id = item.project_id;
        let previous = item.production_percentage;

        let mut active: scope_item::ActiveModel = item.into();
        active.production_percentage = Set(request.production_percentage);
        if let Some(status) = request.status {
            active.status = Set(status.to_string());
        }
        let updated = active.update(self.db.as_ref()).await?;

        activity::record(
            self.db.as_ref(),
            user,
            ActivityEntry {
                project_id,
                entity_type: "scope_item",
                entity_id: id,
                action: "progress_updated".into(),
                details: serde_json::json!({
                    "from": previous,
                    "to": updated.production_percentage,
                }),
            },
            None,
        )
        .await?;
        Ok(redact_item(updated, user))
    }

    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn delete(&self, user: &AuthUser, id: Uuid) -> Result<(), ServiceError> {
        user.require(Capability::ManageScopeItems)?;
        let item = self.load(user, id).await?;
        let project_id = item.project_id;

        let mut active: scope_item::ActiveModel = item.into();
        active.is_deleted = Set(true);
        active.update(self.db.as_ref()).await?;

        activity::record(
            self.db.as_ref(),
            user,
            ActivityEntry {
                project_id,
                entity_type: "scope_item",
                entity_id: id,
                action: "deleted".into(),
                details: serde_json::json!({}),
            },
            None,
        )
        .await?;
        Ok(())
    }

    /// Applies each row on its own; see [`BulkOutcome`].
    #[instrument(skip(self, user, request), fields(user_id = %user.user_id, rows = request.items.len()))]
    pub async fn bulk_update(
        &self,
        user: &AuthUser,
        project_id: Uuid,
        request: BulkUpdateRequest,
    ) -> Result<BulkOutcome, ServiceError> {
        if request.items.iter().any(|row| row.status.is_some()) {
            user.require(Capability::ManageScopeItems)?;
        }
        if request
            .items
            .iter()
            .any(|row| row.production_percentage.is_some())
        {
            user.require(Capability::UpdateProduction)?;
        }
        self.access.project(user, project_id).await?;

        let mut outcome = BulkOutcome::default();
        for row in request.items {
            match self.apply_bulk_row(project_id, &row).await {
                Ok(()) => outcome.succeeded.push(row.id),
                Err(e) => {
                    warn!(item_id = %row.id, error = %e, "bulk row failed");
                    outcome.failed.push(BulkFailure {
                        id: row.id,
                        reason: e.response_message(),
                    });
                }
            }
        }

        activity::record(
            self.db.as_ref(),
            user,
            ActivityEntry {
                project_id,
                entity_type: "scope_item",
                entity_id: project_id,
                action: "bulk_updated".into(),
                details: serde_json::json!({
                    "succeeded": outcome.succeeded.len(),
                    "failed": outcome.failed.len(),
                }),
            },
            None,
        )
        .await?;
        Ok(outcome)
    }

    async fn apply_bulk_row(&self, project_id: Uuid, row: &BulkItemUpdate) -> Result<(), ServiceError> {
        if row.status.is_none() && row.production_percentage.is_none() {
            return Err(ServiceError::ValidationError("nothing to update".into()));
        }
        if let Some(pct) = row.production_percentage {
            check_percentage(pct)?;
        }

        let item = scope_item::Entity::find_by_id(row.id)
            .filter(scope_item::Column::ProjectId.eq(project_id))
            .filter(scope_item::Column::IsDeleted.eq(false))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::not_found("scope item", row.id))?;

        let mut active: scope_item::ActiveModel = item.into();
        if let Some(status) = row.status {
            active.status = Set(status.to_string());
        }
        if let Some(pct) = row.production_percentage {
            active.production_percentage = Set(pct);
        }
        active.update(self.db.as_ref()).await?;
        Ok(())
    }
}
