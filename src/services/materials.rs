use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::access::AccessControl;
use super::activity::{self, ActivityEntry, Notice};
use crate::auth::{AuthUser, Capability, Role};
use crate::db::DbPool;
use crate::entities::{decode_url_list, encode_url_list, item_material, material, scope_item};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::metrics::record_transition;
use crate::workflow::material::{next_status, MaterialAction, MaterialDecision, MaterialStatus};

const ENTITY: &str = "material";

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateMaterialRequest {
    #[validate(length(min = 1, max = 50))]
    pub material_code: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub specification: Option<String>,
    pub supplier: Option<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
    /// Scope items this material is used on.
    #[serde(default)]
    pub item_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateMaterialRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub specification: Option<String>,
    pub supplier: Option<String>,
    pub image_urls: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct MaterialDecisionRequest {
    pub decision: MaterialDecision,
    pub comments: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct LinkItemsRequest {
    pub item_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MaterialView {
    pub id: Uuid,
    pub project_id: Uuid,
    pub material_code: String,
    pub name: String,
    pub specification: Option<String>,
    pub supplier: Option<String>,
    pub image_urls: Vec<String>,
    pub status: String,
    pub sent_to_client_at: Option<chrono::DateTime<Utc>>,
    pub client_response_at: Option<chrono::DateTime<Utc>>,
    pub client_comments: Option<String>,
    pub approved_by: Option<Uuid>,
    pub decided_at: Option<chrono::DateTime<Utc>>,
    pub item_ids: Vec<Uuid>,
}

impl MaterialView {
    fn new(model: material::Model, item_ids: Vec<Uuid>) -> Self {
        Self {
            id: model.id,
            project_id: model.project_id,
            image_urls: decode_url_list(&model.image_urls),
            material_code: model.material_code,
            name: model.name,
            specification: model.specification,
            supplier: model.supplier,
            status: model.status,
            sent_to_client_at: model.sent_to_client_at,
            client_response_at: model.client_response_at,
            client_comments: model.client_comments,
            approved_by: model.approved_by,
            decided_at: model.decided_at,
            item_ids,
        }
    }
}

#[derive(Clone)]
pub struct MaterialService {
    db: Arc<DbPool>,
    access: AccessControl,
    events: EventSender,
}

impl MaterialService {
    pub fn new(db: Arc<DbPool>, access: AccessControl, events: EventSender) -> Self {
        Self { db, access, events }
    }

    async fn load(&self, user: &AuthUser, id: Uuid) -> Result<material::Model, ServiceError> {
        let row = material::Entity::find_by_id(id)
            .filter(material::Column::IsDeleted.eq(false))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::not_found(ENTITY, id))?;
        self.access.ensure(user, row.project_id).await?;
        Ok(row)
    }

    async fn linked_items<C: ConnectionTrait>(db: &C, material_id: Uuid) -> Result<Vec<Uuid>, ServiceError> {
        let ids = item_material::Entity::find()
            .select_only()
            .column(item_material::Column::ItemId)
            .filter(item_material::Column::MaterialId.eq(material_id))
            .filter(item_material::Column::IsDeleted.eq(false))
            .into_tuple::<Uuid>()
            .all(db)
            .await?;
        Ok(ids)
    }

    async fn view(&self, model: material::Model) -> Result<MaterialView, ServiceError> {
        let items = Self::linked_items(self.db.as_ref(), model.id).await?;
        Ok(MaterialView::new(model, items))
    }

    /// Links items that belong to the material's project and are not already linked.
    async fn link<C: ConnectionTrait>(
        db: &C,
        material: &material::Model,
        item_ids: &[Uuid],
    ) -> Result<(), ServiceError> {
        if item_ids.is_empty() {
            return Ok(());
        }
        let valid = scope_item::Entity::find()
            .select_only()
            .column(scope_item::Column::Id)
            .filter(scope_item::Column::Id.is_in(item_ids.to_vec()))
            .filter(scope_item::Column::ProjectId.eq(material.project_id))
            .filter(scope_item::Column::IsDeleted.eq(false))
            .into_tuple::<Uuid>()
            .all(db)
            .await?;
        if let Some(missing) = item_ids.iter().find(|id| !valid.contains(id)) {
            return Err(ServiceError::ValidationError(format!(
                "scope item {} is not part of project {}",
                missing, material.project_id
            )));
        }

        let existing = Self::linked_items(db, material.id).await?;
        for item_id in valid.into_iter().filter(|id| !existing.contains(id)) {
            // A previously unlinked pair is revived rather than duplicated.
            let revived = item_material::Entity::update_many()
                .col_expr(item_material::Column::IsDeleted, Expr::value(false))
                .col_expr(item_material::Column::DeletedAt, Expr::value(Option::<DateTime<Utc>>::None))
                .col_expr(item_material::Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(item_material::Column::MaterialId.eq(material.id))
                .filter(item_material::Column::ItemId.eq(item_id))
                .filter(item_material::Column::IsDeleted.eq(true))
                .exec(db)
                .await?;
            if revived.rows_affected > 0 {
                continue;
            }
            item_material::ActiveModel {
                item_id: Set(item_id),
                material_id: Set(material.id),
                ..Default::default()
            }
            .insert(db)
            .await?;
        }
        Ok(())
    }

    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn list(&self, user: &AuthUser, project_id: Uuid) -> Result<Vec<MaterialView>, ServiceError> {
        self.access.project(user, project_id).await?;
        let rows = material::Entity::find()
            .filter(material::Column::ProjectId.eq(project_id))
            .filter(material::Column::IsDeleted.eq(false))
            .order_by_asc(material::Column::MaterialCode)
            .all(self.db.as_ref())
            .await?;

        let mut views = Vec::with_capacity(rows.len());
        for row in rows {
            views.push(self.view(row).await?);
        }
        Ok(views)
    }

    pub async fn get(&self, user: &AuthUser, id: Uuid) -> Result<MaterialView, ServiceError> {
        let row = self.load(user, id).await?;
        self.view(row).await
    }

    #[instrument(skip(self, user, request), fields(user_id = %user.user_id, code = %request.material_code))]
    pub async fn create(
        &self,
        user: &AuthUser,
        project_id: Uuid,
        request: CreateMaterialRequest,
    ) -> Result<MaterialView, ServiceError> {
        user.require(Capability::ManageMaterials)?;
        request.validate()?;
        self.access.project(user, project_id).await?;

        let txn = self.db.begin().await?;
        let created = material::ActiveModel {
            project_id: Set(project_id),
            material_code: Set(request.material_code),
            name: Set(request.name),
            specification: Set(request.specification),
            supplier: Set(request.supplier),
            image_urls: Set(encode_url_list(&request.image_urls)),
            status: Set(MaterialStatus::Pending.to_string()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        Self::link(&txn, &created, &request.item_ids).await?;

        activity::record(
            &txn,
            user,
            ActivityEntry {
                project_id,
                entity_type: ENTITY,
                entity_id: created.id,
                action: "created".into(),
                details: serde_json::json!({ "material_code": created.material_code }),
            },
            None,
        )
        .await?;
        txn.commit().await?;

        info!(material_id = %created.id, "material created");
        self.view(created).await
    }

    #[instrument(skip(self, user, request), fields(user_id = %user.user_id))]
    pub async fn update(
        &self,
        user: &AuthUser,
        id: Uuid,
        request: UpdateMaterialRequest,
    ) -> Result<MaterialView, ServiceError> {
        user.require(Capability::ManageMaterials)?;
        request.validate()?;
        let current = self.load(user, id).await?;
        if MaterialStatus::parse(&current.status)?.is_terminal() {
            return Err(ServiceError::Conflict(format!(
                "material {} is {} and can no longer be edited",
                current.material_code, current.status
            )));
        }

        let mut active: material::ActiveModel = current.into();
        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if request.specification.is_some() {
            active.specification = Set(request.specification);
        }
        if request.supplier.is_some() {
            active.supplier = Set(request.supplier);
        }
        if let Some(urls) = request.image_urls {
            active.image_urls = Set(encode_url_list(&urls));
        }
        let updated = active.update(self.db.as_ref()).await?;
        self.view(updated).await
    }

    pub async fn link_items(
        &self,
        user: &AuthUser,
        id: Uuid,
        request: LinkItemsRequest,
    ) -> Result<MaterialView, ServiceError> {
        user.require(Capability::ManageMaterials)?;
        let current = self.load(user, id).await?;
        Self::link(self.db.as_ref(), &current, &request.item_ids).await?;
        self.view(current).await
    }

    pub async fn unlink_item(
        &self,
        user: &AuthUser,
        id: Uuid,
        item_id: Uuid,
    ) -> Result<MaterialView, ServiceError> {
        user.require(Capability::ManageMaterials)?;
        let current = self.load(user, id).await?;
        let now = Utc::now();
        item_material::Entity::update_many()
            .col_expr(item_material::Column::IsDeleted, Expr::value(true))
            .col_expr(item_material::Column::DeletedAt, Expr::value(Some(now)))
            .col_expr(item_material::Column::UpdatedAt, Expr::value(now))
            .filter(item_material::Column::MaterialId.eq(current.id))
            .filter(item_material::Column::ItemId.eq(item_id))
            .filter(item_material::Column::IsDeleted.eq(false))
            .exec(self.db.as_ref())
            .await?;
        self.view(current).await
    }

    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn delete(&self, user: &AuthUser, id: Uuid) -> Result<(), ServiceError> {
        user.require(Capability::ManageMaterials)?;
        let current = self.load(user, id).await?;
        let project_id = current.project_id;

        let mut active: material::ActiveModel = current.into();
        active.is_deleted = Set(true);
        active.update(self.db.as_ref()).await?;

        activity::record(
            self.db.as_ref(),
            user,
            ActivityEntry {
                project_id,
                entity_type: ENTITY,
                entity_id: id,
                action: "deleted".into(),
                details: serde_json::json!({}),
            },
            None,
        )
        .await?;
        Ok(())
    }

    fn plan(current: &material::Model, action: MaterialAction) -> Result<(MaterialStatus, MaterialStatus), ServiceError> {
        let from = MaterialStatus::parse(&current.status)?;
        match next_status(from, action) {
            Ok(to) => Ok((from, to)),
            Err(e) => {
                record_transition(ENTITY, action.name(), false);
                warn!(material_id = %current.id, from = %from, action = action.name(), "material transition rejected");
                Err(e.into())
            }
        }
    }

    async fn guarded_update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        from: MaterialStatus,
        mut changes: material::ActiveModel,
    ) -> Result<material::Model, ServiceError> {
        changes.updated_at = Set(Utc::now());
        let result = material::Entity::update_many()
            .set(changes)
            .filter(material::Column::Id.eq(id))
            .filter(material::Column::Status.eq(from.as_ref()))
            .exec(db)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::Conflict(format!(
                "material {} changed status concurrently",
                id
            )));
        }
        material::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found(ENTITY, id))
    }

    async fn announce(&self, updated: &material::Model, action: MaterialAction) {
        record_transition(ENTITY, action.name(), true);
        info!(material_id = %updated.id, status = %updated.status, action = action.name(), "material transitioned");
        self.events
            .publish(Event::MaterialTransitioned {
                project_id: updated.project_id,
                material_id: updated.id,
                material_code: updated.material_code.clone(),
                action: action.name().to_string(),
                status: updated.status.clone(),
            })
            .await;
    }

    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn send_to_client(&self, user: &AuthUser, id: Uuid) -> Result<MaterialView, ServiceError> {
        user.require(Capability::ManageMaterials)?;
        let current = self.load(user, id).await?;
        let action = MaterialAction::SendToClient;
        let (from, to) = Self::plan(&current, action)?;

        let txn = self.db.begin().await?;
        let mut changes = <material::ActiveModel as Default>::default();
        changes.status = Set(to.to_string());
        changes.sent_to_client_at = Set(Some(Utc::now()));
        let updated = Self::guarded_update(&txn, current.id, from, changes).await?;

        activity::record(
            &txn,
            user,
            ActivityEntry {
                project_id: updated.project_id,
                entity_type: ENTITY,
                entity_id: updated.id,
                action: action.name().into(),
                details: serde_json::json!({ "from": from, "to": to }),
            },
            Some(Notice {
                roles: &[Role::Client],
                kind: "material_sent",
                title: format!("Material {} ready for review", updated.material_code),
                message: format!("Please approve or reject {}.", updated.name),
            }),
        )
        .await?;
        txn.commit().await?;

        self.announce(&updated, action).await;
        self.view(updated).await
    }

    /// Approve or reject. Deciding straight from `pending` skips the client and
    /// needs [`Capability::DecideMaterialDirectly`].
    #[instrument(skip(self, user, request), fields(user_id = %user.user_id, decision = %request.decision))]
    pub async fn decide(
        &self,
        user: &AuthUser,
        id: Uuid,
        request: MaterialDecisionRequest,
    ) -> Result<MaterialView, ServiceError> {
        user.require(Capability::DecideMaterial)?;
        let current = self.load(user, id).await?;
        let action = MaterialAction::Decide(request.decision);
        let (from, to) = Self::plan(&current, action)?;
        if from == MaterialStatus::Pending {
            user.require(Capability::DecideMaterialDirectly)?;
        }

        let now = Utc::now();
        let txn = self.db.begin().await?;
        let mut changes = <material::ActiveModel as Default>::default();
        changes.status = Set(to.to_string());
        changes.decided_at = Set(Some(now));
        changes.approved_by = Set(Some(user.user_id));
        if from == MaterialStatus::SentToClient {
            changes.client_response_at = Set(Some(now));
            changes.client_comments = Set(request.comments.clone().filter(|c| !c.trim().is_empty()));
        }
        let updated = Self::guarded_update(&txn, current.id, from, changes).await?;

        activity::record(
            &txn,
            user,
            ActivityEntry {
                project_id: updated.project_id,
                entity_type: ENTITY,
                entity_id: updated.id,
                action: action.name().into(),
                details: serde_json::json!({
                    "from": from,
                    "to": to,
                    "comments": request.comments,
                }),
            },
            Some(Notice {
                roles: &[Role::Pm, Role::Procurement],
                kind: "material_decision",
                title: format!("Material {} {}", updated.material_code, to),
                message: format!("{} was {}.", updated.name, to),
            }),
        )
        .await?;
        txn.commit().await?;

        self.announce(&updated, action).await;
        self.view(updated).await
    }
}
