use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::access::AccessControl;
use super::activity::{self, ActivityEntry, Notice};
use super::scope_items::ScopeItemService;
use crate::auth::{AuthUser, Capability, Role};
use crate::db::DbPool;
use crate::entities::scope_item::{self, ScopeItemStatus};
use crate::entities::{drawing, drawing_revision};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::metrics::record_transition;
use crate::workflow::drawing::{
    available_actions, next_status, revision_code, ClientDecision, DrawingAction, DrawingStatus,
};

const ENTITY: &str = "drawing";

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UploadDrawingRequest {
    #[validate(length(min = 1, max = 2048))]
    pub file_url: String,
    #[validate(length(min = 1, max = 255))]
    pub file_name: String,
    #[validate(range(min = 0))]
    pub file_size: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ClientDecisionRequest {
    pub decision: ClientDecision,
    pub comments: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct OverrideRequest {
    #[validate(length(min = 1, max = 2000))]
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DrawingView {
    pub item_id: Uuid,
    #[schema(value_type = Option<Object>)]
    pub drawing: Option<drawing::Model>,
    #[schema(value_type = Vec<Object>)]
    pub revisions: Vec<drawing_revision::Model>,
    /// Actions the caller may take from the current status.
    pub available_actions: Vec<String>,
}

fn capability_for(action: DrawingAction) -> Capability {
    match action {
        DrawingAction::Upload => Capability::UploadDrawings,
        DrawingAction::SendToClient => Capability::SendDrawingsToClient,
        DrawingAction::RecordDecision(_) => Capability::RecordClientDecision,
        DrawingAction::Override => Capability::OverrideDrawing,
    }
}

#[derive(Clone)]
pub struct DrawingService {
    db: Arc<DbPool>,
    access: AccessControl,
    items: ScopeItemService,
    events: EventSender,
}

impl DrawingService {
    pub fn new(
        db: Arc<DbPool>,
        access: AccessControl,
        items: ScopeItemService,
        events: EventSender,
    ) -> Self {
        Self {
            db,
            access,
            items,
            events,
        }
    }

    async fn load(&self, user: &AuthUser, id: Uuid) -> Result<drawing::Model, ServiceError> {
        let drawing = drawing::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::not_found(ENTITY, id))?;
        self.access.ensure(user, drawing.project_id).await?;
        Ok(drawing)
    }

    async fn production_item(
        &self,
        user: &AuthUser,
        item_id: Uuid,
    ) -> Result<scope_item::Model, ServiceError> {
        let item = self.items.load(user, item_id).await?;
        if !item.is_production_path() {
            return Err(ServiceError::ValidationError(format!(
                "scope item {} is on the procurement path and has no drawing",
                item.item_code
            )));
        }
        Ok(item)
    }

    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn for_item(&self, user: &AuthUser, item_id: Uuid) -> Result<DrawingView, ServiceError> {
        let item = self.items.load(user, item_id).await?;
        let drawing = drawing::Entity::find()
            .filter(drawing::Column::ItemId.eq(item.id))
            .one(self.db.as_ref())
            .await?;

        let (status, revisions) = match &drawing {
            Some(d) => {
                let revisions = drawing_revision::Entity::find()
                    .filter(drawing_revision::Column::DrawingId.eq(d.id))
                    .order_by_asc(drawing_revision::Column::CreatedAt)
                    .order_by_asc(drawing_revision::Column::Revision)
                    .all(self.db.as_ref())
                    .await?;
                (DrawingStatus::parse(&d.status)?, revisions)
            }
            None => (DrawingStatus::NotUploaded, Vec::new()),
        };

        let mut actions: Vec<String> = Vec::new();
        if item.is_production_path() {
            for action in available_actions(status) {
                if user.can(capability_for(action)) && !actions.iter().any(|a| a == action.name()) {
                    actions.push(action.name().to_string());
                }
            }
        }

        Ok(DrawingView {
            item_id: item.id,
            drawing,
            revisions,
            available_actions: actions,
        })
    }

    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn revisions(
        &self,
        user: &AuthUser,
        drawing_id: Uuid,
    ) -> Result<Vec<drawing_revision::Model>, ServiceError> {
        let drawing = self.load(user, drawing_id).await?;
        let rows = drawing_revision::Entity::find()
            .filter(drawing_revision::Column::DrawingId.eq(drawing.id))
            .order_by_asc(drawing_revision::Column::CreatedAt)
            .order_by_asc(drawing_revision::Column::Revision)
            .all(self.db.as_ref())
            .await?;
        Ok(rows)
    }

    /// Existing drawing for the item, or a fresh `not_uploaded` one.
    async fn drawing_for_item(
        txn: &DatabaseTransaction,
        item: &scope_item::Model,
    ) -> Result<drawing::Model, ServiceError> {
        if let Some(existing) = drawing::Entity::find()
            .filter(drawing::Column::ItemId.eq(item.id))
            .one(txn)
            .await?
        {
            return Ok(existing);
        }
        let created = drawing::ActiveModel {
            item_id: Set(item.id),
            project_id: Set(item.project_id),
            status: Set(DrawingStatus::NotUploaded.to_string()),
            ..Default::default()
        }
        .insert(txn)
        .await?;
        Ok(created)
    }

    fn plan(drawing: &drawing::Model, action: DrawingAction) -> Result<(DrawingStatus, DrawingStatus), ServiceError> {
        let from = DrawingStatus::parse(&drawing.status)?;
        match next_status(from, action) {
            Ok(to) => Ok((from, to)),
            Err(e) => {
                record_transition(ENTITY, action.name(), false);
                warn!(drawing_id = %drawing.id, from = %from, action = action.name(), "drawing transition rejected");
                Err(e.into())
            }
        }
    }

    /// Writes `changes` only if the row is still in `from`.
    async fn guarded_update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        from: DrawingStatus,
        mut changes: drawing::ActiveModel,
    ) -> Result<drawing::Model, ServiceError> {
        changes.updated_at = Set(Utc::now());
        let result = drawing::Entity::update_many()
            .set(changes)
            .filter(drawing::Column::Id.eq(id))
            .filter(drawing::Column::Status.eq(from.as_ref()))
            .exec(db)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::Conflict(format!(
                "drawing {} changed status concurrently",
                id
            )));
        }
        drawing::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found(ENTITY, id))
    }

    /// Moves the owning item to `to` when it currently sits in one of `from`.
    async fn advance_item<C: ConnectionTrait>(
        db: &C,
        item_id: Uuid,
        from: &[ScopeItemStatus],
        to: ScopeItemStatus,
    ) -> Result<(), ServiceError> {
        let from: Vec<String> = from.iter().map(|s| s.to_string()).collect();
        let mut changes = <scope_item::ActiveModel as Default>::default();
        changes.status = Set(to.to_string());
        changes.updated_at = Set(Utc::now());
        scope_item::Entity::update_many()
            .set(changes)
            .filter(scope_item::Column::Id.eq(item_id))
            .filter(scope_item::Column::Status.is_in(from))
            .exec(db)
            .await?;
        Ok(())
    }

    async fn finish(
        &self,
        txn: DatabaseTransaction,
        item: &scope_item::Model,
        drawing: &drawing::Model,
        action: DrawingAction,
    ) -> Result<(), ServiceError> {
        txn.commit().await?;
        record_transition(ENTITY, action.name(), true);
        info!(drawing_id = %drawing.id, status = %drawing.status, action = action.name(), "drawing transitioned");
        self.events
            .publish(Event::DrawingTransitioned {
                project_id: drawing.project_id,
                drawing_id: drawing.id,
                item_code: item.item_code.clone(),
                action: action.name().to_string(),
                status: drawing.status.clone(),
            })
            .await;
        Ok(())
    }

    #[instrument(skip(self, user, request), fields(user_id = %user.user_id))]
    pub async fn upload(
        &self,
        user: &AuthUser,
        item_id: Uuid,
        request: UploadDrawingRequest,
    ) -> Result<drawing::Model, ServiceError> {
        user.require(Capability::UploadDrawings)?;
        request.validate()?;
        if request.file_url.trim().is_empty() {
            return Err(ServiceError::ValidationError("file_url is required".into()));
        }
        let item = self.production_item(user, item_id).await?;

        let txn = self.db.begin().await?;
        let current = Self::drawing_for_item(&txn, &item).await?;
        let (from, to) = Self::plan(&current, DrawingAction::Upload)?;

        let existing = drawing_revision::Entity::find()
            .filter(drawing_revision::Column::DrawingId.eq(current.id))
            .count(&txn)
            .await?;
        let code = revision_code(u32::try_from(existing + 1).unwrap_or(u32::MAX));

        drawing_revision::ActiveModel {
            drawing_id: Set(current.id),
            revision: Set(code.clone()),
            file_url: Set(request.file_url),
            file_name: Set(request.file_name),
            file_size: Set(request.file_size),
            uploaded_by: Set(user.user_id),
            notes: Set(request.notes),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let mut changes = <drawing::ActiveModel as Default>::default();
        changes.status = Set(to.to_string());
        changes.current_revision = Set(Some(code.clone()));
        let updated = Self::guarded_update(&txn, current.id, from, changes).await?;

        activity::record(
            &txn,
            user,
            ActivityEntry {
                project_id: item.project_id,
                entity_type: ENTITY,
                entity_id: updated.id,
                action: DrawingAction::Upload.name().into(),
                details: serde_json::json!({ "revision": code, "from": from, "to": to }),
            },
            None,
        )
        .await?;

        self.finish(txn, &item, &updated, DrawingAction::Upload).await?;
        Ok(updated)
    }

    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn send_to_client(
        &self,
        user: &AuthUser,
        drawing_id: Uuid,
    ) -> Result<drawing::Model, ServiceError> {
        user.require(Capability::SendDrawingsToClient)?;
        let current = self.load(user, drawing_id).await?;
        let item = self.items.load(user, current.item_id).await?;
        let (from, to) = Self::plan(&current, DrawingAction::SendToClient)?;

        let txn = self.db.begin().await?;
        let mut changes = <drawing::ActiveModel as Default>::default();
        changes.status = Set(to.to_string());
        changes.sent_to_client_at = Set(Some(Utc::now()));
        let updated = Self::guarded_update(&txn, current.id, from, changes).await?;

        Self::advance_item(
            &txn,
            item.id,
            &[ScopeItemStatus::Pending, ScopeItemStatus::InDesign],
            ScopeItemStatus::AwaitingApproval,
        )
        .await?;

        activity::record(
            &txn,
            user,
            ActivityEntry {
                project_id: updated.project_id,
                entity_type: ENTITY,
                entity_id: updated.id,
                action: DrawingAction::SendToClient.name().into(),
                details: serde_json::json!({ "revision": updated.current_revision }),
            },
            Some(Notice {
                roles: &[Role::Client],
                kind: "drawing_sent",
                title: format!("Drawing {} ready for review", item.item_code),
                message: format!(
                    "Revision {} of {} awaits your decision.",
                    updated.current_revision.as_deref().unwrap_or("-"),
                    item.name
                ),
            }),
        )
        .await?;

        self.finish(txn, &item, &updated, DrawingAction::SendToClient).await?;
        Ok(updated)
    }

    #[instrument(skip(self, user, request), fields(user_id = %user.user_id, decision = ?request.decision))]
    pub async fn record_decision(
        &self,
        user: &AuthUser,
        drawing_id: Uuid,
        request: ClientDecisionRequest,
    ) -> Result<drawing::Model, ServiceError> {
        user.require(Capability::RecordClientDecision)?;
        let current = self.load(user, drawing_id).await?;
        let item = self.items.load(user, current.item_id).await?;
        let action = DrawingAction::RecordDecision(request.decision);
        let (from, to) = Self::plan(&current, action)?;

        let txn = self.db.begin().await?;
        let mut changes = <drawing::ActiveModel as Default>::default();
        changes.status = Set(to.to_string());
        changes.client_response_at = Set(Some(Utc::now()));
        changes.client_comments = Set(request.comments.filter(|c| !c.trim().is_empty()));
        let updated = Self::guarded_update(&txn, current.id, from, changes).await?;

        if to.is_approved() {
            Self::advance_item(
                &txn,
                item.id,
                &[ScopeItemStatus::AwaitingApproval, ScopeItemStatus::InDesign],
                ScopeItemStatus::Approved,
            )
            .await?;
        }

        activity::record(
            &txn,
            user,
            ActivityEntry {
                project_id: updated.project_id,
                entity_type: ENTITY,
                entity_id: updated.id,
                action: action.name().into(),
                details: serde_json::json!({ "decision": request.decision, "comments": updated.client_comments }),
            },
            Some(Notice {
                roles: &[Role::Pm],
                kind: "drawing_decision",
                title: format!("Drawing {} {}", item.item_code, to),
                message: format!("The client recorded {} on {}.", to, item.name),
            }),
        )
        .await?;

        self.finish(txn, &item, &updated, action).await?;
        Ok(updated)
    }

    /// Force-approves without client sign-off. The only route from
    /// `not_uploaded` to `approved`.
    #[instrument(skip(self, user, request), fields(user_id = %user.user_id))]
    pub async fn override_approval(
        &self,
        user: &AuthUser,
        item_id: Uuid,
        request: OverrideRequest,
    ) -> Result<drawing::Model, ServiceError> {
        user.require(Capability::OverrideDrawing)?;
        request.validate()?;
        let reason = request.reason.trim().to_string();
        if reason.is_empty() {
            return Err(ServiceError::ValidationError("override reason is required".into()));
        }
        let item = self.production_item(user, item_id).await?;

        let txn = self.db.begin().await?;
        let current = Self::drawing_for_item(&txn, &item).await?;
        let (from, to) = Self::plan(&current, DrawingAction::Override)?;

        let now = Utc::now();
        let mut changes = <drawing::ActiveModel as Default>::default();
        changes.status = Set(to.to_string());
        changes.pm_override = Set(true);
        changes.pm_override_reason = Set(Some(reason.clone()));
        changes.pm_override_by = Set(Some(user.user_id));
        changes.pm_override_at = Set(Some(now));
        let updated = Self::guarded_update(&txn, current.id, from, changes).await?;

        Self::advance_item(
            &txn,
            item.id,
            &[ScopeItemStatus::AwaitingApproval, ScopeItemStatus::InDesign],
            ScopeItemStatus::Approved,
        )
        .await?;

        activity::record(
            &txn,
            user,
            ActivityEntry {
                project_id: updated.project_id,
                entity_type: ENTITY,
                entity_id: updated.id,
                action: DrawingAction::Override.name().into(),
                details: serde_json::json!({ "from": from, "reason": reason }),
            },
            Some(Notice {
                roles: &[Role::Pm, Role::Production],
                kind: "drawing_override",
                title: format!("Drawing {} approved by override", item.item_code),
                message: reason,
            }),
        )
        .await?;

        self.finish(txn, &item, &updated, DrawingAction::Override).await?;
        Ok(updated)
    }
}
