use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Approval record for the drawing of a production-path scope item.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = Drawing)]
#[sea_orm(table_name = "drawings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub item_id: Uuid,
    pub project_id: Uuid,
    pub status: String,
    pub current_revision: Option<String>,
    pub sent_to_client_at: Option<DateTime<Utc>>,
    pub client_response_at: Option<DateTime<Utc>>,
    pub client_comments: Option<String>,
    pub pm_override: bool,
    pub pm_override_reason: Option<String>,
    pub pm_override_by: Option<Uuid>,
    pub pm_override_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::scope_item::Entity",
        from = "Column::ItemId",
        to = "super::scope_item::Column::Id"
    )]
    ScopeItem,
    #[sea_orm(has_many = "super::drawing_revision::Entity")]
    DrawingRevision,
}

impl Related<super::scope_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ScopeItem.def()
    }
}

impl Related<super::drawing_revision::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DrawingRevision.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let now = Utc::now();
        if insert {
            if self.id.is_not_set() {
                self.id = Set(Uuid::new_v4());
            }
            if self.pm_override.is_not_set() {
                self.pm_override = Set(false);
            }
            self.created_at = Set(now);
        }
        self.updated_at = Set(now);
        Ok(self)
    }
}
