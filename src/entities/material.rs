use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "materials")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub project_id: Uuid,
    pub material_code: String,
    pub name: String,
    pub specification: Option<String>,
    pub supplier: Option<String>,
    /// JSON array of image URLs
    pub image_urls: String,
    pub status: String,
    pub sent_to_client_at: Option<DateTime<Utc>>,
    pub client_response_at: Option<DateTime<Utc>>,
    pub client_comments: Option<String>,
    pub approved_by: Option<Uuid>,
    pub decided_at: Option<DateTime<Utc>>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::project::Entity",
        from = "Column::ProjectId",
        to = "super::project::Column::Id"
    )]
    Project,
    #[sea_orm(has_many = "super::item_material::Entity")]
    ItemMaterial,
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl Related<super::scope_item::Entity> for Entity {
    fn to() -> RelationDef {
        super::item_material::Relation::ScopeItem.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::item_material::Relation::Material.def().rev())
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
            if self.image_urls.is_not_set() {
                self.image_urls = Set("[]".to_string());
            }
            if self.is_deleted.is_not_set() {
                self.is_deleted = Set(false);
            }
            self.created_at = Set(now);
        }
        self.updated_at = Set(now);
        Ok(self)
    }
}
