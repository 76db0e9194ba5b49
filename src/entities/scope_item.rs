use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, Set};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ScopeItemStatus {
    Pending,
    InDesign,
    AwaitingApproval,
    Approved,
    InProduction,
    Complete,
    OnHold,
    Cancelled,
}

impl Default for ScopeItemStatus {
    fn default() -> Self {
        ScopeItemStatus::Pending
    }
}

/// Whether an item is built in-house (and therefore needs a drawing) or bought in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ItemPath {
    Production,
    Procurement,
}

impl Default for ItemPath {
    fn default() -> Self {
        ItemPath::Production
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = ScopeItem)]
#[sea_orm(table_name = "scope_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub project_id: Uuid,
    pub item_code: String,
    pub name: String,
    pub description: Option<String>,
    pub item_path: String,
    pub status: String,
    pub quantity: f64,
    pub unit: Option<String>,
    pub production_percentage: i32,
    pub initial_unit_cost: Option<f64>,
    pub initial_total_cost: Option<f64>,
    pub actual_unit_cost: Option<f64>,
    pub actual_total_cost: Option<f64>,
    pub unit_sales_price: Option<f64>,
    pub total_sales_price: Option<f64>,
    pub notes: Option<String>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn is_production_path(&self) -> bool {
        self.item_path == ItemPath::Production.as_ref()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::project::Entity",
        from = "Column::ProjectId",
        to = "super::project::Column::Id"
    )]
    Project,
    #[sea_orm(has_one = "super::drawing::Entity")]
    Drawing,
    #[sea_orm(has_many = "super::item_material::Entity")]
    ItemMaterial,
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl Related<super::drawing::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Drawing.def()
    }
}

impl Related<super::material::Entity> for Entity {
    fn to() -> RelationDef {
        super::item_material::Relation::Material.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::item_material::Relation::ScopeItem.def().rev())
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
            if self.status.is_not_set() {
                self.status = Set(ScopeItemStatus::Pending.to_string());
            }
            if self.is_deleted.is_not_set() {
                self.is_deleted = Set(false);
            }
            self.created_at = Set(now);
        } else if self.initial_unit_cost.is_set() || self.initial_total_cost.is_set() {
            // Initial costs are the tender baseline and are written exactly once.
            return Err(DbErr::Custom(
                "initial cost fields are immutable after creation".to_string(),
            ));
        }
        self.updated_at = Set(now);
        Ok(self)
    }
}
