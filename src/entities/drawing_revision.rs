use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// One uploaded version of a drawing file. Rows are only ever appended.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = DrawingRevision)]
#[sea_orm(table_name = "drawing_revisions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub drawing_id: Uuid,
    pub revision: String,
    pub file_url: String,
    pub file_name: String,
    pub file_size: Option<i64>,
    pub uploaded_by: Uuid,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::drawing::Entity",
        from = "Column::DrawingId",
        to = "super::drawing::Column::Id"
    )]
    Drawing,
}

impl Related<super::drawing::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Drawing.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if !insert {
            return Err(DbErr::Custom("drawing revisions are append-only".to_string()));
        }
        let now = Utc::now();
        if self.id.is_not_set() {
            self.id = Set(Uuid::new_v4());
        }
        self.created_at = Set(now);
        self.updated_at = Set(now);
        Ok(self)
    }
}
