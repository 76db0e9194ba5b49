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
pub enum ReportType {
    Progress,
    Weekly,
    SiteVisit,
    Installation,
    Snagging,
    Other,
}

impl ReportType {
    pub fn label(self) -> &'static str {
        match self {
            ReportType::Progress => "Progress Report",
            ReportType::Weekly => "Weekly Report",
            ReportType::SiteVisit => "Site Visit Report",
            ReportType::Installation => "Installation Report",
            ReportType::Snagging => "Snagging Report",
            ReportType::Other => "Report",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = Report)]
#[sea_orm(table_name = "reports")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub report_type: String,
    pub is_published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub share_internal: bool,
    pub share_with_client: bool,
    pub created_by: Uuid,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn visible_to_client(&self) -> bool {
        self.is_published && self.share_with_client && !self.is_deleted
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
    #[sea_orm(has_many = "super::report_line::Entity")]
    ReportLine,
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl Related<super::report_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReportLine.def()
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
            if self.is_published.is_not_set() {
                self.is_published = Set(false);
            }
            if self.share_internal.is_not_set() {
                self.share_internal = Set(true);
            }
            if self.share_with_client.is_not_set() {
                self.share_with_client = Set(false);
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
