use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "milestones")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub due_date: DateTime<Utc>,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub alert_days_before: i32,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// Incomplete and past its due date.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.is_completed && self.due_date < now
    }

    /// Incomplete, not yet due, and inside its alert window.
    pub fn is_due_soon(&self, now: DateTime<Utc>) -> bool {
        !self.is_completed
            && self.due_date >= now
            && self.due_date <= now + chrono::Duration::days(i64::from(self.alert_days_before))
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
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
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
            if self.is_completed.is_not_set() {
                self.is_completed = Set(false);
            }
            if self.alert_days_before.is_not_set() {
                self.alert_days_before = Set(7);
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

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn milestone(due_in_days: i64, completed: bool) -> Model {
        let now = Utc::now();
        Model {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            name: "Factory acceptance".into(),
            description: None,
            due_date: now + Duration::days(due_in_days),
            is_completed: completed,
            completed_at: None,
            alert_days_before: 7,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn past_due_incomplete_is_overdue() {
        assert!(milestone(-1, false).is_overdue(Utc::now()));
        assert!(!milestone(-1, true).is_overdue(Utc::now()));
        assert!(!milestone(3, false).is_overdue(Utc::now()));
    }

    #[test]
    fn due_soon_respects_alert_window() {
        assert!(milestone(3, false).is_due_soon(Utc::now()));
        assert!(!milestone(30, false).is_due_soon(Utc::now()));
        assert!(!milestone(-2, false).is_due_soon(Utc::now()));
    }
}
