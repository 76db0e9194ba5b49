use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use sea_orm::sea_query::Expr;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::entities::notification;
use crate::errors::ServiceError;

/// The signed-in user's in-app inbox.
#[derive(Clone)]
pub struct NotificationService {
    db: Arc<DbPool>,
}

impl NotificationService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn list(
        &self,
        user: &AuthUser,
        unread_only: bool,
        limit: u64,
    ) -> Result<Vec<notification::Model>, ServiceError> {
        let mut query = notification::Entity::find()
            .filter(notification::Column::UserId.eq(user.user_id));
        if unread_only {
            query = query.filter(notification::Column::IsRead.eq(false));
        }
        let rows = query
            .order_by_desc(notification::Column::CreatedAt)
            .limit(limit.clamp(1, 200))
            .all(self.db.as_ref())
            .await?;
        Ok(rows)
    }

    pub async fn mark_read(
        &self,
        user: &AuthUser,
        id: Uuid,
    ) -> Result<notification::Model, ServiceError> {
        let row = notification::Entity::find_by_id(id)
            .filter(notification::Column::UserId.eq(user.user_id))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::not_found("notification", id))?;

        if row.is_read {
            return Ok(row);
        }
        let mut active: notification::ActiveModel = row.into();
        active.is_read = Set(true);
        Ok(active.update(self.db.as_ref()).await?)
    }

    /// Returns how many rows changed.
    pub async fn mark_all_read(&self, user: &AuthUser) -> Result<u64, ServiceError> {
        let result = notification::Entity::update_many()
            .col_expr(notification::Column::IsRead, Expr::value(true))
            .col_expr(notification::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
            .filter(notification::Column::UserId.eq(user.user_id))
            .filter(notification::Column::IsRead.eq(false))
            .exec(self.db.as_ref())
            .await?;
        Ok(result.rows_affected)
    }
}
