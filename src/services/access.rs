//! Project membership and visibility.

use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::auth::{AuthUser, Capability, Role};
use crate::cache::TtlCache;
use crate::db::DbPool;
use crate::entities::{project, project_assignment, user};
use crate::errors::ServiceError;

/// Which projects a user may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectScope {
    All,
    Only(Vec<Uuid>),
}

impl ProjectScope {
    pub fn allows(&self, project_id: Uuid) -> bool {
        match self {
            ProjectScope::All => true,
            ProjectScope::Only(ids) => ids.contains(&project_id),
        }
    }

    /// Restricts `column` to the visible project ids. An empty scope matches nothing.
    pub fn condition<C: ColumnTrait>(&self, column: C) -> Condition {
        match self {
            ProjectScope::All => Condition::all(),
            ProjectScope::Only(ids) => Condition::all().add(column.is_in(ids.clone())),
        }
    }
}

pub async fn assigned_project_ids<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
) -> Result<Vec<Uuid>, ServiceError> {
    let ids = project_assignment::Entity::find()
        .select_only()
        .column(project_assignment::Column::ProjectId)
        .filter(project_assignment::Column::UserId.eq(user_id))
        .filter(project_assignment::Column::IsDeleted.eq(false))
        .into_tuple::<Uuid>()
        .all(db)
        .await?;
    Ok(ids)
}

/// Active users assigned to `project_id` whose role is one of `roles`.
pub async fn assigned_users<C: ConnectionTrait>(
    db: &C,
    project_id: Uuid,
    roles: &[Role],
) -> Result<Vec<user::Model>, ServiceError> {
    let user_ids = project_assignment::Entity::find()
        .select_only()
        .column(project_assignment::Column::UserId)
        .filter(project_assignment::Column::ProjectId.eq(project_id))
        .filter(project_assignment::Column::IsDeleted.eq(false))
        .into_tuple::<Uuid>()
        .all(db)
        .await?;

    if user_ids.is_empty() || roles.is_empty() {
        return Ok(Vec::new());
    }

    let role_names: Vec<String> = roles.iter().map(|r| r.to_string()).collect();
    let users = user::Entity::find()
        .filter(user::Column::Id.is_in(user_ids))
        .filter(user::Column::Role.is_in(role_names))
        .filter(user::Column::IsActive.eq(true))
        .all(db)
        .await?;
    Ok(users)
}

/// Resolves and caches each user's [`ProjectScope`].
#[derive(Clone)]
pub struct AccessControl {
    db: Arc<DbPool>,
    scopes: TtlCache<ProjectScope>,
}

impl AccessControl {
    pub fn new(db: Arc<DbPool>, ttl: Duration) -> Self {
        Self {
            db,
            scopes: TtlCache::new("project_scope", ttl),
        }
    }

    fn key(user_id: Uuid) -> String {
        format!("projects:user:{}", user_id)
    }

    pub async fn scope_for(&self, user: &AuthUser) -> Result<ProjectScope, ServiceError> {
        if user.can(Capability::ViewAllProjects) {
            return Ok(ProjectScope::All);
        }
        let db = self.db.clone();
        let user_id = user.user_id;
        self.scopes
            .get_or_try_insert_with(&Self::key(user_id), || async move {
                assigned_project_ids(db.as_ref(), user_id)
                    .await
                    .map(ProjectScope::Only)
            })
            .await
    }

    /// Drops the cached scope after membership changes.
    pub fn forget(&self, user_id: Uuid) {
        self.scopes.invalidate(&Self::key(user_id));
    }

    pub fn forget_all(&self) {
        self.scopes.invalidate_prefix("projects:user:");
    }

    /// Loads a live project the user may see.
    pub async fn project(
        &self,
        user: &AuthUser,
        project_id: Uuid,
    ) -> Result<project::Model, ServiceError> {
        let project = project::Entity::find_by_id(project_id)
            .filter(project::Column::IsDeleted.eq(false))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::not_found("project", project_id))?;

        self.ensure(user, project_id).await?;
        Ok(project)
    }

    /// Membership check without loading the project row.
    pub async fn ensure(&self, user: &AuthUser, project_id: Uuid) -> Result<(), ServiceError> {
        if self.scope_for(user).await?.allows(project_id) {
            Ok(())
        } else {
            debug!(user_id = %user.user_id, %project_id, "project outside user scope");
            Err(ServiceError::Forbidden(format!(
                "not assigned to project {}",
                project_id
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_membership() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert!(ProjectScope::All.allows(a));
        assert!(ProjectScope::Only(vec![a]).allows(a));
        assert!(!ProjectScope::Only(vec![a]).allows(b));
        assert!(!ProjectScope::Only(vec![]).allows(a));
    }
}
