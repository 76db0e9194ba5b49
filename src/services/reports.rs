use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::access::AccessControl;
use super::activity::{self, ActivityEntry, Notice};
use crate::auth::{AuthUser, Capability, Role};
use crate::db::DbPool;
use crate::entities::report::{self, ReportType};
use crate::entities::{decode_url_list, encode_url_list, project, report_line};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::pdf::{ReportDocument, ReportRenderer, ReportSection};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateReportRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub report_type: ReportType,
    pub share_internal: Option<bool>,
    pub share_with_client: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateReportRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub report_type: Option<ReportType>,
    pub share_internal: Option<bool>,
    pub share_with_client: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ReportLineRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub photo_urls: Vec<String>,
    /// Appended after the last line when omitted.
    pub line_order: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ReorderLinesRequest {
    pub line_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReportLineView {
    pub id: Uuid,
    pub line_order: i32,
    pub title: String,
    pub description: Option<String>,
    pub photo_urls: Vec<String>,
}

impl From<report_line::Model> for ReportLineView {
    fn from(line: report_line::Model) -> Self {
        Self {
            photo_urls: decode_url_list(&line.photo_urls),
            id: line.id,
            line_order: line.line_order,
            title: line.title,
            description: line.description,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReportView {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub report_type: String,
    pub is_published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub share_internal: bool,
    pub share_with_client: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<ReportLineView>,
}

impl ReportView {
    fn new(report: report::Model, lines: Vec<report_line::Model>) -> Self {
        Self {
            id: report.id,
            project_id: report.project_id,
            title: report.title,
            report_type: report.report_type,
            is_published: report.is_published,
            published_at: report.published_at,
            share_internal: report.share_internal,
            share_with_client: report.share_with_client,
            created_by: report.created_by,
            created_at: report.created_at,
            lines: lines.into_iter().map(ReportLineView::from).collect(),
        }
    }
}

/// Authors see drafts; other staff see published internal reports; clients
/// see published reports shared with them.
pub fn can_view(report: &report::Model, user: &AuthUser) -> bool {
    if report.is_deleted {
        return false;
    }
    match user.role {
        Role::Client => report.visible_to_client(),
        _ if user.can(Capability::ManageReports) => true,
        _ => report.is_published && report.share_internal,
    }
}

#[derive(Clone)]
pub struct ReportService {
    db: Arc<DbPool>,
    access: AccessControl,
    events: EventSender,
    renderer: ReportRenderer,
}

impl ReportService {
    pub fn new(
        db: Arc<DbPool>,
        access: AccessControl,
        events: EventSender,
        renderer: ReportRenderer,
    ) -> Self {
        Self {
            db,
            access,
            events,
            renderer,
        }
    }

    async fn load(&self, user: &AuthUser, id: Uuid) -> Result<report::Model, ServiceError> {
        let row = report::Entity::find_by_id(id)
            .filter(report::Column::IsDeleted.eq(false))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::not_found("report", id))?;
        self.access.ensure(user, row.project_id).await?;
        if !can_view(&row, user) {
            return Err(ServiceError::not_found("report", id));
        }
        Ok(row)
    }

    async fn lines(&self, report_id: Uuid) -> Result<Vec<report_line::Model>, ServiceError> {
        let rows = report_line::Entity::find()
            .filter(report_line::Column::ReportId.eq(report_id))
            .filter(report_line::Column::IsDeleted.eq(false))
            .order_by_asc(report_line::Column::LineOrder)
            .order_by_asc(report_line::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?;
        Ok(rows)
    }

    async fn view(&self, report: report::Model) -> Result<ReportView, ServiceError> {
        let lines = self.lines(report.id).await?;
        Ok(ReportView::new(report, lines))
    }

    async fn log(&self, user: &AuthUser, report: &report::Model, action: &str, notice: Option<Notice>) -> Result<(), ServiceError> {
        activity::record(
            self.db.as_ref(),
            user,
            ActivityEntry {
                project_id: report.project_id,
                entity_type: "report",
                entity_id: report.id,
                action: action.to_string(),
                details: serde_json::json!({ "title": report.title }),
            },
            notice,
        )
        .await
    }

    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn list(&self, user: &AuthUser, project_id: Uuid) -> Result<Vec<report::Model>, ServiceError> {
        self.access.project(user, project_id).await?;
        let rows = report::Entity::find()
            .filter(report::Column::ProjectId.eq(project_id))
            .filter(report::Column::IsDeleted.eq(false))
            .order_by_desc(report::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?;
        Ok(rows.into_iter().filter(|r| can_view(r, user)).collect())
    }

    pub async fn get(&self, user: &AuthUser, id: Uuid) -> Result<ReportView, ServiceError> {
        let row = self.load(user, id).await?;
        self.view(row).await
    }

    #[instrument(skip(self, user, request), fields(user_id = %user.user_id))]
    pub async fn create(
        &self,
        user: &AuthUser,
        project_id: Uuid,
        request: CreateReportRequest,
    ) -> Result<ReportView, ServiceError> {
        user.require(Capability::ManageReports)?;
        request.validate()?;
        self.access.project(user, project_id).await?;

        let created = report::ActiveModel {
            project_id: Set(project_id),
            title: Set(request.title),
            report_type: Set(request.report_type.to_string()),
            share_internal: Set(request.share_internal.unwrap_or(true)),
            share_with_client: Set(request.share_with_client.unwrap_or(false)),
            created_by: Set(user.user_id),
            ..Default::default()
        }
        .insert(self.db.as_ref())
        .await?;
        self.log(user, &created, "created", None).await?;
        Ok(ReportView::new(created, Vec::new()))
    }

    #[instrument(skip(self, user, request), fields(user_id = %user.user_id))]
    pub async fn update(
        &self,
        user: &AuthUser,
        id: Uuid,
        request: UpdateReportRequest,
    ) -> Result<ReportView, ServiceError> {
        user.require(Capability::ManageReports)?;
        request.validate()?;
        let current = self.load(user, id).await?;

        let mut active: report::ActiveModel = current.into();
        if let Some(title) = request.title {
            active.title = Set(title);
        }
        if let Some(kind) = request.report_type {
            active.report_type = Set(kind.to_string());
        }
        if let Some(flag) = request.share_internal {
            active.share_internal = Set(flag);
        }
        if let Some(flag) = request.share_with_client {
            active.share_with_client = Set(flag);
        }
        let updated = active.update(self.db.as_ref()).await?;
        self.view(updated).await
    }

    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn delete(&self, user: &AuthUser, id: Uuid) -> Result<(), ServiceError> {
        user.require(Capability::ManageReports)?;
        let current = self.load(user, id).await?;
        let mut active: report::ActiveModel = current.clone().into();
        active.is_deleted = Set(true);
        active.update(self.db.as_ref()).await?;
        self.log(user, &current, "deleted", None).await
    }

    #[instrument(skip(self, user, request), fields(user_id = %user.user_id))]
    pub async fn add_line(
        &self,
        user: &AuthUser,
        report_id: Uuid,
        request: ReportLineRequest,
    ) -> Result<ReportView, ServiceError> {
        user.require(Capability::ManageReports)?;
        request.validate()?;
        let report = self.load(user, report_id).await?;

        let order = match request.line_order {
            Some(order) => order,
            None => self
                .lines(report.id)
                .await?
                .iter()
                .map(|l| l.line_order)
                .max()
                .map_or(0, |max| max + 1),
        };

        report_line::ActiveModel {
            report_id: Set(report.id),
            line_order: Set(order),
            title: Set(request.title),
            description: Set(request.description),
            photo_urls: Set(encode_url_list(&request.photo_urls)),
            ..Default::default()
        }
        .insert(self.db.as_ref())
        .await?;
        self.view(report).await
    }

    #[instrument(skip(self, user, request), fields(user_id = %user.user_id))]
    pub async fn update_line(
        &self,
        user: &AuthUser,
        report_id: Uuid,
        line_id: Uuid,
        request: ReportLineRequest,
    ) -> Result<ReportView, ServiceError> {
        user.require(Capability::ManageReports)?;
        request.validate()?;
        let report = self.load(user, report_id).await?;
        let line = report_line::Entity::find_by_id(line_id)
            .filter(report_line::Column::ReportId.eq(report.id))
            .filter(report_line::Column::IsDeleted.eq(false))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::not_found("report line", line_id))?;

        let mut active: report_line::ActiveModel = line.into();
        active.title = Set(request.title);
        active.description = Set(request.description);
        active.photo_urls = Set(encode_url_list(&request.photo_urls));
        if let Some(order) = request.line_order {
            active.line_order = Set(order);
        }
        active.update(self.db.as_ref()).await?;
        self.view(report).await
    }

    pub async fn delete_line(
        &self,
        user: &AuthUser,
        report_id: Uuid,
        line_id: Uuid,
    ) -> Result<ReportView, ServiceError> {
        user.require(Capability::ManageReports)?;
        let report = self.load(user, report_id).await?;
        let line = report_line::Entity::find_by_id(line_id)
            .filter(report_line::Column::ReportId.eq(report.id))
            .filter(report_line::Column::IsDeleted.eq(false))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::not_found("report line", line_id))?;
        let mut active: report_line::ActiveModel = line.into();
        active.is_deleted = Set(true);
        active.deleted_at = Set(Some(Utc::now()));
        active.update(self.db.as_ref()).await?;
        self.view(report).await
    }

    /// Replaces every line in one transaction, numbering them in request order.
    #[instrument(skip(self, user, lines), fields(user_id = %user.user_id, lines = lines.len()))]
    pub async fn replace_lines(
        &self,
        user: &AuthUser,
        report_id: Uuid,
        lines: Vec<ReportLineRequest>,
    ) -> Result<ReportView, ServiceError> {
        user.require(Capability::ManageReports)?;
        for line in &lines {
            line.validate()?;
        }
        let report = self.load(user, report_id).await?;

        let txn = self.db.begin().await?;
        let now = Utc::now();
        report_line::Entity::update_many()
            .col_expr(report_line::Column::IsDeleted, Expr::value(true))
            .col_expr(report_line::Column::DeletedAt, Expr::value(Some(now)))
            .col_expr(report_line::Column::UpdatedAt, Expr::value(now))
            .filter(report_line::Column::ReportId.eq(report.id))
            .filter(report_line::Column::IsDeleted.eq(false))
            .exec(&txn)
            .await?;
        for (index, line) in lines.into_iter().enumerate() {
            report_line::ActiveModel {
                report_id: Set(report.id),
                line_order: Set(i32::try_from(index).unwrap_or(i32::MAX)),
                title: Set(line.title),
                description: Set(line.description),
                photo_urls: Set(encode_url_list(&line.photo_urls)),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }
        txn.commit().await?;
        self.view(report).await
    }

    /// `line_ids` must name every line of the report exactly once.
    pub async fn reorder_lines(
        &self,
        user: &AuthUser,
        report_id: Uuid,
        request: ReorderLinesRequest,
    ) -> Result<ReportView, ServiceError> {
        user.require(Capability::ManageReports)?;
        let report = self.load(user, report_id).await?;
        let existing = self.lines(report.id).await?;

        let mut wanted = request.line_ids.clone();
        wanted.sort();
        wanted.dedup();
        let mut have: Vec<Uuid> = existing.iter().map(|l| l.id).collect();
        have.sort();
        if wanted.len() != request.line_ids.len() || wanted != have {
            return Err(ServiceError::ValidationError(
                "line_ids must list every line of the report exactly once".into(),
            ));
        }

        let txn = self.db.begin().await?;
        for (index, line_id) in request.line_ids.iter().enumerate() {
            let mut changes = <report_line::ActiveModel as Default>::default();
            changes.line_order = Set(i32::try_from(index).unwrap_or(i32::MAX));
            changes.updated_at = Set(Utc::now());
            report_line::Entity::update_many()
                .set(changes)
                .filter(report_line::Column::Id.eq(*line_id))
                .exec(&txn)
                .await?;
        }
        txn.commit().await?;
        self.view(report).await
    }

    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn publish(&self, user: &AuthUser, id: Uuid) -> Result<ReportView, ServiceError> {
        user.require(Capability::PublishReports)?;
        let current = self.load(user, id).await?;
        if self.lines(current.id).await?.is_empty() {
            return Err(ServiceError::ValidationError(
                "a report needs at least one line before publishing".into(),
            ));
        }

        let mut active: report::ActiveModel = current.into();
        active.is_published = Set(true);
        active.published_at = Set(Some(Utc::now()));
        let updated = active.update(self.db.as_ref()).await?;

        let roles: &'static [Role] = if updated.share_with_client {
            &[Role::Client, Role::Production, Role::Procurement]
        } else {
            &[Role::Production, Role::Procurement]
        };
        self.log(
            user,
            &updated,
            "published",
            Some(Notice {
                roles,
                kind: "report_published",
                title: format!("Report published: {}", updated.title),
                message: format!("{} is now available.", updated.title),
            }),
        )
        .await?;

        info!(report_id = %updated.id, share_with_client = updated.share_with_client, "report published");
        self.events
            .publish(Event::ReportPublished {
                project_id: updated.project_id,
                report_id: updated.id,
                title: updated.title.clone(),
                share_with_client: updated.share_with_client,
            })
            .await;
        self.view(updated).await
    }

    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn unpublish(&self, user: &AuthUser, id: Uuid) -> Result<ReportView, ServiceError> {
        user.require(Capability::PublishReports)?;
        let current = self.load(user, id).await?;
        let mut active: report::ActiveModel = current.into();
        active.is_published = Set(false);
        active.published_at = Set(None);
        let updated = active.update(self.db.as_ref()).await?;
        self.log(user, &updated, "unpublished", None).await?;
        self.view(updated).await
    }

    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn render_pdf(&self, user: &AuthUser, id: Uuid) -> Result<(String, Vec<u8>), ServiceError> {
        let report = self.load(user, id).await?;
        let project = project::Entity::find_by_id(report.project_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::not_found("project", report.project_id))?;
        let lines = self.lines(report.id).await?;

        let type_label = ReportType::from_str(&report.report_type)
            .map(ReportType::label)
            .unwrap_or("Report")
            .to_string();
        let file_name = format!(
            "{}-{}.pdf",
            project.project_code,
            crate::storage::sanitize_file_name(&report.title)
        );

        let document = ReportDocument {
            title: report.title,
            type_label,
            project_code: project.project_code,
            project_name: project.name,
            published_on: report.published_at.map(|d| d.format("%Y-%m-%d").to_string()),
            sections: lines
                .into_iter()
                .map(|l| ReportSection {
                    photo_urls: decode_url_list(&l.photo_urls),
                    title: l.title,
                    description: l.description,
                })
                .collect(),
        };
        let bytes = self.renderer.render(document).await?;
        Ok((file_name, bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn report(published: bool, internal: bool, client: bool) -> report::Model {
        let now = Utc::now();
        report::Model {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            title: "Site visit".into(),
            report_type: "site_visit".into(),
            is_published: published,
            published_at: published.then_some(now),
            share_internal: internal,
            share_with_client: client,
            created_by: Uuid::new_v4(),
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[rstest]
    #[case(Role::Client, report(true, true, true), true)]
    #[case(Role::Client, report(true, true, false), false)]
    #[case(Role::Client, report(false, true, true), false)]
    #[case(Role::Pm, report(false, false, false), true)]
    #[case(Role::Production, report(false, true, false), false)]
    #[case(Role::Production, report(true, true, false), true)]
    #[case(Role::Management, report(true, false, true), false)]
    fn visibility(#[case] role: Role, #[case] report: report::Model, #[case] visible: bool) {
        assert_eq!(can_view(&report, &AuthUser::new(Uuid::new_v4(), role)), visible);
    }
}
