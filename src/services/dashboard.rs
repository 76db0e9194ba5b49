/*!
 * # Dashboard aggregation
 *
 * Each section is an independent query run concurrently. A failing section
 * is logged and replaced by its empty value. An unresolvable project scope
 * degrades to an empty one, so the dashboard itself never fails.
 *
 * The global bundle (roles with `ViewAllProjects`) is memoised for the
 * configured TTL. Per-user bundles are always computed fresh. Clients get a
 * reduced bundle: project progress and what awaits their approval.
 */

use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::access::{AccessControl, ProjectScope};
use super::activity::recent_activity;
use super::milestones::MilestoneView;
use crate::auth::{AuthUser, Capability, Role};
use crate::cache::TtlCache;
use crate::db::DbPool;
use crate::entities::{drawing, material, milestone, project, scope_item, snag};
use crate::errors::ServiceError;
use crate::metrics::DASHBOARD_SECTION_FAILURES;
use crate::workflow::drawing::DrawingStatus;
use crate::workflow::material::MaterialStatus;

pub const GLOBAL_CACHE_KEY: &str = "dashboard:global";
const RECENT_PROJECTS: u64 = 10;
const RECENT_ACTIVITY: u64 = 10;
const UPCOMING_DAYS: i64 = 14;
const UPCOMING_LIMIT: usize = 10;

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct DashboardCounts {
    pub projects_by_status: Vec<StatusCount>,
    pub scope_items_by_status: Vec<StatusCount>,
    pub drawings_awaiting_client: i64,
    /// Materials not yet decided (`pending` or `sent_to_client`).
    pub materials_pending: i64,
    pub overdue_milestones: i64,
    pub open_snags: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProjectSummary {
    pub id: Uuid,
    pub project_code: String,
    pub name: String,
    pub client_name: String,
    pub status: String,
    /// Mean production percentage across live scope items.
    pub progress: f64,
    pub contract_value: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct FinancialTotals {
    pub contract_value: Option<f64>,
    pub initial_total_cost: Option<f64>,
    pub actual_total_cost: Option<f64>,
    pub total_sales_price: Option<f64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PendingDrawing {
    pub drawing_id: Uuid,
    pub item_id: Uuid,
    pub item_code: Option<String>,
    pub project_id: Uuid,
    pub revision: Option<String>,
    pub sent_to_client_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PendingMaterial {
    pub material_id: Uuid,
    pub material_code: String,
    pub name: String,
    pub project_id: Uuid,
    pub sent_to_client_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct PendingApprovals {
    pub drawings: Vec<PendingDrawing>,
    pub materials: Vec<PendingMaterial>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ActivityItem {
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub action: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardBundle {
    pub role: Role,
    /// `global` or `assigned`.
    pub scope: String,
    pub counts: DashboardCounts,
    pub recent_projects: Vec<ProjectSummary>,
    /// Present only for roles that may see financials.
    pub financials: Option<FinancialTotals>,
    pub pending_approvals: PendingApprovals,
    pub upcoming_milestones: Vec<MilestoneView>,
    pub recent_activity: Vec<ActivityItem>,
    pub generated_at: DateTime<Utc>,
}

/// Falls back to the empty value for a failed section.
pub trait SectionResult<T> {
    fn section_or_default(self, section: &'static str) -> T;
}

impl<T: Default> SectionResult<T> for Result<T, ServiceError> {
    fn section_or_default(self, section: &'static str) -> T {
        match self {
            Ok(value) => value,
            Err(e) => {
                warn!(section, error = %e, "dashboard section failed, using empty value");
                DASHBOARD_SECTION_FAILURES.with_label_values(&[section]).inc();
                T::default()
            }
        }
    }
}

#[derive(Clone)]
pub struct DashboardService {
    db: Arc<DbPool>,
    access: AccessControl,
    cache: TtlCache<DashboardBundle>,
}

impl DashboardService {
    pub fn new(db: Arc<DbPool>, access: AccessControl, ttl: std::time::Duration) -> Self {
        Self {
            db,
            access,
            cache: TtlCache::new("dashboard", ttl),
        }
    }

    /// Drops the memoised global bundle.
    pub fn invalidate(&self) {
        self.cache.invalidate(GLOBAL_CACHE_KEY);
    }

    #[instrument(skip(self, user), fields(user_id = %user.user_id, role = %user.role))]
    pub async fn for_user(&self, user: &AuthUser) -> Result<DashboardBundle, ServiceError> {
        let scope = match self.access.scope_for(user).await {
            Ok(scope) => scope,
            Err(e) => {
                warn!(error = %e, "project scope unavailable, dashboard limited to nothing");
                DASHBOARD_SECTION_FAILURES.with_label_values(&["scope"]).inc();
                ProjectScope::Only(Vec::new())
            }
        };

        if user.role == Role::Client {
            let bundle = self.build_client(scope).await;
            return Ok(shape_for(bundle, user));
        }

        if scope == ProjectScope::All {
            let bundle = self
                .cache
                .get_or_insert_with(GLOBAL_CACHE_KEY, || self.build(ProjectScope::All, Role::Admin))
                .await;
            return Ok(shape_for(bundle, user));
        }

        let bundle = self.build(scope, user.role).await;
        Ok(shape_for(bundle, user))
    }

    async fn build(&self, scope: ProjectScope, role: Role) -> DashboardBundle {
        let now = Utc::now();
        let (
            projects_by_status,
            items_by_status,
            drawings_awaiting,
            materials_pending,
            milestones,
            open_snags,
            recent_projects,
            financials,
            pending,
            activity,
        ) = tokio::join!(
            self.projects_by_status(&scope),
            self.items_by_status(&scope),
            self.drawings_awaiting_client(&scope),
            self.materials_pending(&scope),
            self.open_milestones(&scope),
            self.open_snags(&scope),
            self.recent_projects(&scope),
            self.financials(&scope),
            self.pending_approvals(&scope),
            recent_activity(self.db.as_ref(), &scope, RECENT_ACTIVITY),
        );

        let milestones = milestones.section_or_default("milestones");
        let overdue = milestones.iter().filter(|m| m.is_overdue(now)).count();
        let horizon = now + Duration::days(UPCOMING_DAYS);
        let upcoming: Vec<MilestoneView> = milestones
            .into_iter()
            .filter(|m| m.due_date >= now && m.due_date <= horizon)
            .take(UPCOMING_LIMIT)
            .map(|m| MilestoneView::at(m, now))
            .collect();

        let bundle = DashboardBundle {
            role,
            scope: if scope == ProjectScope::All { "global" } else { "assigned" }.to_string(),
            counts: DashboardCounts {
                projects_by_status: projects_by_status.section_or_default("projects_by_status"),
                scope_items_by_status: items_by_status.section_or_default("scope_items_by_status"),
                drawings_awaiting_client: drawings_awaiting.section_or_default("drawings_awaiting_client"),
                materials_pending: materials_pending.section_or_default("materials_pending"),
                overdue_milestones: i64::try_from(overdue).unwrap_or(i64::MAX),
                open_snags: open_snags.section_or_default("open_snags"),
            },
            recent_projects: recent_projects.section_or_default("recent_projects"),
            financials: Some(financials.section_or_default("financials")),
            pending_approvals: pending.section_or_default("pending_approvals"),
            upcoming_milestones: upcoming,
            recent_activity: activity
                .map(|rows| {
                    rows.into_iter()
                        .map(|a| ActivityItem {
                            project_id: a.project_id,
                            user_id: a.user_id,
                            entity_type: a.entity_type,
                            entity_id: a.entity_id,
                            action: a.action,
                            created_at: a.created_at,
                        })
                        .collect()
                })
                .section_or_default("recent_activity"),
            generated_at: now,
        };
        debug!(scope = %bundle.scope, "dashboard bundle built");
        bundle
    }

    /// Progress of the client's projects and the items awaiting their decision.
    async fn build_client(&self, scope: ProjectScope) -> DashboardBundle {
        let (recent_projects, pending) =
            tokio::join!(self.recent_projects(&scope), self.pending_approvals(&scope));

        DashboardBundle {
            role: Role::Client,
            scope: "assigned".to_string(),
            counts: DashboardCounts::default(),
            recent_projects: recent_projects.section_or_default("recent_projects"),
            financials: None,
            pending_approvals: pending.section_or_default("pending_approvals"),
            upcoming_milestones: Vec::new(),
            recent_activity: Vec::new(),
            generated_at: Utc::now(),
        }
    }

    async fn live_project_ids(&self, scope: &ProjectScope) -> Result<Vec<Uuid>, ServiceError> {
        let ids = project::Entity::find()
            .select_only()
            .column(project::Column::Id)
            .filter(project::Column::IsDeleted.eq(false))
            .filter(scope.condition(project::Column::Id))
            .into_tuple::<Uuid>()
            .all(self.db.as_ref())
            .await?;
        Ok(ids)
    }

    async fn projects_by_status(&self, scope: &ProjectScope) -> Result<Vec<StatusCount>, ServiceError> {
        let rows = project::Entity::find()
            .select_only()
            .column(project::Column::Status)
            .column_as(Expr::col(project::Column::Id).count(), "count")
            .filter(project::Column::IsDeleted.eq(false))
            .filter(scope.condition(project::Column::Id))
            .group_by(project::Column::Status)
            .order_by_asc(project::Column::Status)
            .into_tuple::<(String, i64)>()
            .all(self.db.as_ref())
            .await?;
        Ok(rows
            .into_iter()
            .map(|(status, count)| StatusCount { status, count })
            .collect())
    }

    async fn items_by_status(&self, scope: &ProjectScope) -> Result<Vec<StatusCount>, ServiceError> {
        let projects = self.live_project_ids(scope).await?;
        let rows = scope_item::Entity::find()
            .select_only()
            .column(scope_item::Column::Status)
            .column_as(Expr::col(scope_item::Column::Id).count(), "count")
            .filter(scope_item::Column::IsDeleted.eq(false))
            .filter(scope_item::Column::ProjectId.is_in(projects))
            .group_by(scope_item::Column::Status)
            .order_by_asc(scope_item::Column::Status)
            .into_tuple::<(String, i64)>()
            .all(self.db.as_ref())
            .await?;
        Ok(rows
            .into_iter()
            .map(|(status, count)| StatusCount { status, count })
            .collect())
    }

    async fn drawings_awaiting_client(&self, scope: &ProjectScope) -> Result<i64, ServiceError> {
        let projects = self.live_project_ids(scope).await?;
        let count = drawing::Entity::find()
            .select_only()
            .column_as(Expr::col((drawing::Entity, drawing::Column::Id)).count(), "count")
            .inner_join(scope_item::Entity)
            .filter(scope_item::Column::IsDeleted.eq(false))
            .filter(drawing::Column::Status.eq(DrawingStatus::SentToClient.as_ref()))
            .filter(drawing::Column::ProjectId.is_in(projects))
            .into_tuple::<i64>()
            .one(self.db.as_ref())
            .await?;
        Ok(count.unwrap_or(0))
    }

    async fn materials_pending(&self, scope: &ProjectScope) -> Result<i64, ServiceError> {
        let projects = self.live_project_ids(scope).await?;
        let count = material::Entity::find()
            .select_only()
            .column_as(Expr::col(material::Column::Id).count(), "count")
            .filter(material::Column::IsDeleted.eq(false))
            .filter(material::Column::Status.is_in([
                MaterialStatus::Pending.to_string(),
                MaterialStatus::SentToClient.to_string(),
            ]))
            .filter(material::Column::ProjectId.is_in(projects))
            .into_tuple::<i64>()
            .one(self.db.as_ref())
            .await?;
        Ok(count.unwrap_or(0))
    }

    /// Incomplete milestones ordered by due date. Overdue and upcoming are
    /// derived from these in Rust so the comparison is backend-independent.
    async fn open_milestones(&self, scope: &ProjectScope) -> Result<Vec<milestone::Model>, ServiceError> {
        let projects = self.live_project_ids(scope).await?;
        let rows = milestone::Entity::find()
            .filter(milestone::Column::IsDeleted.eq(false))
            .filter(milestone::Column::IsCompleted.eq(false))
            .filter(milestone::Column::ProjectId.is_in(projects))
            .order_by_asc(milestone::Column::DueDate)
            .all(self.db.as_ref())
            .await?;
        Ok(rows)
    }

    async fn open_snags(&self, scope: &ProjectScope) -> Result<i64, ServiceError> {
        let projects = self.live_project_ids(scope).await?;
        let count = snag::Entity::find()
            .select_only()
            .column_as(Expr::col(snag::Column::Id).count(), "count")
            .filter(snag::Column::IsDeleted.eq(false))
            .filter(snag::Column::IsResolved.eq(false))
            .filter(snag::Column::ProjectId.is_in(projects))
            .into_tuple::<i64>()
            .one(self.db.as_ref())
            .await?;
        Ok(count.unwrap_or(0))
    }

    async fn recent_projects(&self, scope: &ProjectScope) -> Result<Vec<ProjectSummary>, ServiceError> {
        let projects = project::Entity::find()
            .filter(project::Column::IsDeleted.eq(false))
            .filter(scope.condition(project::Column::Id))
            .order_by_desc(project::Column::CreatedAt)
            .limit(RECENT_PROJECTS)
            .all(self.db.as_ref())
            .await?;
        let ids: Vec<Uuid> = projects.iter().map(|p| p.id).collect();

        let percentages = scope_item::Entity::find()
            .select_only()
            .column(scope_item::Column::ProjectId)
            .column(scope_item::Column::ProductionPercentage)
            .filter(scope_item::Column::IsDeleted.eq(false))
            .filter(scope_item::Column::ProjectId.is_in(ids))
            .into_tuple::<(Uuid, i32)>()
            .all(self.db.as_ref())
            .await?;

        let mut totals: HashMap<Uuid, (i64, i64)> = HashMap::new();
        for (project_id, pct) in percentages {
            let entry = totals.entry(project_id).or_default();
            entry.0 += i64::from(pct);
            entry.1 += 1;
        }

        Ok(projects
            .into_iter()
            .map(|p| {
                let progress = totals
                    .get(&p.id)
                    .filter(|(_, n)| *n > 0)
                    .map_or(0.0, |(sum, n)| *sum as f64 / *n as f64);
                ProjectSummary {
                    id: p.id,
                    project_code: p.project_code,
                    name: p.name,
                    client_name: p.client_name,
                    status: p.status,
                    progress,
                    contract_value: p.contract_value,
                    created_at: p.created_at,
                }
            })
            .collect())
    }

    async fn financials(&self, scope: &ProjectScope) -> Result<FinancialTotals, ServiceError> {
        let projects = self.live_project_ids(scope).await?;
        let contract = project::Entity::find()
            .select_only()
            .column_as(Expr::col(project::Column::ContractValue).sum(), "contract_value")
            .filter(project::Column::Id.is_in(projects.clone()))
            .into_tuple::<Option<f64>>()
            .one(self.db.as_ref())
            .await?
            .flatten();

        let items = scope_item::Entity::find()
            .select_only()
            .column_as(Expr::col(scope_item::Column::InitialTotalCost).sum(), "initial")
            .column_as(Expr::col(scope_item::Column::ActualTotalCost).sum(), "actual")
            .column_as(Expr::col(scope_item::Column::TotalSalesPrice).sum(), "sales")
            .filter(scope_item::Column::IsDeleted.eq(false))
            .filter(scope_item::Column::ProjectId.is_in(projects))
            .into_tuple::<(Option<f64>, Option<f64>, Option<f64>)>()
            .one(self.db.as_ref())
            .await?
            .unwrap_or((None, None, None));

        Ok(FinancialTotals {
            contract_value: contract,
            initial_total_cost: items.0,
            actual_total_cost: items.1,
            total_sales_price: items.2,
        })
    }

    async fn pending_approvals(&self, scope: &ProjectScope) -> Result<PendingApprovals, ServiceError> {
        let projects = self.live_project_ids(scope).await?;
        let drawings = drawing::Entity::find()
            .filter(drawing::Column::Status.eq(DrawingStatus::SentToClient.as_ref()))
            .filter(drawing::Column::ProjectId.is_in(projects.clone()))
            .order_by_asc(drawing::Column::SentToClientAt)
            .find_also_related(scope_item::Entity)
            .filter(scope_item::Column::IsDeleted.eq(false))
            .all(self.db.as_ref())
            .await?;
        let materials = material::Entity::find()
            .filter(material::Column::Status.eq(MaterialStatus::SentToClient.as_ref()))
            .filter(material::Column::IsDeleted.eq(false))
            .filter(material::Column::ProjectId.is_in(projects))
            .order_by_asc(material::Column::SentToClientAt)
            .all(self.db.as_ref())
            .await?;

        Ok(PendingApprovals {
            drawings: drawings
                .into_iter()
                .map(|(d, item)| PendingDrawing {
                    drawing_id: d.id,
                    item_id: d.item_id,
                    item_code: item.map(|i| i.item_code),
                    project_id: d.project_id,
                    revision: d.current_revision,
                    sent_to_client_at: d.sent_to_client_at,
                })
                .collect(),
            materials: materials
                .into_iter()
                .map(|m| PendingMaterial {
                    material_id: m.id,
                    material_code: m.material_code,
                    name: m.name,
                    project_id: m.project_id,
                    sent_to_client_at: m.sent_to_client_at,
                })
                .collect(),
        })
    }
}

/// Applies role visibility to a computed bundle.
///
/// Totals over assigned projects need `ViewCosts`; portfolio-wide totals need
/// `ViewFinancials`. Clients keep only project progress and pending approvals.
pub fn shape_for(mut bundle: DashboardBundle, user: &AuthUser) -> DashboardBundle {
    let sees_totals = if bundle.scope == "global" {
        user.can(Capability::ViewFinancials)
    } else {
        user.can(Capability::ViewCosts)
    };
    if !sees_totals {
        bundle.financials = None;
    }
    if !user.can(Capability::ViewCosts) {
        for project in &mut bundle.recent_projects {
            project.contract_value = None;
        }
    }
    if user.role == Role::Client {
        bundle.counts = DashboardCounts::default();
        bundle.upcoming_milestones.clear();
        bundle.recent_activity.clear();
    }
    bundle.role = user.role;
    bundle
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle() -> DashboardBundle {
        let now = Utc::now();
        DashboardBundle {
            role: Role::Admin,
            scope: "global".into(),
            counts: DashboardCounts::default(),
            recent_projects: vec![ProjectSummary {
                id: Uuid::new_v4(),
                project_code: "HTL-204".into(),
                name: "Harbour Hotel".into(),
                client_name: "Harbour Group".into(),
                status: "active".into(),
                progress: 42.0,
                contract_value: Some(250_000.0),
                created_at: now,
            }],
            financials: Some(FinancialTotals {
                contract_value: Some(250_000.0),
                initial_total_cost: Some(120_000.0),
                actual_total_cost: Some(80_000.0),
                total_sales_price: Some(240_000.0),
            }),
            pending_approvals: PendingApprovals::default(),
            upcoming_milestones: vec![],
            recent_activity: vec![],
            generated_at: now,
        }
    }

    fn assigned_bundle() -> DashboardBundle {
        let mut bundle = bundle();
        bundle.scope = "assigned".into();
        bundle.counts.open_snags = 2;
        bundle.counts.overdue_milestones = 1;
        bundle.recent_activity.push(ActivityItem {
            project_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            entity_type: "snag".into(),
            entity_id: Uuid::new_v4(),
            action: "created".into(),
            created_at: Utc::now(),
        });
        bundle
    }

    #[test]
    fn client_shape_keeps_only_progress_and_approvals() {
        let shaped = shape_for(assigned_bundle(), &AuthUser::new(Uuid::new_v4(), Role::Client));
        assert!(shaped.financials.is_none());
        assert!(shaped.recent_projects.iter().all(|p| p.contract_value.is_none()));
        assert_eq!(shaped.recent_projects[0].progress, 42.0);
        assert_eq!(shaped.counts.open_snags, 0);
        assert_eq!(shaped.counts.overdue_milestones, 0);
        assert!(shaped.recent_activity.is_empty());
        assert_eq!(shaped.role, Role::Client);
    }

    #[test]
    fn assigned_roles_with_costs_keep_their_totals() {
        for role in [Role::Pm, Role::Production, Role::Procurement] {
            let shaped = shape_for(assigned_bundle(), &AuthUser::new(Uuid::new_v4(), role));
            assert!(shaped.financials.is_some(), "{role} lost financials");
            assert_eq!(shaped.recent_projects[0].contract_value, Some(250_000.0));
            assert_eq!(shaped.counts.open_snags, 2);
        }
    }

    #[test]
    fn management_sees_financials() {
        let shaped = shape_for(bundle(), &AuthUser::new(Uuid::new_v4(), Role::Management));
        assert!(shaped.financials.is_some());
    }

    #[test]
    fn failed_section_falls_back_to_empty() {
        let failed: Result<Vec<StatusCount>, ServiceError> = Err(ServiceError::db_error("timeout"));
        assert!(failed.section_or_default("projects_by_status").is_empty());
        let ok: Result<i64, ServiceError> = Ok(3);
        assert_eq!(ok.section_or_default("open_snags"), 3);
    }
}
