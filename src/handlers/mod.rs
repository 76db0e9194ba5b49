//! HTTP handlers and the service container they share.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::pdf::{PhotoFetcher, ReportRenderer};
use crate::services::{
    access::AccessControl, activity::ActivityService, dashboard::DashboardService,
    drawings::DrawingService, materials::MaterialService, milestones::MilestoneService,
    notifications::NotificationService, projects::ProjectService, reports::ReportService,
    scope_items::ScopeItemService, snagging::SnagService, transfer::TransferService,
};

pub mod activity;
pub mod common;
pub mod dashboard;
pub mod drawings;
pub mod health;
pub mod materials;
pub mod milestones;
pub mod notifications;
pub mod projects;
pub mod reports;
pub mod scope_items;
pub mod snagging;
pub mod storage;

/// Services used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub access: AccessControl,
    pub projects: Arc<ProjectService>,
    pub scope_items: Arc<ScopeItemService>,
    pub drawings: Arc<DrawingService>,
    pub materials: Arc<MaterialService>,
    pub milestones: Arc<MilestoneService>,
    pub snagging: Arc<SnagService>,
    pub reports: Arc<ReportService>,
    pub dashboard: Arc<DashboardService>,
    pub transfer: Arc<TransferService>,
    pub activity: Arc<ActivityService>,
    pub notifications: Arc<NotificationService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DbPool>,
        events: EventSender,
        config: &AppConfig,
        photos: Arc<dyn PhotoFetcher>,
    ) -> Self {
        let access = AccessControl::new(db.clone(), config.project_cache_ttl());
        let scope_items = ScopeItemService::new(db.clone(), access.clone());

        Self {
            projects: Arc::new(ProjectService::new(db.clone(), access.clone(), events.clone())),
            drawings: Arc::new(DrawingService::new(
                db.clone(),
                access.clone(),
                scope_items.clone(),
                events.clone(),
            )),
            materials: Arc::new(MaterialService::new(db.clone(), access.clone(), events.clone())),
            milestones: Arc::new(MilestoneService::new(db.clone(), access.clone())),
            snagging: Arc::new(SnagService::new(db.clone(), access.clone())),
            reports: Arc::new(ReportService::new(
                db.clone(),
                access.clone(),
                events.clone(),
                ReportRenderer::new(photos),
            )),
            dashboard: Arc::new(DashboardService::new(
                db.clone(),
                access.clone(),
                config.dashboard_cache_ttl(),
            )),
            transfer: Arc::new(TransferService::new(
                db.clone(),
                access.clone(),
                scope_items.clone(),
                events,
            )),
            activity: Arc::new(ActivityService::new(db.clone(), access.clone())),
            notifications: Arc::new(NotificationService::new(db)),
            scope_items: Arc::new(scope_items),
            access,
        }
    }
}
