//! Spreadsheet import and export of a project's scope items.

use bytes::Bytes;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::access::AccessControl;
use super::activity::{self, ActivityEntry};
use super::scope_items::{CreateScopeItemRequest, ScopeItemService};
use crate::auth::{AuthUser, Capability};
use crate::db::DbPool;
use crate::entities::scope_item;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::excel::{self, ImportReport, ImportedRow, RowIssue};
use crate::metrics::IMPORT_ROWS;
use crate::storage::sanitize_file_name;

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

impl From<ImportedRow> for CreateScopeItemRequest {
    fn from(row: ImportedRow) -> Self {
        CreateScopeItemRequest {
            item_code: row.item_code,
            name: row.name,
            description: row.description,
            item_path: row.item_path,
            status: row.status,
            quantity: row.quantity,
            unit: row.unit,
            production_percentage: row.production_percentage,
            initial_unit_cost: row.initial_unit_cost,
            initial_total_cost: None,
            actual_unit_cost: None,
            unit_sales_price: row.unit_sales_price,
            notes: row.notes,
        }
    }
}

#[derive(Clone)]
pub struct TransferService {
    db: Arc<DbPool>,
    access: AccessControl,
    items: ScopeItemService,
    events: EventSender,
}

impl TransferService {
    pub fn new(db: Arc<DbPool>, access: AccessControl, items: ScopeItemService, events: EventSender) -> Self {
        Self {
            db,
            access,
            items,
            events,
        }
    }

    /// Creates one scope item per valid row. Rows fail independently and
    /// nothing is rolled back.
    #[instrument(skip(self, user, payload), fields(user_id = %user.user_id, bytes = payload.len()))]
    pub async fn import_scope_items(
        &self,
        user: &AuthUser,
        project_id: Uuid,
        payload: Bytes,
    ) -> Result<ImportReport, ServiceError> {
        user.require(Capability::ImportExport)?;
        self.access.project(user, project_id).await?;

        let sheet = tokio::task::spawn_blocking(move || {
            excel::read_workbook(&payload).and_then(|rows| excel::parse_rows(&rows))
        })
        .await
        .map_err(|e| ServiceError::InternalError(format!("import task failed: {}", e)))??;

        IMPORT_ROWS
            .with_label_values(&["skipped"])
            .inc_by(sheet.errors.len() as u64);

        let mut report = ImportReport {
            imported: 0,
            warnings: sheet.warnings,
            errors: sheet.errors,
        };

        for row in sheet.rows {
            let line = row.row;
            let code = row.item_code.clone();
            match self.items.insert(project_id, row.into()).await {
                Ok(_) => {
                    report.imported += 1;
                    IMPORT_ROWS.with_label_values(&["imported"]).inc();
                }
                Err(e) => {
                    warn!(row = line, item_code = %code, error = %e, "import row rejected");
                    IMPORT_ROWS.with_label_values(&["failed"]).inc();
                    report.errors.push(RowIssue {
                        row: line,
                        item_code: Some(code),
                        message: e.response_message(),
                    });
                }
            }
        }
        report.errors.sort_by_key(|issue| issue.row);

        activity::record(
            self.db.as_ref(),
            user,
            ActivityEntry {
                project_id,
                entity_type: "project",
                entity_id: project_id,
                action: "scope_items_imported".into(),
                details: serde_json::json!({
                    "imported": report.imported,
                    "warnings": report.warnings.len(),
                    "errors": report.errors.len(),
                }),
            },
            None,
        )
        .await?;

        self.events
            .publish(Event::ScopeItemsImported {
                project_id,
                imported: report.imported,
                errors: report.errors.len(),
            })
            .await;

        info!(
            imported = report.imported,
            warnings = report.warnings.len(),
            errors = report.errors.len(),
            "scope item import finished"
        );
        Ok(report)
    }

    /// Returns `(file_name, xlsx bytes)`.
    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn export_scope_items(
        &self,
        user: &AuthUser,
        project_id: Uuid,
    ) -> Result<(String, Vec<u8>), ServiceError> {
        let project = self.access.project(user, project_id).await?;
        let items = scope_item::Entity::find()
            .filter(scope_item::Column::ProjectId.eq(project_id))
            .filter(scope_item::Column::IsDeleted.eq(false))
            .order_by_asc(scope_item::Column::ItemCode)
            .all(self.db.as_ref())
            .await?;

        let include_costs = user.sees_costs();
        let count = items.len();
        let bytes = tokio::task::spawn_blocking(move || excel::write_workbook(&items, include_costs))
            .await
            .map_err(|e| ServiceError::InternalError(format!("export task failed: {}", e)))??;

        info!(items = count, include_costs, "scope items exported");
        let file_name = sanitize_file_name(&format!("{}_scope_items.xlsx", project.project_code));
        Ok((file_name, bytes))
    }
}
