use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::str::FromStr;
use tracing::debug;
use utoipa::ToSchema;

use super::{normalize, SheetColumn};
use crate::entities::scope_item::{ItemPath, ScopeItemStatus};
use crate::errors::ServiceError;

/// A spreadsheet cell reduced to what the importer cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    fn text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Some(format!("{}", *n as i64)),
            CellValue::Number(n) => Some(n.to_string()),
            CellValue::Bool(b) => Some(b.to_string()),
        }
    }

    fn number(&self) -> Result<Option<f64>, String> {
        match self {
            CellValue::Empty => Ok(None),
            CellValue::Number(n) => Ok(Some(*n)),
            CellValue::Text(s) if s.trim().is_empty() => Ok(None),
            CellValue::Text(s) => s
                .trim()
                .trim_end_matches('%')
                .replace(',', "")
                .parse::<f64>()
                .map(Some)
                .map_err(|_| format!("'{}' is not a number", s.trim())),
            CellValue::Bool(b) => Err(format!("'{}' is not a number", b)),
        }
    }
}

impl From<&Data> for CellValue {
    fn from(cell: &Data) -> Self {
        match cell {
            Data::Empty => CellValue::Empty,
            Data::String(s) => CellValue::Text(s.clone()),
            Data::Float(f) => CellValue::Number(*f),
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Bool(b) => CellValue::Bool(*b),
            Data::Error(_) => CellValue::Empty,
            other => CellValue::Text(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportedRow {
    /// 1-based sheet row, header included.
    pub row: usize,
    pub item_code: String,
    pub name: String,
    pub description: Option<String>,
    pub item_path: ItemPath,
    pub status: ScopeItemStatus,
    pub quantity: f64,
    pub unit: Option<String>,
    pub initial_unit_cost: Option<f64>,
    pub unit_sales_price: Option<f64>,
    pub production_percentage: i32,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RowIssue {
    pub row: usize,
    pub item_code: Option<String>,
    pub message: String,
}

/// Outcome of an import. Rows with errors were skipped; rows with warnings
/// were imported with the documented fallback values.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct ImportReport {
    pub imported: usize,
    pub warnings: Vec<RowIssue>,
    pub errors: Vec<RowIssue>,
}

#[derive(Debug, Clone, Default)]
pub struct ParsedSheet {
    pub rows: Vec<ImportedRow>,
    pub warnings: Vec<RowIssue>,
    pub errors: Vec<RowIssue>,
}

/// Reads the first worksheet of an `.xlsx` payload into plain cell rows.
pub fn read_workbook(bytes: &[u8]) -> Result<Vec<Vec<CellValue>>, ServiceError> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))
        .map_err(|e| ServiceError::ImportError(format!("not a readable xlsx file: {}", e)))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ServiceError::ImportError("workbook has no worksheets".into()))?
        .map_err(|e| ServiceError::ImportError(e.to_string()))?;

    let rows: Vec<Vec<CellValue>> = range
        .rows()
        .map(|row| row.iter().map(CellValue::from).collect())
        .collect();
    debug!(rows = rows.len(), "worksheet read");
    Ok(rows)
}

struct RowContext<'a> {
    row: usize,
    item_code: Option<String>,
    warnings: &'a mut Vec<RowIssue>,
}

impl RowContext<'_> {
    fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(RowIssue {
            row: self.row,
            item_code: self.item_code.clone(),
            message: message.into(),
        });
    }
}

fn parse_enum<T: FromStr + Default + std::fmt::Display>(
    cell: &CellValue,
    column: SheetColumn,
    ctx: &mut RowContext<'_>,
) -> T {
    let Some(raw) = cell.text() else {
        return T::default();
    };
    match T::from_str(&normalize(&raw)) {
        Ok(value) => value,
        Err(_) => {
            let fallback = T::default();
            ctx.warn(format!("unknown {} '{}', using {}", column, raw, fallback));
            fallback
        }
    }
}

fn parse_money(cell: &CellValue, column: SheetColumn, ctx: &mut RowContext<'_>) -> Option<f64> {
    match cell.number() {
        Ok(Some(v)) if v >= 0.0 && v.is_finite() => Some(v),
        Ok(Some(v)) => {
            ctx.warn(format!("{} {} is negative, left empty", column, v));
            None
        }
        Ok(None) => None,
        Err(message) => {
            ctx.warn(format!("{}: {}, left empty", column, message));
            None
        }
    }
}

/// Interprets raw sheet rows. The first non-blank row is the header.
///
/// Fails only when the header lacks `item_code` or `name`; every other
/// problem is reported against its row.
pub fn parse_rows(rows: &[Vec<CellValue>]) -> Result<ParsedSheet, ServiceError> {
    let Some(header_at) = rows.iter().position(|r| r.iter().any(|c| !c.is_blank())) else {
        return Err(ServiceError::ImportError("sheet is empty".into()));
    };

    let mut columns: HashMap<SheetColumn, usize> = HashMap::new();
    for (idx, cell) in rows[header_at].iter().enumerate() {
        if let Some(column) = cell.text().as_deref().and_then(SheetColumn::from_header) {
            if !column.is_computed() {
                columns.entry(column).or_insert(idx);
            }
        }
    }
    for required in [SheetColumn::ItemCode, SheetColumn::Name] {
        if !columns.contains_key(&required) {
            return Err(ServiceError::ImportError(format!(
                "header row is missing the {} column",
                required
            )));
        }
    }

    let empty = CellValue::Empty;
    let mut parsed = ParsedSheet::default();
    let mut seen_codes = HashSet::new();

    for (offset, cells) in rows.iter().enumerate().skip(header_at + 1) {
        if cells.iter().all(CellValue::is_blank) {
            continue;
        }
        let row = offset + 1;
        let cell = |column: SheetColumn| {
            columns
                .get(&column)
                .and_then(|idx| cells.get(*idx))
                .unwrap_or(&empty)
        };

        let item_code = cell(SheetColumn::ItemCode).text();
        let name = cell(SheetColumn::Name).text();
        let (item_code, name) = match (item_code, name) {
            (Some(code), Some(name)) => (code, name),
            (code, _) => {
                let missing = if code.is_none() { "item_code" } else { "name" };
                parsed.errors.push(RowIssue {
                    row,
                    item_code: code,
                    message: format!("missing {}, row skipped", missing),
                });
                continue;
            }
        };
        if !seen_codes.insert(item_code.clone()) {
            parsed.errors.push(RowIssue {
                row,
                item_code: Some(item_code),
                message: "item_code repeated in this sheet, row skipped".into(),
            });
            continue;
        }

        let mut ctx = RowContext {
            row,
            item_code: Some(item_code.clone()),
            warnings: &mut parsed.warnings,
        };

        let status: ScopeItemStatus = parse_enum(cell(SheetColumn::Status), SheetColumn::Status, &mut ctx);
        let item_path: ItemPath = parse_enum(cell(SheetColumn::ItemPath), SheetColumn::ItemPath, &mut ctx);

        let quantity = match cell(SheetColumn::Quantity).number() {
            Ok(Some(q)) if q >= 0.0 && q.is_finite() => q,
            Ok(Some(q)) => {
                ctx.warn(format!("quantity {} is negative, using 0", q));
                0.0
            }
            Ok(None) => 0.0,
            Err(message) => {
                ctx.warn(format!("quantity: {}, using 0", message));
                0.0
            }
        };

        let production_percentage = match cell(SheetColumn::ProductionPercentage).number() {
            Ok(Some(p)) => {
                let rounded = p.round();
                let clamped = rounded.clamp(0.0, 100.0);
                if clamped != rounded {
                    ctx.warn(format!("production_percentage {} clamped to {}", p, clamped));
                }
                clamped as i32
            }
            Ok(None) => 0,
            Err(message) => {
                ctx.warn(format!("production_percentage: {}, using 0", message));
                0
            }
        };

        let initial_unit_cost = parse_money(cell(SheetColumn::InitialUnitCost), SheetColumn::InitialUnitCost, &mut ctx);
        let unit_sales_price = parse_money(cell(SheetColumn::UnitSalesPrice), SheetColumn::UnitSalesPrice, &mut ctx);

        parsed.rows.push(ImportedRow {
            row,
            item_code,
            name,
            description: cell(SheetColumn::Description).text(),
            item_path,
            status,
            quantity,
            unit: cell(SheetColumn::Unit).text(),
            initial_unit_cost,
            unit_sales_price,
            production_percentage,
            notes: cell(SheetColumn::Notes).text(),
        });
    }

    Ok(parsed)
}
