use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};

use super::{SheetColumn, SHEET_NAME};
use crate::entities::scope_item;
use crate::errors::ServiceError;

impl From<XlsxError> for ServiceError {
    fn from(err: XlsxError) -> Self {
        ServiceError::ExportError(err.to_string())
    }
}

fn column_width(column: SheetColumn) -> f64 {
    match column {
        SheetColumn::Name | SheetColumn::Description | SheetColumn::Notes => 32.0,
        SheetColumn::ItemCode | SheetColumn::Unit | SheetColumn::Progress => 12.0,
        _ => 18.0,
    }
}

fn write_text(sheet: &mut Worksheet, row: u32, col: u16, value: Option<&str>) -> Result<(), XlsxError> {
    if let Some(text) = value {
        sheet.write_string(row, col, text)?;
    }
    Ok(())
}

fn write_amount(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: Option<f64>,
    format: &Format,
) -> Result<(), XlsxError> {
    if let Some(amount) = value {
        sheet.write_number_with_format(row, col, amount, format)?;
    }
    Ok(())
}

/// Writes scope items to a single-sheet workbook. Cost and price columns are
/// left out entirely when `include_costs` is false.
pub fn write_workbook(items: &[scope_item::Model], include_costs: bool) -> Result<Vec<u8>, ServiceError> {
    let columns = SheetColumn::export_set(include_costs);
    let header = Format::new().set_bold();
    let money = Format::new().set_num_format("#,##0.00");
    let percent = Format::new().set_num_format("0%");

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;
    sheet.set_freeze_panes(1, 0)?;

    for (idx, column) in columns.iter().enumerate() {
        let col = idx as u16;
        sheet.write_string_with_format(0, col, column.as_ref(), &header)?;
        sheet.set_column_width(col, column_width(*column))?;
    }

    for (offset, item) in items.iter().enumerate() {
        let row = offset as u32 + 1;
        for (idx, column) in columns.iter().enumerate() {
            let col = idx as u16;
            match column {
                SheetColumn::ItemCode => write_text(sheet, row, col, Some(item.item_code.as_str()))?,
                SheetColumn::Name => write_text(sheet, row, col, Some(item.name.as_str()))?,
                SheetColumn::Description => write_text(sheet, row, col, item.description.as_deref())?,
                SheetColumn::ItemPath => write_text(sheet, row, col, Some(item.item_path.as_str()))?,
                SheetColumn::Status => write_text(sheet, row, col, Some(item.status.as_str()))?,
                SheetColumn::Quantity => {
                    sheet.write_number(row, col, item.quantity)?;
                }
                SheetColumn::Unit => write_text(sheet, row, col, item.unit.as_deref())?,
                SheetColumn::InitialUnitCost => write_amount(sheet, row, col, item.initial_unit_cost, &money)?,
                SheetColumn::UnitSalesPrice => write_amount(sheet, row, col, item.unit_sales_price, &money)?,
                SheetColumn::ProductionPercentage => {
                    sheet.write_number(row, col, f64::from(item.production_percentage))?;
                }
                SheetColumn::Notes => write_text(sheet, row, col, item.notes.as_deref())?,
                SheetColumn::InitialTotalCost => write_amount(sheet, row, col, item.initial_total_cost, &money)?,
                SheetColumn::ActualTotalCost => write_amount(sheet, row, col, item.actual_total_cost, &money)?,
                SheetColumn::TotalSalesPrice => write_amount(sheet, row, col, item.total_sales_price, &money)?,
                SheetColumn::Progress => {
                    let fraction = f64::from(item.production_percentage) / 100.0;
                    sheet.write_number_with_format(row, col, fraction, &percent)?;
                }
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excel::{parse_rows, read_workbook, CellValue};
    use chrono::Utc;
    use uuid::Uuid;

    fn item(code: &str, name: &str, quantity: f64) -> scope_item::Model {
        let now = Utc::now();
        scope_item::Model {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            item_code: code.into(),
            name: name.into(),
            description: Some("oak veneer".into()),
            item_path: "production".into(),
            status: "in_production".into(),
            quantity,
            unit: Some("pcs".into()),
            production_percentage: 35,
            initial_unit_cost: Some(100.0),
            initial_total_cost: Some(100.0 * quantity),
            actual_unit_cost: None,
            actual_total_cost: None,
            unit_sales_price: Some(150.0),
            total_sales_price: Some(150.0 * quantity),
            notes: None,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn exported_sheet_reads_back() {
        let items = vec![item("W-01", "Wardrobe", 3.0), item("T-07", "Reception desk", 1.5)];
        let bytes = write_workbook(&items, true).unwrap();
        let sheet = parse_rows(&read_workbook(&bytes).unwrap()).unwrap();

        assert!(sheet.errors.is_empty());
        assert!(sheet.warnings.is_empty());
        let got: Vec<(String, String, f64)> = sheet
            .rows
            .iter()
            .map(|r| (r.item_code.clone(), r.name.clone(), r.quantity))
            .collect();
        assert_eq!(
            got,
            vec![
                ("W-01".to_string(), "Wardrobe".to_string(), 3.0),
                ("T-07".to_string(), "Reception desk".to_string(), 1.5),
            ]
        );
        assert_eq!(sheet.rows[0].initial_unit_cost, Some(100.0));
        assert_eq!(sheet.rows[0].production_percentage, 35);
    }

    #[test]
    fn costless_export_has_no_cost_headers() {
        let bytes = write_workbook(&[item("W-01", "Wardrobe", 1.0)], false).unwrap();
        let rows = read_workbook(&bytes).unwrap();
        let headers: Vec<String> = rows[0]
            .iter()
            .filter_map(|c| match c {
                CellValue::Text(s) => Some(s.clone()),
                _ => None,
            })
            .collect();
        assert!(headers.contains(&"progress".to_string()));
        assert!(!headers.iter().any(|h| h.contains("cost") || h.contains("price")));
    }
}
