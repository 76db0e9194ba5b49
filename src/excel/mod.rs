//! Spreadsheet exchange for scope items.
//!
//! Import and export share one column vocabulary ([`SheetColumn`]); headers
//! are matched case-insensitively and spaces are treated as underscores, so a
//! sheet exported here always imports cleanly.

use strum::{AsRefStr, Display, EnumIter, EnumString};

pub mod export;
pub mod import;

pub use export::write_workbook;
pub use import::{parse_rows, read_workbook, CellValue, ImportReport, ImportedRow, ParsedSheet, RowIssue};

pub const SHEET_NAME: &str = "Scope Items";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum SheetColumn {
    ItemCode,
    Name,
    Description,
    ItemPath,
    Status,
    Quantity,
    Unit,
    InitialUnitCost,
    UnitSalesPrice,
    ProductionPercentage,
    Notes,
    // computed on export, ignored on import
    InitialTotalCost,
    ActualTotalCost,
    TotalSalesPrice,
    Progress,
}

impl SheetColumn {
    /// Columns read by the importer, in export order.
    pub const EDITABLE: [SheetColumn; 11] = [
        SheetColumn::ItemCode,
        SheetColumn::Name,
        SheetColumn::Description,
        SheetColumn::ItemPath,
        SheetColumn::Status,
        SheetColumn::Quantity,
        SheetColumn::Unit,
        SheetColumn::InitialUnitCost,
        SheetColumn::UnitSalesPrice,
        SheetColumn::ProductionPercentage,
        SheetColumn::Notes,
    ];

    pub const COMPUTED: [SheetColumn; 4] = [
        SheetColumn::InitialTotalCost,
        SheetColumn::ActualTotalCost,
        SheetColumn::TotalSalesPrice,
        SheetColumn::Progress,
    ];

    pub fn is_cost(self) -> bool {
        matches!(
            self,
            SheetColumn::InitialUnitCost
                | SheetColumn::UnitSalesPrice
                | SheetColumn::InitialTotalCost
                | SheetColumn::ActualTotalCost
                | SheetColumn::TotalSalesPrice
        )
    }

    pub fn is_computed(self) -> bool {
        Self::COMPUTED.contains(&self)
    }

    /// Export column set, without cost columns when `include_costs` is false.
    pub fn export_set(include_costs: bool) -> Vec<SheetColumn> {
        Self::EDITABLE
            .iter()
            .chain(Self::COMPUTED.iter())
            .copied()
            .filter(|c| include_costs || !c.is_cost())
            .collect()
    }

    /// Matches a header cell such as `"Item Code"` or `"ITEM_CODE"`.
    pub fn from_header(raw: &str) -> Option<SheetColumn> {
        normalize(raw).parse().ok()
    }
}

/// Lowercases, trims, and turns runs of spaces or dashes into underscores.
pub(crate) fn normalize(raw: &str) -> String {
    raw.trim()
        .to_ascii_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("item_code", Some(SheetColumn::ItemCode))]
    #[case("Item Code", Some(SheetColumn::ItemCode))]
    #[case("  PRODUCTION_PERCENTAGE ", Some(SheetColumn::ProductionPercentage))]
    #[case("unit-sales-price", Some(SheetColumn::UnitSalesPrice))]
    #[case("colour", None)]
    fn headers_match_loosely(#[case] raw: &str, #[case] expected: Option<SheetColumn>) {
        assert_eq!(SheetColumn::from_header(raw), expected);
    }

    #[test]
    fn export_without_costs_drops_every_cost_column() {
        let cols = SheetColumn::export_set(false);
        assert!(cols.iter().all(|c| !c.is_cost()));
        assert!(cols.contains(&SheetColumn::Progress));
        assert_eq!(SheetColumn::export_set(true).len(), 15);
    }
}
