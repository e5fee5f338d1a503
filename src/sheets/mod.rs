//! Spreadsheet access.
//!
//! Tabs are plain grids of strings with the header in the first row. A tab is
//! either replaced whole (report and entity tabs) or patched cell by cell (the
//! cases tab, which people keep editing while a run is in flight).
mod auth;
pub mod case_table;
mod google;
mod workbook;

use crate::config::{PortalSettings, SheetSource};
use anyhow::Result;

pub use case_table::CaseTable;
pub use google::GoogleSheets;
pub use workbook::Workbook;

/// A grid of cells, header row first.
pub type Rows = Vec<Vec<String>>;

/// One cell to overwrite. `row` 0 is the header row, `col` 0 is column A.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellUpdate {
    pub row: usize,
    pub col: usize,
    pub value: String,
}

impl CellUpdate {
    pub fn new(row: usize, col: usize, value: impl Into<String>) -> Self {
        Self {
            row,
            col,
            value: value.into(),
        }
    }
}

/// Read, full-replace and cell-level access to named tabs.
pub trait SheetStore {
    /// Read every row of a tab. A missing or empty tab yields no rows.
    fn read_tab(&self, tab: &str) -> Result<Rows>;

    /// Replace the entire contents of a tab with `rows`.
    fn replace_tab(&self, tab: &str, rows: &[Vec<String>]) -> Result<()>;

    /// Overwrite the given cells and nothing else.
    fn update_cells(&self, tab: &str, updates: &[CellUpdate]) -> Result<()>;
}

/// Apply cell updates to an in-memory grid, growing it where needed.
pub fn patch_rows(rows: &mut Rows, updates: &[CellUpdate]) {
    for update in updates {
        if rows.len() <= update.row {
            rows.resize(update.row + 1, Vec::new());
        }
        let row = &mut rows[update.row];
        if row.len() <= update.col {
            row.resize(update.col + 1, String::new());
        }
        row[update.col] = update.value.clone();
    }
}

/// Open the store selected by settings.
pub fn open_store(source: &SheetSource, portal: &PortalSettings) -> Result<Box<dyn SheetStore>> {
    match source {
        SheetSource::Workbook(path) => Ok(Box::new(Workbook::open(path.clone()))),
        SheetSource::Google {
            spreadsheet_id,
            credentials_path,
            access_token,
        } => {
            let token =
                auth::resolve_access_token(access_token.as_deref(), credentials_path.as_deref())?;
            Ok(Box::new(GoogleSheets::new(
                spreadsheet_id.clone(),
                token,
                portal.fetch_timeout,
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_rows_grows_short_rows_and_keeps_the_rest() {
        let mut rows: Rows = vec![
            vec!["radicado".to_string()],
            vec!["A".to_string(), "Ana".to_string()],
        ];
        patch_rows(
            &mut rows,
            &[
                CellUpdate::new(0, 2, "ultima_actuacion"),
                CellUpdate::new(1, 2, "Auto"),
                CellUpdate::new(3, 0, "Z"),
            ],
        );
        assert_eq!(rows[0], vec!["radicado", "", "ultima_actuacion"]);
        assert_eq!(rows[1], vec!["A", "Ana", "Auto"]);
        assert!(rows[2].is_empty());
        assert_eq!(rows[3], vec!["Z"]);
    }
}
