//! Codec between the cases tab grid and tracked cases.
//!
//! Reading turns the grid into tracked cases. Writing never sends the grid
//! back: it turns refreshed cases into cell updates against the tab as it
//! looks at write time, so rows that people add or edit during a run survive.
use super::{CellUpdate, Rows};
use crate::dates::{format_iso, parse_optional_date};
use crate::model::TrackedCase;
use anyhow::{anyhow, Result};
use std::collections::{BTreeMap, HashMap, HashSet};

pub const RADICADO_COLUMN: &str = "radicado";
pub const STATUS_COLUMN: &str = "ultima_actuacion";
pub const DATE_COLUMN: &str = "fecha_ultima_actuacion";

#[derive(Debug, Clone, Default)]
pub struct CaseTable {
    cases: Vec<TrackedCase>,
}

#[derive(Debug, Clone, Copy)]
struct Columns {
    radicado: usize,
    status: Option<usize>,
    date: Option<usize>,
}

impl Columns {
    fn locate(header: &[String]) -> Result<Self> {
        let radicado = find_column(header, RADICADO_COLUMN)
            .ok_or_else(|| anyhow!("cases tab has no {RADICADO_COLUMN:?} column"))?;
        Ok(Self {
            radicado,
            status: find_column(header, STATUS_COLUMN),
            date: find_column(header, DATE_COLUMN),
        })
    }
}

fn find_column(header: &[String], name: &str) -> Option<usize> {
    header
        .iter()
        .position(|cell| cell.trim().eq_ignore_ascii_case(name))
}

fn cell(row: &[String], col: usize) -> &str {
    row.get(col).map(String::as_str).unwrap_or("")
}

impl CaseTable {
    /// Parse a grid whose first row is the header.
    ///
    /// An empty grid is an empty table; a non-empty grid without a
    /// `radicado` header is an error.
    pub fn parse(grid: Rows) -> Result<Self> {
        let Some((header, rows)) = grid.split_first() else {
            return Ok(Self::default());
        };
        let columns = Columns::locate(header)?;

        let mut seen = HashSet::new();
        let mut cases = Vec::new();
        for (index, row) in rows.iter().enumerate() {
            let case_id = cell(row, columns.radicado).trim();
            if case_id.is_empty() {
                continue;
            }
            if !seen.insert(case_id.to_string()) {
                tracing::warn!(case_id, row = index + 2, "duplicate case row ignored");
                continue;
            }
            let mut case = TrackedCase::new(case_id, index);
            if let Some(col) = columns.status {
                case.last_known_status = cell(row, col).trim().to_string();
            }
            if let Some(col) = columns.date {
                match parse_optional_date(cell(row, col)) {
                    Ok(date) => case.last_known_update_date = date,
                    Err(err) => {
                        tracing::warn!(case_id, error = %err, "stored date unreadable, treating as empty")
                    }
                }
            }
            case.metadata = metadata(
                header,
                row,
                &[Some(columns.radicado), columns.status, columns.date],
            );
            cases.push(case);
        }
        Ok(Self { cases })
    }

    pub fn cases(&self) -> &[TrackedCase] {
        &self.cases
    }
}

/// Cell updates that store the state of `refreshed` cases into `grid`.
///
/// `grid` is the tab as it is now, not as it was when the cases were read. A
/// case is written to its original row when that row still holds its
/// radicado, otherwise to the first row that does; a case whose row is gone
/// is skipped. Missing state columns are appended to the header, and only
/// when at least one row is written.
pub fn state_updates(grid: &[Vec<String>], refreshed: &[TrackedCase]) -> Result<Vec<CellUpdate>> {
    let Some((header, rows)) = grid.split_first() else {
        if !refreshed.is_empty() {
            tracing::warn!(cases = refreshed.len(), "cases tab emptied during the run, state not written");
        }
        return Ok(Vec::new());
    };
    let columns = Columns::locate(header)?;

    let mut first_row: HashMap<&str, usize> = HashMap::new();
    for (index, row) in rows.iter().enumerate() {
        let case_id = cell(row, columns.radicado).trim();
        if !case_id.is_empty() {
            first_row.entry(case_id).or_insert(index);
        }
    }

    let mut targets = Vec::new();
    for case in refreshed {
        let still_there = rows
            .get(case.row)
            .is_some_and(|row| cell(row, columns.radicado).trim() == case.case_id);
        let row = if still_there {
            Some(case.row)
        } else {
            first_row.get(case.case_id.as_str()).copied()
        };
        match row {
            Some(row) => targets.push((row, case)),
            None => {
                tracing::warn!(case_id = %case.case_id, "case row removed during the run, state not written")
            }
        }
    }
    if targets.is_empty() {
        return Ok(Vec::new());
    }

    let mut updates = Vec::new();
    let mut next_col = header.len();
    let mut column = |found: Option<usize>, name: &str, updates: &mut Vec<CellUpdate>| {
        found.unwrap_or_else(|| {
            let col = next_col;
            next_col += 1;
            updates.push(CellUpdate::new(0, col, name));
            col
        })
    };
    let status_col = column(columns.status, STATUS_COLUMN, &mut updates);
    let date_col = column(columns.date, DATE_COLUMN, &mut updates);

    for (row, case) in targets {
        // Grid row 0 is the header.
        updates.push(CellUpdate::new(row + 1, status_col, case.last_known_status.clone()));
        updates.push(CellUpdate::new(
            row + 1,
            date_col,
            format_iso(case.last_known_update_date),
        ));
    }
    Ok(updates)
}

fn metadata(header: &[String], row: &[String], skip: &[Option<usize>]) -> BTreeMap<String, String> {
    header
        .iter()
        .enumerate()
        .filter(|(col, name)| !skip.contains(&Some(*col)) && !name.trim().is_empty())
        .map(|(col, name)| (name.trim().to_string(), cell(row, col).to_string()))
        .collect()
}

#[cfg(test)]
#[path = "case_table_tests.rs"]
mod tests;
