//! Google Sheets API v4 adapter.
use super::{CellUpdate, Rows, SheetStore};
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";
/// Rightmost column the Sheets API addresses.
const LAST_COLUMN: &str = "ZZZ";

pub struct GoogleSheets {
    spreadsheet_id: String,
    token: String,
    agent: ureq::Agent,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

impl GoogleSheets {
    pub fn new(spreadsheet_id: String, token: String, timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            spreadsheet_id,
            token,
            agent,
        }
    }

    fn values_url(&self, tab: &str) -> String {
        format!(
            "{SHEETS_API}/{}/values/{}",
            encode_path_segment(&self.spreadsheet_id),
            encode_path_segment(tab)
        )
    }

    fn batch_url(&self, method: &str) -> String {
        format!(
            "{SHEETS_API}/{}/values:{method}",
            encode_path_segment(&self.spreadsheet_id)
        )
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl SheetStore for GoogleSheets {
    fn read_tab(&self, tab: &str) -> Result<Rows> {
        let mut response = self
            .agent
            .get(self.values_url(tab))
            .header("Authorization", self.bearer())
            .call()
            .with_context(|| format!("read sheet tab {tab}"))?;
        let range: ValueRange = response
            .body_mut()
            .read_json()
            .with_context(|| format!("parse sheet tab {tab}"))?;
        Ok(range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    /// Write the new grid over the old one, then clear whatever the old grid
    /// had beyond the new extent. A failed write leaves the old rows in place.
    fn replace_tab(&self, tab: &str, rows: &[Vec<String>]) -> Result<()> {
        let padded = pad_rows(rows);
        if !padded.is_empty() {
            self.agent
                .put(self.values_url(tab))
                .query("valueInputOption", "RAW")
                .header("Authorization", self.bearer())
                .send_json(json!({ "values": padded }))
                .with_context(|| format!("update sheet tab {tab}"))?;
        }
        self.agent
            .post(self.batch_url("batchClear"))
            .header("Authorization", self.bearer())
            .send_json(json!({ "ranges": trailing_ranges(tab, &padded) }))
            .with_context(|| format!("clear leftover cells of sheet tab {tab}"))?;
        tracing::debug!(tab, rows = rows.len(), "replaced sheet tab");
        Ok(())
    }

    fn update_cells(&self, tab: &str, updates: &[CellUpdate]) -> Result<()> {
        if updates.is_empty() {
            return Ok(());
        }
        let data: Vec<serde_json::Value> = updates
            .iter()
            .map(|update| {
                json!({
                    "range": cell_range(tab, update.row, update.col),
                    "values": [[update.value]],
                })
            })
            .collect();
        self.agent
            .post(self.batch_url("batchUpdate"))
            .header("Authorization", self.bearer())
            .send_json(json!({ "valueInputOption": "RAW", "data": data }))
            .with_context(|| format!("update cells of sheet tab {tab}"))?;
        tracing::debug!(tab, cells = updates.len(), "updated sheet cells");
        Ok(())
    }
}

/// Rows padded to a common width so every written row overwrites the same
/// columns.
fn pad_rows(rows: &[Vec<String>]) -> Rows {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    rows.iter()
        .map(|row| {
            let mut row = row.clone();
            row.resize(width, String::new());
            row
        })
        .collect()
}

/// Ranges outside a grid anchored at A1: every row below it and every column
/// to its right. An empty grid clears the whole tab.
fn trailing_ranges(tab: &str, rows: &[Vec<String>]) -> Vec<String> {
    let sheet = quote_tab(tab);
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    if rows.is_empty() || width == 0 {
        return vec![sheet];
    }
    vec![
        format!("{sheet}!A{}:{LAST_COLUMN}", rows.len() + 1),
        format!("{sheet}!{}1:{LAST_COLUMN}", column_letters(width)),
    ]
}

/// A1 address of one cell; `row` and `col` are zero-based.
fn cell_range(tab: &str, row: usize, col: usize) -> String {
    format!("{}!{}{}", quote_tab(tab), column_letters(col), row + 1)
}

fn quote_tab(tab: &str) -> String {
    format!("'{}'", tab.replace('\'', "''"))
}

/// Zero-based column index to A1 letters: 0 is A, 26 is AA.
fn column_letters(col: usize) -> String {
    let mut n = col + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.iter().rev().map(|&b| b as char).collect()
}

fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Percent-encode everything outside the RFC 3986 unreserved set.
fn encode_path_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
