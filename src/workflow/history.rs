//! Append-only run history, one JSON object per line.
use crate::model::{ChangeEvent, NotificationOutcome, RunSummary};
use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub recorded_at: String,
    pub cases_checked: usize,
    pub succeeded: usize,
    pub failed: Vec<String>,
    pub events: Vec<ChangeEvent>,
    pub stale: usize,
    pub notification: NotificationOutcome,
    pub state_written: bool,
}

impl HistoryEntry {
    pub fn from_summary(summary: &RunSummary) -> Self {
        Self {
            recorded_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            cases_checked: summary.cases_checked,
            succeeded: summary.successes(),
            failed: summary
                .failures
                .iter()
                .map(|failure| failure.case_id.clone())
                .collect(),
            events: summary.events.clone(),
            stale: summary.stale.len(),
            notification: summary.notification.clone(),
            state_written: summary.state_written,
        }
    }
}

/// Append a history entry as JSONL.
pub fn append_history(path: &Path, entry: &HistoryEntry) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).context("create history dir")?;
        }
    }
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open {}", path.display()))?;
    let mut line = serde_json::to_string(entry).context("serialize history entry")?;
    line.push('\n');
    file.write_all(line.as_bytes())
        .with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
