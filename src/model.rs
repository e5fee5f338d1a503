//! Shared record types for tracked cases, portal results, and change events.
//!
//! These types flow between the sheet codec, the portal client, the detector,
//! and the notifier, and serialize into the run summary and history log.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A case row from the cases tab, with its last persisted state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackedCase {
    pub case_id: String,
    /// Zero-based data row index (header excluded) in the cases tab.
    pub row: usize,
    pub last_known_status: String,
    pub last_known_update_date: Option<NaiveDate>,
    /// Every other column of the row, keyed by header.
    pub metadata: BTreeMap<String, String>,
}

impl TrackedCase {
    pub fn new(case_id: impl Into<String>, row: usize) -> Self {
        Self {
            case_id: case_id.into(),
            row,
            last_known_status: String::new(),
            last_known_update_date: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn has_been_seen(&self) -> bool {
        !self.last_known_status.is_empty()
    }
}

/// Current portal state for one case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchResult {
    pub case_id: String,
    pub found: bool,
    pub current_status: String,
    pub current_update_date: Option<NaiveDate>,
    pub raw_fields: BTreeMap<String, String>,
}

impl FetchResult {
    pub fn not_found(case_id: impl Into<String>) -> Self {
        Self {
            case_id: case_id.into(),
            found: false,
            current_status: String::new(),
            current_update_date: None,
            raw_fields: BTreeMap::new(),
        }
    }

    pub fn found(
        case_id: impl Into<String>,
        status: impl Into<String>,
        update_date: Option<NaiveDate>,
    ) -> Self {
        Self {
            case_id: case_id.into(),
            found: true,
            current_status: status.into(),
            current_update_date: update_date,
            raw_fields: BTreeMap::new(),
        }
    }
}

/// Kinds of change reported in a digest, in digest section order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    NewCase,
    StatusChanged,
    DateAdvanced,
    NotFoundAnymore,
}

impl ChangeKind {
    pub const ALL: [ChangeKind; 4] = [
        ChangeKind::NewCase,
        ChangeKind::StatusChanged,
        ChangeKind::DateAdvanced,
        ChangeKind::NotFoundAnymore,
    ];

    /// Return the stable string identifier used in JSON output.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::NewCase => "new_case",
            ChangeKind::StatusChanged => "status_changed",
            ChangeKind::DateAdvanced => "date_advanced",
            ChangeKind::NotFoundAnymore => "not_found_anymore",
        }
    }

    /// Section heading used in the digest and the report tab.
    pub fn heading(&self) -> &'static str {
        match self {
            ChangeKind::NewCase => "Procesos nuevos",
            ChangeKind::StatusChanged => "Cambio de actuación",
            ChangeKind::DateAdvanced => "Nueva actuación registrada",
            ChangeKind::NotFoundAnymore => "Procesos que ya no aparecen en el portal",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single detected change for one case.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub case_id: String,
    pub kind: ChangeKind,
    pub previous_value: String,
    pub new_value: String,
}

/// A case that could not be fetched or parsed this run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseFailure {
    pub case_id: String,
    pub error: String,
}

/// A found case whose latest actuación is older than the stale threshold.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StaleCase {
    pub case_id: String,
    pub status: String,
    pub last_update: NaiveDate,
}

/// One judicial entity listed by the legacy portal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub entity_name: String,
    pub entity_code: String,
    pub jurisdiction: String,
}

/// What happened to the digest this run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "detail")]
pub enum NotificationOutcome {
    /// No events, so nothing was sent.
    NotNeeded,
    Sent,
    /// Dry runs format the digest but never send it.
    Skipped,
    Failed(String),
}

/// Result of one coordinator run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub cases_checked: usize,
    pub events: Vec<ChangeEvent>,
    pub failures: Vec<CaseFailure>,
    pub stale: Vec<StaleCase>,
    pub notification: NotificationOutcome,
    pub state_written: bool,
}

impl RunSummary {
    pub fn successes(&self) -> usize {
        self.cases_checked.saturating_sub(self.failures.len())
    }
}
