//! Summary tab written after runs that found something worth reading.
use crate::dates::{display_value, format_display};
use crate::model::{ChangeKind, RunSummary};
use crate::sheets::Rows;

pub const REPORT_HEADER: [&str; 4] = ["seccion", "radicado", "anterior", "nuevo"];
const FAILED_SECTION: &str = "Procesos fallidos";
const STALE_SECTION: &str = "Procesos para impulsar";

fn display(kind: ChangeKind, value: &str) -> String {
    if kind == ChangeKind::DateAdvanced {
        display_value(value)
    } else {
        value.to_string()
    }
}

/// One row per event, failure, and stale case, grouped by section.
pub fn report_rows(summary: &RunSummary) -> Rows {
    let mut rows: Rows = vec![REPORT_HEADER.iter().map(|h| h.to_string()).collect()];

    let mut events: Vec<_> = summary.events.iter().collect();
    events.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.cmp(b)));
    rows.extend(events.into_iter().map(|event| {
        vec![
            event.kind.heading().to_string(),
            event.case_id.clone(),
            display(event.kind, &event.previous_value),
            display(event.kind, &event.new_value),
        ]
    }));

    let mut stale: Vec<_> = summary.stale.iter().collect();
    stale.sort();
    rows.extend(stale.into_iter().map(|case| {
        vec![
            STALE_SECTION.to_string(),
            case.case_id.clone(),
            case.status.clone(),
            format_display(case.last_update),
        ]
    }));

    let mut failures: Vec<_> = summary.failures.iter().collect();
    failures.sort_by(|a, b| a.case_id.cmp(&b.case_id));
    rows.extend(failures.into_iter().map(|failure| {
        vec![
            FAILED_SECTION.to_string(),
            failure.case_id.clone(),
            String::new(),
            failure.error.clone(),
        ]
    }));
    rows
}
