//! Digest formatting.
//!
//! Events are grouped by kind in a fixed section order and sorted by case id
//! inside each section, so the same set of events always renders the same
//! message no matter which order the fetches completed in. Only changes are
//! mailed; stale cases are listed in the report tab.
use crate::dates::display_value;
use crate::html::escape;
use crate::model::{ChangeEvent, ChangeKind};
use std::fmt::Write as _;

pub const SUBJECT: &str = "Notificación Rama Judicial";
const NO_DATE: &str = "sin fecha";

/// A rendered digest: HTML body plus a plain-text alternative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    pub subject: String,
    pub html: String,
    pub text: String,
}

fn describe(event: &ChangeEvent) -> String {
    match event.kind {
        ChangeKind::NewCase => event.new_value.clone(),
        ChangeKind::StatusChanged => format!("{} → {}", event.previous_value, event.new_value),
        ChangeKind::DateAdvanced => {
            let previous = if event.previous_value.is_empty() {
                NO_DATE.to_string()
            } else {
                display_value(&event.previous_value)
            };
            format!("{previous} → {}", display_value(&event.new_value))
        }
        ChangeKind::NotFoundAnymore => {
            format!("última actuación conocida: {}", event.previous_value)
        }
    }
}

fn sections(events: &[ChangeEvent]) -> Vec<(ChangeKind, Vec<&ChangeEvent>)> {
    ChangeKind::ALL
        .iter()
        .filter_map(|kind| {
            let mut group: Vec<&ChangeEvent> =
                events.iter().filter(|event| event.kind == *kind).collect();
            if group.is_empty() {
                return None;
            }
            group.sort();
            Some((*kind, group))
        })
        .collect()
}

fn subject(count: usize) -> String {
    if count == 1 {
        format!("{SUBJECT} (1 cambio)")
    } else {
        format!("{SUBJECT} ({count} cambios)")
    }
}

/// Render the digest for one run.
pub fn format_digest(events: &[ChangeEvent], spreadsheet_id: Option<&str>) -> Digest {
    let grouped = sections(events);

    let mut html = String::new();
    let mut text = String::new();
    html.push_str("<html>\n<body>\n<h2>Notificación de Rama Judicial</h2>\n");
    let _ = writeln!(
        html,
        "<p>Se detectaron cambios en {} proceso(s) monitoreado(s):</p>",
        events.len()
    );
    let _ = writeln!(
        text,
        "Se detectaron cambios en {} proceso(s) monitoreado(s).",
        events.len()
    );

    for (kind, group) in &grouped {
        let _ = writeln!(html, "<h3>{}</h3>\n<ul>", escape(kind.heading()));
        let _ = writeln!(text, "\n{}:", kind.heading());
        for event in group {
            let detail = describe(event);
            let _ = writeln!(
                html,
                "<li><strong>{}:</strong> {}</li>",
                escape(&event.case_id),
                escape(&detail)
            );
            let _ = writeln!(text, "  - {}: {}", event.case_id, detail);
        }
        html.push_str("</ul>\n");
    }

    if let Some(id) = spreadsheet_id {
        let link = format!("https://docs.google.com/spreadsheets/d/{id}/edit?usp=sharing");
        let _ = writeln!(
            html,
            "<p>Ver detalles completos: <a href=\"{}\">Link al reporte</a></p>",
            escape(&link)
        );
        let _ = writeln!(text, "\nVer detalles completos: {link}");
    }
    html.push_str("</body>\n</html>\n");

    Digest {
        subject: subject(events.len()),
        html,
        text,
    }
}

#[cfg(test)]
#[path = "digest_tests.rs"]
mod tests;
