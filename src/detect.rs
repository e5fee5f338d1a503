//! Change detection between the last persisted case state and a fresh fetch.
//!
//! Detection is a pure comparison against the persisted baseline, so a case
//! that has not moved since the last write-back never produces an event again.
use crate::dates::format_iso;
use crate::model::{ChangeEvent, ChangeKind, FetchResult, TrackedCase};

/// Collapse whitespace runs and trim, keeping the original casing.
pub fn normalize_status(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Comparison key for statuses: normalized whitespace, lower-cased.
fn status_key(raw: &str) -> String {
    normalize_status(raw).to_lowercase()
}

/// Compare a stored case against the current portal state.
pub fn detect(stored: &TrackedCase, fetched: &FetchResult) -> Option<ChangeEvent> {
    let event = |kind, previous_value: String, new_value: String| ChangeEvent {
        case_id: stored.case_id.clone(),
        kind,
        previous_value,
        new_value,
    };

    if !fetched.found {
        if stored.has_been_seen() {
            return Some(event(
                ChangeKind::NotFoundAnymore,
                normalize_status(&stored.last_known_status),
                String::new(),
            ));
        }
        return None;
    }

    if !stored.has_been_seen() {
        return Some(event(
            ChangeKind::NewCase,
            String::new(),
            normalize_status(&fetched.current_status),
        ));
    }

    if status_key(&stored.last_known_status) != status_key(&fetched.current_status) {
        return Some(event(
            ChangeKind::StatusChanged,
            normalize_status(&stored.last_known_status),
            normalize_status(&fetched.current_status),
        ));
    }

    // Option ordering puts None below every date.
    if fetched.current_update_date > stored.last_known_update_date {
        return Some(event(
            ChangeKind::DateAdvanced,
            format_iso(stored.last_known_update_date),
            format_iso(fetched.current_update_date),
        ));
    }

    None
}

/// State to persist after a successful fetch, whether or not it produced an event.
pub fn refresh(stored: &TrackedCase, fetched: &FetchResult) -> TrackedCase {
    let mut next = stored.clone();
    if fetched.found {
        next.last_known_status = normalize_status(&fetched.current_status);
        next.last_known_update_date = fetched.current_update_date;
    } else {
        next.last_known_status.clear();
        next.last_known_update_date = None;
    }
    next
}

#[cfg(test)]
#[path = "detect_tests.rs"]
mod tests;
