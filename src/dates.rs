//! Date parsing and display helpers for portal and sheet values.
use anyhow::{anyhow, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime};

const MONTHS_ES: [&str; 12] = [
    "Ene", "Feb", "Mar", "Abr", "May", "Jun", "Jul", "Ago", "Sep", "Oct", "Nov", "Dic",
];

/// Parse a portal or sheet date.
///
/// Accepts plain `YYYY-MM-DD` and ISO datetimes such as `2025-02-12T00:00:00`,
/// with optional fractional seconds and a trailing `Z` or offset, which are
/// ignored.
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("empty date"));
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    let Some((day, _)) = trimmed.split_once('T') else {
        return Err(anyhow!("unrecognized date {trimmed:?}"));
    };
    let datetime_head = trimmed
        .split(['Z', '+', '.'])
        .next()
        .unwrap_or(trimmed);
    if let Ok(datetime) = NaiveDateTime::parse_from_str(datetime_head, "%Y-%m-%dT%H:%M:%S") {
        return Ok(datetime.date());
    }
    NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|err| anyhow!("unrecognized date {trimmed:?}: {err}"))
}

/// Parse an optional cell; blank cells are `None`.
pub fn parse_optional_date(value: &str) -> Result<Option<NaiveDate>> {
    if value.trim().is_empty() {
        return Ok(None);
    }
    parse_date(value).map(Some)
}

/// Stable sheet representation.
pub fn format_iso(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Spanish short form used in digests, e.g. `12-Feb-2025`.
pub fn format_display(date: NaiveDate) -> String {
    let month = MONTHS_ES[date.month0() as usize];
    format!("{:02}-{}-{}", date.day(), month, date.year())
}

/// Display an ISO value if it parses, otherwise return it unchanged.
pub fn display_value(value: &str) -> String {
    match parse_date(value) {
        Ok(date) => format_display(date),
        Err(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn parses_portal_datetimes() {
        assert_eq!(parse_date("2025-02-12T00:00:00").unwrap(), date(2025, 2, 12));
        assert_eq!(parse_date("2025-02-12T10:30:00.123Z").unwrap(), date(2025, 2, 12));
        assert_eq!(parse_date(" 2024-01-10 ").unwrap(), date(2024, 1, 10));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_date("ayer").is_err());
        assert!(parse_date("").is_err());
        assert_eq!(parse_optional_date("   ").unwrap(), None);
    }

    #[test]
    fn displays_spanish_months() {
        assert_eq!(format_display(date(2025, 1, 5)), "05-Ene-2025");
        assert_eq!(format_display(date(2025, 8, 21)), "21-Ago-2025");
        assert_eq!(display_value("2025-12-01"), "01-Dic-2025");
        assert_eq!(display_value("Archivado"), "Archivado");
    }

    #[test]
    fn iso_round_trip_of_optional() {
        assert_eq!(format_iso(None), "");
        assert_eq!(format_iso(Some(date(2024, 1, 1))), "2024-01-01");
    }
}
