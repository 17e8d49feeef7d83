//! Timestamp conversion for AIS time columns.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Zone suffixes accepted after the date/time part.
const UTC_ZONES: [&str; 3] = ["UTC", "GMT", "Z"];

pub fn default_formats() -> Vec<String> {
    vec![
        "%Y-%m-%d %H:%M:%S".to_string(),
        "%Y-%m-%d %H:%M:%S%.f".to_string(),
    ]
}

/// Parses `text` with each format in turn and returns the first success.
///
/// A trailing zone token (`2023-09-20 00:00:01 UTC`) is stripped before the
/// formats are tried; any zone other than UTC makes the value invalid.
/// Invalid values return `None` instead of an error.
pub fn parse_timestamp(text: &str, formats: &[String]) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let body = match text.rsplit_once(' ') {
        Some((body, zone)) if zone.chars().all(|c| c.is_ascii_alphabetic()) => {
            if !UTC_ZONES.contains(&zone) {
                return None;
            }
            body
        }
        _ => text,
    };

    formats
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(body, format).ok())
        .map(|naive| naive.and_utc())
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S%.f UTC").to_string()
}
