//! Date normalisation to `YYYY-MM-DD`.
//!
//! The primary patterns are tried in a fixed order and the first match wins.
//! `M/D/Y` comes before `D/M/Y`, so an ambiguous value such as `1/2/2024`
//! always reads as January 2nd.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::warn;

/// Patterns the source files are known to use, in priority order
pub const DATE_PATTERNS: [&str; 5] = ["%Y/%m/%d", "%Y-%m-%d", "%Y年%m月%d日", "%m/%d/%Y", "%d/%m/%Y"];

// Lenient fallback for anything else a spreadsheet export might produce
const FALLBACK_DATE_PATTERNS: [&str; 6] =
    ["%Y%m%d", "%Y.%m.%d", "%d %B %Y", "%B %d, %Y", "%B %d %Y", "%d-%b-%Y"];
const FALLBACK_DATETIME_PATTERNS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M",
];

pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse with the primary patterns, then the fallback parser
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    DATE_PATTERNS
        .iter()
        .find_map(|pattern| NaiveDate::parse_from_str(value, pattern).ok())
        .or_else(|| parse_flexible(value))
}

fn parse_flexible(value: &str) -> Option<NaiveDate> {
    FALLBACK_DATE_PATTERNS
        .iter()
        .find_map(|pattern| NaiveDate::parse_from_str(value, pattern).ok())
        .or_else(|| {
            FALLBACK_DATETIME_PATTERNS
                .iter()
                .find_map(|pattern| NaiveDateTime::parse_from_str(value, pattern).ok())
                .map(|datetime| datetime.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|datetime| datetime.date_naive()))
}

/// Convert a raw date cell to `YYYY-MM-DD`. Unparseable input comes back
/// trimmed but otherwise unchanged.
pub fn convert_date(raw: &str) -> String {
    match parse_date(raw) {
        Some(date) => date.format(ISO_DATE_FORMAT).to_string(),
        None => {
            warn!("Could not parse date '{}', keeping it as is", raw.trim());
            raw.trim().to_string()
        }
    }
}
