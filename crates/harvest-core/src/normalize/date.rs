//! Posting-date normalization to `YYYY-MM-DD`.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;

static EMBEDDED_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4}-\d{2}-\d{2})").unwrap());

const OFFSET_LAYOUTS: &[&str] = &["%Y-%m-%dT%H:%M:%S%z", "%Y-%m-%dT%H:%M:%S%.f%z"];
const NAIVE_LAYOUTS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

/// Normalize a raw posting date.
///
/// Accepted layouts are ISO-8601 dates and date-times, with or without
/// fractional seconds and offset; a trailing `Z` reads as `+00:00`. The
/// calendar date in the value's own offset is returned. Otherwise the first
/// embedded `YYYY-MM-DD` is returned, and failing that the trimmed input.
/// Only empty input yields `None`.
pub fn normalize_date(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let candidate = match trimmed.strip_suffix('Z') {
        Some(rest) => format!("{rest}+00:00"),
        None => trimmed.to_string(),
    };

    if let Some(date) = parse_layouts(&candidate) {
        return Some(date.format("%Y-%m-%d").to_string());
    }

    if let Some(m) = EMBEDDED_DATE.captures(trimmed).and_then(|c| c.get(1)) {
        return Some(m.as_str().to_string());
    }

    Some(trimmed.to_string())
}

fn parse_layouts(value: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    for layout in OFFSET_LAYOUTS {
        if let Ok(dt) = DateTime::parse_from_str(value, layout) {
            return Some(dt.date_naive());
        }
    }
    for layout in NAIVE_LAYOUTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, layout) {
            return Some(dt.date());
        }
    }
    None
}
