//! Permissive date handling for inconsistently-shaped historical records.
//! Nothing in this module fails: unparseable inputs score zero (recency) or
//! pass through unchanged (display).

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

/// Rendered marker for an ongoing position.
pub const PRESENT: &str = "現在";

/// Textual spellings that mean "still ongoing". ASCII entries are matched
/// case-insensitively; the Japanese entries match exactly.
pub const PRESENT_MARKERS: &[&str] = &["present", "current", "now", "在職中", "現在"];

/// Milliseconds below this are assumed to be Unix seconds.
const MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

/// Parses a timestamp of any historical shape into Unix milliseconds.
/// ISO strings, `YYYY-MM-DD HH:MM:SS`, bare dates, and numeric epochs
/// (seconds or milliseconds) are accepted; anything else scores 0.
pub fn parse_timestamp_millis(value: &Value) -> i64 {
    match value {
        Value::String(s) => parse_datetime_str(s),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .map(scale_epoch)
            .unwrap_or(0),
        _ => 0,
    }
}

fn parse_datetime_str(raw: &str) -> i64 {
    let s = raw.trim();
    if s.is_empty() {
        return 0;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.timestamp_millis();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return dt.and_utc().timestamp_millis();
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return d
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp_millis())
            .unwrap_or(0);
    }
    if let Ok(epoch) = s.parse::<i64>() {
        return scale_epoch(epoch);
    }
    0
}

fn scale_epoch(epoch: i64) -> i64 {
    if epoch >= MILLIS_THRESHOLD {
        epoch
    } else {
        epoch.saturating_mul(1000)
    }
}

/// Renders a raw date field for display: present markers become [`PRESENT`],
/// parseable dates become `YYYY/MM`, a literal `YYYY-MM`/`YYYY/MM` prefix is
/// reformatted, and everything else passes through trimmed. Never fails.
pub fn normalize_year_month(raw: &str) -> String {
    let s = raw.trim();
    if s.is_empty() {
        return String::new();
    }
    if PRESENT_MARKERS.iter().any(|m| s.eq_ignore_ascii_case(m)) {
        return PRESENT.to_string();
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.format("%Y/%m").to_string();
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return d.format("%Y/%m").to_string();
    }
    if let Some(ym) = leading_year_month(s) {
        return ym;
    }
    s.to_string()
}

/// Extracts a `YYYY-MM` or `YYYY/MM` prefix as `YYYY/MM`.
fn leading_year_month(s: &str) -> Option<String> {
    let bytes = s.as_bytes();
    if bytes.len() < 7 {
        return None;
    }
    let year_ok = bytes[..4].iter().all(u8::is_ascii_digit);
    let sep_ok = bytes[4] == b'-' || bytes[4] == b'/';
    let month_ok = bytes[5..7].iter().all(u8::is_ascii_digit);
    if year_ok && sep_ok && month_ok {
        // Digit checks above guarantee char boundaries.
        Some(format!("{}/{}", &s[..4], &s[5..7]))
    } else {
        None
    }
}
