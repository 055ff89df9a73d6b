//! Historical field-name aliases, encoded as data so schema drift stays out
//! of control flow. Each logical field lists its known spellings oldest-to-
//! newest-agnostic: the first present, non-empty value wins. Adding a newly
//! discovered legacy alias means appending a string here, nothing else.

use serde_json::Value;

pub const START_DATE: &[&str] = &["period_from", "periodFrom", "startDate", "start_date", "from"];
pub const END_DATE: &[&str] = &["period_to", "periodTo", "endDate", "end_date", "to"];
pub const COMPANY: &[&str] = &["company", "companyName", "company_name", "name"];
pub const BUSINESS: &[&str] = &["business", "businessContent", "business_content", "industry"];
pub const CAPITAL: &[&str] = &["capital", "capitalStock", "capital_stock"];
pub const TEAM_SIZE: &[&str] = &["employees", "teamSize", "team_size", "numberOfEmployees"];
pub const ROLE: &[&str] = &["role", "position", "jobTitle", "job_title"];
pub const DUTIES: &[&str] = &["tasks", "duties", "description", "jobDescription", "work_content"];

/// Boolean "still employed here" flags, honored for the end date.
pub const IS_CURRENT: &[&str] = &["is_current", "isCurrent", "currentlyEmployed", "is_present"];

/// Returns the first present, non-empty value among `aliases`, coerced to a
/// string. Objects and arrays never match; they are containers, not field
/// values.
pub fn resolve(entry: &Value, aliases: &[&str]) -> Option<String> {
    aliases
        .iter()
        .filter_map(|key| entry.get(*key))
        .filter_map(coerce_scalar)
        .find(|s| !s.is_empty())
}

/// String-coerces a JSON scalar; trims strings, renders numbers and bools.
pub fn coerce_scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Permissive truthiness for legacy flag fields: booleans, non-zero numbers,
/// and the strings "true"/"1".
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => {
            let s = s.trim();
            s.eq_ignore_ascii_case("true") || s == "1"
        }
        _ => false,
    }
}
