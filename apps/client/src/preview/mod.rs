//! Preview normalizer — the read path that reconciles a user's heterogeneous
//! résumé records into one [`CanonicalPreview`].
//!
//! This path feeds rendering surfaces that must always produce something
//! displayable, so nothing here returns an error: every failure degrades to a
//! partial or empty model.

use serde_json::Value;
use tracing::debug;

use crate::api::ResumeApi;
use crate::models::preview::{CanonicalPreview, PreviewExperience};

pub mod aliases;
pub mod dates;

use self::aliases::{resolve, truthy};
use self::dates::{normalize_year_month, parse_timestamp_millis, PRESENT};

/// Recency candidates, probed at the record's top level and inside the
/// legacy `extra_data` block.
const TIMESTAMP_FIELDS: &[&str] = &["updated_at", "created_at", "submitted_at"];

/// Builds the canonical preview model for a user. The display-name and
/// résumé-list fetches run concurrently; each is best-effort.
pub async fn build_preview(api: &dyn ResumeApi, user_id: &str) -> CanonicalPreview {
    let (name, records) = tokio::join!(api.display_name(user_id), api.list_resumes(user_id));

    let display_name = match name {
        Ok(name) => name.unwrap_or_default(),
        Err(e) => {
            debug!("display name fetch failed for {user_id}: {e}");
            String::new()
        }
    };
    let records = match records {
        Ok(records) => records,
        Err(e) => {
            debug!("resume list fetch failed for {user_id}: {e}");
            Vec::new()
        }
    };

    let mut preview = CanonicalPreview {
        display_name,
        ..CanonicalPreview::default()
    };

    let Some(record) = select_authoritative(&records) else {
        return preview;
    };

    for (i, entry) in experience_source(record).iter().enumerate() {
        let key = format!("exp_{i}");
        preview.order.push(key.clone());
        preview.entries.insert(key, flatten_entry(entry));
    }
    preview
}

/// Picks the single authoritative record: highest recency score, ties broken
/// by the `is_active` flag. Deterministic for distinct scores regardless of
/// input order.
pub fn select_authoritative(records: &[Value]) -> Option<&Value> {
    records.iter().max_by(|a, b| {
        recency_score(a)
            .cmp(&recency_score(b))
            .then_with(|| is_active(a).cmp(&is_active(b)))
    })
}

/// Max over every timestamp the record carries, including the pre-migration
/// copies nested in `extra_data`. Unparseable values score zero.
pub fn recency_score(record: &Value) -> i64 {
    let mut best = 0;
    for key in TIMESTAMP_FIELDS {
        if let Some(v) = record.get(*key) {
            best = best.max(parse_timestamp_millis(v));
        }
        if let Some(v) = record.get("extra_data").and_then(|x| x.get(*key)) {
            best = best.max(parse_timestamp_millis(v));
        }
    }
    best
}

fn is_active(record: &Value) -> bool {
    record.get("is_active").map(truthy).unwrap_or(false)
}

/// Structured `experiences` when non-empty, else the legacy
/// `extra_data.workExperiences` list. Exactly one source; never merged.
fn experience_source(record: &Value) -> &[Value] {
    if let Some(list) = record.get("experiences").and_then(|v| v.as_array()) {
        if !list.is_empty() {
            return list;
        }
    }
    record
        .get("extra_data")
        .and_then(|x| x.get("workExperiences"))
        .and_then(|v| v.as_array())
        .map(|v| v.as_slice())
        .unwrap_or(&[])
}

fn flatten_entry(entry: &Value) -> PreviewExperience {
    let field = |keys: &[&str]| resolve(entry, keys).unwrap_or_default();
    PreviewExperience {
        start: resolve(entry, aliases::START_DATE)
            .map(|raw| normalize_year_month(&raw))
            .unwrap_or_default(),
        end: end_date(entry),
        company: field(aliases::COMPANY),
        business: field(aliases::BUSINESS),
        capital: field(aliases::CAPITAL),
        team_size: field(aliases::TEAM_SIZE),
        role: field(aliases::ROLE),
        duties: field(aliases::DUTIES),
    }
}

/// A truthy "still employed" flag overrides whatever the end-date field says.
fn end_date(entry: &Value) -> String {
    let current = aliases::IS_CURRENT
        .iter()
        .any(|key| entry.get(*key).map(truthy).unwrap_or(false));
    if current {
        return PRESENT.to_string();
    }
    resolve(entry, aliases::END_DATE)
        .map(|raw| normalize_year_month(&raw))
        .unwrap_or_default()
}
