//! The canonical, schema-version-agnostic model fed to preview, print, and
//! PDF export surfaces. Derived fresh on every read; never persisted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One flattened work-history entry. Dates are normalized to `YYYY/MM` or
/// the present-tense marker; every other field is string-coerced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreviewExperience {
    pub start: String,
    pub end: String,
    pub company: String,
    pub business: String,
    pub capital: String,
    pub team_size: String,
    pub role: String,
    pub duties: String,
}

/// Output of the preview normalizer. `order` preserves the source ordering
/// of the synthetic `exp_N` keys in `entries`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalPreview {
    pub display_name: String,
    pub order: Vec<String>,
    pub entries: BTreeMap<String, PreviewExperience>,
}

impl CanonicalPreview {
    /// True when no experience entries were recovered (the display name may
    /// still be set).
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
