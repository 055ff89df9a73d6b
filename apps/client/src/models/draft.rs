//! The wizard's working résumé state and its pure update operations.
//!
//! No I/O happens here. Every operation takes the draft by value and returns
//! the updated draft, so callers (and tests) can treat a sequence of edits as
//! a fold. Mutating operations set `is_dirty`; only `set_current_step`,
//! `mark_saved`, and `reset` leave it alone or clear it.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Flat UI field map for one wizard section (field name → JSON scalar).
pub type FieldMap = Map<String, Value>;

/// The scalar (shallow-merge) sections of the wizard. Experiences, skills,
/// and self-PR have dedicated operations and are not addressable here, so an
/// invalid section name is unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Profile,
    Education,
    Preference,
}

/// One work-history entry. The `id` is caller-assigned, unique within the
/// draft, and stable across reorderings and removals — it is never derived
/// from the entry's position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    pub id: i64,
    #[serde(default)]
    pub fields: FieldMap,
}

impl ExperienceEntry {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            fields: FieldMap::new(),
        }
    }
}

/// Per-step data for the whole wizard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepData {
    pub profile: FieldMap,
    pub education: FieldMap,
    pub preference: FieldMap,
    pub experiences: Vec<ExperienceEntry>,
    pub skills: Option<String>,
    pub self_pr: Option<String>,
    pub certifications: Option<String>,
}

/// The in-progress résumé for the active editing session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    /// 1-based index of the active wizard step.
    pub current_step: u32,
    pub step_data: StepData,
    /// Steps the user has advanced past. Grows monotonically; only `reset`
    /// clears it.
    pub completed_steps: BTreeSet<u32>,
    pub is_dirty: bool,
    pub last_saved: Option<DateTime<Utc>>,
}

impl Default for Draft {
    fn default() -> Self {
        Self {
            current_step: 1,
            step_data: StepData::default(),
            completed_steps: BTreeSet::new(),
            is_dirty: false,
            last_saved: None,
        }
    }
}

impl Draft {
    /// Moves the wizard to another step. Navigation is not an edit, so this
    /// does not touch the dirty flag.
    pub fn set_current_step(mut self, step: u32) -> Self {
        self.current_step = step.max(1);
        self
    }

    /// Shallow-merges `partial` into the named scalar section. Incoming
    /// values win on key overlap; other keys are left as they were.
    pub fn update_section(mut self, section: Section, partial: FieldMap) -> Self {
        let target = match section {
            Section::Profile => &mut self.step_data.profile,
            Section::Education => &mut self.step_data.education,
            Section::Preference => &mut self.step_data.preference,
        };
        for (key, value) in partial {
            target.insert(key, value);
        }
        self.touch()
    }

    /// Replaces the whole experiences list.
    pub fn set_experiences(mut self, list: Vec<ExperienceEntry>) -> Self {
        self.step_data.experiences = list;
        self.touch()
    }

    /// Appends an entry. The caller supplies the unique id.
    pub fn add_experience(mut self, entry: ExperienceEntry) -> Self {
        self.step_data.experiences.push(entry);
        self.touch()
    }

    /// Shallow-merges `partial` into the entry at `index`. Out-of-range
    /// indices are a no-op (the draft is still marked dirty, matching the
    /// behavior of every other mutation).
    pub fn update_experience(mut self, index: usize, partial: FieldMap) -> Self {
        if let Some(entry) = self.step_data.experiences.get_mut(index) {
            for (key, value) in partial {
                entry.fields.insert(key, value);
            }
        }
        self.touch()
    }

    /// Removes the entry at `index`. Remaining entries keep their ids.
    pub fn remove_experience(mut self, index: usize) -> Self {
        if index < self.step_data.experiences.len() {
            self.step_data.experiences.remove(index);
        }
        self.touch()
    }

    pub fn update_skills(mut self, text: impl Into<String>) -> Self {
        self.step_data.skills = Some(text.into());
        self.touch()
    }

    pub fn update_self_pr(mut self, text: impl Into<String>) -> Self {
        self.step_data.self_pr = Some(text.into());
        self.touch()
    }

    pub fn update_certifications(mut self, text: impl Into<String>) -> Self {
        self.step_data.certifications = Some(text.into());
        self.touch()
    }

    /// Idempotent insert into the completed-step set.
    pub fn mark_step_completed(mut self, step: u32) -> Self {
        self.completed_steps.insert(step);
        self.touch()
    }

    /// Clears the dirty flag and stamps the save time.
    pub fn mark_saved(mut self, now: DateTime<Utc>) -> Self {
        self.is_dirty = false;
        self.last_saved = Some(now);
        self
    }

    /// Returns the initial empty draft.
    pub fn reset(self) -> Self {
        Draft::default()
    }

    fn touch(mut self) -> Self {
        self.is_dirty = true;
        self
    }
}
