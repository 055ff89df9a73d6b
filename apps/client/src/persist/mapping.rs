//! Pure translation between the wizard's flat per-step shape and the
//! server's nested résumé shape. UI code never reads or writes the server
//! shape directly; these two functions are the only crossing point.

use serde_json::Value;

use crate::models::draft::{Draft, ExperienceEntry, FieldMap, Section};
use crate::models::resume::{
    ExperiencePayload, ProfileUpsert, ResumeUpsert, SelfPrPayload, SkillPayload,
};

/// Draft field keys consumed by the typed part of [`ExperiencePayload`].
const TYPED_EXPERIENCE_KEYS: &[&str] = &["company", "period_from", "period_to", "role", "tasks"];

/// Builds the profile upsert, or `None` when the profile section has no
/// populated field (the upsert is then skipped entirely).
pub fn profile_payload(email: &str, draft: &Draft) -> Option<ProfileUpsert> {
    let populated: FieldMap = draft
        .step_data
        .profile
        .iter()
        .filter(|(_, v)| !is_blank(v))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    if populated.is_empty() {
        return None;
    }
    Some(ProfileUpsert {
        email: email.to_string(),
        fields: populated,
    })
}

/// True when the draft carries anything for the résumé-body upsert.
pub fn has_resume_body(draft: &Draft) -> bool {
    !draft.step_data.experiences.is_empty()
        || draft
            .step_data
            .skills
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty())
        || draft
            .step_data
            .self_pr
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty())
}

/// Translates the draft into the current-schema résumé body. No legacy
/// aliases are ever written.
pub fn to_server_payload(email: &str, draft: &Draft) -> ResumeUpsert {
    let experiences = draft
        .step_data
        .experiences
        .iter()
        .map(experience_payload)
        .collect();

    let job = draft
        .step_data
        .preference
        .get("desiredJobTypes")
        .and_then(|v| v.as_array())
        .map(|types| {
            types
                .iter()
                .filter_map(|v| v.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        })
        .filter(|s| !s.is_empty());

    let skill = draft
        .step_data
        .skills
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(SkillPayload::slot_one);

    let self_pr = draft
        .step_data
        .self_pr
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(SelfPrPayload::slot_one);

    ResumeUpsert {
        email: email.to_string(),
        title: None,
        experiences,
        job,
        skill,
        self_pr,
    }
}

fn experience_payload(entry: &ExperienceEntry) -> ExperiencePayload {
    let text = |key: &str| {
        entry
            .fields
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };
    let extra: FieldMap = entry
        .fields
        .iter()
        .filter(|(k, _)| !TYPED_EXPERIENCE_KEYS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    ExperiencePayload {
        id: entry.id,
        company: text("company"),
        period_from: text("period_from"),
        period_to: text("period_to"),
        role: text("role"),
        tasks: text("tasks"),
        extra,
    }
}

/// Merges server records on top of the current draft through the ordinary
/// section setters. Sections the server says nothing about are left as they
/// were.
pub fn from_server_payload(
    mut draft: Draft,
    profile: Option<&Value>,
    resume: Option<&Value>,
) -> Draft {
    if let Some(fields) = profile.and_then(|v| v.as_object()) {
        let populated: FieldMap = fields
            .iter()
            .filter(|(k, v)| k.as_str() != "email" && !is_blank(v))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if !populated.is_empty() {
            draft = draft.update_section(Section::Profile, populated);
        }
    }

    let Some(resume) = resume else {
        return draft;
    };

    if let Some(list) = resume.get("experiences").and_then(|v| v.as_array()) {
        if !list.is_empty() {
            let entries = list.iter().map(experience_entry).collect();
            draft = draft.set_experiences(entries);
        }
    }

    if let Some(job) = resume.get("job").and_then(|v| v.as_str()) {
        if !job.is_empty() {
            let types: Vec<Value> = job
                .split(", ")
                .map(|s| Value::String(s.to_string()))
                .collect();
            let mut partial = FieldMap::new();
            partial.insert("desiredJobTypes".to_string(), Value::Array(types));
            draft = draft.update_section(Section::Preference, partial);
        }
    }

    if let Some(skill) = resume
        .get("skill")
        .and_then(|v| v.get("skill"))
        .and_then(|v| v.as_str())
    {
        if !skill.is_empty() {
            draft = draft.update_skills(skill);
        }
    }

    if let Some(pr) = resume
        .get("self_pr")
        .and_then(|v| v.get("profile"))
        .and_then(|v| v.as_str())
    {
        if !pr.is_empty() {
            draft = draft.update_self_pr(pr);
        }
    }

    draft
}

fn experience_entry(value: &Value) -> ExperienceEntry {
    let id = value.get("id").and_then(|v| v.as_i64()).unwrap_or_default();
    let fields: FieldMap = value
        .as_object()
        .map(|obj| {
            obj.iter()
                .filter(|(k, _)| k.as_str() != "id")
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        })
        .unwrap_or_default();
    ExperienceEntry { id, fields }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}
