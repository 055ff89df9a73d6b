//! Server-side payload shapes for the save path (current schema only).
//!
//! The read side deliberately does NOT use these types: historical records
//! carry drifted field names and are probed as raw `serde_json::Value` by the
//! preview normalizer. Writes always target the current schema.

use serde::{Deserialize, Serialize};

use super::draft::FieldMap;

/// Flat contact-and-identity upsert, keyed by email.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpsert {
    pub email: String,
    #[serde(flatten)]
    pub fields: FieldMap,
}

/// Full-document résumé body upsert. The server has no partial-patch
/// semantics for this document; absent optional blocks mean "leave unset".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResumeUpsert {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub experiences: Vec<ExperiencePayload>,
    /// Desired job types, joined into one delimited string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill: Option<SkillPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_pr: Option<SelfPrPayload>,
}

/// One work-history entry in the current server schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperiencePayload {
    pub id: i64,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub period_from: String,
    #[serde(default)]
    pub period_to: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub tasks: String,
    /// Fields beyond the fixed set (business, capital, employees, ...) pass
    /// through untyped.
    #[serde(flatten)]
    pub extra: FieldMap,
}

/// Singleton skill sub-resource. The server keys these per résumé, so the
/// client always upserts slot 1 instead of tracking a separate identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillPayload {
    pub id: i64,
    pub skill: String,
}

impl SkillPayload {
    pub fn slot_one(skill: impl Into<String>) -> Self {
        Self {
            id: 1,
            skill: skill.into(),
        }
    }
}

/// Singleton self-PR sub-resource; same slot-1 convention as [`SkillPayload`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfPrPayload {
    pub id: i64,
    pub profile: String,
}

impl SelfPrPayload {
    pub fn slot_one(profile: impl Into<String>) -> Self {
        Self {
            id: 1,
            profile: profile.into(),
        }
    }
}
