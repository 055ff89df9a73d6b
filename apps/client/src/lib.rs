//! Client core for the recruitment platform's résumé draft lifecycle.
//!
//! Three pieces, consumed in this order:
//! - [`models::draft::Draft`] — the in-memory wizard state with pure update
//!   operations and no I/O.
//! - [`persist::DraftSession`] — wraps a draft with a best-effort local
//!   snapshot store and the server synchronization routine, including the
//!   auto-save debounce and the flat-to-nested payload mapping.
//! - [`preview::build_preview`] — the read path that picks a user's
//!   authoritative résumé record and normalizes its historically-aliased
//!   fields into one canonical model for preview, print, and export.

pub mod api;
pub mod config;
pub mod models;
pub mod persist;
pub mod preview;

pub use api::{ApiError, ResumeApi};
pub use config::Config;
pub use models::draft::{Draft, ExperienceEntry, Section, StepData};
pub use models::preview::{CanonicalPreview, PreviewExperience};
pub use persist::{DraftSession, SaveOutcome};
pub use preview::build_preview;
