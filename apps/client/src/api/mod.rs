//! Transport seam between the client core and the platform's JSON-over-HTTP
//! endpoints. Everything above this module talks to [`ResumeApi`]; the
//! reqwest implementation lives in [`http`].

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::models::resume::{ProfileUpsert, ResumeUpsert};

pub mod http;

pub use http::{HeaderProvider, HttpResumeApi, NoAuth};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Request/response contracts this core relies on. Records coming back from
/// the server are raw `Value`s because historical rows carry drifted field
/// names; only the write payloads are typed.
#[async_trait]
pub trait ResumeApi: Send + Sync {
    /// Upserts the flat contact-and-identity record.
    async fn save_profile(&self, req: &ProfileUpsert) -> Result<(), ApiError>;

    /// Full-document upsert of the résumé body.
    async fn save_resume(&self, req: &ResumeUpsert) -> Result<(), ApiError>;

    /// Fetches the profile record by email, `None` when the server has none.
    async fn get_profile(&self, email: &str) -> Result<Option<Value>, ApiError>;

    /// Fetches the résumé body currently being edited, by email.
    async fn get_resume(&self, email: &str) -> Result<Option<Value>, ApiError>;

    /// All résumé records the server knows for a user, any schema vintage.
    async fn list_resumes(&self, user_id: &str) -> Result<Vec<Value>, ApiError>;

    /// Best-effort display name lookup.
    async fn display_name(&self, user_id: &str) -> Result<Option<String>, ApiError>;
}
