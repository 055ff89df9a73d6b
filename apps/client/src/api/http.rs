//! Reqwest-backed [`ResumeApi`] implementation.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::config::Config;
use crate::models::resume::{ProfileUpsert, ResumeUpsert};

use super::{ApiError, ResumeApi};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Opaque header source supplied by the authentication layer. May return an
/// empty set when no session is established; the resulting HTTP failure is
/// surfaced like any other.
pub trait HeaderProvider: Send + Sync {
    fn headers(&self) -> Vec<(String, String)>;
}

/// Header provider for unauthenticated contexts.
pub struct NoAuth;

impl HeaderProvider for NoAuth {
    fn headers(&self) -> Vec<(String, String)> {
        Vec::new()
    }
}

pub struct HttpResumeApi {
    client: Client,
    base_url: String,
    auth: Arc<dyn HeaderProvider>,
}

impl HttpResumeApi {
    pub fn new(base_url: impl Into<String>, auth: Arc<dyn HeaderProvider>) -> Self {
        Self::with_timeout(base_url, auth, DEFAULT_TIMEOUT_SECS)
    }

    pub fn from_config(config: &Config, auth: Arc<dyn HeaderProvider>) -> Self {
        Self::with_timeout(&config.api_base_url, auth, config.http_timeout_secs)
    }

    fn with_timeout(
        base_url: impl Into<String>,
        auth: Arc<dyn HeaderProvider>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(timeout_secs))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        for (name, value) in self.auth.headers() {
            builder = builder.header(name, value);
        }
        builder
    }

    /// Sends the request and maps non-2xx statuses to `ApiError::Api`,
    /// extracting the server's error envelope message when it parses.
    async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Api {
            status: status.as_u16(),
            message: extract_error_message(&body),
        })
    }

    async fn get_json(&self, path: &str) -> Result<Option<Value>, ApiError> {
        let response = match self.send(self.request(Method::GET, path)).await {
            Ok(r) => r,
            Err(ApiError::Api { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                debug!("GET {path} returned 404");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        let value: Value = response.json().await?;
        Ok(if value.is_null() { None } else { Some(value) })
    }
}

#[async_trait]
impl ResumeApi for HttpResumeApi {
    async fn save_profile(&self, req: &ProfileUpsert) -> Result<(), ApiError> {
        self.send(self.request(Method::POST, "/api/v1/profile").json(req))
            .await?;
        debug!("profile upsert accepted for {}", req.email);
        Ok(())
    }

    async fn save_resume(&self, req: &ResumeUpsert) -> Result<(), ApiError> {
        self.send(self.request(Method::POST, "/api/v1/resume").json(req))
            .await?;
        debug!(
            "resume upsert accepted for {} ({} experiences)",
            req.email,
            req.experiences.len()
        );
        Ok(())
    }

    async fn get_profile(&self, email: &str) -> Result<Option<Value>, ApiError> {
        self.get_json(&format!("/api/v1/profile/{email}")).await
    }

    async fn get_resume(&self, email: &str) -> Result<Option<Value>, ApiError> {
        self.get_json(&format!("/api/v1/resume/{email}")).await
    }

    async fn list_resumes(&self, user_id: &str) -> Result<Vec<Value>, ApiError> {
        let value = self.get_json(&format!("/api/v1/resumes/{user_id}")).await?;
        Ok(match value {
            Some(Value::Array(records)) => records,
            // Some deployments wrap the list in an envelope.
            Some(other) => other
                .get("resumes")
                .and_then(|v| v.as_array())
                .cloned()
                .unwrap_or_default(),
            None => Vec::new(),
        })
    }

    async fn display_name(&self, user_id: &str) -> Result<Option<String>, ApiError> {
        let value = self.get_json(&format!("/api/v1/users/{user_id}")).await?;
        Ok(value.as_ref().and_then(extract_display_name))
    }
}

/// Probes the handful of keys a user record has carried a display name
/// under; the first non-empty value wins.
fn extract_display_name(record: &Value) -> Option<String> {
    ["display_name", "name", "userName", "full_name"]
        .iter()
        .filter_map(|key| record.get(*key).and_then(|v| v.as_str()))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(String::from)
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Pulls the message out of an `{"error": {"message": ...}}` envelope,
/// falling back to the raw body.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_error_message_from_envelope() {
        let body = r#"{"error":{"code":"VALIDATION_ERROR","message":"email required"}}"#;
        assert_eq!(extract_error_message(body), "email required");
    }

    #[test]
    fn test_extract_error_message_raw_fallback() {
        assert_eq!(extract_error_message("boom"), "boom");
    }

    #[test]
    fn test_extract_display_name_prefers_first_alias() {
        let record = json!({"name": "Sato", "display_name": "Sato Hanako"});
        assert_eq!(
            extract_display_name(&record),
            Some("Sato Hanako".to_string())
        );
    }

    #[test]
    fn test_extract_display_name_skips_empty_aliases() {
        let record = json!({"display_name": "  ", "name": "Sato"});
        assert_eq!(extract_display_name(&record), Some("Sato".to_string()));
    }

    #[test]
    fn test_extract_display_name_none_when_all_missing() {
        assert_eq!(extract_display_name(&json!({"id": 1})), None);
    }
}
