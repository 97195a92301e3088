//! JSON-over-HTTP session store.
//!
//! [`RestSessionStore`] implements [`SessionStore`] and [`ProfileSource`]
//! against a small REST API:
//!
//! | Operation | Request |
//! |-----------|---------|
//! | create    | `POST /sessions` with a [`NewSession`] body |
//! | update    | `PATCH /sessions/{id}` with a [`SessionSnapshot`] body |
//! | finalize  | `PUT /sessions/{id}/final` with a [`SessionRecord`] body |
//! | list      | `GET /sessions?user_id={user}` returning `[SessionRecord]` |
//! | weight    | `GET /profiles/{user}` returning `{"weight_kg": f64 \| null}` |
//!
//! The server is expected to ignore a `PATCH` for a finalized session.
//! A `404` on a profile lookup means "no stored weight".
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use pedalsync_core::remote::RestSessionStore;
//!
//! # fn example() -> pedalsync_core::Result<()> {
//! let store = Arc::new(RestSessionStore::new("https://api.example.com/v1")?);
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};

use pedalsync_types::{NewSession, SessionRecord, SessionSnapshot};

use crate::error::{Error, Result};
use crate::traits::{ProfileSource, SessionStore};

/// Request timeout of the default client.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct ProfileResponse {
    #[serde(default)]
    weight_kg: Option<f64>,
}

/// HTTP client for a session backend.
#[derive(Debug, Clone)]
pub struct RestSessionStore {
    client: Client,
    base_url: Url,
}

impl RestSessionStore {
    /// Create a store talking to `base_url`.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| Error::store("build_client", e))?;
        Self::with_client(base_url, client)
    }

    /// Create a store with a custom reqwest client.
    pub fn with_client(base_url: &str, client: Client) -> Result<Self> {
        let trimmed = base_url.trim_end_matches('/');
        if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
            return Err(Error::invalid_config(format!(
                "URL must start with http:// or https://, got: {}",
                base_url
            )));
        }
        let base_url = Url::parse(trimmed)
            .map_err(|e| Error::invalid_config(format!("Invalid URL {}: {}", base_url, e)))?;
        Ok(Self { client, base_url })
    }

    /// The base URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::invalid_config("base URL cannot carry a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send_json<B: Serialize>(
        &self,
        operation: &'static str,
        request: reqwest::RequestBuilder,
        body: &B,
    ) -> Result<()> {
        let response = request
            .json(body)
            .send()
            .await
            .map_err(|e| Error::store(operation, e))?;
        check_status(operation, response).await.map(|_| ())
    }
}

async fn check_status(
    operation: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .json::<serde_json::Value>()
        .await
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
        .unwrap_or_else(|| status.to_string());
    Err(Error::store(
        operation,
        format!("HTTP {}: {}", status.as_u16(), message),
    ))
}

#[async_trait]
impl SessionStore for RestSessionStore {
    async fn create_session(&self, session: &NewSession) -> Result<()> {
        let url = self.endpoint(&["sessions"])?;
        self.send_json("create_session", self.client.post(url), session)
            .await
    }

    async fn update_session(&self, snapshot: &SessionSnapshot) -> Result<()> {
        let id = snapshot.session_id.to_string();
        let url = self.endpoint(&["sessions", &id])?;
        self.send_json("update_session", self.client.patch(url), snapshot)
            .await
    }

    async fn finalize_session(&self, record: &SessionRecord) -> Result<()> {
        let id = record.session_id.to_string();
        let url = self.endpoint(&["sessions", &id, "final"])?;
        self.send_json("finalize_session", self.client.put(url), record)
            .await
    }

    async fn list_sessions(&self, user_id: &str) -> Result<Vec<SessionRecord>> {
        let url = self.endpoint(&["sessions"])?;
        let response = self
            .client
            .get(url)
            .query(&[("user_id", user_id)])
            .send()
            .await
            .map_err(|e| Error::store("list_sessions", e))?;
        check_status("list_sessions", response)
            .await?
            .json()
            .await
            .map_err(|e| Error::store("list_sessions", e))
    }
}

#[async_trait]
impl ProfileSource for RestSessionStore {
    async fn user_weight_kg(&self, user_id: &str) -> Result<Option<f64>> {
        let url = self.endpoint(&["profiles", user_id])?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::store("user_weight_kg", e))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let profile: ProfileResponse = check_status("user_weight_kg", response)
            .await?
            .json()
            .await
            .map_err(|e| Error::store("user_weight_kg", e))?;
        Ok(profile.weight_kg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pedalsync_types::SessionId;

    #[test]
    fn test_store_creation() {
        let store = RestSessionStore::new("http://localhost:8080").unwrap();
        assert_eq!(store.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_store_normalizes_url() {
        let store = RestSessionStore::new("https://api.example.com/v1/").unwrap();
        assert_eq!(store.base_url(), "https://api.example.com/v1");
    }

    #[test]
    fn test_store_invalid_url() {
        let result = RestSessionStore::new("localhost:8080");
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_endpoints() {
        let store = RestSessionStore::new("https://api.example.com/v1").unwrap();
        let id = SessionId::new();
        let url = store
            .endpoint(&["sessions", &id.to_string(), "final"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            format!("https://api.example.com/v1/sessions/{}/final", id)
        );

        // User ids are percent-encoded as a single segment.
        let url = store.endpoint(&["profiles", "a/b c"]).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/profiles/a%2Fb%20c");
    }

    #[test]
    fn test_endpoint_on_bare_host() {
        let store = RestSessionStore::new("http://localhost:8080").unwrap();
        let url = store.endpoint(&["sessions"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/sessions");
    }

    #[test]
    fn test_profile_response_null_weight() {
        let profile: ProfileResponse = serde_json::from_str(r#"{"weight_kg": null}"#).unwrap();
        assert!(profile.weight_kg.is_none());
        let profile: ProfileResponse = serde_json::from_str("{}").unwrap();
        assert!(profile.weight_kg.is_none());
    }
}
