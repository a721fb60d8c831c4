//! HTTP client for the hosting backend
//!
//! Every backend function is invoked with the same envelope: a bearer
//! authenticated `POST` of `{functionName, data}`. The response body is
//! either the result or `{error: {code, message, suggestion?}}`.

use reqwest::StatusCode;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use std::path::Path;
use tokio_util::io::ReaderStream;
use url::Url;

use crate::error::{DeployError, Result};
use crate::types::{CallEnvelope, ErrorEnvelope};

/// Longest slice of an unexpected response body quoted in errors
const MAX_QUOTED_BODY: usize = 300;

/// Client for backend calls and archive uploads
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl BackendClient {
    /// Create a client for the given call endpoint
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `api_url` does not parse.
    pub fn new(api_url: &str) -> Result<Self> {
        Self::with_http_client(reqwest::Client::new(), api_url)
    }

    /// Create a client reusing an existing `reqwest` client
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `api_url` does not parse.
    pub fn with_http_client(http: reqwest::Client, api_url: &str) -> Result<Self> {
        let endpoint = Url::parse(api_url)
            .map_err(|e| DeployError::invalid_config(format!("api_url `{api_url}`: {e}")))?;
        Ok(Self { http, endpoint })
    }

    /// Get the underlying HTTP client
    #[must_use]
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Get the call endpoint
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Invoke a backend function and return its raw result.
    ///
    /// A `{"result": ...}` wrapper is unwrapped. An empty success body
    /// yields `Value::Null`.
    ///
    /// # Errors
    ///
    /// `AuthFailureDuringCall` on HTTP 401, `Backend` for an error envelope
    /// or any other non-success status, `Http`/`Json` for transport problems.
    pub async fn call(
        &self,
        token: &str,
        function_name: &str,
        data: serde_json::Value,
    ) -> Result<serde_json::Value> {
        tracing::debug!(function = function_name, "calling backend");

        let response = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(token)
            .json(&CallEnvelope::new(function_name, data))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let envelope = serde_json::from_str::<ErrorEnvelope>(&body).ok();

        if status == StatusCode::UNAUTHORIZED {
            let message = envelope
                .map(|e| e.error.message)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| status.to_string());
            return Err(DeployError::AuthFailureDuringCall(message));
        }

        if let Some(envelope) = envelope {
            let error = envelope.error;
            return Err(DeployError::backend(
                error.code,
                error.message,
                error.suggestion,
            ));
        }

        if !status.is_success() {
            return Err(DeployError::backend(
                format!("HTTP_{}", status.as_u16()),
                format!("{function_name} failed: {}", quote_body(&body)),
                None,
            ));
        }

        if body.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }

        let mut value: serde_json::Value = serde_json::from_str(&body)?;
        if let Some(result) = value.as_object_mut().and_then(|map| {
            if map.len() == 1 {
                map.remove("result")
            } else {
                None
            }
        }) {
            value = result;
        }
        Ok(value)
    }

    /// Invoke a backend function and deserialize its result
    ///
    /// # Errors
    ///
    /// Same as [`call`](Self::call), plus `Json` if the result has the wrong shape.
    pub async fn call_as<T: DeserializeOwned>(
        &self,
        token: &str,
        function_name: &str,
        data: serde_json::Value,
    ) -> Result<T> {
        let value = self.call(token, function_name, data).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Stream a ZIP archive to a signed upload URL
    ///
    /// # Errors
    ///
    /// Returns `Backend` with code `UPLOAD_FAILED` if storage rejects the upload.
    pub async fn upload_archive(&self, upload_url: &str, archive: &Path) -> Result<()> {
        let file = tokio::fs::File::open(archive).await?;
        let size = file.metadata().await?.len();
        tracing::debug!(size, "uploading archive");

        let response = self
            .http
            .put(upload_url)
            .header(CONTENT_TYPE, "application/zip")
            .header(CONTENT_LENGTH, size)
            .body(reqwest::Body::wrap_stream(ReaderStream::new(file)))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(DeployError::backend(
            "UPLOAD_FAILED",
            format!("storage rejected the upload ({status}): {}", quote_body(&body)),
            Some("Retry the deploy; the upload URL may have expired".to_string()),
        ))
    }
}

fn quote_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "(empty response)".to_string();
    }
    let mut quoted: String = trimmed.chars().take(MAX_QUOTED_BODY).collect();
    if quoted.len() < trimmed.len() {
        quoted.push_str("...");
    }
    quoted
}
