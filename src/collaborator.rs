//! The external text-generation collaborator.
//!
//! The insight builder only sees the [`InsightCollaborator`] capability, so it
//! can be driven by a fake in tests. [`GeminiClient`] is the production
//! implementation backed by the Generative Language REST API.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::InsightError;
use crate::insights::InsightRequest;
use crate::Config;

// ---

/// Something that can answer an [`InsightRequest`] with raw text.
///
/// Implementations return the collaborator's answer verbatim; parsing and
/// validation belong to the caller.
#[async_trait]
pub trait InsightCollaborator: Send + Sync {
    async fn complete(&self, request: &InsightRequest) -> Result<String, InsightError>;
}

/// HTTP client for the Gemini `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    // ---
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    // ---
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, InsightError> {
        // ---
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(GeminiClient {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    /// Build a client from configuration.
    ///
    /// Returns `Ok(None)` when no API key is configured, so no request can
    /// ever be attempted without a credential.
    pub fn from_config(config: &Config) -> Result<Option<Self>, InsightError> {
        // ---
        match config.insights_api_key.as_deref() {
            Some(key) if !key.is_empty() => Self::new(
                config.insights_api_url.as_str(),
                config.insights_model.as_str(),
                key,
                Duration::from_secs(u64::from(config.insights_timeout_secs)),
            )
            .map(Some),
            _ => Ok(None),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl InsightCollaborator for GeminiClient {
    async fn complete(&self, request: &InsightRequest) -> Result<String, InsightError> {
        // ---
        let url = self.endpoint();
        debug!("Requesting insights from: {}", url);

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InsightError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = response.json().await?;
        debug!("Insights raw response: {}", payload);

        response_text(&payload).ok_or(InsightError::EmptyResponse)
    }
}

// ---

/// `generateContent` body asking for a JSON array of insight objects.
fn request_body(request: &InsightRequest) -> Value {
    // ---
    json!({
        "contents": [{ "parts": [{ "text": request.prompt }] }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "ARRAY",
                "maxItems": request.max_insights.to_string(),
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "severity": {
                            "type": "STRING",
                            "enum": ["info", "warning", "critical", "success"]
                        },
                        "title": { "type": "STRING" },
                        "description": { "type": "STRING" },
                        "recommendation": { "type": "STRING" }
                    },
                    "required": ["severity", "title", "description", "recommendation"]
                }
            }
        }
    })
}

/// Concatenated text parts of the first candidate.
fn response_text(payload: &Value) -> Option<String> {
    // ---
    let parts = payload
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();

    (!text.trim().is_empty()).then_some(text)
}
