//! Remote image-generation provider client (kie.ai "jobs" API).
//!
//! The provider runs generation asynchronously: `createTask` returns an
//! opaque task id and `recordInfo` reports the task's current record. This
//! module owns the credential, composes the styled prompt, and normalizes
//! provider responses into the shared wire types, including the three-state
//! narrowing of provider task states and the decode-with-degrade handling of
//! the nested `resultJson` payload.

use colorbook_types::{AspectRatio, TaskSnapshot, TaskState};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::warn;

use crate::error::ApiError;

/// Model identifier submitted when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-image/1.5-text-to-image";

/// Quality setting submitted when none is configured.
pub const DEFAULT_QUALITY: &str = "medium";

const STYLE_PREFIX: &str = "Black & white refined lineart ";
const STYLE_SUFFIX: &str = ", elegant mood, 6–8 detailed elements, crisp \
high-contrast outlines, coloring-book style. --stylize 750 --no watermarks \
--no signature";

/// Wrap the user prompt in the fixed coloring-book style template.
pub fn compose_prompt(prompt: &str) -> String {
    format!("{STYLE_PREFIX}{prompt}{STYLE_SUFFIX}")
}

// ── Provider wire types ──────────────────────────────────────────────────────

/// Top-level provider envelope; `code == 200` means success. Some error
/// responses carry `msg`, others `message`.
#[derive(Debug, Deserialize)]
struct ProviderEnvelope<T> {
    code: Option<i64>,
    msg: Option<String>,
    message: Option<String>,
    data: Option<T>,
}

impl<T> ProviderEnvelope<T> {
    fn provider_message(&self) -> Option<&str> {
        self.msg.as_deref().or(self.message.as_deref())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedTaskData {
    task_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskRecordData {
    task_id: Option<String>,
    state: Option<String>,
    /// JSON-encoded string; decoded separately on success.
    result_json: Option<String>,
    fail_code: Option<String>,
    fail_msg: Option<String>,
}

/// Shape of the decoded `resultJson` payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultPayload {
    #[serde(default)]
    result_urls: Vec<String>,
}

// ── Client ───────────────────────────────────────────────────────────────────

/// HTTP client for the provider's task-creation and task-query endpoints.
///
/// Cheap to clone; the inner `reqwest::Client` is a shared connection pool.
#[derive(Debug, Clone)]
pub struct ProviderClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    quality: String,
}

impl ProviderClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_owned(),
            quality: DEFAULT_QUALITY.to_owned(),
        }
    }

    /// Override the model identifier (default: [`DEFAULT_MODEL`]).
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the quality setting (default: [`DEFAULT_QUALITY`]).
    pub fn quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = quality.into();
        self
    }

    /// Create a generation task; returns the provider-assigned task id.
    ///
    /// The user prompt is wrapped in the style template before submission.
    pub async fn create_task(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<String, ApiError> {
        let body = json!({
            "model": self.model,
            "input": {
                "prompt": compose_prompt(prompt),
                "aspect_ratio": aspect_ratio,
                "quality": self.quality,
            },
        });

        let response = self
            .http
            .post(format!("{}/jobs/createTask", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|source| ApiError::Network {
                message: "Failed to create task",
                source,
            })?;

        let envelope: ProviderEnvelope<CreatedTaskData> =
            decode_envelope(response, "Failed to create task").await?;

        envelope
            .data
            .and_then(|d| d.task_id)
            .ok_or_else(|| ApiError::Upstream("Failed to create task".to_owned()))
    }

    /// Query a task's current record and normalize it into a [`TaskSnapshot`].
    pub async fn query_task(&self, task_id: &str) -> Result<TaskSnapshot, ApiError> {
        let response = self
            .http
            .get(format!("{}/jobs/recordInfo", self.base_url))
            .query(&[("taskId", task_id)])
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|source| ApiError::Network {
                message: "Failed to query task",
                source,
            })?;

        let envelope: ProviderEnvelope<TaskRecordData> =
            decode_envelope(response, "Failed to query task").await?;
        let record = envelope
            .data
            .ok_or_else(|| ApiError::Upstream("Failed to query task".to_owned()))?;

        // Three-state narrowing: anything non-terminal (queuing, generating,
        // states the provider adds later) counts as still waiting.
        let state = TaskState::from_provider(record.state.as_deref().unwrap_or(""));

        let result_urls = match (state, record.result_json.as_deref()) {
            (TaskState::Success, Some(raw)) => decode_result_urls(task_id, raw),
            _ => Vec::new(),
        };

        Ok(TaskSnapshot {
            task_id: record.task_id.unwrap_or_else(|| task_id.to_owned()),
            state,
            result_urls,
            // Empty failure fields count as absent on the wire.
            fail_code: record.fail_code.filter(|c| !c.is_empty()),
            fail_msg: record.fail_msg.filter(|m| !m.is_empty()),
        })
    }
}

/// Common response ladder, in the same order for both endpoints: the body
/// must parse as JSON, then the HTTP status must be 2xx, then the provider
/// `code` must be 200. Error messages prefer what the provider said.
async fn decode_envelope<T: DeserializeOwned>(
    response: reqwest::Response,
    generic: &str,
) -> Result<ProviderEnvelope<T>, ApiError> {
    let status = response.status();

    let envelope: ProviderEnvelope<T> = match response.json().await {
        Ok(envelope) => envelope,
        Err(_) => {
            return Err(ApiError::Parse {
                status: status.as_u16(),
            });
        }
    };

    if !status.is_success() {
        let message = envelope
            .provider_message()
            .map(str::to_owned)
            .unwrap_or_else(|| format!("API request failed with status: {}", status.as_u16()));
        return Err(ApiError::Upstream(message));
    }

    if envelope.code != Some(200) {
        let message = envelope
            .provider_message()
            .map(str::to_owned)
            .unwrap_or_else(|| generic.to_owned());
        return Err(ApiError::Upstream(message));
    }

    Ok(envelope)
}

/// Decode the nested `resultJson` payload.
///
/// A malformed or incomplete payload is a provider anomaly, not a request
/// failure: it is logged and degraded to an empty url list, which the caller
/// reports as an anomalous success.
fn decode_result_urls(task_id: &str, raw: &str) -> Vec<String> {
    match serde_json::from_str::<ResultPayload>(raw) {
        Ok(payload) => payload.result_urls,
        Err(error) => {
            warn!(task_id, %error, "failed to parse provider resultJson");
            Vec::new()
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
