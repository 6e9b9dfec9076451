//! Shared wire types for the colorbook HTTP API.
//!
//! Everything the server serializes and the client deserializes lives here so
//! the two sides can never drift apart: the generation request, the task
//! snapshot returned by the polling endpoint, and the `{code, message, data}`
//! JSON envelope every route answers with.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

// ── Aspect ratio ─────────────────────────────────────────────────────────────

/// Width:height descriptor constraining the generated image shape.
///
/// The provider accepts exactly these three values; `3:2` is the default the
/// original page ships with. `Display`/`FromStr` use the same literals as the
/// serde encoding.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize,
    ToSchema,
)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    #[strum(serialize = "1:1")]
    Square,
    #[serde(rename = "2:3")]
    #[strum(serialize = "2:3")]
    Portrait,
    #[default]
    #[serde(rename = "3:2")]
    #[strum(serialize = "3:2")]
    Landscape,
}

// ── Task state ───────────────────────────────────────────────────────────────

/// Logical state of a remote generation task.
///
/// The provider reports a richer set of states (`queuing`, `generating`, …);
/// they are deliberately narrowed to these three so that polling keeps
/// working when the provider adds new non-terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// Any non-terminal provider state.
    #[strum(serialize = "waiting")]
    Waiting,
    #[strum(serialize = "success")]
    Success,
    #[strum(serialize = "fail")]
    Fail,
}

impl TaskState {
    /// Map a raw provider state string onto the three logical states.
    ///
    /// Everything that is not literally `"success"` or `"fail"` counts as
    /// still in flight.
    pub fn from_provider(state: &str) -> Self {
        state.parse().unwrap_or(TaskState::Waiting)
    }

    /// `true` once polling can stop.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Success | TaskState::Fail)
    }
}

// ── Request / response payloads ──────────────────────────────────────────────

/// Request body for `POST /generate`.
///
/// `prompt` is optional at the serde level so that an absent field surfaces
/// as a structured validation error instead of a deserializer rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub prompt: Option<String>,
    /// Defaults to `3:2` when omitted.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub aspect_ratio: Option<AspectRatio>,
}

/// Success payload of `POST /generate`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatedTask {
    /// Opaque task identifier assigned by the remote provider.
    pub task_id: String,
}

/// Success payload of `GET /generate?taskId=…`: the normalized view of one
/// remote task.
///
/// `result_urls` is non-empty only on `success`; the fail fields are set only
/// on `fail`. Both are always present on the wire (`[]` / `null`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskSnapshot {
    pub task_id: String,
    pub state: TaskState,
    #[serde(default)]
    pub result_urls: Vec<String>,
    pub fail_code: Option<String>,
    pub fail_msg: Option<String>,
}

// ── Response envelope ────────────────────────────────────────────────────────

/// JSON envelope for every API response: `code == 0` carries `data`,
/// any other code carries `message`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Envelope<T> {
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            code: 0,
            message: None,
            data: Some(data),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            code: -1,
            message: Some(message.into()),
            data: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == 0
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_ratio_defaults_to_landscape() {
        assert_eq!(AspectRatio::default(), AspectRatio::Landscape);
        assert_eq!(AspectRatio::default().to_string(), "3:2");
    }

    #[test]
    fn aspect_ratio_serde_uses_wire_literals() {
        let json = serde_json::to_string(&AspectRatio::Portrait).unwrap();
        assert_eq!(json, "\"2:3\"");
        let parsed: AspectRatio = serde_json::from_str("\"1:1\"").unwrap();
        assert_eq!(parsed, AspectRatio::Square);
    }

    #[test]
    fn aspect_ratio_rejects_unknown_literals() {
        assert!("9:16".parse::<AspectRatio>().is_err());
        assert!(serde_json::from_str::<AspectRatio>("\"16:9\"").is_err());
    }

    #[test]
    fn display_and_parse_use_the_wire_literals() {
        assert_eq!(AspectRatio::Portrait.to_string(), "2:3");
        assert_eq!("1:1".parse::<AspectRatio>(), Ok(AspectRatio::Square));
        assert_eq!(TaskState::Success.to_string(), "success");
        assert_eq!("fail".parse::<TaskState>(), Ok(TaskState::Fail));
        // Variant names are not wire literals.
        assert!("Square".parse::<AspectRatio>().is_err());
    }

    #[test]
    fn provider_states_narrow_to_three() {
        assert_eq!(TaskState::from_provider("success"), TaskState::Success);
        assert_eq!(TaskState::from_provider("fail"), TaskState::Fail);
        // Known non-terminal states and any future additions stay "waiting".
        for raw in ["waiting", "queuing", "generating", "brand-new-state", ""] {
            assert_eq!(TaskState::from_provider(raw), TaskState::Waiting, "{raw}");
        }
    }

    #[test]
    fn terminal_states_are_success_and_fail_only() {
        assert!(TaskState::Success.is_terminal());
        assert!(TaskState::Fail.is_terminal());
        assert!(!TaskState::Waiting.is_terminal());
    }

    #[test]
    fn envelope_ok_omits_message() {
        let env = Envelope::ok(CreatedTask {
            task_id: "T1".into(),
        });
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["code"], 0);
        assert_eq!(json["data"]["taskId"], "T1");
        assert!(json.get("message").is_none());
    }

    #[test]
    fn envelope_err_omits_data() {
        let env: Envelope<CreatedTask> = Envelope::err("prompt is required");
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["code"], -1);
        assert_eq!(json["message"], "prompt is required");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn snapshot_serializes_camel_case_with_null_fail_fields() {
        let snap = TaskSnapshot {
            task_id: "T9".into(),
            state: TaskState::Waiting,
            result_urls: vec![],
            fail_code: None,
            fail_msg: None,
        };
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["taskId"], "T9");
        assert_eq!(json["state"], "waiting");
        assert_eq!(json["resultUrls"], serde_json::json!([]));
        assert!(json["failCode"].is_null());
        assert!(json["failMsg"].is_null());
    }
}
