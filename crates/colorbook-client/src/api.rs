//! HTTP client for the colorbook server's generation endpoints.

use colorbook_types::{AspectRatio, CreatedTask, Envelope, GenerateRequest, TaskSnapshot};
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Errors surfaced to the generation flow.
///
/// The `Display` text of every variant is what ends up in the user-visible
/// error state, so each message is short and self-contained.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server's response body was not parseable as the JSON envelope.
    #[error("request failed with status {status}: unparseable response body")]
    Parse { status: u16 },

    /// The server answered with an error envelope (or a non-2xx status);
    /// carries the envelope message when one was present.
    #[error("{0}")]
    Api(String),

    /// The request could not complete at the network level.
    #[error("{message}")]
    Network {
        message: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

/// Client for `POST /generate` and `GET /generate?taskId=…`.
///
/// Cheap to clone; the inner `reqwest::Client` is a shared connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    /// Submit a generation task; returns the task id to poll.
    pub async fn create_task(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<String, ClientError> {
        let request = GenerateRequest {
            prompt: Some(prompt.to_owned()),
            aspect_ratio: Some(aspect_ratio),
        };

        let response = self
            .http
            .post(format!("{}/generate", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|source| ClientError::Network {
                message: "Failed to generate coloring page",
                source,
            })?;

        let envelope: Envelope<CreatedTask> = decode(response, "Failed to create task").await?;
        envelope
            .data
            .map(|d| d.task_id)
            .ok_or_else(|| ClientError::Api("Failed to create task".to_owned()))
    }

    /// Fetch the current snapshot of a task.
    pub async fn query_task(&self, task_id: &str) -> Result<TaskSnapshot, ClientError> {
        let response = self
            .http
            .get(format!("{}/generate", self.base_url))
            .query(&[("taskId", task_id)])
            .send()
            .await
            .map_err(|source| ClientError::Network {
                message: "Failed to query task status",
                source,
            })?;

        let envelope: Envelope<TaskSnapshot> = decode(response, "Failed to query task").await?;
        envelope
            .data
            .ok_or_else(|| ClientError::Api("Failed to query task".to_owned()))
    }
}

/// Decode ladder shared by both endpoints: the body must parse as the JSON
/// envelope, then the HTTP status must be 2xx (proxies and crashes can still
/// produce one even though the server itself always answers 200), then the
/// envelope `code` must be 0.
async fn decode<T: DeserializeOwned>(
    response: reqwest::Response,
    generic: &str,
) -> Result<Envelope<T>, ClientError> {
    let status = response.status();

    let envelope: Envelope<T> = match response.json().await {
        Ok(envelope) => envelope,
        Err(_) => {
            return Err(ClientError::Parse {
                status: status.as_u16(),
            });
        }
    };

    if !status.is_success() {
        let message = envelope
            .message
            .unwrap_or_else(|| format!("request failed with status {}", status.as_u16()));
        return Err(ClientError::Api(message));
    }

    if !envelope.is_ok() {
        let message = envelope.message.unwrap_or_else(|| generic.to_owned());
        return Err(ClientError::Api(message));
    }

    Ok(envelope)
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use axum::Router;
    use axum::routing::{get, post};
    use serde_json::json;

    use super::*;

    async fn spawn_server(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve test server");
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn create_task_returns_id_from_envelope() {
        let app = Router::new().route(
            "/generate",
            post(|| async { axum::Json(json!({ "code": 0, "data": { "taskId": "T1" } })) }),
        );
        let base = spawn_server(app).await;

        let task_id = ApiClient::new(&base)
            .create_task("a cat", AspectRatio::Square)
            .await
            .expect("create should succeed");
        assert_eq!(task_id, "T1");
    }

    #[tokio::test]
    async fn unparseable_body_carries_the_http_status() {
        let app = Router::new().route(
            "/generate",
            post(|| async { (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let base = spawn_server(app).await;

        let err = ApiClient::new(&base)
            .create_task("a cat", AspectRatio::Landscape)
            .await
            .expect_err("unparseable body should fail");
        assert!(matches!(err, ClientError::Parse { status: 500 }));
        assert!(err.to_string().contains("request failed with status 500"));
    }

    #[tokio::test]
    async fn error_envelope_message_is_surfaced() {
        let app = Router::new().route(
            "/generate",
            post(|| async { axum::Json(json!({ "code": -1, "message": "prompt is required" })) }),
        );
        let base = spawn_server(app).await;

        let err = ApiClient::new(&base)
            .create_task("a cat", AspectRatio::Landscape)
            .await
            .expect_err("error envelope should fail");
        assert!(matches!(&err, ClientError::Api(m) if m == "prompt is required"));
    }

    #[tokio::test]
    async fn non_2xx_prefers_envelope_message_over_status() {
        let app = Router::new().route(
            "/generate",
            post(|| async {
                (
                    axum::http::StatusCode::SERVICE_UNAVAILABLE,
                    axum::Json(json!({ "code": -1, "message": "upstream down" })),
                )
            }),
        );
        let base = spawn_server(app).await;

        let err = ApiClient::new(&base)
            .create_task("a cat", AspectRatio::Landscape)
            .await
            .expect_err("non-2xx should fail");
        assert!(matches!(&err, ClientError::Api(m) if m == "upstream down"));
    }

    #[tokio::test]
    async fn missing_data_falls_back_to_generic_message() {
        let app = Router::new().route(
            "/generate",
            post(|| async { axum::Json(json!({ "code": 0 })) }),
        );
        let base = spawn_server(app).await;

        let err = ApiClient::new(&base)
            .create_task("a cat", AspectRatio::Landscape)
            .await
            .expect_err("missing data should fail");
        assert!(matches!(&err, ClientError::Api(m) if m == "Failed to create task"));
    }

    #[tokio::test]
    async fn query_task_decodes_snapshot() {
        let app = Router::new().route(
            "/generate",
            get(|| async {
                axum::Json(json!({
                    "code": 0,
                    "data": {
                        "taskId": "T1",
                        "state": "waiting",
                        "resultUrls": [],
                        "failCode": null,
                        "failMsg": null,
                    },
                }))
            }),
        );
        let base = spawn_server(app).await;

        let snapshot = ApiClient::new(&base)
            .query_task("T1")
            .await
            .expect("query should succeed");
        assert_eq!(snapshot.task_id, "T1");
        assert_eq!(snapshot.state, colorbook_types::TaskState::Waiting);
    }
}
