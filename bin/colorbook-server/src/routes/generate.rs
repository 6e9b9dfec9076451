//! Coloring-page generation endpoints.
//!
//! `POST /generate` submits a prompt to the remote provider and answers with
//! the provider-assigned task id; `GET /generate?taskId=…` polls that task
//! and answers with its normalized snapshot. Both endpoints answer the
//! `{code, message, data}` envelope with HTTP 200; `code` carries the
//! success/failure signal so browser clients never need a non-2xx branch.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::info;
use utoipa::{IntoParams, OpenApi};

use colorbook_types::{CreatedTask, Envelope, GenerateRequest, TaskSnapshot};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(create_generation, poll_generation),
    components(schemas(GenerateRequest, CreatedTask, TaskSnapshot))
)]
struct GenerateApi;

/// Paths and schemas contributed by this module.
pub fn api_docs() -> utoipa::openapi::OpenApi {
    GenerateApi::openapi()
}

/// Register generation routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/generate", post(create_generation).get(poll_generation))
}

/// Query parameters for `GET /generate`.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PollQuery {
    /// Task id returned by the submit endpoint.
    #[serde(rename = "taskId")]
    pub task_id: Option<String>,
}

/// Submit a generation task.
///
/// The prompt is wrapped in the coloring-book style template server-side;
/// the aspect ratio defaults to `3:2` when omitted.
#[utoipa::path(
    post,
    path = "/generate",
    tag = "generate",
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "Envelope: code 0 with {taskId}, or code -1 with message", body = Value)
    )
)]
pub async fn create_generation(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<Envelope<CreatedTask>>, ApiError> {
    let prompt = request.prompt.as_deref().map(str::trim).unwrap_or_default();
    if prompt.is_empty() {
        return Err(ApiError::Validation("prompt is required".to_owned()));
    }

    let aspect_ratio = request.aspect_ratio.unwrap_or_default();
    let task_id = state.provider.create_task(prompt, aspect_ratio).await?;

    info!(task_id = %task_id, aspect_ratio = %aspect_ratio, "generation task created");
    Ok(Json(Envelope::ok(CreatedTask { task_id })))
}

/// Poll a generation task.
#[utoipa::path(
    get,
    path = "/generate",
    tag = "generate",
    params(PollQuery),
    responses(
        (status = 200, description = "Envelope: code 0 with the task snapshot, or code -1 with message", body = Value)
    )
)]
pub async fn poll_generation(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PollQuery>,
) -> Result<Json<Envelope<TaskSnapshot>>, ApiError> {
    let task_id = query.task_id.as_deref().unwrap_or_default();
    if task_id.is_empty() {
        return Err(ApiError::Validation("taskId is required".to_owned()));
    }

    let snapshot = state.provider.query_task(task_id).await?;
    info!(task_id = %snapshot.task_id, state = %snapshot.state, "task polled");
    Ok(Json(Envelope::ok(snapshot)))
}

// ── Tests ────────────────────────────────────────────────────────────────────
