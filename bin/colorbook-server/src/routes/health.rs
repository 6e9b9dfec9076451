//! Health / heartbeat endpoint.

use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(heartbeat), components(schemas(Heartbeat)))]
struct HealthApi;

/// Paths and schemas contributed by this module.
pub fn api_docs() -> utoipa::openapi::OpenApi {
    HealthApi::openapi()
}

/// Register health-check routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(heartbeat))
}

/// Heartbeat payload.
#[derive(Debug, Serialize, ToSchema)]
pub struct Heartbeat {
    /// Always `ok` while the process is accepting requests.
    #[schema(value_type = String)]
    pub status: &'static str,
    /// Crate version baked in at compile time.
    #[schema(value_type = String)]
    pub version: &'static str,
}

/// Heartbeat endpoint for load-balancer and uptime probes.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Server is healthy", body = Heartbeat)
    )
)]
pub async fn heartbeat() -> Json<Heartbeat> {
    Json(Heartbeat {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn heartbeat_reports_ok_and_version() {
        let Json(beat) = heartbeat().await;
        assert_eq!(beat.status, "ok");
        assert_eq!(beat.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn heartbeat_serializes_to_the_wire_shape() {
        let beat = Heartbeat {
            status: "ok",
            version: "1.2.3",
        };
        let body = serde_json::to_value(beat).expect("serialize");
        assert_eq!(body, json!({ "status": "ok", "version": "1.2.3" }));
    }
}
