//! CORS layer.

use axum::http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use crate::config::Config;

/// Build the CORS layer from the configured origin list.
///
/// Without `COLORBOOK_CORS_ORIGINS` the layer allows any origin, which suits
/// local development; deployments should set an explicit list.
pub fn cors_layer(config: &Config) -> CorsLayer {
    let origins = config
        .cors_allowed_origins
        .as_deref()
        .map(parse_origins)
        .unwrap_or_default();

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(origins)
    }
}

/// Parse a comma-separated origin list, skipping entries that are not valid
/// header values.
fn parse_origins(raw: &str) -> Vec<HeaderValue> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse::<HeaderValue>() {
            Ok(origin) => Some(origin),
            Err(_) => {
                warn!(origin = %s, "ignoring invalid CORS origin");
                None
            }
        })
        .collect()
}

// ── Tests ────────────────────────────────────────────────────────────────────
