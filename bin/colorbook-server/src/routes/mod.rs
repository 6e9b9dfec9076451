//! Axum router construction.
//!
//! [`build`] wires the full application surface: the `/generate` submit and
//! poll routes, the `/health` heartbeat, the optional OpenAPI document
//! (disable with `COLORBOOK_ENABLE_DOCS=false`), and the CORS / trace-ID
//! middleware stack.

pub mod doc;
mod generate;
mod health;

use crate::middleware::{cors, trace};
use crate::state::AppState;
use axum::{Router, middleware};
use std::sync::Arc;
use tower::ServiceBuilder;

// ── Router builder ────────────────────────────────────────────────────────────

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .merge(health::router())
        .merge(generate::router());

    // Document serving is on by default; deployments that do not want to
    // advertise the API surface set COLORBOOK_ENABLE_DOCS=false.
    if state.config.enable_docs {
        app = app.merge(doc::router());
    }

    let cors = cors::cors_layer(&state.config);
    app.layer(ServiceBuilder::new().layer(cors))
        // Added last, so the trace layer sits outermost and every response,
        // CORS preflights included, carries an x-trace-id.
        .layer(middleware::from_fn(trace::trace_middleware))
        .with_state(state)
}

// ── Tests ────────────────────────────────────────────────────────────────────
