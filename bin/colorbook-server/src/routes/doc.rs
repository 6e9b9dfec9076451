//! Merged OpenAPI document.

use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::routes::generate;
use crate::routes::health;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(info(
    title = "colorbook-server",
    description = "Prompt-to-coloring-page generation API",
    contact(name = "colorbook-rs", url = "https://github.com/colorbook-rs/colorbook")
))]
struct ApiDoc;

/// Merge every route module's paths and schemas into one document.
///
/// Info fields not set on [`ApiDoc`], the version included, come from the
/// crate metadata.
pub fn api_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(generate::api_docs());
    root.merge(health::api_docs());
    root
}

/// Serve the merged document at `/api-docs/openapi.json`.
pub fn router() -> Router<Arc<AppState>> {
    let doc = api_docs();
    Router::new().route(
        "/api-docs/openapi.json",
        get(move || {
            let doc = doc.clone();
            async move { Json(doc) }
        }),
    )
}
