//! Request tracing middleware.
//!
//! Every request runs inside a span carrying an `x-trace-id` (propagated from
//! the caller when it is a valid UUID, minted otherwise), and the id is echoed
//! on the response. All colorbook responses are small JSON envelopes, so the
//! response body is buffered to recover the envelope `code` for the completion
//! log line; error envelopes are logged in full.

use std::time::Instant;

use axum::body::{Body, Bytes};
use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use http_body_util::BodyExt;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

/// Header carrying the per-request trace id.
pub static X_TRACE_ID: &str = "x-trace-id";

pub async fn trace_middleware(mut req: Request<Body>, next: Next) -> Response {
    let started = Instant::now();

    let trace_id = req
        .headers()
        .get(X_TRACE_ID)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);
    let header_value = HeaderValue::from_str(&trace_id.to_string()).ok();

    let span = info_span!(
        "http_request",
        trace_id = %trace_id,
        method = %req.method(),
        path = req.uri().path(),
    );

    async move {
        info!("request started");
        if let Some(value) = &header_value {
            req.headers_mut().insert(X_TRACE_ID, value.clone());
        }

        let response = next.run(req).await;
        let status = response.status();

        let (parts, body) = response.into_parts();
        let bytes = body
            .collect()
            .await
            .map(|collected| collected.to_bytes())
            .unwrap_or_default();

        match envelope_code(&bytes) {
            Some(code) if code != 0 => info!(
                status = status.as_u16(),
                code,
                body = %String::from_utf8_lossy(&bytes),
                latency_ms = started.elapsed().as_millis(),
                "request failed"
            ),
            code => info!(
                status = status.as_u16(),
                code,
                latency_ms = started.elapsed().as_millis(),
                "request finished"
            ),
        }

        let mut response = Response::from_parts(parts, Body::from(bytes));
        if let Some(value) = header_value {
            response.headers_mut().insert(X_TRACE_ID, value);
        }
        response
    }
    .instrument(span)
    .await
}

/// Extract the `code` field when the body is a JSON envelope.
fn envelope_code(bytes: &Bytes) -> Option<i64> {
    serde_json::from_slice::<serde_json::Value>(bytes)
        .ok()?
        .get("code")?
        .as_i64()
}

// ── Tests ────────────────────────────────────────────────────────────────────
