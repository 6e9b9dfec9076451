//! Unified request error type.
//!
//! Every handler returns `Result<T, ApiError>`, which implements
//! [`axum::response::IntoResponse`] so errors are automatically rendered as
//! the `{code: -1, message}` JSON envelope the web client consumes. The
//! transport status stays 200 since the envelope `code` is the success
//! signal; upstream/network detail is logged server-side before the short
//! client message goes out.

use axum::Json;
use axum::response::{IntoResponse, Response};
use colorbook_types::Envelope;
use thiserror::Error;
use tracing::{error, warn};

/// All errors that can occur while handling a generation request.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A required request field is missing or empty. Rejected before any
    /// provider call is made.
    #[error("{0}")]
    Validation(String),

    /// The provider answered with a non-2xx status or a provider-level error
    /// code; carries the provider's message when one was available.
    #[error("{0}")]
    Upstream(String),

    /// The provider response body was not parseable as JSON at all.
    #[error("API request failed with status: {status}. Failed to parse response.")]
    Parse { status: u16 },

    /// The provider request could not complete at the network level. The
    /// client sees the operation's generic message; the source error is
    /// logged.
    #[error("{message}")]
    Network {
        message: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            ApiError::Validation(m) => m.clone(),
            ApiError::Upstream(m) => {
                warn!(message = %m, "provider reported an error");
                m.clone()
            }
            ApiError::Parse { status } => {
                warn!(status = *status, "unparseable provider response body");
                self.to_string()
            }
            ApiError::Network { message, source } => {
                error!(error = %source, "provider request failed");
                (*message).to_owned()
            }
        };
        Json(Envelope::<()>::err(message)).into_response()
    }
}
