//! Client-side generation flow for the colorbook server.
//!
//! Two layers:
//! - [`api::ApiClient`]: thin typed client for the server's `/generate`
//!   submit and poll endpoints.
//! - [`controller::GenerationController`]: the full generation state
//!   machine: submit, poll until terminal, publish observable state and
//!   one-shot notices. The polling loop is an owned, cancellable tokio task.

pub mod api;
pub mod controller;

pub use api::{ApiClient, ClientError};
pub use controller::{
    ControllerConfig, GenerationController, GenerationState, Notice, Phase,
};
