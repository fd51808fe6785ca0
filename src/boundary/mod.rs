//! Primitive-only façade over [`FilebrowserClient`](crate::api::client::FilebrowserClient).
//!
//! Callers on the other side only see strings, booleans and nulls. Rich
//! results travel as JSON, failures as a sentinel plus a message in the
//! last-error slot.

pub mod adapter;
pub mod exports;

use crate::api::client::ClientError;
use crate::config::settings::ConfigError;

pub use adapter::NOT_INITIALIZED;

#[derive(Debug, thiserror::Error)]
pub enum BoundaryError {
    #[error("Client not initialized. Call createClient() first.")]
    NotInitialized,

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to encode result: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Failed to start runtime: {0}")]
    Runtime(std::io::Error),

    #[error("Blocking call made from inside an async runtime; call it from a plain thread (e.g. spawn_blocking)")]
    NestedRuntime,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
