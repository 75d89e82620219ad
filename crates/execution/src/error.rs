#![allow(missing_docs)]

use std::time::Duration;

use thiserror::Error;

/// Defines the specific error types for the execution client.
///
/// Functions throughout the crate return `eyre::Result`; these variants are
/// wrapped in the report so callers can `downcast_ref` to tell an expected
/// outcome (a paused client, an unsupported method) from a real failure.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("JSON-RPC error (code {code}): {message}")]
    JsonRpc { code: i64, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("{method} timed out after {timeout:?}")]
    Timeout { method: &'static str, timeout: Duration },

    #[error("client paused for another {remaining:?}")]
    ClientPaused { remaining: Duration },

    #[error("{0} not supported")]
    MethodNotSupported(&'static str),

    #[error("JWT error: {0}")]
    Jwt(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ExecutionError {
    /// Whether this is the breaker rejecting a call without attempting it.
    pub fn is_paused(&self) -> bool {
        matches!(self, Self::ClientPaused { .. })
    }
}

/// Returns the classified error inside an eyre report, if there is one.
pub fn classify(report: &color_eyre::eyre::Report) -> Option<&ExecutionError> {
    report.downcast_ref::<ExecutionError>()
}
