use thiserror::Error;

/// Failures turning a consensus-layer block into something the relay can deliver.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid block response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid transaction at position {index}: {reason}")]
    InvalidTransaction { index: usize, reason: String },
}
