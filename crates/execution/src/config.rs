#![allow(missing_docs)]
use std::{collections::BTreeMap, path::PathBuf, time::Duration};

use alloy_primitives::hex;
use color_eyre::eyre;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::ExecutionError;

/// Connection parameters for one execution engine.
///
/// The position of an entry in the configured list matters: the first engine is
/// the primary, whose answers are returned to the caller, every other engine is
/// a follower.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElClientConfig {
    /// Label used in logs.
    pub name: String,
    /// Engine API HTTP endpoint, e.g. http://localhost:8551
    pub address: Url,
    /// Extra headers attached to every request.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Hex encoded 32-byte JWT secret. Empty means unauthenticated.
    #[serde(default)]
    pub jwt_secret: String,
    /// File holding the JWT secret, as raw 32 bytes or 64 hex chars.
    /// Takes precedence over `jwt_secret`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwt_secret_file: Option<PathBuf>,
}

impl ElClientConfig {
    /// Resolves the configured JWT secret. `None` means requests go out without
    /// an `Authorization` header.
    pub fn resolve_jwt_secret(&self) -> eyre::Result<Option<[u8; 32]>> {
        let Some(path) = &self.jwt_secret_file else {
            return Ok(parse_jwt_secret(&self.jwt_secret)?);
        };

        let raw = std::fs::read(path).map_err(|e| {
            eyre::eyre!("Failed to read JWT secret from {}: {}", path.display(), e)
        })?;
        if let Ok(secret) = <[u8; 32]>::try_from(raw.as_slice()) {
            return Ok(non_zero(secret));
        }
        let secret = parse_jwt_secret(&String::from_utf8_lossy(&raw)).map_err(|e| {
            eyre::eyre!(
                "JWT secret at {} must be 32 raw bytes or 64 hex chars: {}",
                path.display(),
                e
            )
        })?;
        Ok(secret)
    }
}

/// Parses a hex encoded JWT secret, with or without `0x` prefix.
///
/// Empty and all-zero secrets yield `None`.
pub fn parse_jwt_secret(raw: &str) -> Result<Option<[u8; 32]>, ExecutionError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    let decoded = hex::decode(raw).map_err(|e| ExecutionError::Jwt(e.to_string()))?;
    let secret: [u8; 32] = decoded.as_slice().try_into().map_err(|_| {
        ExecutionError::Jwt(format!("secret must be 32 bytes, got {}", decoded.len()))
    })?;
    Ok(non_zero(secret))
}

fn non_zero(secret: [u8; 32]) -> Option<[u8; 32]> {
    (secret != [0u8; 32]).then_some(secret)
}

/// Per-engine failure policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Consecutive failures after which the engine is paused. Zero disables pausing.
    pub error_threshold: u32,
    /// How long a paused engine rejects calls.
    pub backoff_secs: u64,
    /// Deadline for a single engine call.
    pub call_timeout_secs: u64,
}

impl BreakerConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self { error_threshold: 6, backoff_secs: 120, call_timeout_secs: 6 }
    }
}
