use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading the command line and configuration.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Could not open file: {0}")]
    OpenFile(PathBuf),

    #[error("Could not parse configuration: {0}")]
    ParseConfig(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
