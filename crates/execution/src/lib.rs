// crates/execution/src/lib.rs

pub mod breaker;
pub mod config;
pub mod engine_api;
pub mod error;
pub mod multiplexer;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod transport;

pub use config::{BreakerConfig, ElClientConfig};
pub use engine_api::{EngineApi, client::EngineApiClient};
pub use error::ExecutionError;
pub use multiplexer::Multiplexer;
