//! Consensus layer client.
//!
//! The relay only ever reads blocks from the consensus layer, through the
//! standard beacon REST API.

pub mod block_id;
pub mod client;
pub mod config;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use block_id::BlockId;
pub use client::{BeaconApi, BeaconClient};
pub use config::ClClientConfig;
