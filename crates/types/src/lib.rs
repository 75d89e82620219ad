#![forbid(unsafe_code)]
#![deny(trivial_casts, trivial_numeric_casts)]
#![allow(missing_docs)]

pub mod aliases;
pub mod beacon_block;
pub mod block_update;
pub mod error;
pub mod quantity;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use beacon_block::{BeaconBlockResponse, decode_block_response};
pub use block_update::{BlockUpdate, decode_versioned_hashes};
pub use error::DecodeError;
