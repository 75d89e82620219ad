//! The relay pipeline: a fetch loop polling the consensus layer and a deliver
//! loop driving the execution engines, joined by two bounded channels.

pub mod config;
pub mod deliver;
mod fetch;
pub mod relay;

pub use config::RelayConfig;
pub use deliver::DeliverState;
pub use relay::{Fetcher, FetcherHandle};
