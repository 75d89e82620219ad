// crates/execution/src/engine_api/mod.rs

pub mod client;
pub mod jwt;
pub mod methods;

use alloy_rpc_types_engine::{
    ExecutionPayloadV3, ForkchoiceState, ForkchoiceUpdated, PayloadAttributes, PayloadId,
    PayloadStatus, TransitionConfiguration,
};
use async_trait::async_trait;
use color_eyre::eyre;
use elrelay_types::aliases::B256;

/// The subset of the Engine API the relay speaks.
///
/// Implemented by a single remote engine ([`client::EngineApiClient`]) and by the
/// [`crate::Multiplexer`] that fans calls out to several of them.
#[async_trait]
pub trait EngineApi: Send + Sync {
    /// Label used in logs.
    fn name(&self) -> &str;

    /// Informs the engine about the current head and finalized block.
    async fn forkchoice_updated(
        &self,
        state: ForkchoiceState,
        payload_attributes: Option<PayloadAttributes>,
    ) -> eyre::Result<ForkchoiceUpdated>;

    /// Submits a full block for execution.
    async fn new_payload(
        &self,
        payload: ExecutionPayloadV3,
        versioned_hashes: Vec<B256>,
        parent_beacon_block_root: B256,
    ) -> eyre::Result<PayloadStatus>;

    async fn exchange_transition_configuration(
        &self,
        config: TransitionConfiguration,
    ) -> eyre::Result<TransitionConfiguration>;

    /// Always fails: the relay never asks engines to build payloads.
    async fn get_payload(&self, payload_id: PayloadId) -> eyre::Result<ExecutionPayloadV3>;
}
