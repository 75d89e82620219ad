//! An in-memory [`EngineApi`] that records what it is asked to do.

use std::{
    sync::{Mutex, PoisonError},
    time::Duration,
};

use alloy_rpc_types_engine::{
    ExecutionPayloadV3, ForkchoiceState, ForkchoiceUpdated, PayloadAttributes, PayloadId,
    PayloadStatus, PayloadStatusEnum, TransitionConfiguration,
};
use async_trait::async_trait;
use color_eyre::eyre;
use elrelay_types::aliases::B256;

use crate::{EngineApi, ExecutionError, engine_api::methods::ENGINE_GET_PAYLOAD_V1};

/// A call received by a [`RecordingEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    ForkchoiceUpdated(ForkchoiceState),
    NewPayload { block_hash: B256, versioned_hashes: Vec<B256>, parent_beacon_block_root: B256 },
    ExchangeTransitionConfiguration,
    GetPayload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Behavior {
    Succeed,
    Fail,
    Paused,
}

#[derive(Debug)]
pub struct RecordingEngine {
    name: String,
    behavior: Behavior,
    delay: Duration,
    calls: Mutex<Vec<EngineCall>>,
}

impl RecordingEngine {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            behavior: Behavior::Succeed,
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails with a transport error.
    pub fn failing(mut self) -> Self {
        self.behavior = Behavior::Fail;
        self
    }

    /// Every call is rejected as if the engine's breaker were open.
    pub fn paused(mut self) -> Self {
        self.behavior = Behavior::Paused;
        self
    }

    /// Every call takes `delay` to complete.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Calls that completed, in completion order.
    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn forkchoice_states(&self) -> Vec<ForkchoiceState> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                EngineCall::ForkchoiceUpdated(state) => Some(state),
                _ => None,
            })
            .collect()
    }

    async fn record(&self, call: EngineCall) -> eyre::Result<()> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(call);
        match self.behavior {
            Behavior::Succeed => Ok(()),
            Behavior::Fail => {
                Err(ExecutionError::Transport(format!("{} is down", self.name)).into())
            }
            Behavior::Paused => {
                Err(ExecutionError::ClientPaused { remaining: Duration::from_secs(60) }.into())
            }
        }
    }
}

#[async_trait]
impl EngineApi for RecordingEngine {
    fn name(&self) -> &str {
        &self.name
    }

    async fn forkchoice_updated(
        &self,
        state: ForkchoiceState,
        _payload_attributes: Option<PayloadAttributes>,
    ) -> eyre::Result<ForkchoiceUpdated> {
        let head = state.head_block_hash;
        self.record(EngineCall::ForkchoiceUpdated(state)).await?;
        Ok(ForkchoiceUpdated {
            payload_status: PayloadStatus {
                status: PayloadStatusEnum::Valid,
                latest_valid_hash: Some(head),
            },
            payload_id: None,
        })
    }

    async fn new_payload(
        &self,
        payload: ExecutionPayloadV3,
        versioned_hashes: Vec<B256>,
        parent_beacon_block_root: B256,
    ) -> eyre::Result<PayloadStatus> {
        let block_hash = payload.payload_inner.payload_inner.block_hash;
        let call =
            EngineCall::NewPayload { block_hash, versioned_hashes, parent_beacon_block_root };
        self.record(call).await?;
        Ok(PayloadStatus { status: PayloadStatusEnum::Syncing, latest_valid_hash: None })
    }

    async fn exchange_transition_configuration(
        &self,
        config: TransitionConfiguration,
    ) -> eyre::Result<TransitionConfiguration> {
        self.record(EngineCall::ExchangeTransitionConfiguration).await?;
        Ok(config)
    }

    async fn get_payload(&self, _payload_id: PayloadId) -> eyre::Result<ExecutionPayloadV3> {
        self.record(EngineCall::GetPayload).await?;
        Err(ExecutionError::MethodNotSupported(ENGINE_GET_PAYLOAD_V1).into())
    }
}
