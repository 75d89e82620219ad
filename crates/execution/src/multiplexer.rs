//! Fan-out of engine API calls to every configured execution engine.

use std::{future::Future, sync::Arc};

use alloy_rpc_types_engine::{
    ExecutionPayloadV3, ForkchoiceState, ForkchoiceUpdated, PayloadAttributes, PayloadId,
    PayloadStatus, TransitionConfiguration,
};
use async_trait::async_trait;
use color_eyre::eyre::{self, eyre};
use elrelay_types::aliases::B256;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::{
    EngineApi, ExecutionError,
    config::{BreakerConfig, ElClientConfig},
    engine_api::{client::EngineApiClient, methods::*},
    error::classify,
};

/// Relays every call to one primary engine and any number of followers.
///
/// Only the primary's outcome reaches the caller. Follower calls run
/// concurrently on their own tasks and their failures are logged and dropped,
/// but every relayed call waits for all of them before returning.
pub struct Multiplexer {
    primary: Arc<dyn EngineApi>,
    followers: Vec<Arc<dyn EngineApi>>,
}

impl Multiplexer {
    pub fn new(primary: Arc<dyn EngineApi>, followers: Vec<Arc<dyn EngineApi>>) -> Self {
        Self { primary, followers }
    }

    /// The first engine becomes the primary.
    pub fn from_clients(clients: Vec<Arc<dyn EngineApi>>) -> eyre::Result<Self> {
        let mut clients = clients.into_iter();
        let primary = clients.next().ok_or_else(|| eyre!("at least one EL client is required"))?;
        Ok(Self::new(primary, clients.collect()))
    }

    /// Builds an HTTP client per configured engine, in configuration order.
    pub fn connect(configs: &[ElClientConfig], breaker: &BreakerConfig) -> eyre::Result<Self> {
        let clients = configs
            .iter()
            .map(|config| {
                EngineApiClient::from_config(config, breaker)
                    .map(|client| Arc::new(client) as Arc<dyn EngineApi>)
            })
            .collect::<eyre::Result<Vec<_>>>()?;
        Self::from_clients(clients)
    }

    pub fn primary(&self) -> &Arc<dyn EngineApi> {
        &self.primary
    }

    pub fn followers(&self) -> &[Arc<dyn EngineApi>] {
        &self.followers
    }

    async fn relay<T, F, Fut>(&self, method: &'static str, call: F) -> eyre::Result<T>
    where
        F: Fn(Arc<dyn EngineApi>) -> Fut + Send + Sync,
        Fut: Future<Output = eyre::Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let mut followers = JoinSet::new();
        for el in &self.followers {
            let name = el.name().to_string();
            let fut = call(el.clone());
            followers.spawn(async move {
                if let Err(e) = fut.await {
                    log_failure(&name, method, &e);
                }
            });
        }

        let result = call(self.primary.clone()).await;
        if let Err(e) = &result {
            log_failure(self.primary.name(), method, e);
        }

        while let Some(joined) = followers.join_next().await {
            if let Err(e) = joined {
                warn!(method, err = %e, "Follower task did not complete");
            }
        }

        result
    }
}

fn log_failure(el: &str, method: &str, err: &eyre::Report) {
    if classify(err).is_some_and(ExecutionError::is_paused) {
        debug!(el, method, err = %err, "Skipped call to paused client");
    } else {
        warn!(el, method, err = %err, "Engine call failed");
    }
}

#[async_trait]
impl EngineApi for Multiplexer {
    fn name(&self) -> &str {
        "multiplexer"
    }

    async fn forkchoice_updated(
        &self,
        state: ForkchoiceState,
        payload_attributes: Option<PayloadAttributes>,
    ) -> eyre::Result<ForkchoiceUpdated> {
        self.relay(ENGINE_FORKCHOICE_UPDATED_V1, |el| {
            let payload_attributes = payload_attributes.clone();
            async move { el.forkchoice_updated(state, payload_attributes).await }
        })
        .await
    }

    async fn new_payload(
        &self,
        payload: ExecutionPayloadV3,
        versioned_hashes: Vec<B256>,
        parent_beacon_block_root: B256,
    ) -> eyre::Result<PayloadStatus> {
        self.relay(ENGINE_NEW_PAYLOAD_V3, |el| {
            let payload = payload.clone();
            let versioned_hashes = versioned_hashes.clone();
            async move { el.new_payload(payload, versioned_hashes, parent_beacon_block_root).await }
        })
        .await
    }

    async fn exchange_transition_configuration(
        &self,
        config: TransitionConfiguration,
    ) -> eyre::Result<TransitionConfiguration> {
        self.relay(ENGINE_EXCHANGE_TRANSITION_CONFIGURATION_V1, |el| {
            let config = config.clone();
            async move { el.exchange_transition_configuration(config).await }
        })
        .await
    }

    async fn get_payload(&self, _payload_id: PayloadId) -> eyre::Result<ExecutionPayloadV3> {
        Err(ExecutionError::MethodNotSupported(ENGINE_GET_PAYLOAD_V1).into())
    }
}
