#![allow(missing_docs)]
use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use alloy_rpc_types_engine::{
    ExecutionPayloadV3, ForkchoiceState, ForkchoiceUpdated, PayloadAttributes, PayloadId,
    PayloadStatus, TransitionConfiguration,
};
use async_trait::async_trait;
use color_eyre::eyre;
use elrelay_types::aliases::B256;
use serde::{Serialize, de::DeserializeOwned};
use tracing::warn;

use super::{EngineApi, methods::*};
use crate::{
    ExecutionError,
    breaker::{BreakerState, CircuitBreaker},
    config::{BreakerConfig, ElClientConfig},
    transport::{JsonRpcRequest, Transport, http::HttpTransport},
};

/// Engine API client for a single execution engine.
///
/// Every call passes through the engine's circuit breaker and runs under a fixed
/// deadline. Failures of any kind (transport, JSON-RPC error, undecodable result,
/// timeout) count towards pausing the engine; a success clears the count.
pub struct EngineApiClient {
    name: String,
    transport: Arc<dyn Transport>,
    breaker: CircuitBreaker,
    call_timeout: Duration,
    next_id: AtomicU64,
}

impl EngineApiClient {
    pub fn new(
        name: impl Into<String>,
        transport: Arc<dyn Transport>,
        breaker: CircuitBreaker,
        call_timeout: Duration,
    ) -> Self {
        Self { name: name.into(), transport, breaker, call_timeout, next_id: AtomicU64::new(1) }
    }

    /// Builds an HTTP client for the configured engine.
    pub fn from_config(config: &ElClientConfig, breaker: &BreakerConfig) -> eyre::Result<Self> {
        let mut transport =
            HttpTransport::new(config.address.clone())?.with_headers(&config.headers)?;
        match config.resolve_jwt_secret()? {
            Some(secret) => transport = transport.with_jwt(secret),
            None => warn!(el = %config.name, "Using empty jwt-secret"),
        }

        Ok(Self::new(
            config.name.clone(),
            Arc::new(transport),
            CircuitBreaker::from(breaker),
            breaker.call_timeout(),
        ))
    }

    pub fn breaker_state(&self) -> BreakerState {
        self.breaker.state()
    }

    async fn request<P, R>(&self, method: &'static str, params: P) -> eyre::Result<R>
    where
        P: Serialize + Send,
        R: DeserializeOwned + Send,
    {
        self.breaker.admit(&self.name)?;

        let result = match tokio::time::timeout(self.call_timeout, self.call(method, params)).await
        {
            Ok(result) => result,
            Err(_) => Err(ExecutionError::Timeout { method, timeout: self.call_timeout }.into()),
        };

        match &result {
            Ok(_) => self.breaker.record_success(),
            Err(_) => self.breaker.record_failure(),
        }
        result
    }

    async fn call<P, R>(&self, method: &'static str, params: P) -> eyre::Result<R>
    where
        P: Serialize + Send,
        R: DeserializeOwned + Send,
    {
        let params = serde_json::to_value(params)
            .map_err(|e| ExecutionError::Serialization(e.to_string()))?;
        let req = JsonRpcRequest::new(method, params, self.next_id.fetch_add(1, Ordering::Relaxed));

        let resp = self.transport.send(&req).await?;

        if let Some(err) = resp.error {
            return Err(ExecutionError::JsonRpc { code: err.code, message: err.message }.into());
        }

        let res = resp.result.ok_or_else(|| {
            ExecutionError::InvalidResponse("Missing result field in JSON-RPC response".into())
        })?;

        serde_json::from_value(res)
            .map_err(|e| ExecutionError::InvalidResponse(format!("{method}: {e}")).into())
    }
}

impl fmt::Debug for EngineApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineApiClient")
            .field("name", &self.name)
            .field("transport", &"<dyn Transport>")
            .field("breaker", &self.breaker)
            .finish()
    }
}

#[async_trait]
impl EngineApi for EngineApiClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn forkchoice_updated(
        &self,
        state: ForkchoiceState,
        payload_attributes: Option<PayloadAttributes>,
    ) -> eyre::Result<ForkchoiceUpdated> {
        self.request(ENGINE_FORKCHOICE_UPDATED_V1, (state, payload_attributes)).await
    }

    async fn new_payload(
        &self,
        payload: ExecutionPayloadV3,
        versioned_hashes: Vec<B256>,
        parent_beacon_block_root: B256,
    ) -> eyre::Result<PayloadStatus> {
        self.request(ENGINE_NEW_PAYLOAD_V3, (payload, versioned_hashes, parent_beacon_block_root))
            .await
    }

    async fn exchange_transition_configuration(
        &self,
        config: TransitionConfiguration,
    ) -> eyre::Result<TransitionConfiguration> {
        self.request(ENGINE_EXCHANGE_TRANSITION_CONFIGURATION_V1, (config,)).await
    }

    async fn get_payload(&self, _payload_id: PayloadId) -> eyre::Result<ExecutionPayloadV3> {
        Err(ExecutionError::MethodNotSupported(ENGINE_GET_PAYLOAD_V1).into())
    }
}
