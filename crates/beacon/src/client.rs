use std::time::Duration;

use alloy_rpc_types_engine::ExecutionPayloadV3;
use async_trait::async_trait;
use color_eyre::eyre::{self, eyre};
use elrelay_types::{aliases::B256, decode_block_response};
use reqwest::{
    Client,
    header::{HeaderMap, HeaderName, HeaderValue},
};
use tracing::trace;
use url::Url;

use crate::{BlockId, ClClientConfig};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Read access to consensus layer blocks.
///
/// Every method returns the block's execution payload together with its parent
/// beacon block root.
#[async_trait]
pub trait BeaconApi: Send + Sync {
    /// Label used in logs.
    fn name(&self) -> &str;

    async fn get_block(&self, id: BlockId) -> eyre::Result<(ExecutionPayloadV3, B256)>;

    async fn get_head_block(&self) -> eyre::Result<(ExecutionPayloadV3, B256)> {
        self.get_block(BlockId::Head).await
    }

    async fn get_finalized_block(&self) -> eyre::Result<(ExecutionPayloadV3, B256)> {
        self.get_block(BlockId::Finalized).await
    }
}

/// Beacon REST API client.
///
/// Transport failures, non-2xx answers and undecodable bodies all surface as a
/// plain error; callers retry them alike.
#[derive(Debug, Clone)]
pub struct BeaconClient {
    name: String,
    address: Url,
    client: Client,
}

impl BeaconClient {
    pub fn new(config: &ClClientConfig) -> eyre::Result<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| eyre!("invalid header name {name:?}: {e}"))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| eyre!("invalid value for header {name}: {e}"))?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| eyre!("failed to build HTTP client: {e}"))?;

        Ok(Self { name: config.name.clone(), address: config.address.clone(), client })
    }

    fn block_url(&self, id: BlockId) -> eyre::Result<Url> {
        let base = self.address.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}/eth/v2/beacon/blocks/{id}"))
            .map_err(|e| eyre!("invalid block URL for {id}: {e}"))
    }
}

#[async_trait]
impl BeaconApi for BeaconClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_block(&self, id: BlockId) -> eyre::Result<(ExecutionPayloadV3, B256)> {
        let url = self.block_url(id)?;
        trace!(cl = %self.name, %url, "Fetching block");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| eyre!("failed to fetch {id} block: {e}"))?;
        let body =
            response.bytes().await.map_err(|e| eyre!("failed to read {id} block: {e}"))?;

        let (payload, parent_root) =
            decode_block_response(&body).map_err(|e| eyre!("failed to decode {id} block: {e}"))?;
        Ok((payload, parent_root))
    }
}
