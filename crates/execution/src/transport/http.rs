// crates/execution/src/transport/http.rs
#![allow(missing_docs)]

use std::collections::BTreeMap;

use async_trait::async_trait;
use color_eyre::eyre;
use reqwest::{
    Client,
    header::{HeaderMap, HeaderName, HeaderValue},
};
use url::Url;

use super::{JsonRpcRequest, JsonRpcResponse, Transport};
use crate::{ExecutionError, engine_api::jwt::JwtProvider};

/// JSON-RPC over HTTP, optionally authenticated with an engine API JWT.
///
/// Deadlines are enforced by the caller; the transport itself does not time out.
pub struct HttpTransport {
    client: Client,
    url: Url,
    headers: HeaderMap,
    jwt_provider: Option<JwtProvider>,
}

impl HttpTransport {
    pub fn new(url: Url) -> eyre::Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| ExecutionError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, url, headers: HeaderMap::new(), jwt_provider: None })
    }

    pub fn with_jwt(mut self, secret: [u8; 32]) -> Self {
        self.jwt_provider = Some(JwtProvider::new(secret));
        self
    }

    /// Attaches custom headers sent with every request.
    pub fn with_headers(mut self, headers: &BTreeMap<String, String>) -> eyre::Result<Self> {
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| eyre::eyre!("invalid header name {name:?}: {e}"))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| eyre::eyre!("invalid value for header {name}: {e}"))?;
            self.headers.insert(name, value);
        }
        Ok(self)
    }

    pub fn is_authenticated(&self) -> bool {
        self.jwt_provider.is_some()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &JsonRpcRequest) -> eyre::Result<JsonRpcResponse> {
        let mut req_builder =
            self.client.post(self.url.clone()).headers(self.headers.clone()).json(request);

        if let Some(provider) = &self.jwt_provider {
            let token = provider.get_token().await?;
            req_builder = req_builder.bearer_auth(token);
        }

        let response = req_builder
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| ExecutionError::Transport(e.to_string()))?;
        let response_bytes =
            response.bytes().await.map_err(|e| ExecutionError::Transport(e.to_string()))?;
        serde_json::from_slice(&response_bytes)
            .map_err(|e| ExecutionError::InvalidResponse(e.to_string()).into())
    }
}
