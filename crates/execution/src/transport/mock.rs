//! A mock transport for testing the Engine API client.

use std::{
    collections::{HashMap, VecDeque},
    future::pending,
};

use async_trait::async_trait;
use color_eyre::eyre::{self, eyre};
use serde_json::Value;
use tokio::sync::Mutex;

use super::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, Transport};
use crate::ExecutionError;

/// What the mock does with the next request for a method.
#[derive(Debug)]
pub(crate) enum MockReply {
    Result(Value),
    RpcError { code: i64, message: String },
    Failure(String),
    /// Never answers; lets tests hit the caller's deadline.
    Stall,
}

/// A mock transport programmed with a queue of replies per method.
///
/// Every request is recorded, including the ones that fail.
#[derive(Debug, Default)]
pub(crate) struct MockTransport {
    replies: Mutex<HashMap<String, VecDeque<MockReply>>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn push(&self, method: &str, reply: MockReply) {
        self.replies.lock().await.entry(method.to_string()).or_default().push_back(reply);
    }

    pub(crate) async fn push_many(
        &self,
        method: &str,
        count: usize,
        reply: impl Fn() -> MockReply,
    ) {
        for _ in 0..count {
            self.push(method, reply()).await;
        }
    }

    /// Methods and params of every request received so far.
    pub(crate) async fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &JsonRpcRequest) -> eyre::Result<JsonRpcResponse> {
        self.calls.lock().await.push((request.method.clone(), request.params.clone()));
        let reply =
            self.replies.lock().await.get_mut(&request.method).and_then(VecDeque::pop_front);

        let (result, error) = match reply {
            Some(MockReply::Result(result)) => (Some(result), None),
            Some(MockReply::RpcError { code, message }) => {
                (None, Some(JsonRpcError { code, message }))
            }
            Some(MockReply::Failure(message)) => {
                return Err(ExecutionError::Transport(message).into());
            }
            Some(MockReply::Stall) => pending().await,
            None => {
                let method = &request.method;
                return Err(eyre!("MockTransport: received unexpected call to method '{method}'"));
            }
        };

        Ok(JsonRpcResponse { jsonrpc: "2.0".to_string(), id: request.id, result, error })
    }
}
