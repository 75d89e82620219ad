//! A scripted [`BeaconApi`] for driving the relay's loops in tests.

use std::{
    collections::VecDeque,
    sync::{Mutex, PoisonError},
};

use alloy_rpc_types_engine::ExecutionPayloadV3;
use async_trait::async_trait;
use color_eyre::eyre::{self, eyre};
use elrelay_types::aliases::B256;

use crate::{BeaconApi, BlockId};

type Reply = Result<(ExecutionPayloadV3, B256), String>;

/// Replies queued for one block id. Once the queue runs dry the last reply
/// repeats, like a node whose head stopped moving.
#[derive(Debug, Default)]
struct Script {
    queue: VecDeque<Reply>,
    last: Option<Reply>,
}

impl Script {
    fn next(&mut self) -> Option<Reply> {
        if let Some(reply) = self.queue.pop_front() {
            self.last = Some(reply);
        }
        self.last.clone()
    }
}

#[derive(Debug, Default)]
pub struct ScriptedBeacon {
    head: Mutex<Script>,
    finalized: Mutex<Script>,
    requests: Mutex<Vec<BlockId>>,
}

impl ScriptedBeacon {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_head(&self, payload: ExecutionPayloadV3, parent_root: B256) {
        lock(&self.head).queue.push_back(Ok((payload, parent_root)));
    }

    pub fn push_head_error(&self, message: &str) {
        lock(&self.head).queue.push_back(Err(message.to_string()));
    }

    pub fn push_finalized(&self, payload: ExecutionPayloadV3, parent_root: B256) {
        lock(&self.finalized).queue.push_back(Ok((payload, parent_root)));
    }

    pub fn push_finalized_error(&self, message: &str) {
        lock(&self.finalized).queue.push_back(Err(message.to_string()));
    }

    /// Every block id asked for so far, in order.
    pub fn requests(&self) -> Vec<BlockId> {
        lock(&self.requests).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl BeaconApi for ScriptedBeacon {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn get_block(&self, id: BlockId) -> eyre::Result<(ExecutionPayloadV3, B256)> {
        lock(&self.requests).push(id);
        let reply = match id {
            BlockId::Head => lock(&self.head).next(),
            BlockId::Finalized => lock(&self.finalized).next(),
            BlockId::Slot(_) => None,
        };
        match reply {
            Some(Ok(block)) => Ok(block),
            Some(Err(message)) => Err(eyre!(message)),
            None => Err(eyre!("no {id} block")),
        }
    }
}
