//! Consensus layer polling.

use std::{future::Future, sync::Arc, time::Duration};

use alloy_rpc_types_engine::ExecutionPayloadV3;
use color_eyre::eyre;
use elrelay_beacon::{BeaconApi, BlockId};
use elrelay_types::{BlockUpdate, aliases::B256};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Last block number seen for one block id, and where its updates go.
struct Tracked {
    id: BlockId,
    last_number: u64,
    tx: mpsc::Sender<BlockUpdate>,
}

impl Tracked {
    fn new(id: BlockId, tx: mpsc::Sender<BlockUpdate>) -> Self {
        Self { id, last_number: 0, tx }
    }

    /// Publishes the block if its number differs from the last one seen.
    ///
    /// The send never waits: with the channel full the update is dropped, and a
    /// later poll delivers whatever is current by then.
    fn observe(&mut self, payload: ExecutionPayloadV3, parent_root: B256) {
        let number = payload.payload_inner.payload_inner.block_number;
        if number == 0 || number == self.last_number {
            return;
        }
        self.last_number = number;

        let update = match BlockUpdate::new(payload, parent_root) {
            Ok(update) => update,
            Err(e) => {
                error!(block = %self.id, number, err = %e, "Failed to decode block");
                return;
            }
        };

        let hash = update.block_hash();
        match self.tx.try_send(update) {
            Ok(()) => debug!(block = %self.id, number, %hash, "New block"),
            Err(TrySendError::Full(_)) => {
                debug!(block = %self.id, number, "Channel full, dropping update")
            }
            Err(TrySendError::Closed(_)) => {
                debug!(block = %self.id, number, "Channel closed, dropping update")
            }
        }
    }
}

pub(crate) struct FetchWorker {
    beacon: Arc<dyn BeaconApi>,
    head: Tracked,
    finalized: Tracked,
    poll_interval: Duration,
    retry_interval: Duration,
}

impl FetchWorker {
    pub(crate) fn new(
        beacon: Arc<dyn BeaconApi>,
        head_tx: mpsc::Sender<BlockUpdate>,
        finalized_tx: mpsc::Sender<BlockUpdate>,
        poll_interval: Duration,
        retry_interval: Duration,
    ) -> Self {
        Self {
            beacon,
            head: Tracked::new(BlockId::Head, head_tx),
            finalized: Tracked::new(BlockId::Finalized, finalized_tx),
            poll_interval,
            retry_interval,
        }
    }

    /// Polls finalized then head, once per cycle, until `shutdown` fires.
    pub(crate) async fn run(mut self, shutdown: CancellationToken) {
        info!(cl = %self.beacon.name(), interval = ?self.poll_interval, "Fetch loop started");

        loop {
            let Some(finalized) = until_cancelled(&shutdown, self.fetch(BlockId::Finalized)).await
            else {
                break;
            };
            match finalized {
                Ok((payload, root)) => self.finalized.observe(payload, root),
                Err(_) => {
                    if !sleep_or_stop(self.retry_interval, &shutdown).await {
                        break;
                    }
                }
            }

            let Some(head) = until_cancelled(&shutdown, self.fetch(BlockId::Head)).await else {
                break;
            };
            let wait = match head {
                Ok((payload, root)) => {
                    self.head.observe(payload, root);
                    self.poll_interval
                }
                Err(_) => self.retry_interval,
            };

            if !sleep_or_stop(wait, &shutdown).await {
                break;
            }
        }

        info!("Fetch loop stopped");
    }

    async fn fetch(&self, id: BlockId) -> eyre::Result<(ExecutionPayloadV3, B256)> {
        let result = self.beacon.get_block(id).await;
        if let Err(e) = &result {
            error!(cl = %self.beacon.name(), block = %id, err = %e, "Failed to fetch block");
        }
        result
    }
}

async fn until_cancelled<T>(
    shutdown: &CancellationToken,
    fut: impl Future<Output = T>,
) -> Option<T> {
    tokio::select! {
        biased;
        _ = shutdown.cancelled() => None,
        value = fut => Some(value),
    }
}

/// Returns `false` if `shutdown` fired before `duration` elapsed.
async fn sleep_or_stop(duration: Duration, shutdown: &CancellationToken) -> bool {
    tokio::select! {
        _ = shutdown.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}
