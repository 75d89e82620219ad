use std::sync::Arc;

use color_eyre::eyre;
use elrelay_beacon::BeaconApi;
use elrelay_execution::EngineApi;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{RelayConfig, deliver::DeliverWorker, fetch::FetchWorker};

/// Wires a consensus layer source to an engine sink.
pub struct Fetcher {
    beacon: Arc<dyn BeaconApi>,
    engine: Arc<dyn EngineApi>,
    config: RelayConfig,
}

impl Fetcher {
    pub fn new(
        beacon: Arc<dyn BeaconApi>,
        engine: Arc<dyn EngineApi>,
        config: RelayConfig,
    ) -> Self {
        Self { beacon, engine, config }
    }

    /// Spawns the fetch and deliver loops on the current runtime.
    pub fn start(self) -> FetcherHandle {
        let capacity = self.config.channel_capacity.max(1);
        let (head_tx, head_rx) = mpsc::channel(capacity);
        let (finalized_tx, finalized_rx) = mpsc::channel(capacity);
        let shutdown = CancellationToken::new();

        let fetch = FetchWorker::new(
            self.beacon,
            head_tx,
            finalized_tx,
            self.config.poll_interval(),
            self.config.retry_interval(),
        );
        let deliver = DeliverWorker::new(self.engine, head_rx, finalized_rx);

        FetcherHandle {
            fetch: tokio::spawn(fetch.run(shutdown.clone())),
            deliver: tokio::spawn(deliver.run(shutdown.clone())),
            shutdown,
        }
    }
}

/// Running relay loops.
pub struct FetcherHandle {
    fetch: JoinHandle<()>,
    deliver: JoinHandle<()>,
    shutdown: CancellationToken,
}

impl FetcherHandle {
    /// Cancelling this token stops both loops.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Signals both loops to stop and waits until they have exited.
    pub async fn stop(self) -> eyre::Result<()> {
        self.shutdown.cancel();
        self.join().await
    }

    /// Waits for both loops to exit, which they only do once stopped.
    pub async fn join(self) -> eyre::Result<()> {
        let (fetch, deliver) = tokio::join!(self.fetch, self.deliver);
        fetch?;
        deliver?;
        info!("Relay stopped");
        Ok(())
    }
}
