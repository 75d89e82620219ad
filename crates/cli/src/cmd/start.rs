use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre;
use elrelay_beacon::BeaconClient;
use elrelay_execution::Multiplexer;
use elrelay_node::Fetcher;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Config;

#[derive(Parser, Debug, Clone, Default, PartialEq)]
pub struct StartCmd {
    /// Override the interval between two polls of the consensus layer, in seconds
    #[clap(long)]
    pub poll_interval_secs: Option<u64>,
}

impl StartCmd {
    /// Runs the relay until `shutdown` is cancelled.
    pub async fn run(&self, mut config: Config, shutdown: CancellationToken) -> eyre::Result<()> {
        if let Some(secs) = self.poll_interval_secs {
            config.relay.poll_interval_secs = secs.max(1);
        }

        let beacon = BeaconClient::new(&config.cl_client)?;
        let engines = Multiplexer::connect(&config.el_clients, &config.breaker)?;
        info!(
            cl = %config.cl_client.name,
            primary = %engines.primary().name(),
            followers = engines.followers().len(),
            "Relay is starting..."
        );

        let handle = Fetcher::new(Arc::new(beacon), Arc::new(engines), config.relay).start();

        shutdown.cancelled().await;
        handle.stop().await?;
        info!("Relay has stopped");
        Ok(())
    }
}
