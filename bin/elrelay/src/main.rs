#![allow(missing_docs)]
//! elrelay: keeps execution engines following a consensus layer node.

use color_eyre::eyre::{Result, eyre};
use elrelay_cli::{
    args::{Args, Commands},
    cmd::start::StartCmd,
    config, logging, runtime,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, trace};

/// Main entry point for the application
///
/// This function:
/// - Parses command-line arguments
/// - Loads configuration from file
/// - Initializes logging system
/// - Runs the relay until SIGINT or SIGTERM
fn main() -> Result<()> {
    color_eyre::install()?;

    // Also forward panics to tracing so they show up alongside relay logs.
    install_tracing_panic_hook();

    let args = Args::new();

    let mut config = config::load_config(&args.config)
        .map_err(|error| eyre!("Failed to load configuration file: {error}"))?;

    // Command-line parameters override the file's logging section.
    if let Some(log_level) = args.log_level {
        config.logging.log_level = log_level;
    }
    if let Some(log_format) = args.log_format {
        config.logging.log_format = log_format;
    }

    // This is a drop guard responsible for flushing any remaining logs when the program terminates.
    // It must be assigned to a binding that is not _, as _ will result in the guard being dropped
    // immediately.
    let _guard = logging::init(config.logging.log_level, config.logging.log_format);

    trace!("Command-line parameters: {args:?}");
    info!(file = %args.config.display(), "Loaded configuration");

    match args.command() {
        Commands::Start(cmd) => start(&cmd, config),
    }
}

fn install_tracing_panic_hook() {
    use std::panic;

    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());

        let msg: &str = if let Some(s) = info.payload().downcast_ref::<&str>() {
            s
        } else if let Some(s) = info.payload().downcast_ref::<String>() {
            s.as_str()
        } else {
            "panic"
        };

        tracing::error!(target = "panic", %location, message = %msg, "panic occurred");

        default_hook(info);
    }));
}

fn start(cmd: &StartCmd, config: config::Config) -> Result<()> {
    let rt = runtime::build_runtime(config.runtime)?;

    rt.block_on(async {
        let shutdown = CancellationToken::new();
        tokio::spawn(cancel_on_signal(shutdown.clone()));
        cmd.run(config, shutdown).await
    })
    .map_err(|error| eyre!("Failed to run the relay: {error}"))
}

/// Cancels `shutdown` on SIGINT or SIGTERM (Ctrl+C only on non-unix targets).
async fn cancel_on_signal(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        info!("Received SIGINT (Ctrl+C), initiating graceful shutdown...");
                    }
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, initiating graceful shutdown...");
                    }
                }
            }
            Err(e) => {
                tracing::warn!(err = %e, "Failed to register SIGTERM handler, using Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
                info!("Received SIGINT (Ctrl+C), initiating graceful shutdown...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received Ctrl+C, initiating graceful shutdown...");
    }
    shutdown.cancel();
}
