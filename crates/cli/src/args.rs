//! Command line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::{
    cmd::start::StartCmd,
    config::{LogFormat, LogLevel},
};

const DEFAULT_CONFIG_FILE: &str = "elrelay.toml";

#[derive(Parser, Clone, Debug, PartialEq)]
#[command(version, about = "Relays consensus layer heads to execution engines")]
pub struct Args {
    /// Configuration file
    #[arg(long, global = true, env = "ELRELAY_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Log level, overrides the configuration file (default: `info`)
    #[arg(long, global = true)]
    pub log_level: Option<LogLevel>,

    /// Log format, overrides the configuration file (default: `plaintext`)
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Clone, Debug, PartialEq)]
pub enum Commands {
    /// Start the relay (default)
    Start(StartCmd),
}

impl Args {
    pub fn new() -> Args {
        Args::parse()
    }

    /// The command to run. Without one the relay starts.
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or_else(|| Commands::Start(StartCmd::default()))
    }
}
