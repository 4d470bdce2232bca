//! CLI arguments for the `gbm-engine` binary.

use {
    clap::{Parser, Subcommand},
    std::path::PathBuf,
};

/// Run the GBM auction settlement engine
#[derive(Parser, Debug)]
#[command(version)]
pub struct Args {
    /// The log filter.
    #[arg(long, env, default_value = "warn,gbm_engine=debug")]
    pub log: String,

    /// Whether to emit logs as JSON.
    #[arg(long, env, default_value = "false")]
    pub use_json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replays a script of auction operations against an in-memory ledger.
    Simulate {
        /// Path to the engine configuration file. This file should be in TOML
        /// format.
        #[clap(long, env)]
        config: PathBuf,
        /// Path to the JSON script of steps to replay.
        #[clap(long, env)]
        script: PathBuf,
    },
    /// Loads and applies a configuration file without running anything.
    Validate {
        /// Path to the engine configuration file. This file should be in TOML
        /// format.
        #[clap(long, env)]
        config: PathBuf,
    },
}
