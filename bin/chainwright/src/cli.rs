use std::path::PathBuf;

use alloy_core::primitives::Address;
use clap::Parser;
use tracing::level_filters::LevelFilter;
use url::Url;

/// How transactions are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum BackendKind {
    /// Send transactions through the network's JSON-RPC endpoint.
    Rpc,
    /// Predict addresses locally without sending anything.
    DryRun,
}

#[derive(Parser)]
#[command(name = "chainwright")]
#[command(
    author,
    version,
    about = "Deploy and wire interdependent contracts in a fixed order"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "CHAINWRIGHT_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Path to the manifest file, or to a directory containing `Chainwright.toml`.
    #[arg(short, long, env = "CHAINWRIGHT_MANIFEST", default_value = ".")]
    pub manifest: PathBuf,

    /// Network to deploy to, as named in the manifest's `[networks]` table.
    #[arg(short, long, env = "CHAINWRIGHT_NETWORK")]
    pub network: String,

    /// Plan to run, as named in the manifest's `[plans]` table.
    #[arg(short, long, env = "CHAINWRIGHT_PLAN")]
    pub plan: String,

    /// Execution backend.
    #[arg(long, env = "CHAINWRIGHT_BACKEND", default_value_t = BackendKind::Rpc)]
    pub backend: BackendKind,

    /// Override the network's RPC endpoint.
    #[arg(long)]
    pub rpc_url: Option<Url>,

    /// Override the sender account.
    #[arg(long)]
    pub from: Option<Address>,

    /// Directory holding compiled contract artifacts.
    ///
    /// Defaults to ./artifacts
    #[arg(long)]
    pub artifacts: Option<PathBuf>,

    /// Directory the deployment record is written to.
    ///
    /// Defaults to ./deployments
    #[arg(long)]
    pub outdata: Option<PathBuf>,

    /// Seconds to wait for a transaction to be mined before failing the step.
    #[arg(long)]
    pub receipt_timeout: Option<u64>,
}
