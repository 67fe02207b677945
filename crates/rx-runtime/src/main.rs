//! rx-ledger entry point.

use anyhow::Context;
use clap::Parser;
use rx_runtime::cli::{execute, Args};
use rx_runtime::{init_tracing, LedgerContainer, RuntimeConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = RuntimeConfig::from_env().context("Invalid configuration")?;
    args.apply(&mut config);

    init_tracing(&config.log_level, config.log_json)?;
    tracing::debug!(?config, "[rx-runtime] Configuration loaded");

    let container = LedgerContainer::open(config).await?;

    let mut stdout = std::io::stdout().lock();
    execute(&container, args.command, args.json, &mut stdout).await
}
