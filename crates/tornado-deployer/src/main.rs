use std::{env, io};

use anyhow::{anyhow, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{
    artifacts::ContractArtifacts,
    config::{resolve_config, Cli},
    sequencer::Sequencer,
    store::AddressStore,
};

mod artifacts;
mod chain;
mod config;
mod contracts;
mod sequencer;
mod store;

fn init_logging() -> Result<()> {
    const LOG_CONFIGURATION_ENVVAR: &str = "RUST_LOG";

    let filter = EnvFilter::new(
        env::var(LOG_CONFIGURATION_ENVVAR)
            .as_deref()
            .unwrap_or("info"),
    );

    tracing_subscriber::fmt()
        .with_writer(io::stdout)
        .with_target(true)
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| anyhow!(err))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging()?;

    let config = resolve_config(cli)?;
    info!("Deploying to network `{}`", config.network);
    if !config.reset {
        info!("Use --reset or remove entries from the address store to force a new deployment");
    }

    let artifacts = ContractArtifacts::load(&config.artifacts_dir)?;
    let chain = chain::connect(&config.node_rpc_url, config.signer()?).await?;
    let mut store = AddressStore::load(&config.store_path)?;

    Sequencer::new(&chain, &config, &mut store)
        .run(&artifacts)
        .await
}
