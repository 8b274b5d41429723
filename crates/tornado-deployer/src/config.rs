use std::{env, path::PathBuf, str::FromStr};

use alloy_signer_local::PrivateKeySigner;
use anyhow::{anyhow, Result};
use clap::Parser;

pub const NETWORK_ENV: &str = "TRON_NETWORK";
pub const MAINNET_SIGNING_KEY_ENV: &str = "DEPLOY_PRIVATE_KEY_MAINNET";
pub const SIGNING_KEY_ENV: &str = "PRIVATE_KEY";
pub const NODE_RPC_URL_ENV: &str = "NODE_RPC_URL";
pub const ETH_AMOUNT_ENV: &str = "ETH_AMOUNT";
pub const TOKEN_AMOUNT_ENV: &str = "TOKEN_AMOUNT";
pub const MERKLE_TREE_HEIGHT_ENV: &str = "MERKLE_TREE_HEIGHT";
pub const ERC20_TOKEN_ENV: &str = "ERC20_TOKEN";
pub const ADDRESS_STORE_PATH_ENV: &str = "ADDRESS_STORE_PATH";
pub const ARTIFACTS_DIR_ENV: &str = "CONTRACT_ARTIFACTS_DIR";

pub const DEFAULT_NETWORK: &str = "mainnet";
pub const DEFAULT_ADDRESS_STORE_PATH: &str = "addresses.json";
pub const DEFAULT_ARTIFACTS_DIR: &str = "build/contracts";

/// Command line surface. Everything else is configured through the
/// environment.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Parser)]
#[command(about = "Deploy the Tornado privacy-pool contract suite")]
pub struct Cli {
    /// Redeploy every contract, ignoring addresses already recorded in the
    /// store. The store file itself is not cleared; fresh addresses overwrite
    /// the old ones as the run progresses.
    #[clap(long)]
    pub reset: bool,
}

/// Immutable per-run configuration, resolved once from the CLI and the
/// environment.
///
/// The pool parameters stay unparsed: a step that is skipped must not require
/// its environment variables to be present.
#[derive(Clone)]
pub struct RunConfig {
    pub network: String,
    pub reset: bool,
    pub node_rpc_url: String,
    pub store_path: PathBuf,
    pub artifacts_dir: PathBuf,
    pub signing_key: String,
    pub eth_amount: Option<String>,
    pub token_amount: Option<String>,
    pub merkle_tree_height: Option<String>,
    pub erc20_token: Option<String>,
}

impl RunConfig {
    pub fn signer(&self) -> Result<PrivateKeySigner> {
        PrivateKeySigner::from_str(&self.signing_key)
            .map_err(|e| anyhow!("Invalid signing key: {e}"))
    }
}

pub fn resolve_config(cli: Cli) -> Result<RunConfig> {
    let network = env_opt(NETWORK_ENV).unwrap_or_else(|| DEFAULT_NETWORK.to_string());

    let signing_key_env = if network == DEFAULT_NETWORK {
        MAINNET_SIGNING_KEY_ENV
    } else {
        SIGNING_KEY_ENV
    };
    let signing_key = env_opt(signing_key_env).ok_or_else(|| {
        anyhow!("Missing signing key: set `{signing_key_env}` for network `{network}`")
    })?;

    let node_rpc_url = env_opt(NODE_RPC_URL_ENV).unwrap_or_else(|| default_rpc_url(&network));

    let store_path = parsing::parse_path(
        &env_opt(ADDRESS_STORE_PATH_ENV)
            .unwrap_or_else(|| DEFAULT_ADDRESS_STORE_PATH.to_string()),
    )?;
    let artifacts_dir = parsing::parse_path(
        &env_opt(ARTIFACTS_DIR_ENV).unwrap_or_else(|| DEFAULT_ARTIFACTS_DIR.to_string()),
    )?;

    Ok(RunConfig {
        network,
        reset: cli.reset,
        node_rpc_url,
        store_path,
        artifacts_dir,
        signing_key,
        eth_amount: env_opt(ETH_AMOUNT_ENV),
        token_amount: env_opt(TOKEN_AMOUNT_ENV),
        merkle_tree_height: env_opt(MERKLE_TREE_HEIGHT_ENV),
        erc20_token: env_opt(ERC20_TOKEN_ENV),
    })
}

/// The JSON-RPC endpoint of the network's public gateway. Mainnet is served
/// from the bare domain; test networks (e.g. `shasta`) from their own
/// subdomain.
fn default_rpc_url(network: &str) -> String {
    match network {
        "mainnet" => "https://api.trongrid.io/jsonrpc".to_string(),
        testnet => format!("https://api.{testnet}.trongrid.io/jsonrpc"),
    }
}

fn env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}

mod parsing {
    use std::{path::PathBuf, str::FromStr};

    use anyhow::{anyhow, Result};

    pub fn parse_path(path: &str) -> Result<PathBuf> {
        let expanded_path =
            shellexpand::full(path).map_err(|e| anyhow!("Failed to expand path: {e:?}"))?;
        PathBuf::from_str(expanded_path.as_ref())
            .map_err(|e| anyhow!("Failed to interpret path: {e:?}"))
    }
}
