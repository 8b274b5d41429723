//! The deployment sequencer: five create-or-reuse steps in a fixed order,
//! with the address store checkpointed to disk after every step so an
//! interrupted run resumes from the first incomplete step.

use std::str::FromStr;

use alloy_primitives::{Address, U256};
use anyhow::{anyhow, Context, Result};
use tracing::{debug, info};

use crate::{
    artifacts::ContractArtifacts,
    chain::Chain,
    config::{RunConfig, ERC20_TOKEN_ENV, ETH_AMOUNT_ENV, MERKLE_TREE_HEIGHT_ENV, TOKEN_AMOUNT_ENV},
    contracts::{self, initial_mint_amount, MINT_RECIPIENT},
    store::{AddressStore, ContractKey},
};

/// How a step completed: with the address already recorded in the store, or
/// with a fresh deployment.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum StepOutcome {
    Reused(Address),
    Deployed(Address),
}

impl StepOutcome {
    pub fn address(self) -> Address {
        match self {
            StepOutcome::Reused(address) | StepOutcome::Deployed(address) => address,
        }
    }
}

/// Drives the ordered deployment sequence against `chain`, recording progress
/// in `store`.
pub struct Sequencer<'a, C: Chain> {
    chain: &'a C,
    config: &'a RunConfig,
    store: &'a mut AddressStore,
}

impl<'a, C: Chain> Sequencer<'a, C> {
    pub fn new(chain: &'a C, config: &'a RunConfig, store: &'a mut AddressStore) -> Self {
        store.ensure_network(&config.network);
        Self {
            chain,
            config,
            store,
        }
    }

    /// Run all five steps in order. Any failure aborts the run immediately;
    /// steps completed so far are already persisted.
    pub async fn run(&mut self, artifacts: &ContractArtifacts) -> Result<()> {
        let usdt = self
            .create_or_reuse(ContractKey::Usdt, || {
                Ok(contracts::erc20_mock_init_code(&artifacts.erc20_mock))
            })
            .await?;
        if let StepOutcome::Deployed(token) = usdt {
            self.mint_test_tokens(token).await?;
        }
        self.checkpoint()?;

        let hasher = self
            .create_or_reuse(ContractKey::Hasher, || Ok(artifacts.hasher.bytecode.to_vec()))
            .await?;
        self.checkpoint()?;

        let verifier = self
            .create_or_reuse(ContractKey::Verifier, || {
                Ok(artifacts.verifier.bytecode.to_vec())
            })
            .await?;
        self.checkpoint()?;

        let config = self.config;
        self.create_or_reuse(ContractKey::EthTornado, || {
            Ok(contracts::eth_tornado_init_code(
                &artifacts.eth_tornado,
                verifier.address(),
                hasher.address(),
                parse_amount(&config.eth_amount, ETH_AMOUNT_ENV)?,
                parse_tree_height(&config.merkle_tree_height)?,
            ))
        })
        .await?;
        self.checkpoint()?;

        self.create_or_reuse(ContractKey::Erc20Tornado, || {
            Ok(contracts::erc20_tornado_init_code(
                &artifacts.erc20_tornado,
                verifier.address(),
                hasher.address(),
                parse_amount(&config.token_amount, TOKEN_AMOUNT_ENV)?,
                parse_tree_height(&config.merkle_tree_height)?,
                parse_token_address(&config.erc20_token)?,
            ))
        })
        .await?;
        self.checkpoint()
    }

    /// Skip the step if the store already has an address for `key` on the
    /// current network (unless resetting); otherwise deploy and record the
    /// fresh address.
    async fn create_or_reuse(
        &mut self,
        key: ContractKey,
        init_code: impl FnOnce() -> Result<Vec<u8>>,
    ) -> Result<StepOutcome> {
        let network = self.config.network.as_str();

        if !self.config.reset {
            if let Some(address) = self.store.network(network).and_then(|n| n.get(key)) {
                info!(
                    "{key} already deployed at {}, skipping. Use --reset to override.",
                    address.to_checksum(None)
                );
                return Ok(StepOutcome::Reused(address));
            }
        }

        let address = self
            .chain
            .deploy(init_code()?)
            .await
            .with_context(|| format!("Failed to deploy {key}"))?;
        info!("Deployed {key} at {}", address.to_checksum(None));

        self.store.network_mut(network).set(key, address);
        Ok(StepOutcome::Deployed(address))
    }

    async fn mint_test_tokens(&self, token: Address) -> Result<()> {
        let amount = initial_mint_amount();
        let tx_hash = self
            .chain
            .mint(token, MINT_RECIPIENT, amount)
            .await
            .context("Failed to mint usdt")?;
        info!("Minted {amount} base units of usdt to {MINT_RECIPIENT} in {tx_hash}");
        Ok(())
    }

    /// Persist the full store so that an interruption after this step does
    /// not redo the work already done.
    fn checkpoint(&self) -> Result<()> {
        debug!("Persisting address store to {:?}", self.config.store_path);
        self.store.save(&self.config.store_path)
    }
}

fn require<'v>(value: &'v Option<String>, env_name: &str) -> Result<&'v str> {
    value
        .as_deref()
        .ok_or_else(|| anyhow!("`{env_name}` is not set"))
}

fn parse_amount(value: &Option<String>, env_name: &str) -> Result<U256> {
    let raw = require(value, env_name)?;
    U256::from_str(raw).with_context(|| format!("Invalid `{env_name}`: {raw}"))
}

fn parse_tree_height(value: &Option<String>) -> Result<u32> {
    let raw = require(value, MERKLE_TREE_HEIGHT_ENV)?;
    raw.parse()
        .with_context(|| format!("Invalid `{MERKLE_TREE_HEIGHT_ENV}`: {raw}"))
}

fn parse_token_address(value: &Option<String>) -> Result<Address> {
    let raw = require(value, ERC20_TOKEN_ENV)?;
    Address::from_str(raw).with_context(|| format!("Invalid `{ERC20_TOKEN_ENV}`: {raw}"))
}

#[cfg(test)]
mod tests {
    use std::{path::PathBuf, sync::Mutex};

    use alloy_primitives::TxHash;
    use anyhow::bail;

    use super::*;
    use crate::artifacts::Artifact;

    #[derive(Default)]
    struct MockChain {
        deploys: Mutex<Vec<Vec<u8>>>,
        mints: Mutex<Vec<(Address, Address, U256)>>,
        // Zero-based index of the deploy call that should fail, if any.
        fail_on_deploy: Option<usize>,
    }

    impl Chain for MockChain {
        async fn deploy(&self, init_code: Vec<u8>) -> Result<Address> {
            let mut deploys = self.deploys.lock().unwrap();
            if self.fail_on_deploy == Some(deploys.len()) {
                bail!("deploy rejected by node");
            }
            deploys.push(init_code);
            Ok(Address::random())
        }

        async fn mint(&self, token: Address, to: Address, amount: U256) -> Result<TxHash> {
            self.mints.lock().unwrap().push((token, to, amount));
            Ok(TxHash::random())
        }
    }

    fn test_artifacts() -> ContractArtifacts {
        let artifact = |tag: u8| Artifact {
            bytecode: vec![0x60, tag].into(),
        };
        ContractArtifacts {
            erc20_mock: artifact(0),
            hasher: artifact(1),
            verifier: artifact(2),
            eth_tornado: artifact(3),
            erc20_tornado: artifact(4),
        }
    }

    fn test_config(network: &str, reset: bool, store_path: PathBuf, token: Address) -> RunConfig {
        RunConfig {
            network: network.into(),
            reset,
            node_rpc_url: "http://localhost:8545".into(),
            store_path,
            artifacts_dir: PathBuf::from("build/contracts"),
            signing_key: String::new(),
            eth_amount: Some("1000000".into()),
            token_amount: Some("50000000".into()),
            merkle_tree_height: Some("20".into()),
            erc20_token: Some(token.to_string()),
        }
    }

    fn temp_store_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "tornado-deployer-seq-{name}-{}.json",
            std::process::id()
        ))
    }

    #[tokio::test]
    async fn fresh_run_deploys_all_five_contracts() {
        let path = temp_store_path("fresh-run");
        let chain = MockChain::default();
        let config = test_config("shasta", false, path.clone(), Address::random());
        let artifacts = test_artifacts();
        let mut store = AddressStore::default();

        Sequencer::new(&chain, &config, &mut store)
            .run(&artifacts)
            .await
            .unwrap();

        assert_eq!(chain.deploys.lock().unwrap().len(), 5);
        let shasta = store.network("shasta").unwrap();
        for key in ContractKey::ALL {
            assert!(shasta.get(key).is_some(), "{key} not recorded");
        }
        assert!(shasta.exchanges.is_empty());

        // The fresh mock token got its test mint.
        let mints = chain.mints.lock().unwrap();
        assert_eq!(
            *mints,
            vec![(
                shasta.get(ContractKey::Usdt).unwrap(),
                MINT_RECIPIENT,
                U256::from(1_000_000)
            )]
        );

        // The store on disk matches the one in memory.
        assert_eq!(AddressStore::load(&path).unwrap(), store);
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn pools_use_addresses_deployed_earlier_in_the_same_run() {
        let path = temp_store_path("same-run-params");
        let chain = MockChain::default();
        let token = Address::random();
        let config = test_config("shasta", false, path.clone(), token);
        let artifacts = test_artifacts();
        let mut store = AddressStore::default();

        Sequencer::new(&chain, &config, &mut store)
            .run(&artifacts)
            .await
            .unwrap();

        let shasta = store.network("shasta").unwrap();
        let hasher = shasta.get(ContractKey::Hasher).unwrap();
        let verifier = shasta.get(ContractKey::Verifier).unwrap();

        let deploys = chain.deploys.lock().unwrap();
        assert_eq!(
            deploys[3],
            contracts::eth_tornado_init_code(
                &artifacts.eth_tornado,
                verifier,
                hasher,
                U256::from(1_000_000),
                20
            )
        );
        assert_eq!(
            deploys[4],
            contracts::erc20_tornado_init_code(
                &artifacts.erc20_tornado,
                verifier,
                hasher,
                U256::from(50_000_000),
                20,
                token
            )
        );
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn recorded_steps_are_skipped_and_their_addresses_reused() {
        let path = temp_store_path("skip-recorded");
        let chain = MockChain::default();
        let token = Address::random();
        let config = test_config("mainnet", false, path.clone(), token);
        let artifacts = test_artifacts();

        let hasher = Address::random();
        let verifier = Address::random();
        let mut store = AddressStore::default();
        store.network_mut("mainnet").set(ContractKey::Hasher, hasher);
        store
            .network_mut("mainnet")
            .set(ContractKey::Verifier, verifier);

        Sequencer::new(&chain, &config, &mut store)
            .run(&artifacts)
            .await
            .unwrap();

        // Only usdt and the two pools were deployed.
        let deploys = chain.deploys.lock().unwrap();
        assert_eq!(deploys.len(), 3);

        // The stored addresses survived untouched and fed the pool
        // constructors.
        let mainnet = store.network("mainnet").unwrap();
        assert_eq!(mainnet.get(ContractKey::Hasher), Some(hasher));
        assert_eq!(mainnet.get(ContractKey::Verifier), Some(verifier));
        assert_eq!(
            deploys[1],
            contracts::eth_tornado_init_code(
                &artifacts.eth_tornado,
                verifier,
                hasher,
                U256::from(1_000_000),
                20
            )
        );
        assert_eq!(
            deploys[2],
            contracts::erc20_tornado_init_code(
                &artifacts.erc20_tornado,
                verifier,
                hasher,
                U256::from(50_000_000),
                20,
                token
            )
        );
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn skipped_mock_token_is_not_minted() {
        let path = temp_store_path("skip-usdt");
        let chain = MockChain::default();
        let config = test_config("shasta", false, path.clone(), Address::random());
        let artifacts = test_artifacts();

        let usdt = Address::random();
        let mut store = AddressStore::default();
        store.network_mut("shasta").set(ContractKey::Usdt, usdt);

        Sequencer::new(&chain, &config, &mut store)
            .run(&artifacts)
            .await
            .unwrap();

        assert_eq!(chain.deploys.lock().unwrap().len(), 4);
        assert!(chain.mints.lock().unwrap().is_empty());
        assert_eq!(
            store.network("shasta").unwrap().get(ContractKey::Usdt),
            Some(usdt)
        );
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn reset_redeploys_everything() {
        let path = temp_store_path("reset");
        let chain = MockChain::default();
        let config = test_config("shasta", true, path.clone(), Address::random());
        let artifacts = test_artifacts();

        let mut store = AddressStore::default();
        let old: Vec<_> = ContractKey::ALL
            .into_iter()
            .map(|key| {
                let address = Address::random();
                store.network_mut("shasta").set(key, address);
                address
            })
            .collect();

        Sequencer::new(&chain, &config, &mut store)
            .run(&artifacts)
            .await
            .unwrap();

        assert_eq!(chain.deploys.lock().unwrap().len(), 5);
        let shasta = store.network("shasta").unwrap();
        for (key, old_address) in ContractKey::ALL.into_iter().zip(old) {
            assert_ne!(shasta.get(key), Some(old_address), "{key} not redeployed");
        }
        assert_eq!(AddressStore::load(&path).unwrap(), store);
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn failed_step_leaves_earlier_steps_checkpointed() {
        let path = temp_store_path("hasher-failure");
        // The hasher deployment is the second deploy call.
        let chain = MockChain {
            fail_on_deploy: Some(1),
            ..Default::default()
        };
        let config = test_config("shasta", false, path.clone(), Address::random());
        let artifacts = test_artifacts();
        let mut store = AddressStore::default();

        let result = Sequencer::new(&chain, &config, &mut store)
            .run(&artifacts)
            .await;
        assert!(result.is_err());

        // Only usdt was attempted and it is already on disk; nothing after
        // the failed hasher step ran.
        assert_eq!(chain.deploys.lock().unwrap().len(), 1);
        let on_disk = AddressStore::load(&path).unwrap();
        let shasta = on_disk.network("shasta").unwrap();
        assert!(shasta.get(ContractKey::Usdt).is_some());
        for key in [
            ContractKey::Hasher,
            ContractKey::Verifier,
            ContractKey::EthTornado,
            ContractKey::Erc20Tornado,
        ] {
            assert_eq!(shasta.get(key), None, "{key} should not have run");
        }
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn pool_parameters_are_only_required_by_their_step() {
        let path = temp_store_path("lazy-params");
        let chain = MockChain::default();
        let mut config = test_config("shasta", false, path.clone(), Address::random());
        config.erc20_token = None;
        let artifacts = test_artifacts();

        // Everything except the token pool is already recorded.
        let mut store = AddressStore::default();
        for key in [
            ContractKey::Usdt,
            ContractKey::Hasher,
            ContractKey::Verifier,
            ContractKey::EthTornado,
        ] {
            store.network_mut("shasta").set(key, Address::random());
        }

        let result = Sequencer::new(&chain, &config, &mut store)
            .run(&artifacts)
            .await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains(ERC20_TOKEN_ENV));
        assert!(chain.deploys.lock().unwrap().is_empty());
        let _ = std::fs::remove_file(path);
    }
}
