use std::{collections::BTreeMap, fs, path::Path};

use alloy_primitives::Address;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Stable logical names of the deployed contracts, used as keys in the
/// address store.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ContractKey {
    Usdt,
    Hasher,
    Verifier,
    EthTornado,
    Erc20Tornado,
}

impl ContractKey {
    /// All keys, in deployment order.
    pub const ALL: [ContractKey; 5] = [
        ContractKey::Usdt,
        ContractKey::Hasher,
        ContractKey::Verifier,
        ContractKey::EthTornado,
        ContractKey::Erc20Tornado,
    ];
}

impl std::fmt::Display for ContractKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ContractKey::Usdt => "usdt",
            ContractKey::Hasher => "hasher",
            ContractKey::Verifier => "verifier",
            ContractKey::EthTornado => "ethTornado",
            ContractKey::Erc20Tornado => "erc20Tornado",
        })
    }
}

/// Addresses recorded for a single network. Once set, an entry is only
/// overwritten by a `--reset` run.
#[derive(Clone, Eq, PartialEq, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkAddresses {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usdt: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hasher: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verifier: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eth_tornado: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub erc20_tornado: Option<Address>,
    /// Reserved for exchange integrations. Carried through the file verbatim.
    #[serde(default)]
    pub exchanges: BTreeMap<String, serde_json::Value>,
}

impl NetworkAddresses {
    pub fn get(&self, key: ContractKey) -> Option<Address> {
        match key {
            ContractKey::Usdt => self.usdt,
            ContractKey::Hasher => self.hasher,
            ContractKey::Verifier => self.verifier,
            ContractKey::EthTornado => self.eth_tornado,
            ContractKey::Erc20Tornado => self.erc20_tornado,
        }
    }

    pub fn set(&mut self, key: ContractKey, address: Address) {
        let slot = match key {
            ContractKey::Usdt => &mut self.usdt,
            ContractKey::Hasher => &mut self.hasher,
            ContractKey::Verifier => &mut self.verifier,
            ContractKey::EthTornado => &mut self.eth_tornado,
            ContractKey::Erc20Tornado => &mut self.erc20_tornado,
        };
        *slot = Some(address);
    }
}

/// The persisted mapping of network name to deployed contract addresses.
#[derive(Clone, Eq, PartialEq, Debug, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct AddressStore {
    networks: BTreeMap<String, NetworkAddresses>,
}

impl AddressStore {
    /// Read the store from `path`. A missing file yields an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No address store found at {path:?}, starting with an empty one.");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read address store at {path:?}"))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse address store at {path:?}"))
    }

    /// Overwrite `path` with the full pretty-printed store.
    pub fn save(&self, path: &Path) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)
            .map_err(|e| anyhow!("Failed to serialize address store: {e}"))?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to save address store to {path:?}"))
    }

    /// Make sure `network` has a record, initializing an empty one if needed.
    pub fn ensure_network(&mut self, network: &str) {
        self.networks.entry(network.into()).or_default();
    }

    pub fn network(&self, network: &str) -> Option<&NetworkAddresses> {
        self.networks.get(network)
    }

    pub fn network_mut(&mut self, network: &str) -> &mut NetworkAddresses {
        self.networks.entry(network.into()).or_default()
    }
}
