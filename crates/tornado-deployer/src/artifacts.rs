use std::{fs, path::Path};

use alloy_primitives::Bytes;
use anyhow::{Context, Result};
use serde::Deserialize;

/// A compiled contract artifact produced by the external Solidity build step.
///
/// Only the creation bytecode is consumed here; constructor argument encoding
/// comes from the bindings in [`crate::contracts`].
#[derive(Clone, Debug, Deserialize)]
pub struct Artifact {
    pub bytecode: Bytes,
}

impl Artifact {
    fn load(dir: &Path, contract: &str) -> Result<Self> {
        let path = dir.join(format!("{contract}.json"));
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read contract artifact {path:?}"))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse contract artifact {path:?}"))
    }
}

/// The five artifacts required by the deployment sequence.
pub struct ContractArtifacts {
    pub erc20_mock: Artifact,
    pub hasher: Artifact,
    pub verifier: Artifact,
    pub eth_tornado: Artifact,
    pub erc20_tornado: Artifact,
}

impl ContractArtifacts {
    /// Load all artifacts from `dir`. A missing or malformed file is fatal.
    pub fn load(dir: &Path) -> Result<Self> {
        Ok(Self {
            erc20_mock: Artifact::load(dir, "ERC20Mock")?,
            hasher: Artifact::load(dir, "Hasher")?,
            verifier: Artifact::load(dir, "Verifier")?,
            eth_tornado: Artifact::load(dir, "ETHTornado")?,
            erc20_tornado: Artifact::load(dir, "ERC20Tornado")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_truffle_artifact_json() {
        let artifact: Artifact = serde_json::from_str(
            r#"{
                "contractName": "Hasher",
                "abi": [],
                "bytecode": "0x60806040",
                "networks": {}
            }"#,
        )
        .unwrap();
        assert_eq!(artifact.bytecode.to_vec(), vec![0x60, 0x80, 0x60, 0x40]);
    }

    #[test]
    fn rejects_malformed_bytecode() {
        let result =
            serde_json::from_str::<Artifact>(r#"{"bytecode": "0xnot-hex-at-all"}"#);
        assert!(result.is_err());
    }
}
