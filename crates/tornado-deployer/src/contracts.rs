//! ABI bindings and creation-code builders for the deployed contract suite.
//!
//! Creation code is the artifact bytecode with the ABI-encoded constructor
//! arguments appended. Hasher and Verifier take no constructor arguments, so
//! their artifact bytecode is used as-is by the sequencer.

use alloy_primitives::{address, utils::parse_units, Address, U256};
use alloy_sol_types::{SolCall, SolConstructor};

use crate::artifacts::Artifact;

pub const MOCK_TOKEN_NAME: &str = "Tether USD";
pub const MOCK_TOKEN_SYMBOL: &str = "USDT";
pub const MOCK_TOKEN_DECIMALS: u8 = 6;

/// Fixed recipient of the test mint issued right after a fresh mock-token
/// deployment.
pub const MINT_RECIPIENT: Address = address!("70997970C51812dc3A010C7d01b50e0d17dc79C8");

mod erc20_mock {
    alloy_sol_types::sol! {
        constructor(string name, string symbol, uint8 decimals);

        function mint(address to, uint256 amount) external;
    }
}

mod eth_tornado {
    alloy_sol_types::sol! {
        constructor(address verifier, address hasher, uint256 denomination, uint32 merkleTreeHeight);
    }
}

mod erc20_tornado {
    alloy_sol_types::sol! {
        constructor(address verifier, address hasher, uint256 denomination, uint32 merkleTreeHeight, address token);
    }
}

/// One whole mock token in base units, the amount of the test mint.
pub fn initial_mint_amount() -> U256 {
    parse_units("1", MOCK_TOKEN_DECIMALS)
        .expect("static amount is valid")
        .get_absolute()
}

pub fn erc20_mock_init_code(artifact: &Artifact) -> Vec<u8> {
    let constructor = erc20_mock::constructorCall {
        name: MOCK_TOKEN_NAME.into(),
        symbol: MOCK_TOKEN_SYMBOL.into(),
        decimals: MOCK_TOKEN_DECIMALS,
    };
    [artifact.bytecode.to_vec(), constructor.abi_encode()].concat()
}

pub fn mint_calldata(to: Address, amount: U256) -> Vec<u8> {
    erc20_mock::mintCall { to, amount }.abi_encode()
}

pub fn eth_tornado_init_code(
    artifact: &Artifact,
    verifier: Address,
    hasher: Address,
    denomination: U256,
    merkle_tree_height: u32,
) -> Vec<u8> {
    let constructor = eth_tornado::constructorCall {
        verifier,
        hasher,
        denomination,
        merkleTreeHeight: merkle_tree_height,
    };
    [artifact.bytecode.to_vec(), constructor.abi_encode()].concat()
}

pub fn erc20_tornado_init_code(
    artifact: &Artifact,
    verifier: Address,
    hasher: Address,
    denomination: U256,
    merkle_tree_height: u32,
    token: Address,
) -> Vec<u8> {
    let constructor = erc20_tornado::constructorCall {
        verifier,
        hasher,
        denomination,
        merkleTreeHeight: merkle_tree_height,
        token,
    };
    [artifact.bytecode.to_vec(), constructor.abi_encode()].concat()
}
