use std::future::Future;

use alloy_primitives::{Address, TxHash, U256};
use alloy_provider::{
    fillers::WalletFiller,
    network::{EthereumWallet, TransactionBuilder},
    Provider, ProviderBuilder,
};
use alloy_rpc_types::TransactionRequest;
use alloy_signer_local::PrivateKeySigner;
use anyhow::{anyhow, Context, Result};
use tracing::info;

use crate::contracts;

/// The remote operations the deployment sequence needs from the chain.
pub trait Chain {
    /// Instantiate a contract from its creation code and return its address.
    fn deploy(&self, init_code: Vec<u8>) -> impl Future<Output = Result<Address>> + Send;

    /// Mint mock tokens to `to`, waiting for inclusion. Returns the
    /// transaction hash.
    fn mint(
        &self,
        token: Address,
        to: Address,
        amount: U256,
    ) -> impl Future<Output = Result<TxHash>> + Send;
}

/// Chain access over the node's JSON-RPC endpoint, signing with a local key.
pub struct RpcChain<P> {
    provider: P,
    caller: Address,
}

/// Connect to the node at `rpc_url` and verify the connection by fetching the
/// current block number.
pub async fn connect(
    rpc_url: &str,
    signer: PrivateKeySigner,
) -> Result<RpcChain<impl Provider + Clone>> {
    let caller = signer.address();
    let provider = ProviderBuilder::new()
        .with_recommended_fillers()
        .filler(WalletFiller::new(EthereumWallet::from(signer)))
        .on_builtin(rpc_url)
        .await
        .with_context(|| format!("Failed to connect to the node at {rpc_url}"))?;

    let block_number = provider.get_block_number().await?;
    info!("Connected to {rpc_url} at block number {block_number}");

    Ok(RpcChain { provider, caller })
}

impl<P: Provider + Clone> Chain for RpcChain<P> {
    async fn deploy(&self, init_code: Vec<u8>) -> Result<Address> {
        let tx = TransactionRequest::default()
            .with_from(self.caller)
            .with_deploy_code(init_code);

        let receipt = self
            .provider
            .send_transaction(tx)
            .await?
            .get_receipt()
            .await?;
        receipt
            .contract_address
            .ok_or_else(|| anyhow!("Deployment receipt is missing the contract address"))
    }

    async fn mint(&self, token: Address, to: Address, amount: U256) -> Result<TxHash> {
        let tx = TransactionRequest::default()
            .with_from(self.caller)
            .with_to(token)
            .with_input(contracts::mint_calldata(to, amount));

        let receipt = self
            .provider
            .send_transaction(tx)
            .await?
            .get_receipt()
            .await?;
        Ok(receipt.transaction_hash)
    }
}
