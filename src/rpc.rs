use crate::celo::NetworkParams;
use crate::contracts::{IBroker, IERC20};
use crate::provider::{ProviderError, ProviderEvent, WalletProvider, UNRECOGNIZED_CHAIN_CODE};
use alloy::network::EthereumWallet;
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{DynProvider, PendingTransactionConfig, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use tokio::sync::broadcast;

/// Production [`WalletProvider`] backed by an HTTP JSON-RPC endpoint and a
/// local signing key.
///
/// A headless RPC client has no account selector and no user prompts, so
/// permission requests are trivially granted and no provider events are
/// ever emitted; the subscription channel exists so sessions can still
/// install their handler.
pub struct RpcWalletProvider {
    inner: DynProvider,
    signer_address: Address,
    chain_id: u64,
    events: broadcast::Sender<ProviderEvent>,
}

impl RpcWalletProvider {
    pub fn connect(rpc_url: &str, private_key: &str, chain_id: u64) -> Result<Self> {
        let signer: PrivateKeySigner = private_key
            .trim()
            .parse()
            .context("Invalid private key")?;
        let signer_address = signer.address();

        let url = rpc_url.parse().context("Invalid RPC URL")?;
        let inner = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url)
            .erased();

        let (events, _) = broadcast::channel(16);
        debug!("RPC client ready for {signer_address} on chain {chain_id}");

        Ok(Self {
            inner,
            signer_address,
            chain_id,
            events,
        })
    }
}

#[async_trait]
impl WalletProvider for RpcWalletProvider {
    async fn request_permissions(&self) -> Result<(), ProviderError> {
        // A locally configured signer needs no permission grant
        Ok(())
    }

    async fn accounts(&self) -> Result<Vec<Address>, ProviderError> {
        Ok(vec![self.signer_address])
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), ProviderError> {
        // An HTTP endpoint serves exactly one chain; any other id is
        // unrecognized, which lets the session fall back to add_chain
        if chain_id == self.chain_id {
            Ok(())
        } else {
            Err(ProviderError::new(
                UNRECOGNIZED_CHAIN_CODE,
                format!("Unrecognized chain id {chain_id}"),
            ))
        }
    }

    async fn add_chain(&self, params: &NetworkParams) -> Result<(), ProviderError> {
        if params.chain_id == self.chain_id {
            debug!("Chain {} already configured", params.chain_name);
            Ok(())
        } else {
            Err(ProviderError::rpc(format!(
                "Cannot add chain {}: client is pinned to chain {}",
                params.chain_id, self.chain_id
            )))
        }
    }

    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256, ProviderError> {
        IERC20::new(token, self.inner.clone())
            .balanceOf(owner)
            .call()
            .await
            .map_err(ProviderError::rpc)
    }

    async fn approve(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxHash, ProviderError> {
        let pending = IERC20::new(token, self.inner.clone())
            .approve(spender, amount)
            .send()
            .await
            .map_err(ProviderError::rpc)?;
        Ok(*pending.tx_hash())
    }

    async fn transfer(
        &self,
        token: Address,
        to: Address,
        amount: U256,
    ) -> Result<TxHash, ProviderError> {
        let pending = IERC20::new(token, self.inner.clone())
            .transfer(to, amount)
            .send()
            .await
            .map_err(ProviderError::rpc)?;
        Ok(*pending.tx_hash())
    }

    async fn swap_in(
        &self,
        broker: Address,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
        min_amount_out: U256,
    ) -> Result<TxHash, ProviderError> {
        let pending = IBroker::new(broker, self.inner.clone())
            .swapIn(token_in, token_out, amount_in, min_amount_out)
            .send()
            .await
            .map_err(ProviderError::rpc)?;
        Ok(*pending.tx_hash())
    }

    async fn wait_for_transaction(&self, tx: TxHash) -> Result<(), ProviderError> {
        let pending = self
            .inner
            .watch_pending_transaction(PendingTransactionConfig::new(tx))
            .await
            .map_err(ProviderError::rpc)?;
        pending.await.map_err(ProviderError::rpc)?;
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}
