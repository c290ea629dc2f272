use crate::celo::NetworkParams;
use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use tokio::sync::broadcast;

/// Error code a provider returns when asked to switch to a chain it does
/// not know (EIP-3085/3326).
pub const UNRECOGNIZED_CHAIN_CODE: i64 = 4902;

/// Error code a provider returns when the user rejects a request
/// (EIP-1193).
pub const USER_REJECTED_CODE: i64 = 4001;

/// Event pushed by a wallet provider. Sessions consume these through
/// [`WalletProvider::subscribe`].
#[derive(Debug, Clone)]
pub enum ProviderEvent {
    AccountsChanged(Vec<Address>),
    ChainChanged(u64),
    Disconnect,
}

/// Error surfaced by a wallet provider, carrying the provider's numeric
/// code when it reports one.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ProviderError {
    pub code: Option<i64>,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }

    pub fn rpc(message: impl std::fmt::Display) -> Self {
        Self {
            code: None,
            message: message.to_string(),
        }
    }

    pub fn is_unrecognized_chain(&self) -> bool {
        self.code == Some(UNRECOGNIZED_CHAIN_CODE)
    }

    pub fn is_user_rejected(&self) -> bool {
        self.code == Some(USER_REJECTED_CODE)
    }
}

/// Wallet provider handle: account management, network switching, the
/// contract-call surface the payment flow needs, and event subscriptions.
///
/// Both [`crate::WalletSession`] and [`crate::PaymentOrchestrator`] depend
/// only on this trait, so tests can substitute a scripted provider.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Ask the wallet for account permission (the account selector).
    async fn request_permissions(&self) -> Result<(), ProviderError>;

    /// Currently exposed accounts, first entry is the active one.
    async fn accounts(&self) -> Result<Vec<Address>, ProviderError>;

    async fn switch_chain(&self, chain_id: u64) -> Result<(), ProviderError>;

    async fn add_chain(&self, params: &NetworkParams) -> Result<(), ProviderError>;

    /// ERC-20 `balanceOf` read.
    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256, ProviderError>;

    /// Submit an ERC-20 `approve`; returns the transaction hash.
    async fn approve(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxHash, ProviderError>;

    /// Submit an ERC-20 `transfer`; returns the transaction hash.
    async fn transfer(
        &self,
        token: Address,
        to: Address,
        amount: U256,
    ) -> Result<TxHash, ProviderError>;

    /// Submit a broker `swapIn`; returns the transaction hash.
    async fn swap_in(
        &self,
        broker: Address,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
        min_amount_out: U256,
    ) -> Result<TxHash, ProviderError>;

    /// Block until the transaction is included.
    async fn wait_for_transaction(&self, tx: TxHash) -> Result<(), ProviderError>;

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;
}
