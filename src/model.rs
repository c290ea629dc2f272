use crate::provider::ProviderError;
use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

// Wallet connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletStatus {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

// Wallet session state, mutated only by connect/disconnect and provider
// event handlers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletState {
    pub status: WalletStatus,
    pub account: Option<Address>,
    pub error: Option<String>,
}

impl Default for WalletState {
    fn default() -> Self {
        Self {
            status: WalletStatus::Disconnected,
            account: None,
            error: None,
        }
    }
}

// One-way progression per payment attempt: idle -> loading -> success | error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Idle,
    Loading,
    Success,
    Error,
}

// Workflow step currently in flight while the status is loading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStep {
    CheckBalance,
    Approve,
    Swap,
    VerifyOutput,
    Transfer,
}

// Final outcome of a payment attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentResult {
    pub success: bool,
    pub tx_hash: Option<String>,
    pub error: Option<String>,
    pub help_text: Option<String>,
}

// Error type for the payment workflow
#[derive(Debug, thiserror::Error)]
pub enum PayError {
    #[error("Please enter a valid amount greater than 0")]
    InvalidAmount,

    #[error("Please enter a valid Celo address")]
    InvalidAddress,

    #[error("No accounts found")]
    NoAccount,

    #[error("Insufficient cUSD balance. You can get test cUSD from the Celo Faucet at https://developers.celo.org/tools/faucet")]
    InsufficientBalance,

    #[error("Swap failed: No cKES received")]
    SwapNoOutput,

    #[error("Swap failed: Received amount is less than minimum expected")]
    SwapBelowMinimum,

    #[error(transparent)]
    Provider(#[from] ProviderError),
}
