use crate::celo::{BROKER_ADDRESS, CKES_ADDRESS, CUSD_ADDRESS};
use crate::model::{PayError, PaymentResult, PaymentStatus, PaymentStep};
use crate::provider::WalletProvider;
use crate::utils;
use alloy::primitives::{Address, TxHash, U256};
use log::{debug, error, info};
use std::sync::Arc;

/// Drives the cUSD -> cKES payment workflow: balance check, approve, swap,
/// output verification, transfer.
///
/// The steps are strictly sequential; each on-chain confirmation is awaited
/// before the next call. A transaction mined before a failing step stays
/// final, nothing is rolled back.
pub struct PaymentOrchestrator {
    provider: Arc<dyn WalletProvider>,
    status: PaymentStatus,
    step: Option<PaymentStep>,
    result: Option<PaymentResult>,
}

impl PaymentOrchestrator {
    pub fn new(provider: Arc<dyn WalletProvider>) -> Self {
        Self {
            provider,
            status: PaymentStatus::Idle,
            step: None,
            result: None,
        }
    }

    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    /// The most recently entered workflow step: the one in flight while
    /// loading, or the one that failed.
    pub fn step(&self) -> Option<PaymentStep> {
        self.step
    }

    pub fn result(&self) -> Option<&PaymentResult> {
        self.result.as_ref()
    }

    /// Clear the previous attempt's outcome before a new one.
    pub fn reset(&mut self) {
        self.status = PaymentStatus::Idle;
        self.step = None;
        self.result = None;
    }

    /// Run the payment workflow to completion. Any step's failure aborts
    /// the remaining steps; the underlying message is kept verbatim and a
    /// trailing help URL, when present, is split out for display.
    pub async fn run(&mut self, amount: &str, recipient: &str) -> PaymentResult {
        self.reset();
        self.status = PaymentStatus::Loading;

        let result = match self.process(amount, recipient).await {
            Ok(tx_hash) => {
                self.status = PaymentStatus::Success;
                PaymentResult {
                    success: true,
                    tx_hash: Some(tx_hash.to_string()),
                    error: None,
                    help_text: None,
                }
            }
            Err(e) => {
                let message = e.to_string();
                error!("Payment error: {message}");
                self.status = PaymentStatus::Error;
                let help_text = utils::extract_help_url(&message);
                PaymentResult {
                    success: false,
                    tx_hash: None,
                    error: Some(message),
                    help_text,
                }
            }
        };

        self.result = Some(result.clone());
        result
    }

    async fn process(&mut self, amount: &str, recipient: &str) -> Result<TxHash, PayError> {
        if !utils::is_valid_amount(amount) {
            return Err(PayError::InvalidAmount);
        }
        let amount_wei = utils::to_wei(amount);
        if amount_wei.is_zero() {
            return Err(PayError::InvalidAmount);
        }

        if !utils::is_valid_address(recipient) {
            return Err(PayError::InvalidAddress);
        }
        let recipient: Address = recipient.parse().map_err(|_| PayError::InvalidAddress)?;

        let accounts = self.provider.accounts().await?;
        let account = *accounts.first().ok_or(PayError::NoAccount)?;

        info!("Starting payment of {amount_wei} wei from {account} to {recipient}");

        self.enter(PaymentStep::CheckBalance);
        let cusd_balance = self.provider.balance_of(CUSD_ADDRESS, account).await?;
        if cusd_balance < amount_wei {
            return Err(PayError::InsufficientBalance);
        }

        // cKES snapshot, for the post-swap delta
        let initial_ckes = self.provider.balance_of(CKES_ADDRESS, account).await?;

        // 1. Approve cUSD spending
        self.enter(PaymentStep::Approve);
        info!("Approving cUSD for broker contract...");
        let approve_tx = self
            .provider
            .approve(CUSD_ADDRESS, BROKER_ADDRESS, amount_wei)
            .await?;
        self.provider.wait_for_transaction(approve_tx).await?;
        info!("Approval confirmed: {approve_tx}");

        // 2. Execute swap with 5% slippage tolerance
        self.enter(PaymentStep::Swap);
        let min_amount_out = amount_wei * U256::from(95) / U256::from(100);
        info!("Executing swap with minimum output: {min_amount_out}");
        let swap_tx = self
            .provider
            .swap_in(
                BROKER_ADDRESS,
                CUSD_ADDRESS,
                CKES_ADDRESS,
                amount_wei,
                min_amount_out,
            )
            .await?;
        self.provider.wait_for_transaction(swap_tx).await?;
        info!("Swap confirmed: {swap_tx}");

        // The swap transaction succeeding is not enough; the economic
        // outcome is verified against the observed balance delta.
        self.enter(PaymentStep::VerifyOutput);
        let final_ckes = self.provider.balance_of(CKES_ADDRESS, account).await?;
        let swapped = final_ckes.saturating_sub(initial_ckes);
        if swapped.is_zero() {
            return Err(PayError::SwapNoOutput);
        }
        if swapped < min_amount_out {
            return Err(PayError::SwapBelowMinimum);
        }

        // 3. Transfer the swapped cKES to the recipient
        self.enter(PaymentStep::Transfer);
        info!("Transferring {swapped} wei of cKES to {recipient}");
        let transfer_tx = self
            .provider
            .transfer(CKES_ADDRESS, recipient, swapped)
            .await?;
        self.provider.wait_for_transaction(transfer_tx).await?;
        info!("Transfer confirmed: {transfer_tx}");

        Ok(transfer_tx)
    }

    fn enter(&mut self, step: PaymentStep) {
        debug!("Payment step: {step:?}");
        self.step = Some(step);
    }
}
