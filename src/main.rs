//! Celo freelancer payment client - Main executable
//!
//! This is the entry point for the command-line client that connects a
//! wallet, swaps cUSD for cKES through the Mento broker and transfers the
//! result to a freelancer's address on the Celo Alfajores network.
use anyhow::{bail, Context};
use celo_pay::{
    utils, FsSessionCache, PaymentOrchestrator, RpcWalletProvider, WalletProvider, WalletSession,
    WalletStatus, ALFAJORES_CHAIN_ID, ALFAJORES_EXPLORER_URL, ALFAJORES_RPC_URL, CKES_ADDRESS,
    CUSD_ADDRESS,
};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use log::{info, warn};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON-RPC endpoint (falls back to $CELO_RPC_URL, then Alfajores Forno)
    #[arg(long)]
    rpc_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Pay a freelancer: swap cUSD to cKES and transfer it to their address
    Pay {
        /// Payment amount in cUSD
        amount: String,

        /// Freelancer's wallet address
        recipient: String,

        /// Print the payment result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the wallet's cUSD and cKES balances
    Balance,
}

/// Application entry point
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    // Initialize logging with default level of "info"
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    info!("Starting Celo payment client v{}", celo_pay::VERSION);

    let cli = Cli::parse();

    let rpc_url = cli
        .rpc_url
        .or_else(|| env::var("CELO_RPC_URL").ok())
        .unwrap_or_else(|| ALFAJORES_RPC_URL.to_string());

    let private_key = env::var("CELO_PRIVATE_KEY")
        .context("CELO_PRIVATE_KEY must be set in environment variables")?;

    info!("Connecting to Celo network at {rpc_url}...");
    let provider = Arc::new(
        RpcWalletProvider::connect(&rpc_url, &private_key, ALFAJORES_CHAIN_ID)
            .context("Failed to create Celo RPC client")?,
    );

    match cli.command {
        Command::Pay {
            amount,
            recipient,
            json,
        } => pay(provider, &amount, &recipient, json).await,
        Command::Balance => balance(provider).await,
    }
}

async fn pay(
    provider: Arc<RpcWalletProvider>,
    amount: &str,
    recipient: &str,
    json: bool,
) -> anyhow::Result<()> {
    // Local validation happens before any network call
    let amount = utils::sanitize_amount(amount);
    if !utils::is_valid_amount(&amount) {
        bail!("Please enter a valid amount greater than 0");
    }
    if !utils::is_valid_address(recipient) {
        bail!("Please enter a valid Celo address");
    }

    let cache = FsSessionCache::open(session_cache_dir()).context("Failed to open session cache")?;
    let mut session = WalletSession::new(Some(provider.clone() as Arc<dyn WalletProvider>), Arc::new(cache));

    session.start().await;
    if session.status() != WalletStatus::Connected && !session.connect().await {
        let state = session.state();
        bail!(
            "{}",
            state
                .error
                .unwrap_or_else(|| "Failed to connect wallet".to_string())
        );
    }

    // Best effort: the payment proceeds even if the switch fails
    if !session.switch_to_alfajores().await {
        warn!("Could not switch to the Celo Alfajores network, proceeding anyway");
    }

    let mut orchestrator = PaymentOrchestrator::new(provider);
    let result = orchestrator.run(&amount, recipient).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if result.success {
        let tx_hash = result.tx_hash.clone().unwrap_or_default();
        println!(
            "Payment of {} sent to {}",
            utils::format_amount(&amount, "cUSD"),
            utils::truncate_address(recipient)
        );
        println!("Transfer tx: {}", utils::format_tx_hash(&tx_hash));
        println!("{ALFAJORES_EXPLORER_URL}/tx/{tx_hash}");
    } else {
        println!(
            "Payment failed: {}",
            result.error.as_deref().unwrap_or("An unknown error occurred")
        );
        if let Some(help) = &result.help_text {
            println!("Help: {help}");
        }
    }

    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}

async fn balance(provider: Arc<RpcWalletProvider>) -> anyhow::Result<()> {
    let accounts = provider
        .accounts()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read accounts: {e}"))?;
    let Some(account) = accounts.first().copied() else {
        bail!("No accounts found");
    };

    info!(
        "Fetching balances for {}",
        utils::truncate_address(&account.to_string())
    );

    let cusd = provider
        .balance_of(CUSD_ADDRESS, account)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read cUSD balance: {e}"))?;
    let ckes = provider
        .balance_of(CKES_ADDRESS, account)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read cKES balance: {e}"))?;

    println!("Balances for {account}");
    println!("{}", utils::format_amount(&utils::from_wei(cusd), "cUSD"));
    println!("{}", utils::format_amount(&utils::from_wei(ckes), "cKES"));

    Ok(())
}

fn session_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(env::temp_dir)
        .join("celo-pay")
}
