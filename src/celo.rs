use alloy::primitives::{address, Address};
use serde::{Deserialize, Serialize};

// Alfajores network parameters
pub const ALFAJORES_CHAIN_ID: u64 = 44787;
pub const ALFAJORES_CHAIN_NAME: &str = "Celo Alfajores";
pub const ALFAJORES_RPC_URL: &str = "https://alfajores-forno.celo-testnet.org";
pub const ALFAJORES_EXPLORER_URL: &str = "https://alfajores.celoscan.io";

// Alfajores contract addresses
pub const CUSD_ADDRESS: Address = address!("874069Fa1Eb16D44d622F2e0Ca25eeA172369bC1");
pub const CKES_ADDRESS: Address = address!("1E0433C1769271ECcF4CFF9FDdD515eefE6CdF92");

/// Mento broker, the on-chain venue for stablecoin swaps.
pub const BROKER_ADDRESS: Address = address!("D3Dff18E465bCa6241A244144765b4421Ac14D09");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Full chain definition, as handed to a provider that does not yet know
/// the target network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkParams {
    pub chain_id: u64,
    pub chain_name: String,
    pub native_currency: NativeCurrency,
    pub rpc_url: String,
    pub explorer_url: String,
}

impl NetworkParams {
    pub fn alfajores() -> Self {
        Self {
            chain_id: ALFAJORES_CHAIN_ID,
            chain_name: ALFAJORES_CHAIN_NAME.to_string(),
            native_currency: NativeCurrency {
                name: "Celo".to_string(),
                symbol: "CELO".to_string(),
                decimals: 18,
            },
            rpc_url: ALFAJORES_RPC_URL.to_string(),
            explorer_url: ALFAJORES_EXPLORER_URL.to_string(),
        }
    }
}
