//! Target chain identifiers and configurations
//!
//! The ecosystem targets the Avalanche C-Chain: Fuji for testing and the
//! production network for mainnet deployments.

use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
// CHAIN IDENTIFIERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Avalanche Fuji testnet
pub const AVALANCHE_FUJI: &str = "avalanche-fuji";
/// Avalanche C-Chain
pub const AVALANCHE: &str = "avalanche";

/// Fuji EVM chain ID
pub const AVALANCHE_FUJI_CHAIN_ID: u64 = 43113;
/// Avalanche C-Chain EVM chain ID
pub const AVALANCHE_CHAIN_ID: u64 = 43114;

// ═══════════════════════════════════════════════════════════════════════════════
// CHAIN INFO
// ═══════════════════════════════════════════════════════════════════════════════

/// Which of the two configured networks the service talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkEnvironment {
    #[default]
    Testnet,
    Mainnet,
}

impl std::str::FromStr for NetworkEnvironment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "testnet" | "fuji" => Ok(Self::Testnet),
            "mainnet" => Ok(Self::Mainnet),
            other => Err(format!("unknown network: {}", other)),
        }
    }
}

/// Chain information structure
#[derive(Debug, Clone, Serialize)]
pub struct ChainInfo {
    /// Short chain identifier
    pub chain_name: &'static str,
    /// Human-readable chain name
    pub display_name: &'static str,
    /// EVM chain ID
    pub chain_id: u64,
    /// Native gas token symbol
    pub native_symbol: &'static str,
    /// Native token decimals
    pub native_decimals: u8,
    /// Public RPC endpoint
    pub rpc_url: &'static str,
    /// Whether chain is production-ready
    pub production_ready: bool,
}

fn fuji() -> ChainInfo {
    ChainInfo {
        chain_name: AVALANCHE_FUJI,
        display_name: "Avalanche Fuji",
        chain_id: AVALANCHE_FUJI_CHAIN_ID,
        native_symbol: "AVAX",
        native_decimals: 18,
        rpc_url: "https://api.avax-test.network/ext/bc/C/rpc",
        production_ready: false,
    }
}

fn avalanche() -> ChainInfo {
    ChainInfo {
        chain_name: AVALANCHE,
        display_name: "Avalanche",
        chain_id: AVALANCHE_CHAIN_ID,
        native_symbol: "AVAX",
        native_decimals: 18,
        rpc_url: "https://api.avax.network/ext/bc/C/rpc",
        production_ready: true,
    }
}

/// Both configured chains, testnet first
pub fn supported_chains() -> Vec<ChainInfo> {
    vec![fuji(), avalanche()]
}

/// Chain a network environment resolves to
pub fn chain_for(network: NetworkEnvironment) -> ChainInfo {
    match network {
        NetworkEnvironment::Testnet => fuji(),
        NetworkEnvironment::Mainnet => avalanche(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_chains() {
        let chains = supported_chains();
        assert_eq!(chains.len(), 2);
        assert_eq!(chains[0].chain_id, 43113);
        assert!(!chains[0].production_ready);
        assert_eq!(chains[1].chain_id, 43114);
        assert!(chains[1].production_ready);
    }

    #[test]
    fn test_chain_for_network() {
        assert_eq!(chain_for(NetworkEnvironment::Mainnet).chain_name, AVALANCHE);
        assert_eq!(chain_for(NetworkEnvironment::Testnet).chain_name, AVALANCHE_FUJI);
    }

    #[test]
    fn test_network_parsing() {
        assert_eq!("fuji".parse::<NetworkEnvironment>().unwrap(), NetworkEnvironment::Testnet);
        assert_eq!("MAINNET".parse::<NetworkEnvironment>().unwrap(), NetworkEnvironment::Mainnet);
        assert!("devnet".parse::<NetworkEnvironment>().is_err());
        assert_eq!(chain_for(NetworkEnvironment::Mainnet).chain_id, AVALANCHE_CHAIN_ID);
    }
}
