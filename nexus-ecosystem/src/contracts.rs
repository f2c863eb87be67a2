//! Deployed contract descriptors and unit helpers
//!
//! The ecosystem consumes three contracts it does not implement: the MockUSDC
//! token, the NexusVault on the C-Chain, and the NexusBilling contract on the
//! billing subnet. Only their addresses and ABI JSON are needed here.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::chains::{self, ChainInfo, NetworkEnvironment};

// ═══════════════════════════════════════════════════════════════════════════════
// ADDRESSES
// ═══════════════════════════════════════════════════════════════════════════════

/// Fuji deployment of the MockUSDC token
pub const MOCK_USDC_ADDRESS: &str = "0x0Ea1fc10a7Bd14231d41E7575aA00888ca5255dC";
/// Fuji deployment of the NexusVault
pub const NEXUS_VAULT_ADDRESS: &str = "0xeF49d4fCd8C452f09AfA76B3BaBbdA4b4190866B";
/// Fuji deployment of the NexusBilling contract
pub const NEXUS_BILLING_ADDRESS: &str = "0xc6a24A2bA1435553F0CcC45020F45E3804e63871";

/// mUSDC token decimals
pub const MUSDC_DECIMALS: u8 = 6;

pub const MOCK_USDC_ARTIFACT: &str = "MockUSDC.json";
pub const NEXUS_VAULT_ARTIFACT: &str = "NexusVault.json";
pub const NEXUS_BILLING_ARTIFACT: &str = "NexusBilling.json";

// ═══════════════════════════════════════════════════════════════════════════════
// ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum ContractError {
    #[error("failed to read artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid artifact: {0}")]
    InvalidArtifact(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// ═══════════════════════════════════════════════════════════════════════════════
// DESCRIPTORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Address plus interface descriptor of one deployed contract
#[derive(Debug, Clone, Serialize)]
pub struct ContractDescriptor {
    /// Contract name as deployed
    pub name: String,
    /// Checksummed deployment address
    pub address: String,
    /// JSON ABI
    pub abi: Value,
}

impl ContractDescriptor {
    /// Create a descriptor, rejecting malformed addresses
    pub fn new(name: &str, address: &str, abi: Value) -> Result<Self, ContractError> {
        if !is_valid_address(address) {
            return Err(ContractError::InvalidAddress(address.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            address: address.to_string(),
            abi,
        })
    }

    /// ABI entry of the named function, if present
    pub fn function(&self, name: &str) -> Option<&Value> {
        self.abi.as_array()?.iter().find(|entry| {
            entry["type"] == "function" && entry["name"] == name
        })
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.function(name).is_some()
    }
}

/// Minimal ERC-20 ABI covering the two calls the dashboards need
pub fn erc20_abi() -> Value {
    json!([
        {
            "name": "balanceOf",
            "type": "function",
            "stateMutability": "view",
            "inputs": [{ "name": "account", "type": "address" }],
            "outputs": [{ "name": "balance", "type": "uint256" }]
        },
        {
            "name": "approve",
            "type": "function",
            "stateMutability": "nonpayable",
            "inputs": [
                { "name": "spender", "type": "address" },
                { "name": "amount", "type": "uint256" }
            ],
            "outputs": [{ "name": "success", "type": "bool" }]
        }
    ])
}

/// Read the ABI out of a compiler artifact.
///
/// Accepts either a Hardhat artifact object (`{"abi": [...]}`) or a bare ABI
/// array.
pub fn load_abi_artifact(path: &Path) -> Result<Value, ContractError> {
    let raw = fs::read_to_string(path).map_err(|source| ContractError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let artifact: Value = serde_json::from_str(&raw)?;

    match artifact {
        Value::Array(_) => Ok(artifact),
        Value::Object(mut obj) => match obj.remove("abi") {
            Some(abi @ Value::Array(_)) => Ok(abi),
            _ => Err(ContractError::InvalidArtifact(format!(
                "{} has no abi array",
                path.display()
            ))),
        },
        _ => Err(ContractError::InvalidArtifact(format!(
            "{} is neither an artifact nor an abi",
            path.display()
        ))),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONTRACT SET
// ═══════════════════════════════════════════════════════════════════════════════

/// The three contracts the ecosystem talks to
#[derive(Debug, Clone, Serialize)]
pub struct ContractSet {
    pub mock_usdc: ContractDescriptor,
    pub vault: ContractDescriptor,
    pub billing: ContractDescriptor,
}

/// Address overrides applied on top of the Fuji deployment
#[derive(Debug, Clone, Default)]
pub struct AddressOverrides {
    pub mock_usdc: Option<String>,
    pub vault: Option<String>,
    pub billing: Option<String>,
}

impl ContractSet {
    /// Fuji deployment with built-in ABIs
    pub fn fuji() -> Self {
        Self {
            mock_usdc: ContractDescriptor {
                name: "MockUSDC".into(),
                address: MOCK_USDC_ADDRESS.into(),
                abi: erc20_abi(),
            },
            vault: ContractDescriptor {
                name: "NexusVault".into(),
                address: NEXUS_VAULT_ADDRESS.into(),
                abi: json!([]),
            },
            billing: ContractDescriptor {
                name: "NexusBilling".into(),
                address: NEXUS_BILLING_ADDRESS.into(),
                abi: json!([]),
            },
        }
    }

    /// Build the set from address overrides and an optional artifact
    /// directory. Missing artifacts keep the built-in ABI.
    pub fn load(
        overrides: &AddressOverrides,
        artifact_dir: Option<&Path>,
    ) -> Result<Self, ContractError> {
        let mut set = Self::fuji();

        for (descriptor, address) in [
            (&mut set.mock_usdc, &overrides.mock_usdc),
            (&mut set.vault, &overrides.vault),
            (&mut set.billing, &overrides.billing),
        ] {
            if let Some(address) = address {
                let abi = std::mem::take(&mut descriptor.abi);
                *descriptor = ContractDescriptor::new(&descriptor.name, address, abi)?;
            }
        }

        if let Some(dir) = artifact_dir {
            for (descriptor, file) in [
                (&mut set.mock_usdc, MOCK_USDC_ARTIFACT),
                (&mut set.vault, NEXUS_VAULT_ARTIFACT),
                (&mut set.billing, NEXUS_BILLING_ARTIFACT),
            ] {
                let path = dir.join(file);
                if path.exists() {
                    descriptor.abi = load_abi_artifact(&path)?;
                    debug!(contract = %descriptor.name, path = %path.display(), "loaded abi artifact");
                } else {
                    warn!(contract = %descriptor.name, path = %path.display(), "abi artifact missing, using built-in abi");
                }
            }
        }

        Ok(set)
    }

    pub fn all(&self) -> [&ContractDescriptor; 3] {
        [&self.mock_usdc, &self.vault, &self.billing]
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// NETWORK CONFIG
// ═══════════════════════════════════════════════════════════════════════════════

/// Static network configuration: active chain, both target chains and the
/// deployed contracts
#[derive(Debug, Clone, Serialize)]
pub struct NetworkConfig {
    pub network: NetworkEnvironment,
    pub chain: ChainInfo,
    pub chains: Vec<ChainInfo>,
    pub contracts: ContractSet,
}

impl NetworkConfig {
    pub fn new(network: NetworkEnvironment, contracts: ContractSet) -> Self {
        Self {
            network,
            chain: chains::chain_for(network),
            chains: chains::supported_chains(),
            contracts,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self::new(NetworkEnvironment::Testnet, ContractSet::fuji())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

/// `0x` followed by 40 hex digits, any case
pub fn is_valid_address(address: &str) -> bool {
    address
        .strip_prefix("0x")
        .map(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()))
        .unwrap_or(false)
}

/// Convert a decimal string into integer base units.
///
/// Fractional digits beyond `decimals` are rejected rather than rounded.
pub fn parse_units(amount: &str, decimals: u8) -> Result<u128, ContractError> {
    let amount = amount.trim();
    let invalid = || ContractError::InvalidAmount(amount.to_string());

    let (whole, frac) = match amount.split_once('.') {
        Some((w, f)) => (w, f),
        None => (amount, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid());
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    if frac.len() > decimals as usize {
        return Err(invalid());
    }

    let scale = 10u128.checked_pow(decimals as u32).ok_or_else(invalid)?;
    let whole: u128 = if whole.is_empty() { 0 } else { whole.parse().map_err(|_| invalid())? };
    let padded = format!("{:0<width$}", frac, width = decimals as usize);
    let frac: u128 = if padded.is_empty() { 0 } else { padded.parse().map_err(|_| invalid())? };

    whole
        .checked_mul(scale)
        .and_then(|w| w.checked_add(frac))
        .ok_or_else(invalid)
}

/// Render integer base units as a decimal string without trailing zeros
pub fn format_units(value: u128, decimals: u8) -> String {
    if decimals == 0 {
        return value.to_string();
    }
    let digits = format!("{:0>width$}", value, width = decimals as usize + 1);
    let (whole, frac) = digits.split_at(digits.len() - decimals as usize);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, frac)
    }
}
