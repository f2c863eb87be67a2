//! Service configuration.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use nexus_ecosystem::chains::NetworkEnvironment;
use nexus_ecosystem::console::RenewalTiming;
use nexus_ecosystem::contracts::{AddressOverrides, ContractSet, NetworkConfig};
use nexus_ecosystem::settlement::DEFAULT_TELEPORT_DELAY;

pub const DEFAULT_PORT: u16 = 3010;
/// Account the in-memory wallet connects as when none is configured
pub const DEFAULT_DEMO_ACCOUNT: &str = "0x8920b6e1F0a3C47d25e9B01c3Dd4A7e5b6f02456";

/// Service configuration.
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    /// Listen port.
    pub port: u16,
    /// Wait before a simulated teleport settles.
    pub teleport_delay: Duration,
    /// Pacing of the admin renewal simulation.
    pub renewal_timing: RenewalTiming,
    /// Target network.
    pub network: NetworkEnvironment,
    /// Account the in-memory wallet connects as.
    pub demo_account: String,
    /// Directory holding the contract ABI artifacts.
    pub abi_dir: Option<PathBuf>,
    /// Contract address overrides.
    pub addresses: AddressOverrides,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            teleport_delay: DEFAULT_TELEPORT_DELAY,
            renewal_timing: RenewalTiming::default(),
            network: NetworkEnvironment::Testnet,
            demo_account: DEFAULT_DEMO_ACCOUNT.to_string(),
            abi_dir: None,
            addresses: AddressOverrides::default(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let port: u16 = parse_var("PORT")?.unwrap_or(DEFAULT_PORT);

        let teleport_delay = parse_var::<u64>("NEXUS_TELEPORT_DELAY_MS")?
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_TELEPORT_DELAY);

        let renewal_timing = parse_var::<u32>("NEXUS_RENEWAL_STEP_SCALE")?
            .map(RenewalTiming::scaled)
            .unwrap_or_default();

        let network = match env::var("NEXUS_NETWORK") {
            Ok(raw) => raw
                .parse::<NetworkEnvironment>()
                .map_err(anyhow::Error::msg)
                .context("NEXUS_NETWORK must be testnet or mainnet")?,
            Err(_) => NetworkEnvironment::Testnet,
        };

        let demo_account =
            env::var("NEXUS_DEMO_ACCOUNT").unwrap_or_else(|_| DEFAULT_DEMO_ACCOUNT.to_string());

        let abi_dir = env::var("NEXUS_ABI_DIR").ok().map(PathBuf::from);

        let addresses = AddressOverrides {
            mock_usdc: env::var("NEXUS_MOCK_USDC_ADDRESS").ok(),
            vault: env::var("NEXUS_VAULT_ADDRESS").ok(),
            billing: env::var("NEXUS_BILLING_ADDRESS").ok(),
        };

        Ok(Self {
            port,
            teleport_delay,
            renewal_timing,
            network,
            demo_account,
            abi_dir,
            addresses,
        })
    }

    /// Resolve the active chain and contract set.
    pub fn network_config(&self) -> Result<NetworkConfig> {
        let contracts = ContractSet::load(&self.addresses, self.abi_dir.as_deref())
            .context("failed to load contract descriptors")?;
        Ok(NetworkConfig::new(self.network, contracts))
    }
}

fn parse_var<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{} has an invalid value: {}", name, raw)),
        Err(_) => Ok(None),
    }
}
