//! User-facing flows.
//!
//! Each flow mirrors one action a holder can take: approving the vault,
//! subscribing to a subnet service, or approving the vault on-chain. Flows
//! collect the notifications they raise in a [`FlowReport`]; failures come
//! back as a [`FlowError`] whose message is what the holder is shown. No
//! failure mutates the store.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

use crate::contracts::{format_units, parse_units, NetworkConfig, MUSDC_DECIMALS};
use crate::settlement::{simulate_teleport, SettlementError};
use crate::store::EcosystemStore;
use crate::wallet::{ContractCall, WalletError, WalletProvider};
use crate::Subscription;

/// Allowance granted to the vault by the on-chain approval
pub const VAULT_ALLOWANCE: &str = "10000";

/// Wallet error messages are cut to this many characters
const ERROR_SNIPPET_LEN: usize = 50;

/// Pending-flow key held while a vault approval settles
pub const APPROVE_VAULT_KEY: &str = "approve-vault";

/// Pending-flow key held while a registration on `service_id` settles
pub fn subscribe_key(service_id: &str) -> String {
    format!("subscribe:{}", service_id)
}

// ═══════════════════════════════════════════════════════════════════════════════
// ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Please connect your wallet first.")]
    WalletNotConnected,

    #[error("Please enter a target address")]
    MissingTargetAddress,

    #[error("{action} failed: {message}")]
    Wallet { action: &'static str, message: String },

    #[error("{message}")]
    Settlement {
        message: &'static str,
        #[source]
        source: SettlementError,
    },

    #[error("Vault authorization is already in progress.")]
    ApprovalInProgress,

    #[error("Registration on {0} is already in progress.")]
    SubscriptionInProgress(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}

impl FlowError {
    fn wallet(action: &'static str, err: WalletError) -> Self {
        let message: String = err.to_string().chars().take(ERROR_SNIPPET_LEN).collect();
        Self::Wallet { action, message }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// NOTIFICATIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Loading,
    Info,
    Success,
    Error,
}

/// Transient message shown to the holder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Notifications raised by a successful flow, in order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowReport {
    pub notifications: Vec<Notification>,
    /// Extra data a flow hands back (e.g. a refreshed balance)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl FlowReport {
    pub(crate) fn push(&mut self, level: NotificationLevel, message: impl Into<String>) {
        let notification = Notification::new(level, message);
        info!(level = ?notification.level, message = %notification.message, "notification");
        self.notifications.push(notification);
    }

    pub(crate) fn single(level: NotificationLevel, message: impl Into<String>) -> Self {
        let mut report = Self::default();
        report.push(level, message);
        report
    }

    /// Last notification raised, if any
    pub fn last(&self) -> Option<&Notification> {
        self.notifications.last()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SERVICE CATALOG
// ═══════════════════════════════════════════════════════════════════════════════

/// A subnet service a holder can subscribe to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceOffering {
    pub id: String,
    pub name: String,
    pub tier: String,
    pub price: f64,
    pub features: Vec<String>,
}

impl ServiceOffering {
    /// Galactic Raiders gaming subnet pass
    pub fn galactic_raiders() -> Self {
        Self {
            id: "NX-GR-100".into(),
            name: "Galactic Raiders Subnet".into(),
            tier: "PRO GAMER PASS".into(),
            price: 100.00,
            features: vec![
                "Full Access to Galactic Custom Subnet".into(),
                "Zero Gas Fees for all Transactions".into(),
                "Exclusive Season 4 In-game Assets".into(),
                "Priority Matchmaking & Tournament Entry".into(),
                "Early Access to Galactic Raiders Beta".into(),
            ],
        }
    }

    /// Subscription record created once the holder is registered
    pub fn to_subscription(&self) -> Subscription {
        Subscription::active(&self.id, &self.name, &self.tier, self.price)
    }
}

/// Services available on the demo subnet
pub fn catalog() -> Vec<ServiceOffering> {
    vec![ServiceOffering::galactic_raiders()]
}

// ═══════════════════════════════════════════════════════════════════════════════
// FLOWS
// ═══════════════════════════════════════════════════════════════════════════════

/// Grant the billing agent access to the vault through a simulated
/// cross-chain message.
pub async fn approve_vault(
    store: &EcosystemStore,
    wallet: &dyn WalletProvider,
    delay: Duration,
) -> Result<FlowReport, FlowError> {
    if wallet.account().await.is_none() {
        return Err(FlowError::WalletNotConnected);
    }
    // Claim before checking so a settlement landing in between is seen.
    let guard = store
        .begin_pending(APPROVE_VAULT_KEY)
        .ok_or(FlowError::ApprovalInProgress)?;
    if store.vault_approved() {
        return Ok(FlowReport::single(
            NotificationLevel::Info,
            "Vault is already approved.",
        ));
    }

    let mut report = FlowReport::default();
    report.push(
        NotificationLevel::Loading,
        "Initiating cross-chain message to C-Chain...",
    );

    let handle = store.clone();
    simulate_teleport(delay, move || {
        handle.set_vault_approved(true);
        drop(guard);
    })
        .await
        .map_err(|source| FlowError::Settlement {
            message: "Failed to authorize.",
            source,
        })?;

    report.push(NotificationLevel::Success, "Vault Authorization Confirmed!");
    Ok(report)
}

/// Register the holder on `offering`, deducting its price once the
/// simulated billing message settles.
pub async fn subscribe_to_service(
    store: &EcosystemStore,
    wallet: &dyn WalletProvider,
    offering: &ServiceOffering,
    delay: Duration,
) -> Result<FlowReport, FlowError> {
    if wallet.account().await.is_none() {
        // Prompt for a connection; the holder retries once connected.
        if let Err(err) = wallet.connect().await {
            warn!(error = %err, "connect prompt failed");
        }
        return Err(FlowError::WalletNotConnected);
    }
    let guard = store
        .begin_pending(&subscribe_key(&offering.id))
        .ok_or_else(|| FlowError::SubscriptionInProgress(offering.name.clone()))?;
    if store.is_subscribed(&offering.id) {
        return Ok(FlowReport::single(
            NotificationLevel::Info,
            format!("Active Subscription on {}", offering.name),
        ));
    }

    let mut report = FlowReport::default();
    report.push(
        NotificationLevel::Loading,
        "Communicating with Subnet Billing Contract...",
    );

    let handle = store.clone();
    let subscription = offering.to_subscription();
    simulate_teleport(delay, move || {
        handle.add_subscription(subscription);
        drop(guard);
    })
        .await
        .map_err(|source| FlowError::Settlement {
            message: "Failed to register subscription.",
            source,
        })?;

    report.push(
        NotificationLevel::Success,
        format!("Successfully registered on {}!", offering.name),
    );
    Ok(report)
}

/// Approve the vault to pull mUSDC through a real `approve` call, wait for
/// the receipt and refresh the holder's token balance.
pub async fn approve_vault_onchain(
    wallet: &dyn WalletProvider,
    network: &NetworkConfig,
) -> Result<FlowReport, FlowError> {
    let account = wallet.account().await.ok_or(FlowError::WalletNotConnected)?;
    let contracts = &network.contracts;

    let mut report = FlowReport::default();
    report.push(NotificationLevel::Loading, "Approving Nexus Vault...");

    let amount = parse_units(VAULT_ALLOWANCE, MUSDC_DECIMALS)
        .map_err(|e| FlowError::InvalidAmount(e.to_string()))?;
    let call = ContractCall::new(
        &contracts.mock_usdc,
        "approve",
        vec![json!(contracts.vault.address), json!(amount.to_string())],
    );

    let tx = wallet
        .write_contract(&call)
        .await
        .map_err(|e| FlowError::wallet("Approval", e))?;
    report.push(NotificationLevel::Success, "Transaction submitted...");

    let receipt = wallet
        .wait_for_receipt(&tx)
        .await
        .map_err(|e| FlowError::wallet("Approval", e))?;
    report.push(NotificationLevel::Success, "Nexus Vault Approved Successfully!");

    let balance = read_musdc_balance(wallet, network, &account)
        .await
        .map_err(|e| FlowError::wallet("Balance refresh", e))?;

    report.data = Some(json!({
        "tx_hash": receipt.hash,
        "block_number": receipt.block_number,
        "musdc_balance": format_units(balance, MUSDC_DECIMALS),
    }));
    Ok(report)
}

/// Balances shown on the wallet overview card
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletOverview {
    pub connected: bool,
    pub account: Option<String>,
    /// Native balance with four decimals
    pub native_balance: String,
    pub native_symbol: String,
    /// mUSDC balance in decimal units, when connected
    pub musdc_balance: Option<String>,
}

pub async fn wallet_overview(
    wallet: &dyn WalletProvider,
    network: &NetworkConfig,
) -> Result<WalletOverview, FlowError> {
    let symbol = network.chain.native_symbol.to_string();
    let Some(account) = wallet.account().await else {
        return Ok(WalletOverview {
            connected: false,
            account: None,
            native_balance: "0.0000".into(),
            native_symbol: symbol,
            musdc_balance: None,
        });
    };

    let native = wallet
        .native_balance(&account)
        .await
        .map_err(|e| FlowError::wallet("Balance read", e))?;
    let musdc = read_musdc_balance(wallet, network, &account)
        .await
        .map_err(|e| FlowError::wallet("Balance read", e))?;

    Ok(WalletOverview {
        connected: true,
        account: Some(account),
        native_balance: four_decimals(native.value, native.decimals),
        native_symbol: native.symbol,
        musdc_balance: Some(format_units(musdc, MUSDC_DECIMALS)),
    })
}

async fn read_musdc_balance(
    wallet: &dyn WalletProvider,
    network: &NetworkConfig,
    account: &str,
) -> Result<u128, WalletError> {
    let call = ContractCall::new(&network.contracts.mock_usdc, "balanceOf", vec![json!(account)]);
    let value = wallet.read_contract(&call).await?;
    match &value {
        serde_json::Value::String(s) => s
            .parse()
            .map_err(|_| WalletError::Rpc(format!("malformed uint256: {}", s))),
        serde_json::Value::Number(n) => n
            .as_u64()
            .map(u128::from)
            .ok_or_else(|| WalletError::Rpc(format!("malformed uint256: {}", n))),
        other => Err(WalletError::Rpc(format!("unexpected balanceOf result: {}", other))),
    }
}

/// Truncate base units to four decimals
fn four_decimals(value: u128, decimals: u8) -> String {
    // u128 holds at most 38 decimal places
    let Some(scale) = 10u128.checked_pow(decimals as u32) else {
        return "0.0000".to_string();
    };
    let frac = value % scale;
    let frac4 = if decimals >= 4 {
        frac / 10u128.pow(decimals as u32 - 4)
    } else {
        frac * 10u128.pow(4 - decimals as u32)
    };
    format!("{}.{:04}", value / scale, frac4)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::MockWallet;
    use crate::EcosystemState;

    const ACCOUNT: &str = "0x8920000000000000000000000000000000002456";
    const DELAY: Duration = crate::settlement::DEFAULT_TELEPORT_DELAY;

    #[tokio::test(start_paused = true)]
    async fn test_approve_vault_requires_wallet() {
        let store = EcosystemStore::new(EcosystemState::new(10.0, false, vec![]));
        let wallet = MockWallet::new(ACCOUNT);

        let err = approve_vault(&store, &wallet, DELAY).await.unwrap_err();
        assert!(matches!(err, FlowError::WalletNotConnected));
        assert_eq!(err.to_string(), "Please connect your wallet first.");
        assert!(!store.vault_approved());
    }

    #[tokio::test(start_paused = true)]
    async fn test_approve_vault_settles_after_delay() {
        let store = EcosystemStore::new(EcosystemState::new(10.0, false, vec![]));
        let wallet = MockWallet::connected(ACCOUNT);
        let start = tokio::time::Instant::now();

        let report = approve_vault(&store, &wallet, DELAY).await.unwrap();

        assert!(start.elapsed() >= DELAY);
        assert!(store.vault_approved());
        assert_eq!(report.notifications[0].level, NotificationLevel::Loading);
        assert_eq!(report.last().unwrap().message, "Vault Authorization Confirmed!");
    }

    #[tokio::test(start_paused = true)]
    async fn test_approve_vault_already_approved() {
        let store = EcosystemStore::default();
        let wallet = MockWallet::connected(ACCOUNT);
        let start = tokio::time::Instant::now();

        let report = approve_vault(&store, &wallet, DELAY).await.unwrap();

        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(report.notifications.len(), 1);
        assert_eq!(report.notifications[0].level, NotificationLevel::Info);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribe_to_service() {
        let store = EcosystemStore::default();
        let wallet = MockWallet::connected(ACCOUNT);
        let offering = ServiceOffering::galactic_raiders();

        let report = subscribe_to_service(&store, &wallet, &offering, DELAY)
            .await
            .unwrap();

        assert_eq!(store.balance(), 1320.50);
        assert_eq!(store.subscriptions().len(), 3);
        assert_eq!(
            report.last().unwrap().message,
            "Successfully registered on Galactic Raiders Subnet!"
        );

        // A second attempt is answered without another deduction.
        let again = subscribe_to_service(&store, &wallet, &offering, DELAY)
            .await
            .unwrap();
        assert_eq!(again.notifications[0].level, NotificationLevel::Info);
        assert_eq!(store.subscriptions().len(), 3);
        assert_eq!(store.balance(), 1320.50);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_subscribes_charge_once() {
        let store = EcosystemStore::default();
        let wallet = MockWallet::connected(ACCOUNT);
        let offering = ServiceOffering::galactic_raiders();

        let (first, second) = tokio::join!(
            subscribe_to_service(&store, &wallet, &offering, DELAY),
            subscribe_to_service(&store, &wallet, &offering, DELAY),
        );

        let outcomes = [first, second];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(outcomes
            .iter()
            .any(|r| matches!(r, Err(FlowError::SubscriptionInProgress(_)))));
        assert_eq!(store.subscriptions().len(), 3);
        assert_eq!(store.balance(), 1320.50);
        assert!(!store.is_pending(&subscribe_key(&offering.id)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_approvals_settle_once() {
        let store = EcosystemStore::new(EcosystemState::new(10.0, false, vec![]));
        let wallet = MockWallet::connected(ACCOUNT);

        let (first, second) = tokio::join!(
            approve_vault(&store, &wallet, DELAY),
            approve_vault(&store, &wallet, DELAY),
        );

        let outcomes = [first, second];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(outcomes
            .iter()
            .any(|r| matches!(r, Err(FlowError::ApprovalInProgress))));
        assert!(store.vault_approved());
        assert!(!store.is_pending(APPROVE_VAULT_KEY));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_subscribe_still_settles() {
        let store = EcosystemStore::default();
        let wallet = MockWallet::connected(ACCOUNT);
        let offering = ServiceOffering::galactic_raiders();

        let cut_short = tokio::time::timeout(
            Duration::from_millis(10),
            subscribe_to_service(&store, &wallet, &offering, DELAY),
        )
        .await;
        assert!(cut_short.is_err());
        assert!(store.is_pending(&subscribe_key(&offering.id)));

        tokio::time::sleep(DELAY).await;
        assert_eq!(store.subscriptions().len(), 3);
        assert!(!store.is_pending(&subscribe_key(&offering.id)));

        // A retry now sees the registration instead of charging again
        let retry = subscribe_to_service(&store, &wallet, &offering, DELAY)
            .await
            .unwrap();
        assert_eq!(retry.notifications[0].level, NotificationLevel::Info);
        assert_eq!(store.balance(), 1320.50);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribe_prompts_connection() {
        let store = EcosystemStore::default();
        let wallet = MockWallet::new(ACCOUNT);
        let offering = ServiceOffering::galactic_raiders();

        let err = subscribe_to_service(&store, &wallet, &offering, DELAY)
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::WalletNotConnected));
        assert_eq!(store.subscriptions().len(), 2);
        // The prompt connected the wallet for the retry.
        assert_eq!(wallet.account().await.as_deref(), Some(ACCOUNT));
    }

    #[tokio::test]
    async fn test_approve_vault_onchain() {
        let network = NetworkConfig::default();
        let wallet = MockWallet::connected(ACCOUNT);
        wallet
            .mint(&network.contracts.mock_usdc.address, ACCOUNT, 1_420_500_000)
            .await;

        let report = approve_vault_onchain(&wallet, &network).await.unwrap();

        let levels: Vec<_> = report.notifications.iter().map(|n| n.level).collect();
        assert_eq!(
            levels,
            vec![
                NotificationLevel::Loading,
                NotificationLevel::Success,
                NotificationLevel::Success
            ]
        );
        let data = report.data.unwrap();
        assert_eq!(data["musdc_balance"], "1420.5");
        assert_eq!(
            wallet
                .allowance(
                    &network.contracts.mock_usdc.address,
                    ACCOUNT,
                    &network.contracts.vault.address
                )
                .await,
            10_000_000_000
        );
    }

    #[tokio::test]
    async fn test_approve_vault_onchain_rejected() {
        let network = NetworkConfig::default();
        let wallet = MockWallet::connected(ACCOUNT);
        wallet
            .reject_writes(Some(
                "User denied transaction signature. Request id 77 was cancelled by the holder",
            ))
            .await;

        let err = approve_vault_onchain(&wallet, &network).await.unwrap_err();
        let text = err.to_string();
        assert!(text.starts_with("Approval failed: user rejected the request"));
        assert_eq!(text.len(), "Approval failed: ".len() + ERROR_SNIPPET_LEN);
    }

    #[tokio::test]
    async fn test_wallet_overview() {
        let network = NetworkConfig::default();
        let wallet = MockWallet::new(ACCOUNT);

        let overview = wallet_overview(&wallet, &network).await.unwrap();
        assert!(!overview.connected);
        assert_eq!(overview.native_balance, "0.0000");
        assert!(overview.musdc_balance.is_none());

        wallet.connect().await.unwrap();
        wallet.set_native_balance(ACCOUNT, 1_234_567_890_000_000_000).await;
        let overview = wallet_overview(&wallet, &network).await.unwrap();
        assert!(overview.connected);
        assert_eq!(overview.native_balance, "1.2345");
        assert_eq!(overview.native_symbol, "AVAX");
        assert_eq!(overview.musdc_balance.as_deref(), Some("0"));
    }

    #[test]
    fn test_four_decimals() {
        assert_eq!(four_decimals(0, 18), "0.0000");
        assert_eq!(four_decimals(15, 1), "1.5000");
        assert_eq!(four_decimals(123_456_789, 6), "123.4567");
        assert_eq!(four_decimals(u128::MAX, 38), "3.4028");
        assert_eq!(four_decimals(u128::MAX, 39), "0.0000");
        assert_eq!(four_decimals(1, u8::MAX), "0.0000");
    }
}
