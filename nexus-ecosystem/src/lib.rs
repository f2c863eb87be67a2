//! nexus-ecosystem
//!
//! Types and utilities for the Nexus mock subscription-payment ecosystem.
//! This crate provides the ecosystem data model, the observable state store,
//! and the simulated "teleport" settlement flow that stands in for a real
//! cross-chain message between the C-Chain vault and a billing subnet.

use serde::{Deserialize, Serialize};

pub mod chains;
pub mod console;
pub mod contracts;
pub mod flows;
pub mod settlement;
pub mod store;
pub mod wallet;

pub use settlement::{simulate_teleport, Settlement, SettlementError, SettlementPhase};
pub use store::EcosystemStore;

/// Rail identifier for the simulated teleporter
pub const RAIL_ID_NEXUS_TELEPORT: &str = "NEXUS_TELEPORT";

/// Starting mUSDC balance of a freshly seeded ecosystem
pub const SEED_BALANCE: f64 = 1420.50;

// ═══════════════════════════════════════════════════════════════════════════════
// SUBSCRIPTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Lifecycle status of a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SubscriptionStatus {
    Active,
    Pending,
    Inactive,
}

/// One recurring-billing relationship between the holder and a subnet service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    /// Caller-supplied identifier (e.g. "NX-GAM-729"); not required to be unique
    pub id: String,
    /// Display name of the service
    pub name: String,
    /// Display label of the service tier
    pub tier: String,
    /// Monthly price in decimal mUSDC units
    pub price: f64,
    /// Current status
    pub status: SubscriptionStatus,
}

impl Subscription {
    /// Create a new active subscription
    pub fn active(id: &str, name: &str, tier: &str, price: f64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            tier: tier.to_string(),
            price,
            status: SubscriptionStatus::Active,
        }
    }

    /// Price formatted with two decimals, the way subscription tables render it
    pub fn display_price(&self) -> String {
        format!("${:.2}", self.price)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ECOSYSTEM STATE
// ═══════════════════════════════════════════════════════════════════════════════

/// Full mock ecosystem state rendered by every surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcosystemState {
    /// mUSDC balance in decimal units
    pub balance: f64,
    /// Whether the billing agent may pull funds from the vault
    pub vault_approved: bool,
    /// Append-only list of subscriptions, in insertion order
    pub subscriptions: Vec<Subscription>,
}

impl EcosystemState {
    /// Create an explicit state
    pub fn new(balance: f64, vault_approved: bool, subscriptions: Vec<Subscription>) -> Self {
        Self {
            balance,
            vault_approved,
            subscriptions,
        }
    }

    /// Seed state the demo starts from: a healthy balance, an approved vault
    /// and two running subnet subscriptions.
    pub fn seeded() -> Self {
        Self {
            balance: SEED_BALANCE,
            vault_approved: true,
            subscriptions: vec![
                Subscription::active("NX-GAM-729", "Web3 Gaming Subnet", "VIP PASS", 49.99),
                Subscription::active("NX-FIN-104", "DeFi Subnet", "PRO ANALYTICS", 120.00),
            ],
        }
    }

    /// Sum of the prices of all subscriptions with ACTIVE status
    pub fn monthly_commitment(&self) -> f64 {
        self.subscriptions
            .iter()
            .filter(|s| s.status == SubscriptionStatus::Active)
            .map(|s| s.price)
            .sum()
    }
}

impl Default for EcosystemState {
    fn default() -> Self {
        Self::seeded()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_state() {
        let state = EcosystemState::seeded();

        assert_eq!(state.balance, 1420.50);
        assert!(state.vault_approved);
        assert_eq!(state.subscriptions.len(), 2);
        assert_eq!(state.subscriptions[0].id, "NX-GAM-729");
        assert_eq!(state.subscriptions[1].id, "NX-FIN-104");
        assert!((state.monthly_commitment() - 169.99).abs() < 1e-9);
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&SubscriptionStatus::Pending).unwrap();
        assert_eq!(json, "\"PENDING\"");

        let status: SubscriptionStatus = serde_json::from_str("\"INACTIVE\"").unwrap();
        assert_eq!(status, SubscriptionStatus::Inactive);
    }

    #[test]
    fn test_display_price() {
        let sub = Subscription::active("NX-FIN-104", "DeFi Subnet", "PRO ANALYTICS", 120.0);
        assert_eq!(sub.display_price(), "$120.00");
    }
}
