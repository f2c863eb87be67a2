//! Observable ecosystem state store.
//!
//! The store is a cheap-to-clone handle around a `tokio::sync::watch`
//! channel. Every mutation goes through `send_modify`, so a mutation touching
//! several fields is published as one transition and observers never see a
//! half-applied update.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tracing::debug;

use crate::{EcosystemState, Subscription};

/// Single source of truth for balance, vault approval and subscriptions.
#[derive(Clone, Debug)]
pub struct EcosystemStore {
    state: Arc<watch::Sender<EcosystemState>>,
    /// Keys of flows whose settlement has not landed yet
    pending: Arc<Mutex<HashSet<String>>>,
}

/// Marks a flow as in flight until dropped.
#[derive(Debug)]
pub struct PendingGuard {
    pending: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
        debug!(key = %self.key, "pending flow released");
    }
}

impl Default for EcosystemStore {
    fn default() -> Self {
        Self::new(EcosystemState::seeded())
    }
}

impl EcosystemStore {
    /// Create a store holding `initial`.
    pub fn new(initial: EcosystemState) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self {
            state: Arc::new(tx),
            pending: Arc::default(),
        }
    }

    /// Register an observer. The receiver is marked changed after every
    /// mutation.
    pub fn subscribe(&self) -> watch::Receiver<EcosystemState> {
        self.state.subscribe()
    }

    /// Clone of the latest committed state.
    pub fn snapshot(&self) -> EcosystemState {
        self.state.borrow().clone()
    }

    pub fn balance(&self) -> f64 {
        self.state.borrow().balance
    }

    pub fn vault_approved(&self) -> bool {
        self.state.borrow().vault_approved
    }

    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.state.borrow().subscriptions.clone()
    }

    /// Whether any subscription carries `id`.
    pub fn is_subscribed(&self, id: &str) -> bool {
        self.state.borrow().subscriptions.iter().any(|s| s.id == id)
    }

    /// Claim `key` for a flow. Returns `None` while another holder of the
    /// same key is still in flight.
    pub fn begin_pending(&self, key: &str) -> Option<PendingGuard> {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if !pending.insert(key.to_string()) {
            return None;
        }
        Some(PendingGuard {
            pending: Arc::clone(&self.pending),
            key: key.to_string(),
        })
    }

    /// Whether a flow holding `key` is in flight.
    pub fn is_pending(&self, key: &str) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }

    /// Replace the balance. Negative amounts are accepted.
    pub fn set_balance(&self, amount: f64) {
        self.state.send_modify(|state| state.balance = amount);
        debug!(balance = amount, "balance replaced");
    }

    /// Replace the vault approval flag.
    pub fn set_vault_approved(&self, approved: bool) {
        self.state.send_modify(|state| state.vault_approved = approved);
        debug!(approved, "vault approval replaced");
    }

    /// Append `sub` and deduct its price from the balance in one transition.
    ///
    /// Neither duplicate ids nor insufficient balance are rejected; the
    /// balance may go negative.
    pub fn add_subscription(&self, sub: Subscription) {
        let id = sub.id.clone();
        let price = sub.price;
        self.state.send_modify(|state| {
            state.balance -= sub.price;
            state.subscriptions.push(sub);
        });
        debug!(%id, price, balance = self.balance(), "subscription added");
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
