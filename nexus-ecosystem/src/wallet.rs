//! Wallet-connection boundary.
//!
//! The ecosystem never signs or executes anything itself. Account access,
//! read calls and state-changing calls go through a [`WalletProvider`]; the
//! in-memory [`MockWallet`] backs the demo service and the tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha3::{Digest, Keccak256};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::contracts::{parse_units, ContractDescriptor};

// ═══════════════════════════════════════════════════════════════════════════════
// ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("wallet not connected")]
    NotConnected,

    #[error("user rejected the request: {0}")]
    Rejected(String),

    #[error("unsupported call {function} on {contract}")]
    UnsupportedCall { contract: String, function: String },

    #[error("invalid call arguments: {0}")]
    InvalidArguments(String),

    #[error("transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("rpc error: {0}")]
    Rpc(String),
}

// ═══════════════════════════════════════════════════════════════════════════════
// TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// Native balance of an account, in base units
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeBalance {
    pub value: u128,
    pub decimals: u8,
    pub symbol: String,
}

/// A contract function invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractCall {
    /// Target contract address
    pub address: String,
    /// Interface descriptor
    pub abi: Value,
    /// Function name
    pub function_name: String,
    /// Positional arguments as JSON values
    pub args: Vec<Value>,
}

impl ContractCall {
    pub fn new(contract: &ContractDescriptor, function_name: &str, args: Vec<Value>) -> Self {
        Self {
            address: contract.address.clone(),
            abi: contract.abi.clone(),
            function_name: function_name.to_string(),
            args,
        }
    }

    fn arg_str(&self, index: usize) -> Result<&str, WalletError> {
        self.args
            .get(index)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                WalletError::InvalidArguments(format!(
                    "{}: argument {} must be a string",
                    self.function_name, index
                ))
            })
    }
}

/// Handle to a submitted transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxHandle {
    /// Transaction hash (0x-prefixed)
    pub hash: String,
}

/// Confirmation of a submitted transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxReceipt {
    pub hash: String,
    pub block_number: u64,
    pub success: bool,
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROVIDER TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Capabilities exposed by an injected browser wallet.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Currently connected account, if any.
    async fn account(&self) -> Option<String>;

    /// Request a connection and return the connected account.
    async fn connect(&self) -> Result<String, WalletError>;

    /// Native balance of `account` on the active chain.
    async fn native_balance(&self, account: &str) -> Result<NativeBalance, WalletError>;

    /// Read-only contract call returning the decoded return value.
    async fn read_contract(&self, call: &ContractCall) -> Result<Value, WalletError>;

    /// State-changing contract call.
    async fn write_contract(&self, call: &ContractCall) -> Result<TxHandle, WalletError>;

    /// Wait until `tx` is confirmed.
    async fn wait_for_receipt(&self, tx: &TxHandle) -> Result<TxReceipt, WalletError>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// MOCK WALLET
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
struct MockLedger {
    account: Option<String>,
    native: HashMap<String, u128>,
    /// ERC-20 balances keyed by (token, holder), lower-cased
    tokens: HashMap<(String, String), u128>,
    /// ERC-20 allowances keyed by (token, owner, spender), lower-cased
    allowances: HashMap<(String, String, String), u128>,
    receipts: HashMap<String, TxReceipt>,
    reject_writes: Option<String>,
}

/// In-memory wallet with a tiny ERC-20 ledger.
///
/// Understands `balanceOf`, `allowance` and `approve`; every other function
/// is reported as unsupported.
#[derive(Debug)]
pub struct MockWallet {
    demo_account: String,
    native_symbol: String,
    ledger: RwLock<MockLedger>,
    nonce: AtomicU64,
    block: AtomicU64,
}

impl MockWallet {
    /// Create a disconnected wallet that connects as `demo_account`.
    pub fn new(demo_account: &str) -> Self {
        Self {
            demo_account: demo_account.to_string(),
            native_symbol: "AVAX".to_string(),
            ledger: RwLock::new(MockLedger::default()),
            nonce: AtomicU64::new(0),
            block: AtomicU64::new(1),
        }
    }

    /// Create a wallet that is already connected.
    pub fn connected(demo_account: &str) -> Self {
        let mut wallet = Self::new(demo_account);
        wallet.ledger.get_mut().account = Some(demo_account.to_string());
        wallet
    }

    /// Give the demo account `native` wei and `amount` base units of `token`.
    pub fn funded(mut self, native: u128, token: &str, amount: u128) -> Self {
        let account = self.demo_account.to_lowercase();
        let ledger = self.ledger.get_mut();
        ledger.native.insert(account.clone(), native);
        ledger.tokens.insert((token.to_lowercase(), account), amount);
        self
    }

    pub fn demo_account(&self) -> &str {
        &self.demo_account
    }

    pub async fn disconnect(&self) {
        self.ledger.write().await.account = None;
    }

    pub async fn set_native_balance(&self, account: &str, value: u128) {
        self.ledger
            .write()
            .await
            .native
            .insert(account.to_lowercase(), value);
    }

    /// Credit `amount` base units of `token` to `holder`.
    pub async fn mint(&self, token: &str, holder: &str, amount: u128) {
        let mut ledger = self.ledger.write().await;
        let entry = ledger
            .tokens
            .entry((token.to_lowercase(), holder.to_lowercase()))
            .or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    pub async fn allowance(&self, token: &str, owner: &str, spender: &str) -> u128 {
        self.ledger
            .read()
            .await
            .allowances
            .get(&(token.to_lowercase(), owner.to_lowercase(), spender.to_lowercase()))
            .copied()
            .unwrap_or(0)
    }

    /// Make every following write fail with `reason`; `None` restores normal
    /// behavior.
    pub async fn reject_writes(&self, reason: Option<&str>) {
        self.ledger.write().await.reject_writes = reason.map(str::to_string);
    }

    fn next_tx_hash(&self, call: &ContractCall) -> String {
        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst);
        let mut hasher = Keccak256::new();
        hasher.update(call.address.to_lowercase().as_bytes());
        hasher.update(call.function_name.as_bytes());
        hasher.update(Value::Array(call.args.clone()).to_string().as_bytes());
        hasher.update(nonce.to_be_bytes());
        format!("0x{}", hex::encode(hasher.finalize()))
    }
}

#[async_trait]
impl WalletProvider for MockWallet {
    async fn account(&self) -> Option<String> {
        self.ledger.read().await.account.clone()
    }

    async fn connect(&self) -> Result<String, WalletError> {
        let mut ledger = self.ledger.write().await;
        ledger.account = Some(self.demo_account.clone());
        info!(account = %self.demo_account, "wallet connected");
        Ok(self.demo_account.clone())
    }

    async fn native_balance(&self, account: &str) -> Result<NativeBalance, WalletError> {
        let ledger = self.ledger.read().await;
        Ok(NativeBalance {
            value: ledger.native.get(&account.to_lowercase()).copied().unwrap_or(0),
            decimals: 18,
            symbol: self.native_symbol.clone(),
        })
    }

    async fn read_contract(&self, call: &ContractCall) -> Result<Value, WalletError> {
        let ledger = self.ledger.read().await;
        let token = call.address.to_lowercase();

        match call.function_name.as_str() {
            "balanceOf" => {
                let holder = call.arg_str(0)?.to_lowercase();
                let balance = ledger.tokens.get(&(token, holder)).copied().unwrap_or(0);
                // uint256 values travel as decimal strings
                Ok(Value::String(balance.to_string()))
            }
            "allowance" => {
                let owner = call.arg_str(0)?.to_lowercase();
                let spender = call.arg_str(1)?.to_lowercase();
                let allowance = ledger
                    .allowances
                    .get(&(token, owner, spender))
                    .copied()
                    .unwrap_or(0);
                Ok(Value::String(allowance.to_string()))
            }
            other => Err(WalletError::UnsupportedCall {
                contract: call.address.clone(),
                function: other.to_string(),
            }),
        }
    }

    async fn write_contract(&self, call: &ContractCall) -> Result<TxHandle, WalletError> {
        let mut ledger = self.ledger.write().await;
        let owner = ledger.account.clone().ok_or(WalletError::NotConnected)?;

        if let Some(reason) = &ledger.reject_writes {
            warn!(function = %call.function_name, %reason, "write rejected");
            return Err(WalletError::Rejected(reason.clone()));
        }

        match call.function_name.as_str() {
            "approve" => {
                let spender = call.arg_str(0)?.to_lowercase();
                let amount: u128 = match call.args.get(1) {
                    Some(Value::String(s)) => parse_units(s, 0)
                        .map_err(|e| WalletError::InvalidArguments(e.to_string()))?,
                    Some(Value::Number(n)) => n.as_u64().map(u128::from).ok_or_else(|| {
                        WalletError::InvalidArguments("approve: amount must be unsigned".into())
                    })?,
                    _ => {
                        return Err(WalletError::InvalidArguments(
                            "approve: missing amount".into(),
                        ))
                    }
                };
                ledger.allowances.insert(
                    (call.address.to_lowercase(), owner.to_lowercase(), spender),
                    amount,
                );
            }
            other => {
                return Err(WalletError::UnsupportedCall {
                    contract: call.address.clone(),
                    function: other.to_string(),
                })
            }
        }

        let hash = self.next_tx_hash(call);
        let block_number = self.block.fetch_add(1, Ordering::SeqCst);
        ledger.receipts.insert(
            hash.clone(),
            TxReceipt {
                hash: hash.clone(),
                block_number,
                success: true,
            },
        );
        debug!(%hash, function = %call.function_name, "transaction submitted");

        Ok(TxHandle { hash })
    }

    async fn wait_for_receipt(&self, tx: &TxHandle) -> Result<TxReceipt, WalletError> {
        self.ledger
            .read()
            .await
            .receipts
            .get(&tx.hash)
            .cloned()
            .ok_or_else(|| WalletError::TransactionNotFound(tx.hash.clone()))
    }
}
