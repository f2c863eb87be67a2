//! Admin developer console: teleporter log, live event feed and the manual
//! renewal simulation.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::flows::{FlowError, FlowReport, NotificationLevel};

/// Entries kept in the console; older ones fall off the end
pub const MAX_LOG_ENTRIES: usize = 50;

pub const DEFAULT_TARGET_ADDRESS: &str = "0x8920...2456";
pub const DEFAULT_SERVICE_ID: &str = "SRV-MAIN-9921";

/// Console shared between the feed task and request handlers
pub type SharedConsole = Arc<RwLock<LogConsole>>;

// ═══════════════════════════════════════════════════════════════════════════════
// LOG ENTRIES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Info,
    Success,
    Warning,
    System,
}

/// One console line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Local wall-clock time, `HH:MM:SS`
    pub time: String,
    pub content: String,
    pub kind: LogKind,
}

/// Newest-first, bounded log
#[derive(Debug, Clone)]
pub struct LogConsole {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl Default for LogConsole {
    fn default() -> Self {
        Self::new(MAX_LOG_ENTRIES)
    }
}

impl LogConsole {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Console pre-filled with the recent teleporter history
    pub fn seeded() -> Self {
        let mut console = Self::default();
        let history = [
            ("14:22:01", "INF: Initializing Teleporter handshake with node #042", LogKind::Info),
            ("14:22:15", "INF: Calculating gas parameters for L2 bridge... OK", LogKind::Info),
            ("14:23:45", "EVT: PaymentTeleported SUCCESS - 0.45 ETH", LogKind::Success),
            ("14:25:12", "WRN: Latency spike detected in Peer-4 node link", LogKind::Warning),
            ("14:28:02", "EVT: RenewalTriggered for UID: 114-002", LogKind::Info),
            ("14:28:05", "INF: Vault lock initiated... Transaction confirmed.", LogKind::Info),
            ("14:30:11", "SYS: Listening for new socket events...", LogKind::System),
        ];
        for (time, content, kind) in history {
            console.push_at(time, content, kind);
        }
        console
    }

    /// Add a line stamped with the current local time.
    pub fn push(&mut self, content: impl Into<String>, kind: LogKind) {
        let time = chrono::Local::now().format("%H:%M:%S").to_string();
        self.push_at(&time, content, kind);
    }

    pub fn push_at(&mut self, time: &str, content: impl Into<String>, kind: LogKind) {
        self.entries.push_front(LogEntry {
            time: time.to_string(),
            content: content.into(),
            kind,
        });
        self.entries.truncate(self.capacity);
    }

    /// Entries, newest first
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<&LogEntry> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LIVE FEED
// ═══════════════════════════════════════════════════════════════════════════════

/// Pick one background event for the live feed
pub fn random_event<R: Rng>(rng: &mut R) -> (String, LogKind) {
    match rng.gen_range(0..6) {
        0 => ("SYS: Heartbeat check OK for Node-12".into(), LogKind::System),
        1 => (
            format!(
                "INF: Verified inbound Teleporter packet [Hash: {:06x}]",
                rng.gen_range(0..0x100_0000u32)
            ),
            LogKind::Info,
        ),
        2 => ("EVT: StateSync mapped new block".into(), LogKind::Info),
        3 => (
            "INF: Subnet billing indexer polled 4 new subscriptions".into(),
            LogKind::Info,
        ),
        4 => ("WRN: Minor RPC delay detected (120ms)".into(), LogKind::Warning),
        _ => (
            "EVT: CrossChainTransfer queued for processing".into(),
            LogKind::Info,
        ),
    }
}

/// Pacing of the live feed
#[derive(Debug, Clone, Copy)]
pub struct FeedTiming {
    pub first_delay: Duration,
    pub min_interval: Duration,
    pub max_interval: Duration,
}

impl Default for FeedTiming {
    fn default() -> Self {
        Self {
            first_delay: Duration::from_secs(2),
            min_interval: Duration::from_secs(2),
            max_interval: Duration::from_secs(6),
        }
    }
}

/// Running live feed; stops when dropped.
#[derive(Debug)]
pub struct FeedHandle(JoinHandle<()>);

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Start pushing random events into `console`.
pub fn spawn_feed(console: SharedConsole, timing: FeedTiming) -> FeedHandle {
    let handle = tokio::spawn(async move {
        let mut rng = StdRng::from_entropy();
        tokio::time::sleep(timing.first_delay).await;

        loop {
            let (content, kind) = random_event(&mut rng);
            debug!(%content, "feed event");
            console.write().await.push(content, kind);

            let min = timing.min_interval.as_millis() as u64;
            let max = timing.max_interval.as_millis() as u64;
            let next = if max > min { rng.gen_range(min..max) } else { min };
            tokio::time::sleep(Duration::from_millis(next)).await;
        }
    });
    FeedHandle(handle)
}

// ═══════════════════════════════════════════════════════════════════════════════
// RENEWAL SIMULATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Manual trigger form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenewalRequest {
    #[serde(default = "default_target_address")]
    pub target_address: String,
    #[serde(default = "default_service_id")]
    pub service_id: String,
}

fn default_target_address() -> String {
    DEFAULT_TARGET_ADDRESS.to_string()
}

fn default_service_id() -> String {
    DEFAULT_SERVICE_ID.to_string()
}

impl Default for RenewalRequest {
    fn default() -> Self {
        Self {
            target_address: default_target_address(),
            service_id: default_service_id(),
        }
    }
}

/// Pauses between the five renewal log lines
#[derive(Debug, Clone, Copy)]
pub struct RenewalTiming {
    pub steps: [Duration; 4],
}

impl Default for RenewalTiming {
    fn default() -> Self {
        Self {
            steps: [
                Duration::from_millis(1000),
                Duration::from_millis(1500),
                Duration::from_millis(1500),
                Duration::from_millis(1000),
            ],
        }
    }
}

impl RenewalTiming {
    /// Default pacing scaled by `percent` (100 keeps it unchanged)
    pub fn scaled(percent: u32) -> Self {
        let mut timing = Self::default();
        for step in timing.steps.iter_mut() {
            *step = *step * percent / 100;
        }
        timing
    }

    pub fn total(&self) -> Duration {
        self.steps.iter().sum()
    }
}

/// Walk a billing renewal through the teleporter, logging each hop.
pub async fn simulate_renewal(
    console: &SharedConsole,
    request: &RenewalRequest,
    timing: &RenewalTiming,
) -> Result<FlowReport, FlowError> {
    if request.target_address.trim().is_empty() {
        return Err(FlowError::MissingTargetAddress);
    }

    let uid: String = request.target_address.chars().take(10).collect();
    let hops = [
        (
            format!("EVT: RenewalTriggered for UID: {}...", uid),
            LogKind::Info,
        ),
        (
            "INF: Teleporter: Cross-chain message sent (Subnet → C-Chain)".to_string(),
            LogKind::Info,
        ),
        (
            "INF: C-Chain: NexusVault.receiveTeleporterMessage executing...".to_string(),
            LogKind::Info,
        ),
        (
            "EVT: PaymentTeleported SUCCESS - 100 mUSDC".to_string(),
            LogKind::Success,
        ),
    ];

    info!(service_id = %request.service_id, target = %request.target_address, "renewal simulation started");
    console.write().await.push(
        format!(
            "INF: Initiating triggerRenewal for Service: {}...",
            request.service_id
        ),
        LogKind::Info,
    );

    for (pause, (content, kind)) in timing.steps.iter().zip(hops) {
        tokio::time::sleep(*pause).await;
        console.write().await.push(content, kind);
    }

    info!(service_id = %request.service_id, "renewal simulation complete");
    Ok(FlowReport::single(
        NotificationLevel::Success,
        "Simulation Complete: Teleportation Successful!",
    ))
}

// ═══════════════════════════════════════════════════════════════════════════════
// SYSTEM STATUS
// ═══════════════════════════════════════════════════════════════════════════════

/// Status card for one ecosystem component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStatus {
    pub label: String,
    pub address: String,
    pub status: String,
    pub detail: String,
}

/// Status cards shown above the console
pub fn system_status() -> Vec<SystemStatus> {
    let card = |label: &str, address: &str, status: &str, detail: &str| SystemStatus {
        label: label.into(),
        address: address.into(),
        status: status.into(),
        detail: detail.into(),
    };
    vec![
        card("Vault Contract", "0x71C765...D4C731", "Online", "Balance: 142.08 ETH"),
        card("Billing Engine", "0x3A2B9C...E5F812", "Online", "Processed: 1,204 calls"),
        card("Teleporter Bridge", "0x9F1D8E...C0B4A2", "Busy", "Latency: 14ms"),
    ]
}
