//! nexus-rails-teleport
//!
//! Axum-based HTTP service for the Nexus mock ecosystem. It exposes the
//! shared ecosystem store, the holder flows (vault approval, subnet
//! subscriptions, on-chain approval) and the admin teleporter console.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use nexus_ecosystem::{
    console::{self, LogConsole, LogEntry, RenewalRequest, SharedConsole},
    contracts::{parse_units, NetworkConfig, MUSDC_DECIMALS},
    flows::{self, FlowError, FlowReport, ServiceOffering, WalletOverview},
    wallet::{MockWallet, WalletProvider},
    EcosystemState, EcosystemStore, Subscription, RAIL_ID_NEXUS_TELEPORT, SEED_BALANCE,
};

pub mod config;

use crate::config::ServiceConfig;

/// Native balance the demo wallet starts with (2.5 AVAX)
const DEMO_NATIVE_BALANCE: u128 = 2_500_000_000_000_000_000;

// ═══════════════════════════════════════════════════════════════════════════════
// STATE
// ═══════════════════════════════════════════════════════════════════════════════

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    /// Active chain and contract descriptors
    pub network: Arc<NetworkConfig>,
    /// Shared mock ecosystem
    pub store: EcosystemStore,
    /// In-memory wallet standing in for the browser extension
    pub wallet: Arc<MockWallet>,
    /// Admin teleporter log
    pub console: SharedConsole,
    /// Set while an admin renewal simulation runs
    pub simulating: Arc<AtomicBool>,
}

impl AppState {
    /// Seeded state with a disconnected, funded demo wallet.
    pub fn new(config: ServiceConfig, network: NetworkConfig) -> Self {
        let seed_musdc = parse_units(&SEED_BALANCE.to_string(), MUSDC_DECIMALS).unwrap_or(0);
        let wallet = MockWallet::new(&config.demo_account).funded(
            DEMO_NATIVE_BALANCE,
            &network.contracts.mock_usdc.address,
            seed_musdc,
        );

        Self {
            config: Arc::new(config),
            network: Arc::new(network),
            store: EcosystemStore::default(),
            wallet: Arc::new(wallet),
            console: Arc::new(RwLock::new(LogConsole::seeded())),
            simulating: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Build the state from configuration, loading contract descriptors.
    pub fn from_config(config: ServiceConfig) -> anyhow::Result<Self> {
        let network = config.network_config()?;
        Ok(Self::new(config, network))
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(ServiceConfig::default(), NetworkConfig::default())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ROUTER
// ═══════════════════════════════════════════════════════════════════════════════

/// Build the router with default state
pub fn app_router() -> Router {
    app_router_with_state(AppState::default())
}

/// Build the router around existing state
pub fn app_router_with_state(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        // Ecosystem store
        .route("/ecosystem", get(get_ecosystem))
        .route("/ecosystem/subscriptions", get(list_subscriptions))
        .route("/ecosystem/balance", put(set_balance))
        // Network & wallet
        .route("/network", get(get_network))
        .route("/wallet", get(get_wallet))
        .route("/wallet/connect", post(connect_wallet))
        // Vault
        .route("/vault/approve", post(approve_vault))
        .route("/vault/approve/onchain", post(approve_vault_onchain))
        // Subnet services
        .route("/services", get(list_services))
        .route("/services/:id/subscribe", post(subscribe_service))
        // Admin console
        .route("/admin/status", get(admin_status))
        .route("/admin/logs", get(admin_logs))
        .route("/admin/simulate", post(admin_simulate))
        .layer(cors)
        .with_state(state)
}

// ═══════════════════════════════════════════════════════════════════════════════
// HANDLERS - HEALTH & ECOSYSTEM
// ═══════════════════════════════════════════════════════════════════════════════

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "rail_id": RAIL_ID_NEXUS_TELEPORT
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EcosystemResponse {
    #[serde(flatten)]
    pub state: EcosystemState,
    pub monthly_commitment: f64,
}

async fn get_ecosystem(State(state): State<AppState>) -> Json<EcosystemResponse> {
    let snapshot = state.store.snapshot();
    Json(EcosystemResponse {
        monthly_commitment: snapshot.monthly_commitment(),
        state: snapshot,
    })
}

/// Subscription as listed on the dashboard
#[derive(Debug, Serialize, Deserialize)]
pub struct SubscriptionRow {
    #[serde(flatten)]
    pub subscription: Subscription,
    /// Price formatted for display, e.g. `$49.99`
    pub display_price: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubscriptionsResponse {
    pub subscriptions: Vec<SubscriptionRow>,
    pub count: usize,
}

async fn list_subscriptions(State(state): State<AppState>) -> Json<SubscriptionsResponse> {
    let subscriptions: Vec<SubscriptionRow> = state
        .store
        .subscriptions()
        .into_iter()
        .map(|subscription| SubscriptionRow {
            display_price: subscription.display_price(),
            subscription,
        })
        .collect();
    Json(SubscriptionsResponse {
        count: subscriptions.len(),
        subscriptions,
    })
}

#[derive(Debug, Deserialize)]
pub struct SetBalanceRequest {
    pub balance: f64,
}

async fn set_balance(
    State(state): State<AppState>,
    Json(req): Json<SetBalanceRequest>,
) -> Json<EcosystemState> {
    state.store.set_balance(req.balance);
    Json(state.store.snapshot())
}

// ═══════════════════════════════════════════════════════════════════════════════
// HANDLERS - NETWORK & WALLET
// ═══════════════════════════════════════════════════════════════════════════════

async fn get_network(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.network.as_ref().clone())
}

async fn get_wallet(State(state): State<AppState>) -> Result<Json<WalletOverview>, ApiError> {
    let overview = flows::wallet_overview(state.wallet.as_ref(), &state.network).await?;
    Ok(Json(overview))
}

async fn connect_wallet(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let account = state.wallet.connect().await.map_err(|e| ApiError {
        status: StatusCode::BAD_GATEWAY,
        message: e.to_string(),
        code: "WALLET_ERROR".into(),
    })?;

    Ok(Json(serde_json::json!({
        "connected": true,
        "account": account,
        "chain_id": state.network.chain.chain_id,
    })))
}

// ═══════════════════════════════════════════════════════════════════════════════
// HANDLERS - VAULT
// ═══════════════════════════════════════════════════════════════════════════════

async fn approve_vault(State(state): State<AppState>) -> Result<Json<FlowReport>, ApiError> {
    let report = flows::approve_vault(
        &state.store,
        state.wallet.as_ref(),
        state.config.teleport_delay,
    )
    .await?;
    Ok(Json(report))
}

async fn approve_vault_onchain(
    State(state): State<AppState>,
) -> Result<Json<FlowReport>, ApiError> {
    let report = flows::approve_vault_onchain(state.wallet.as_ref(), &state.network).await?;
    Ok(Json(report))
}

// ═══════════════════════════════════════════════════════════════════════════════
// HANDLERS - SUBNET SERVICES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceListing {
    #[serde(flatten)]
    pub offering: ServiceOffering,
    pub subscribed: bool,
}

async fn list_services(State(state): State<AppState>) -> Json<Vec<ServiceListing>> {
    let listings = flows::catalog()
        .into_iter()
        .map(|offering| ServiceListing {
            subscribed: state.store.is_subscribed(&offering.id),
            offering,
        })
        .collect();
    Json(listings)
}

async fn subscribe_service(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FlowReport>, ApiError> {
    let offering = flows::catalog()
        .into_iter()
        .find(|o| o.id == id)
        .ok_or_else(|| ApiError {
            status: StatusCode::NOT_FOUND,
            message: format!("Unknown service: {}", id),
            code: "SERVICE_NOT_FOUND".into(),
        })?;

    let report = flows::subscribe_to_service(
        &state.store,
        state.wallet.as_ref(),
        &offering,
        state.config.teleport_delay,
    )
    .await?;
    Ok(Json(report))
}

// ═══════════════════════════════════════════════════════════════════════════════
// HANDLERS - ADMIN CONSOLE
// ═══════════════════════════════════════════════════════════════════════════════

async fn admin_status() -> Json<Vec<console::SystemStatus>> {
    Json(console::system_status())
}

async fn admin_logs(State(state): State<AppState>) -> Json<Vec<LogEntry>> {
    Json(state.console.read().await.entries())
}

/// Clears the simulation flag once the simulation task finishes
struct SimulationGuard(Arc<AtomicBool>);

impl SimulationGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(Arc::clone(flag)))
    }
}

impl Drop for SimulationGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

async fn admin_simulate(
    State(state): State<AppState>,
    req: Option<Json<RenewalRequest>>,
) -> Result<Json<FlowReport>, ApiError> {
    let Some(guard) = SimulationGuard::acquire(&state.simulating) else {
        warn!("renewal simulation already running");
        return Err(ApiError {
            status: StatusCode::CONFLICT,
            message: "A renewal simulation is already running".into(),
            code: "SIMULATION_IN_PROGRESS".into(),
        });
    };

    let req = req.map(|Json(r)| r).unwrap_or_default();
    let console = Arc::clone(&state.console);
    let timing = state.config.renewal_timing;

    // Runs detached so a dropped request cannot cut the renewal short
    let simulation = tokio::spawn(async move {
        let _guard = guard;
        console::simulate_renewal(&console, &req, &timing).await
    });

    let report = simulation.await.map_err(|e| ApiError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: format!("Renewal simulation failed: {}", e),
        code: "SIMULATION_FAILED".into(),
    })??;
    Ok(Json(report))
}

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR HANDLING
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub code: String,
}

impl From<FlowError> for ApiError {
    fn from(err: FlowError) -> Self {
        let (status, code) = match &err {
            FlowError::WalletNotConnected => (StatusCode::UNAUTHORIZED, "WALLET_NOT_CONNECTED"),
            FlowError::MissingTargetAddress => (StatusCode::BAD_REQUEST, "MISSING_TARGET_ADDRESS"),
            FlowError::Wallet { .. } => (StatusCode::BAD_GATEWAY, "WALLET_ERROR"),
            FlowError::Settlement { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "SETTLEMENT_FAILED"),
            FlowError::ApprovalInProgress => (StatusCode::CONFLICT, "APPROVAL_IN_PROGRESS"),
            FlowError::SubscriptionInProgress(_) => (StatusCode::CONFLICT, "SUBSCRIPTION_IN_PROGRESS"),
            FlowError::InvalidAmount(_) => (StatusCode::BAD_REQUEST, "INVALID_AMOUNT"),
        };
        Self {
            status,
            message: err.to_string(),
            code: code.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let body = serde_json::json!({
            "error": self.message,
            "error_code": self.code,
        });
        (self.status, Json(body)).into_response()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MAIN ENTRY POINT
// ═══════════════════════════════════════════════════════════════════════════════

pub mod main_entry {
    use super::*;
    use std::net::SocketAddr;

    use nexus_ecosystem::console::{spawn_feed, FeedTiming};

    pub async fn run_server() -> anyhow::Result<()> {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "nexus_rails_teleport=info,nexus_ecosystem=info".into()),
            )
            .init();

        dotenvy::dotenv().ok();
        let config = ServiceConfig::from_env()?;
        let port = config.port;

        let state = AppState::from_config(config)?;
        info!(
            network = ?state.network.network,
            chain_id = state.network.chain.chain_id,
            account = %state.wallet.demo_account(),
            "ecosystem ready"
        );

        let _feed = spawn_feed(Arc::clone(&state.console), FeedTiming::default());

        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        info!("Nexus teleport rail listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app_router_with_state(state)).await?;

        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
