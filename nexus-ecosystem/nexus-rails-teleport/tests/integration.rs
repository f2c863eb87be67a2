//! Integration tests for the Nexus teleport rail
//!
//! These tests drive the service end to end:
//! 1. Reading and adjusting the shared ecosystem
//! 2. Connecting the wallet and approving the vault
//! 3. Subscribing to subnet services
//! 4. On-chain vault approval
//! 5. The admin console and renewal simulation

use std::time::Duration;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::json;

use nexus_ecosystem::console::RenewalTiming;
use nexus_ecosystem::contracts::NetworkConfig;
use nexus_ecosystem::flows::{subscribe_key, APPROVE_VAULT_KEY};
use nexus_ecosystem::{EcosystemState, EcosystemStore};
use nexus_rails_teleport::{app_router_with_state, config::ServiceConfig, AppState};

// ═══════════════════════════════════════════════════════════════════════════════
// HELPER FUNCTIONS
// ═══════════════════════════════════════════════════════════════════════════════

fn create_test_state() -> AppState {
    let config = ServiceConfig {
        teleport_delay: Duration::ZERO,
        renewal_timing: RenewalTiming::scaled(0),
        ..Default::default()
    };
    AppState::new(config, NetworkConfig::default())
}

fn create_test_server() -> TestServer {
    TestServer::new(app_router_with_state(create_test_state())).unwrap()
}

/// Server whose ecosystem has not approved the vault yet
fn create_unapproved_server() -> TestServer {
    let mut state = create_test_state();
    let seeded = EcosystemState::seeded();
    state.store = EcosystemStore::new(EcosystemState::new(
        seeded.balance,
        false,
        seeded.subscriptions,
    ));
    TestServer::new(app_router_with_state(state)).unwrap()
}

async fn connect(server: &TestServer) {
    server.post("/wallet/connect").await.assert_status_ok();
}

fn messages(body: &serde_json::Value) -> Vec<String> {
    body["notifications"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["message"].as_str().unwrap().to_string())
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// ECOSYSTEM TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_health_endpoint() {
    let server = create_test_server();

    let response = server.get("/health").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["rail_id"], "NEXUS_TELEPORT");
}

#[tokio::test]
async fn test_seeded_ecosystem() {
    let server = create_test_server();

    let body: serde_json::Value = server.get("/ecosystem").await.json();
    assert_eq!(body["balance"], 1420.50);
    assert_eq!(body["vault_approved"], true);
    assert_eq!(body["monthly_commitment"], 169.99);

    let body: serde_json::Value = server.get("/ecosystem/subscriptions").await.json();
    assert_eq!(body["count"], 2);
    assert_eq!(body["subscriptions"][0]["status"], "ACTIVE");
    assert_eq!(body["subscriptions"][0]["display_price"], "$49.99");
}

#[tokio::test]
async fn test_set_balance() {
    let server = create_test_server();

    let response = server
        .put("/ecosystem/balance")
        .json(&json!({ "balance": 42.0 }))
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = server.get("/ecosystem").await.json();
    assert_eq!(body["balance"], 42.0);
    // Other fields untouched
    assert_eq!(body["subscriptions"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_network_endpoint() {
    let server = create_test_server();

    let body: serde_json::Value = server.get("/network").await.json();
    assert_eq!(body["network"], "testnet");
    assert_eq!(body["chain"]["chain_id"], 43113);
    assert_eq!(body["chains"].as_array().unwrap().len(), 2);
    assert_eq!(
        body["contracts"]["mock_usdc"]["address"],
        "0x0Ea1fc10a7Bd14231d41E7575aA00888ca5255dC"
    );
}

// ═══════════════════════════════════════════════════════════════════════════════
// WALLET & VAULT TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_wallet_overview() {
    let server = create_test_server();

    let body: serde_json::Value = server.get("/wallet").await.json();
    assert_eq!(body["connected"], false);
    assert_eq!(body["native_balance"], "0.0000");

    connect(&server).await;

    let body: serde_json::Value = server.get("/wallet").await.json();
    assert_eq!(body["connected"], true);
    assert_eq!(body["native_balance"], "2.5000");
    assert_eq!(body["native_symbol"], "AVAX");
    assert_eq!(body["musdc_balance"], "1420.5");
}

#[tokio::test]
async fn test_approve_vault_requires_wallet() {
    let server = create_unapproved_server();

    let response = server.post("/vault/approve").await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let body: serde_json::Value = response.json();
    assert_eq!(body["error_code"], "WALLET_NOT_CONNECTED");
    assert_eq!(body["error"], "Please connect your wallet first.");

    let body: serde_json::Value = server.get("/ecosystem").await.json();
    assert_eq!(body["vault_approved"], false);
}

#[tokio::test]
async fn test_approve_vault() {
    let server = create_unapproved_server();
    connect(&server).await;

    let response = server.post("/vault/approve").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(
        messages(&body),
        vec![
            "Initiating cross-chain message to C-Chain...",
            "Vault Authorization Confirmed!",
        ]
    );

    let state: serde_json::Value = server.get("/ecosystem").await.json();
    assert_eq!(state["vault_approved"], true);

    // Approving again is a no-op
    let body: serde_json::Value = server.post("/vault/approve").await.json();
    assert_eq!(messages(&body), vec!["Vault is already approved."]);
}

#[tokio::test]
async fn test_approve_vault_while_pending() {
    let mut state = create_test_state();
    let seeded = EcosystemState::seeded();
    state.store = EcosystemStore::new(EcosystemState::new(
        seeded.balance,
        false,
        seeded.subscriptions,
    ));
    let _pending = state.store.begin_pending(APPROVE_VAULT_KEY).unwrap();
    let server = TestServer::new(app_router_with_state(state)).unwrap();
    connect(&server).await;

    let response = server.post("/vault/approve").await;
    response.assert_status(StatusCode::CONFLICT);

    let body: serde_json::Value = response.json();
    assert_eq!(body["error_code"], "APPROVAL_IN_PROGRESS");
}

#[tokio::test]
async fn test_approve_vault_onchain() {
    let server = create_test_server();
    connect(&server).await;

    let response = server.post("/vault/approve/onchain").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(
        messages(&body),
        vec![
            "Approving Nexus Vault...",
            "Transaction submitted...",
            "Nexus Vault Approved Successfully!",
        ]
    );
    assert!(body["data"]["tx_hash"].as_str().unwrap().starts_with("0x"));
    assert_eq!(body["data"]["musdc_balance"], "1420.5");
}

// ═══════════════════════════════════════════════════════════════════════════════
// SUBNET SERVICE TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_subscribe_prompts_connection() {
    let server = create_test_server();

    let response = server.post("/services/NX-GR-100/subscribe").await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    // The failed attempt asked the wallet to connect
    let body: serde_json::Value = server.get("/wallet").await.json();
    assert_eq!(body["connected"], true);

    let body: serde_json::Value = server.get("/ecosystem/subscriptions").await.json();
    assert_eq!(body["count"], 2);
}

#[tokio::test]
async fn test_subscribe_to_service() {
    let server = create_test_server();
    connect(&server).await;

    let response = server.post("/services/NX-GR-100/subscribe").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(
        body["notifications"].as_array().unwrap().last().unwrap()["message"],
        "Successfully registered on Galactic Raiders Subnet!"
    );

    let state: serde_json::Value = server.get("/ecosystem").await.json();
    assert_eq!(state["balance"], 1320.50);
    assert_eq!(state["subscriptions"][2]["id"], "NX-GR-100");

    let services: serde_json::Value = server.get("/services").await.json();
    assert_eq!(services[0]["subscribed"], true);

    // A second attempt does not charge again
    let body: serde_json::Value = server.post("/services/NX-GR-100/subscribe").await.json();
    assert_eq!(
        messages(&body),
        vec!["Active Subscription on Galactic Raiders Subnet"]
    );
    let state: serde_json::Value = server.get("/ecosystem").await.json();
    assert_eq!(state["balance"], 1320.50);
}

#[tokio::test]
async fn test_subscribe_while_pending() {
    let state = create_test_state();
    let _pending = state.store.begin_pending(&subscribe_key("NX-GR-100")).unwrap();
    let server = TestServer::new(app_router_with_state(state)).unwrap();
    connect(&server).await;

    let response = server.post("/services/NX-GR-100/subscribe").await;
    response.assert_status(StatusCode::CONFLICT);

    let body: serde_json::Value = response.json();
    assert_eq!(body["error_code"], "SUBSCRIPTION_IN_PROGRESS");
    assert_eq!(body["error"], "Registration on Galactic Raiders Subnet is already in progress.");

    let state: serde_json::Value = server.get("/ecosystem").await.json();
    assert_eq!(state["balance"], 1420.50);
    assert_eq!(state["subscriptions"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_unknown_service() {
    let server = create_test_server();
    connect(&server).await;

    let response = server.post("/services/NX-NOPE/subscribe").await;
    response.assert_status(StatusCode::NOT_FOUND);

    let body: serde_json::Value = response.json();
    assert_eq!(body["error_code"], "SERVICE_NOT_FOUND");
}

// ═══════════════════════════════════════════════════════════════════════════════
// ADMIN CONSOLE TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_admin_status_and_logs() {
    let server = create_test_server();

    let cards: serde_json::Value = server.get("/admin/status").await.json();
    let cards = cards.as_array().unwrap();
    assert_eq!(cards.len(), 3);
    assert_eq!(cards[0]["label"], "Vault Contract");

    let logs: serde_json::Value = server.get("/admin/logs").await.json();
    let logs = logs.as_array().unwrap();
    assert_eq!(logs.len(), 7);
    assert_eq!(logs[0]["kind"], "system");
}

#[tokio::test]
async fn test_simulate_requires_target() {
    let server = create_test_server();

    let response = server
        .post("/admin/simulate")
        .json(&json!({ "target_address": "", "service_id": "SRV-MAIN-9921" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: serde_json::Value = response.json();
    assert_eq!(body["error_code"], "MISSING_TARGET_ADDRESS");

    let logs: serde_json::Value = server.get("/admin/logs").await.json();
    assert_eq!(logs.as_array().unwrap().len(), 7);
}

#[tokio::test]
async fn test_simulate_renewal() {
    let server = create_test_server();

    let response = server.post("/admin/simulate").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(
        messages(&body),
        vec!["Simulation Complete: Teleportation Successful!"]
    );

    let logs: serde_json::Value = server.get("/admin/logs").await.json();
    let logs = logs.as_array().unwrap();
    assert_eq!(logs.len(), 12);
    assert_eq!(logs[0]["content"], "EVT: PaymentTeleported SUCCESS - 100 mUSDC");
    assert_eq!(logs[0]["kind"], "success");
    assert_eq!(logs[3]["content"], "EVT: RenewalTriggered for UID: 0x8920...2...");
}
