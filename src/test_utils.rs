//! Shared helpers for unit and integration tests.

use crate::config::{Config, NodeState};
use std::path::Path;
use std::sync::Arc;

/// Builds a config with two nodes and fast timings, bypassing the
/// environment so tests stay independent of it.
#[must_use]
pub fn create_test_config() -> Arc<Config> {
    Arc::new(Config {
        listen_addr: "127.0.0.1:8000".parse().unwrap(),
        nodes: vec![
            NodeState {
                name: "ALPHA".to_string(),
                base_url: "http://127.0.0.1:8001".to_string(),
            },
            NodeState {
                name: "BETA".to_string(),
                base_url: "http://127.0.0.1:8002".to_string(),
            },
        ],
        mutation_interval_secs: 25,
        request_timeout_secs: 5,
        forward_retries: 3,
        suffix_length: 6,
        suffix_alphabet: "abcdefghijklmnopqrstuvwxyz0123456789".to_string(),
        route_table_path: "routes.json".into(),
        mapping_state_path: "/tmp/mutation_state.json".into(),
        artifact_path: "/tmp/active_routes.json".into(),
        reputation_max_delay_ms: 20,
        miss_penalty_ms: 10,
        deception_status: "CRITICAL_SUCCESS".to_string(),
        deception_username: "admin_root".to_string(),
        deception_permissions: "UNLIMITED".to_string(),
        deception_account_flag: "TRAP_DOOR_ACTIVATED_IP_LOGGED".to_string(),
        deception_system_message: "Root access granted. Downloading database...".to_string(),
        loader_max_retries: 8,
        loader_backoff_ms: 500,
        node_listen_addr: "127.0.0.1:8001".parse().unwrap(),
        webhook_url: None,
        webhook_token: None,
        log_format: "pretty".to_string(),
    })
}

/// Writes a small banking-demo route table: three mutable routes plus a
/// stable root.
pub async fn write_demo_route_table(path: &Path) {
    let routes = serde_json::json!([
        {
            "method": "GET",
            "path": "/admin/login",
            "handler": "admin_login",
            "response": {"status": "Login Page", "auth_token": "X99-KEY", "version": "1.0"}
        },
        {
            "method": "GET",
            "path": "/api/balance",
            "handler": "get_balance",
            "response": {"user": "admin", "balance": 4521.77}
        },
        {
            "method": "POST",
            "path": "/api/transfer",
            "handler": "transfer_funds",
            "response": {"status": "Transfer queued"},
            "status": 202
        },
        {
            "method": "GET",
            "path": "/",
            "handler": "home",
            "stable": true,
            "response": {"message": "Welcome to the Bank. System Operational."}
        }
    ]);
    tokio::fs::write(path, serde_json::to_vec_pretty(&routes).unwrap())
        .await
        .unwrap();
}
