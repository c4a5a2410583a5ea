//! Configuration settings.
//!
//! Defines the main `Config` struct and environment variable loading logic.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

fn get_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} must be set in environment"))
}

fn get_env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn get_env_u32_or(key: &str, default: u32) -> u32 {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn get_env_u64_or(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn get_env_usize_or(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// One backend node. Exactly one node in the configured list is active
/// at any time; the rotation task advances the active index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeState {
    /// Display name used in logs and webhook events.
    pub name: String,
    /// Base URL the gateway forwards matched requests to.
    pub base_url: String,
}

impl NodeState {
    /// Host:port authority of the node, with the URL scheme stripped.
    #[must_use]
    pub fn authority(&self) -> &str {
        self.base_url
            .strip_prefix("http://")
            .or_else(|| self.base_url.strip_prefix("https://"))
            .unwrap_or(&self.base_url)
            .trim_end_matches('/')
    }
}

fn parse_nodes(raw: &str) -> Vec<NodeState> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| {
            let (name, base_url) = entry
                .split_once('=')
                .unwrap_or_else(|| panic!("NODES entry '{entry}' must be NAME=URL"));
            NodeState {
                name: name.trim().to_string(),
                base_url: base_url.trim().to_string(),
            }
        })
        .collect()
}

/// Application configuration loaded from environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the gateway listens on.
    pub listen_addr: SocketAddr,
    /// Ordered backend node list; index 0 is active at boot.
    pub nodes: Vec<NodeState>,
    /// Seconds between mutation generations.
    pub mutation_interval_secs: u64,
    /// Per-request upstream timeout in seconds.
    pub request_timeout_secs: u64,
    /// Connect retry budget when forwarding to the active node.
    pub forward_retries: u32,
    /// Length of the random path suffix per generation.
    pub suffix_length: usize,
    /// Alphabet the suffix is drawn from.
    pub suffix_alphabet: String,
    /// Path to the human-authored route table (JSON array).
    pub route_table_path: PathBuf,
    /// Path of the mapping store file shared with external readers.
    pub mapping_state_path: PathBuf,
    /// Path the regenerated route artifact is published to.
    pub artifact_path: PathBuf,
    /// Upper bound of the random pre-processing delay for flagged sources.
    pub reputation_max_delay_ms: u64,
    /// Fixed additional delay applied on an unmapped-route miss.
    pub miss_penalty_ms: u64,
    /// Deception payload: top-level status field.
    pub deception_status: String,
    /// Deception payload: fake username.
    pub deception_username: String,
    /// Deception payload: fake permission level.
    pub deception_permissions: String,
    /// Deception payload: account flag marking the trap.
    pub deception_account_flag: String,
    /// Deception payload: system message.
    pub deception_system_message: String,
    /// Node loader: attempt budget while waiting for the artifact.
    pub loader_max_retries: u32,
    /// Node loader: fixed backoff between attempts in milliseconds.
    pub loader_backoff_ms: u64,
    /// Address the node binary serves the loaded artifact on.
    pub node_listen_addr: SocketAddr,
    /// Webhook URL for security notifications.
    pub webhook_url: Option<String>,
    /// Bearer token for the webhook endpoint.
    pub webhook_token: Option<String>,
    /// Logging format: "json" or "pretty".
    pub log_format: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// # Panics
    ///
    /// Panics if `NODES` is missing or malformed, or if an address
    /// variable does not parse as a socket address.
    #[must_use]
    pub fn from_env() -> Arc<Self> {
        let listen_addr = get_env_or("LISTEN_ADDR", "0.0.0.0:8000")
            .parse()
            .expect("LISTEN_ADDR must be a valid socket address");
        let nodes = parse_nodes(&get_env("NODES"));
        assert!(!nodes.is_empty(), "NODES must list at least one node");
        let node_listen_addr = get_env_or("NODE_LISTEN_ADDR", "127.0.0.1:8001")
            .parse()
            .expect("NODE_LISTEN_ADDR must be a valid socket address");

        Arc::new(Self {
            listen_addr,
            nodes,
            mutation_interval_secs: get_env_u64_or("MUTATION_INTERVAL_SECS", 25),
            request_timeout_secs: get_env_u64_or("REQUEST_TIMEOUT_SECS", 5),
            forward_retries: get_env_u32_or("FORWARD_RETRIES", 3),
            suffix_length: get_env_usize_or("SUFFIX_LENGTH", 6),
            suffix_alphabet: get_env_or("SUFFIX_ALPHABET", "abcdefghijklmnopqrstuvwxyz0123456789"),
            route_table_path: PathBuf::from(get_env_or("ROUTE_TABLE_PATH", "routes.json")),
            mapping_state_path: PathBuf::from(get_env_or(
                "MAPPING_STATE_PATH",
                "/tmp/mutation_state.json",
            )),
            artifact_path: PathBuf::from(get_env_or("ARTIFACT_PATH", "/tmp/active_routes.json")),
            reputation_max_delay_ms: get_env_u64_or("REPUTATION_MAX_DELAY_MS", 1000),
            miss_penalty_ms: get_env_u64_or("MISS_PENALTY_MS", 300),
            deception_status: get_env_or("DECEPTION_STATUS", "CRITICAL_SUCCESS"),
            deception_username: get_env_or("DECEPTION_USERNAME", "admin_root"),
            deception_permissions: get_env_or("DECEPTION_PERMISSIONS", "UNLIMITED"),
            deception_account_flag: get_env_or(
                "DECEPTION_ACCOUNT_FLAG",
                "TRAP_DOOR_ACTIVATED_IP_LOGGED",
            ),
            deception_system_message: get_env_or(
                "DECEPTION_SYSTEM_MESSAGE",
                "Root access granted. Downloading database...",
            ),
            loader_max_retries: get_env_u32_or("LOADER_MAX_RETRIES", 8),
            loader_backoff_ms: get_env_u64_or("LOADER_BACKOFF_MS", 500),
            node_listen_addr,
            webhook_url: env::var("WEBHOOK_URL").ok().filter(|s| !s.is_empty()),
            webhook_token: env::var("WEBHOOK_TOKEN").ok().filter(|s| !s.is_empty()),
            log_format: get_env_or("LOG_FORMAT", "json"),
        })
    }
}
