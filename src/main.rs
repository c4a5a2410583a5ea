//! `Chameleond` - Moving-target defense gateway for HTTP services.
//!
//! Copyright (C) 2026 Maverick
//! SPDX-License-Identifier: AGPL-3.0-only
//!
//! Initializes the application runtime, loads configuration, sets up logging,
//! and launches the gateway service and the rotation task.

use chameleond::{
    ChameleonGateway, Config, GatewayState, ReputationLedger, WebhookNotifier,
    mutation::MutationEngine, run_rotation_loop,
};

use pingora::proxy::http_proxy_service;
use pingora::server::Server;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() {
    dotenvy::dotenv().ok();

    let (non_blocking, _guard) = tracing_appender::non_blocking(std::io::stdout());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(non_blocking);

    if log_format.eq_ignore_ascii_case("pretty") {
        subscriber.init();
    } else {
        subscriber.json().init();
    }

    let config = Config::from_env();
    info!(
        listen_addr = %config.listen_addr,
        nodes = config.nodes.len(),
        mutation_interval_secs = config.mutation_interval_secs,
        log_format = %config.log_format,
        "Gateway initialized"
    );

    let state = Arc::new(GatewayState::new(&config));
    let reputation = Arc::new(ReputationLedger::new());
    let webhook = Arc::new(WebhookNotifier::new(&config));
    let engine = Arc::new(MutationEngine::new(config.clone()));

    let mut server = Server::new(None).expect("Failed to create Pingora server");
    server.bootstrap();

    let gateway = ChameleonGateway::new(
        config.clone(),
        state.clone(),
        reputation,
        webhook.clone(),
    );

    let mut proxy_service = http_proxy_service(&server.configuration, gateway);
    proxy_service.add_tcp(&config.listen_addr.to_string());
    server.add_service(proxy_service);

    // Held for the life of the process; dropping it would stop the
    // rotation task.
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    std::thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
        rt.block_on(async move {
            // First generation before the first interval elapses, so the
            // surface is mutated and the artifact published from boot.
            match engine.mutate().await {
                Ok((snapshot, _artifact)) => state.publish(Arc::new(snapshot)),
                Err(e) => warn!(error = %e, "Initial mutation failed, starting with empty mapping"),
            }
            run_rotation_loop(config, state, engine, webhook, shutdown_rx).await;
        });
    });

    server.run_forever();
}
