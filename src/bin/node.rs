//! Node binary: waits for the published route artifact, then serves the
//! mutated surface and hot-swaps it when a new generation lands.

use chameleond::node::{NodeLoader, NodeService, run_reload_loop, serve};
use chameleond::Config;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
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
        node_listen_addr = %config.node_listen_addr,
        artifact_path = %config.artifact_path.display(),
        "Node starting"
    );

    let loader = NodeLoader::new(config.clone());
    let artifact = match loader.load().await {
        Ok(artifact) => artifact,
        Err(e) => {
            error!(error = %e, "No route artifact available, giving up");
            std::process::exit(1);
        }
    };

    let service = Arc::new(NodeService::new(&artifact));
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(run_reload_loop(
        config.clone(),
        service.clone(),
        shutdown_rx.clone(),
    ));

    if let Err(e) = serve(config.node_listen_addr, service, shutdown_rx).await {
        error!(error = %e, "Node server failed");
        std::process::exit(1);
    }
}
