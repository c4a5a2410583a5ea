//! Rotation task.
//!
//! Background loop that re-invokes the mutation engine on a fixed
//! interval, publishes the new snapshot, and advances the active node.
//! Node rotation is decoupled from mutation success so the system keeps
//! moving under partial failure; the loop itself never terminates the
//! process on error.

use crate::config::Config;
use crate::core::gateway::state::GatewayState;
use crate::features::webhook::{EventType, WebhookNotifier, WebhookPayload, epoch_timestamp};
use crate::mutation::MutationEngine;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// Runs the rotation schedule until the shutdown signal flips.
pub async fn run_rotation_loop(
    config: Arc<Config>,
    state: Arc<GatewayState>,
    engine: Arc<MutationEngine>,
    webhook: Arc<WebhookNotifier>,
    mut shutdown: watch::Receiver<bool>,
) {
    let interval = Duration::from_secs(config.mutation_interval_secs);
    info!(interval_secs = config.mutation_interval_secs, "Rotation task started");

    loop {
        tokio::select! {
            () = tokio::time::sleep(interval) => {}
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("Rotation task stopping");
                    return;
                }
            }
        }

        match engine.mutate().await {
            Ok((snapshot, _artifact)) => {
                state.publish(Arc::new(snapshot));
            }
            Err(e) => {
                warn!(error = %e, "Mutation cycle failed, keeping previous snapshot");
                webhook.notify(WebhookPayload {
                    event_type: EventType::MutationFailed,
                    timestamp: epoch_timestamp(),
                    source_ip: None,
                    severity: 3,
                    message: format!("Mutation cycle failed: {e}"),
                });
            }
        }

        let node = state.advance_node();
        info!(node = %node.name, base_url = %node.base_url, "Traffic re-routed");
        webhook.notify(WebhookPayload {
            event_type: EventType::NodeRotated,
            timestamp: epoch_timestamp(),
            source_ip: None,
            severity: 1,
            message: format!("Traffic re-routed to node {}", node.name),
        });
    }
}
