//! Webhook notifications.
//!
//! Handles asynchronous dispatch of security alerts to external endpoints.

use crate::config::{Config, GatewayError, Result};
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error};

/// Security event types for webhook notifications.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    IntrusionDetected,
    MutationFailed,
    ForwardingFailed,
    NodeRotated,
}

/// Webhook payload for security events.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookPayload {
    pub event_type: EventType,
    pub timestamp: i64,
    pub source_ip: Option<String>,
    pub severity: u8,
    pub message: String,
}

pub struct WebhookNotifier {
    client: Client,
    webhook_url: Option<String>,
    webhook_token: Option<String>,
}

impl WebhookNotifier {
    #[must_use]
    pub fn new(config: &Arc<Config>) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            webhook_url: config.webhook_url.clone(),
            webhook_token: config.webhook_token.clone(),
        }
    }

    pub fn notify(&self, payload: WebhookPayload) {
        let Some(url) = self.webhook_url.clone() else {
            return;
        };

        let client = self.client.clone();
        let token = self.webhook_token.clone();
        tokio::spawn(async move {
            if let Err(e) = Self::send_notification(&client, &url, token.as_deref(), &payload).await
            {
                error!(error = %e, "Webhook notification failed");
            }
        });
    }

    async fn send_notification(
        client: &Client,
        url: &str,
        token: Option<&str>,
        payload: &WebhookPayload,
    ) -> Result<()> {
        let (tags, title) = match payload.event_type {
            EventType::IntrusionDetected => ("rotating_light,honey_pot", "Intrusion Detected"),
            EventType::MutationFailed => ("dna,warning", "Mutation Cycle Failed"),
            EventType::ForwardingFailed => ("electric_plug,warning", "Node Forwarding Failed"),
            EventType::NodeRotated => ("arrows_counterclockwise", "Active Node Rotated"),
        };

        let mut req = client
            .post(url)
            .header("Title", title)
            .header("Priority", payload.severity.to_string())
            .header("Tags", tags)
            .body(payload.message.clone());

        if let Some(t) = token {
            req = req.header("Authorization", format!("Bearer {t}"));
        }

        req.send()
            .await
            .map_err(|e| GatewayError::Webhook(e.to_string()))?;

        debug!(event_type = ?payload.event_type, "Webhook notification sent");
        Ok(())
    }
}

/// Seconds since the Unix epoch, saturating at zero.
#[must_use]
pub fn epoch_timestamp() -> i64 {
    i64::try_from(
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs(),
    )
    .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_config;

    #[test]
    fn test_payload_serialization() {
        let payload = WebhookPayload {
            event_type: EventType::IntrusionDetected,
            timestamp: 1_234_567_890,
            source_ip: Some("10.0.0.9".into()),
            severity: 5,
            message: "Unmapped route probed".into(),
        };

        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("intrusion_detected"));
        assert!(json.contains("10.0.0.9"));
        assert!(json.contains("1234567890"));
    }

    #[test]
    fn test_notifier_creation_no_url() {
        let config = create_test_config();
        let notifier = WebhookNotifier::new(&config);
        assert!(notifier.webhook_url.is_none());
    }

    #[tokio::test]
    async fn test_notify_without_url_does_not_panic() {
        let config = create_test_config();
        let notifier = WebhookNotifier::new(&config);
        notifier.notify(WebhookPayload {
            event_type: EventType::NodeRotated,
            timestamp: 123,
            source_ip: None,
            severity: 1,
            message: "test".into(),
        });
    }

    #[test]
    fn test_payload_without_source_ip() {
        let payload = WebhookPayload {
            event_type: EventType::MutationFailed,
            timestamp: 999,
            source_ip: None,
            severity: 3,
            message: "cycle skipped".into(),
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("mutation_failed"));
        assert!(json.contains("null"));
    }

    #[test]
    fn test_epoch_timestamp_positive() {
        assert!(epoch_timestamp() > 0);
    }
}
