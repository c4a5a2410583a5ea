//! Optional integrations.

pub mod webhook;

pub use webhook::{EventType, WebhookNotifier, WebhookPayload};
