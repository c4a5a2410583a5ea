//! Deception payload.
//!
//! The static response served for unmapped paths. Shaped like a
//! plausible privileged success so replay of stale or guessed paths
//! appears to work while being inert.

use crate::config::Config;
use serde::Serialize;

/// Fake user record embedded in the deception payload.
#[derive(Debug, Clone, Serialize)]
pub struct DeceptionUserData {
    pub username: String,
    pub permissions: String,
    pub account_flag: String,
}

/// The fixed deception response body.
#[derive(Debug, Clone, Serialize)]
pub struct DeceptionPayload {
    pub status: String,
    pub user_data: DeceptionUserData,
    pub system_message: String,
}

impl DeceptionPayload {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            status: config.deception_status.clone(),
            user_data: DeceptionUserData {
                username: config.deception_username.clone(),
                permissions: config.deception_permissions.clone(),
                account_flag: config.deception_account_flag.clone(),
            },
            system_message: config.deception_system_message.clone(),
        }
    }

    /// Serialized body. The payload is config-derived and always valid.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
