//! Error types and result aliases.
//!
//! Defines the core `GatewayError` enumeration and common `Result` type.

use std::path::PathBuf;
use thiserror::Error;

/// Gateway-specific errors.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Route table source is unavailable. The mutation cycle is skipped
    /// and the previous snapshot retained.
    #[error("route table not found at {0}")]
    TemplateMissing(PathBuf),

    /// Mapping or artifact read/write failed. Logged and non-fatal.
    #[error("persistence failure: {0}")]
    Persistence(String),

    /// Forwarding to the active node failed after retries.
    #[error("forwarding error: {0}")]
    Forwarding(String),

    /// Route artifact could not be loaded within the retry budget.
    #[error("artifact load failed after {attempts} attempts")]
    ArtifactLoad { attempts: u32 },

    /// Webhook notification error.
    #[error("webhook error: {0}")]
    Webhook(String),
}

/// Result type alias for `GatewayError`.
pub type Result<T> = std::result::Result<T, GatewayError>;
