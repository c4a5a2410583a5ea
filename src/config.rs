//! Configuration module.
//!
//! Exposes environment-driven settings and the error taxonomy.

pub mod error;
pub mod settings;

pub use error::{GatewayError, Result};
pub use settings::{Config, NodeState};
