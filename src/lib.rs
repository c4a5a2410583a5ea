//! Library definitions.
//!
//! Exports the configuration layer, the mutation engine, the gateway
//! service, and the node-side loader and server.

pub mod config;
pub mod core;
pub mod features;
pub mod mutation;
pub mod node;
pub mod security;

#[cfg(any(test, feature = "testing"))]
pub mod test_utils;

pub use config::{Config, GatewayError, NodeState, Result};
pub use core::gateway::{ChameleonGateway, GatewayState, run_rotation_loop};
pub use features::webhook::{EventType, WebhookNotifier, WebhookPayload};
pub use mutation::{MappingSnapshot, MutationEngine, RouteArtifact, RouteTable};
pub use node::{NodeLoader, NodeService};
pub use security::deception::DeceptionPayload;
pub use security::reputation::ReputationLedger;
