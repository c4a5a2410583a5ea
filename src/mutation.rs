//! Mutation engine and persistence.
//!
//! Derives a randomized route mapping from the stable route table each
//! generation and publishes the regenerated artifact for the nodes.

pub mod engine;
pub mod routes;
pub mod store;

pub use engine::MutationEngine;
pub use routes::{ArtifactRoute, MappingSnapshot, MutationRecord, RouteArtifact, RouteDefinition, RouteTable};
pub use store::MappingStore;
