//! Shared gateway state.
//!
//! The current mapping snapshot is copy-on-publish: the whole `Arc` is
//! replaced and never mutated in place, so request handlers that
//! captured a snapshot keep a consistent view while rotations proceed.
//! The active node index is an atomic advanced modulo the node count.

use crate::config::{Config, NodeState};
use crate::mutation::MappingSnapshot;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// State owned by the gateway: current snapshot, active node pointer.
pub struct GatewayState {
    snapshot: RwLock<Arc<MappingSnapshot>>,
    active_node: AtomicUsize,
    nodes: Vec<NodeState>,
}

impl GatewayState {
    /// # Panics
    ///
    /// Panics if the configured node list is empty.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        assert!(!config.nodes.is_empty(), "node list must not be empty");
        Self {
            snapshot: RwLock::new(Arc::new(MappingSnapshot::default())),
            active_node: AtomicUsize::new(0),
            nodes: config.nodes.clone(),
        }
    }

    /// Current snapshot reference. Callers hold the returned `Arc` for
    /// the remainder of the request regardless of concurrent publishes.
    #[must_use]
    pub fn current_snapshot(&self) -> Arc<MappingSnapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Atomically replaces the current snapshot.
    pub fn publish(&self, snapshot: Arc<MappingSnapshot>) {
        *self
            .snapshot
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = snapshot;
    }

    #[must_use]
    pub fn nodes(&self) -> &[NodeState] {
        &self.nodes
    }

    #[must_use]
    pub fn active_index(&self) -> usize {
        self.active_node.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn node(&self, index: usize) -> &NodeState {
        &self.nodes[index % self.nodes.len()]
    }

    #[must_use]
    pub fn active_node(&self) -> &NodeState {
        self.node(self.active_index())
    }

    /// Advances the active pointer to the next node and returns it.
    pub fn advance_node(&self) -> &NodeState {
        let next = self
            .active_node
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |i| {
                Some((i + 1) % self.nodes.len())
            })
            .map(|prev| (prev + 1) % self.nodes.len())
            .unwrap_or(0);
        &self.nodes[next]
    }
}
