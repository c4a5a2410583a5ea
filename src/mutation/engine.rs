//! Mutation engine.
//!
//! Consumes the route table and produces a new generation's mapping
//! snapshot plus a regenerated route artifact. Non-stable routes get a
//! random suffix drawn from a cryptographically secure source; stable
//! routes are copied through unchanged so a liveness/identity endpoint
//! stays reachable across all generations.

use crate::config::{Config, Result};
use crate::mutation::routes::{
    ArtifactRoute, MappingSnapshot, MutationRecord, RouteArtifact, RouteTable,
};
use crate::mutation::store::{MappingStore, write_atomic};
use rand::Rng;
use rand::rngs::OsRng;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// Produces one mutation generation per call.
pub struct MutationEngine {
    config: Arc<Config>,
    store: MappingStore,
    generation: AtomicU64,
}

/// Random suffix over the given alphabet, drawn from the OS CSPRNG.
fn chaos_suffix(alphabet: &[char], length: usize) -> String {
    let mut rng = OsRng;
    (0..length)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())])
        .collect()
}

impl MutationEngine {
    #[must_use]
    pub fn new(config: Arc<Config>) -> Self {
        let store = MappingStore::new(config.mapping_state_path.clone());
        Self {
            config,
            store,
            generation: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn store(&self) -> &MappingStore {
        &self.store
    }

    /// Runs one mutation cycle: load the route table, derive the new
    /// mapping and artifact, and persist both atomically.
    ///
    /// Persistence failures are logged and non-fatal; the freshly built
    /// snapshot is still returned so the gateway keeps moving.
    ///
    /// # Errors
    ///
    /// Returns `TemplateMissing` when the route table is unavailable
    /// (callers treat this as "mutation unavailable this cycle") and
    /// `Persistence` when it cannot be parsed.
    pub async fn mutate(&self) -> Result<(MappingSnapshot, RouteArtifact)> {
        let table = RouteTable::load(&self.config.route_table_path).await?;
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;

        let alphabet: Vec<char> = self.config.suffix_alphabet.chars().collect();
        let mut entries = HashMap::with_capacity(table.routes.len());
        let mut records = Vec::new();
        let mut artifact_routes = Vec::with_capacity(table.routes.len());
        // Suffixes are unique within a generation; calls stay independent.
        let mut used = HashSet::new();

        for route in &table.routes {
            let (mutated_path, mutated_handler) = if route.stable {
                (route.path.clone(), route.handler.clone())
            } else {
                let mut suffix = chaos_suffix(&alphabet, self.config.suffix_length);
                while !used.insert(suffix.clone()) {
                    suffix = chaos_suffix(&alphabet, self.config.suffix_length);
                }
                records.push(MutationRecord {
                    original_path: route.path.clone(),
                    mutated_path: format!("{}_{suffix}", route.path),
                    handler: format!("{}_{suffix}", route.handler),
                    generation,
                });
                (
                    format!("{}_{suffix}", route.path),
                    format!("{}_{suffix}", route.handler),
                )
            };

            entries.insert(route.path.clone(), mutated_path.clone());
            artifact_routes.push(ArtifactRoute {
                method: route.method.clone(),
                path: mutated_path,
                handler: mutated_handler,
                response: route.response.clone(),
                status: route.status,
            });
        }

        debug!(generation, mutated = records.len(), "Route surface rewritten");

        let snapshot = MappingSnapshot::new(generation, entries);
        let artifact = RouteArtifact {
            generation,
            routes: artifact_routes,
        };

        self.persist(&snapshot, &artifact).await;

        info!(
            generation,
            routes = snapshot.entries.len(),
            "Mutation generation published"
        );
        Ok((snapshot, artifact))
    }

    async fn persist(&self, snapshot: &MappingSnapshot, artifact: &RouteArtifact) {
        match serde_json::to_vec_pretty(artifact) {
            Ok(payload) => {
                if let Err(e) = write_atomic(&self.config.artifact_path, &payload).await {
                    warn!(error = %e, path = %self.config.artifact_path.display(), "Artifact write failed");
                }
            }
            Err(e) => warn!(error = %e, "Artifact serialization failed"),
        }

        if let Err(e) = self.store.save(&snapshot.entries).await {
            warn!(error = %e, path = %self.store.path().display(), "Mapping state write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayError;
    use crate::test_utils::{create_test_config, write_demo_route_table};
    use proptest::prelude::*;

    fn engine_in(dir: &std::path::Path) -> MutationEngine {
        let mut config = Arc::unwrap_or_clone(create_test_config());
        config.route_table_path = dir.join("routes.json");
        config.mapping_state_path = dir.join("mutation_state.json");
        config.artifact_path = dir.join("active_routes.json");
        MutationEngine::new(Arc::new(config))
    }

    #[tokio::test]
    async fn test_missing_table_is_template_missing() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(dir.path());
        let err = engine.mutate().await.unwrap_err();
        assert!(matches!(err, GatewayError::TemplateMissing(_)));
    }

    #[tokio::test]
    async fn test_stable_routes_identity_mapped_every_generation() {
        let dir = tempfile::tempdir().unwrap();
        write_demo_route_table(&dir.path().join("routes.json")).await;
        let engine = engine_in(dir.path());

        for _ in 0..5 {
            let (snapshot, _) = engine.mutate().await.unwrap();
            assert_eq!(snapshot.resolve("/"), Some("/"));
        }
    }

    #[tokio::test]
    async fn test_mutated_path_shape() {
        let dir = tempfile::tempdir().unwrap();
        write_demo_route_table(&dir.path().join("routes.json")).await;
        let engine = engine_in(dir.path());

        let (snapshot, _) = engine.mutate().await.unwrap();
        let mutated = snapshot.resolve("/admin/login").unwrap();

        assert_ne!(mutated, "/admin/login");
        let suffix = mutated.strip_prefix("/admin/login_").unwrap();
        assert_eq!(suffix.len(), 6);
        assert!(suffix.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn test_mutated_paths_unique_within_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        write_demo_route_table(&dir.path().join("routes.json")).await;
        let engine = engine_in(dir.path());

        let (snapshot, _) = engine.mutate().await.unwrap();
        let values: HashSet<&String> = snapshot.entries.values().collect();
        assert_eq!(values.len(), snapshot.entries.len());
    }

    #[tokio::test]
    async fn test_generation_strictly_increases() {
        let dir = tempfile::tempdir().unwrap();
        write_demo_route_table(&dir.path().join("routes.json")).await;
        let engine = engine_in(dir.path());

        let (first, _) = engine.mutate().await.unwrap();
        let (second, _) = engine.mutate().await.unwrap();
        let (third, _) = engine.mutate().await.unwrap();
        assert!(first.generation < second.generation);
        assert!(second.generation < third.generation);
    }

    #[tokio::test]
    async fn test_artifact_exposes_only_mutated_surface() {
        let dir = tempfile::tempdir().unwrap();
        write_demo_route_table(&dir.path().join("routes.json")).await;
        let engine = engine_in(dir.path());

        let (snapshot, artifact) = engine.mutate().await.unwrap();
        assert_eq!(artifact.generation, snapshot.generation);
        for route in &artifact.routes {
            assert!(snapshot.entries.values().any(|v| v == &route.path));
        }
        let login = artifact
            .routes
            .iter()
            .find(|r| r.path.starts_with("/admin/login_"))
            .unwrap();
        assert!(login.handler.starts_with("admin_login_"));
        assert_eq!(login.response["status"], "Login Page");
    }

    #[tokio::test]
    async fn test_persists_state_and_artifact_atomically() {
        let dir = tempfile::tempdir().unwrap();
        write_demo_route_table(&dir.path().join("routes.json")).await;
        let engine = engine_in(dir.path());

        let (snapshot, _) = engine.mutate().await.unwrap();

        let stored = engine.store().load().await.unwrap().unwrap();
        assert_eq!(stored, snapshot.entries);

        let artifact = RouteArtifact::load(&dir.path().join("active_routes.json"))
            .await
            .unwrap();
        assert_eq!(artifact.generation, snapshot.generation);
        assert!(!dir.path().join("active_routes.json.tmp").exists());
        assert!(!dir.path().join("mutation_state.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_collision_rate_negligible_across_calls() {
        // Many independent generations of the same route should not
        // repeat suffixes at any meaningful rate.
        let dir = tempfile::tempdir().unwrap();
        write_demo_route_table(&dir.path().join("routes.json")).await;
        let engine = engine_in(dir.path());

        let mut seen = HashSet::new();
        let samples = 500;
        for _ in 0..samples {
            let (snapshot, _) = engine.mutate().await.unwrap();
            seen.insert(snapshot.resolve("/admin/login").unwrap().to_string());
        }
        // 36^6 possibilities; allow at most a couple of repeats.
        assert!(seen.len() >= samples - 2, "suffix collisions: {}", samples - seen.len());
    }

    proptest! {
        #[test]
        fn prop_suffix_length_and_alphabet(length in 1usize..24) {
            let alphabet: Vec<char> = "abcdefghijklmnopqrstuvwxyz0123456789".chars().collect();
            let suffix = chaos_suffix(&alphabet, length);
            prop_assert_eq!(suffix.chars().count(), length);
            prop_assert!(suffix.chars().all(|c| alphabet.contains(&c)));
        }

        #[test]
        fn prop_suffix_respects_custom_alphabet(length in 1usize..16) {
            let alphabet: Vec<char> = "XYZ9".chars().collect();
            let suffix = chaos_suffix(&alphabet, length);
            prop_assert!(suffix.chars().all(|c| "XYZ9".contains(c)));
        }
    }
}
