//! Artifact loader.
//!
//! The node never embeds a route definition of its own. At startup it
//! polls the artifact path published by the gateway's mutation engine
//! until a non-empty artifact appears, within a bounded attempt budget.

use crate::config::{Config, GatewayError, Result};
use crate::mutation::routes::RouteArtifact;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Loads the published route artifact with bounded retries.
pub struct NodeLoader {
    config: Arc<Config>,
}

impl NodeLoader {
    #[must_use]
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// Waits for the artifact to appear and returns it.
    ///
    /// # Errors
    ///
    /// Returns `ArtifactLoad` once the attempt budget is exhausted
    /// without a usable artifact.
    pub async fn load(&self) -> Result<RouteArtifact> {
        let attempts = self.config.loader_max_retries;
        for attempt in 1..=attempts {
            match RouteArtifact::load(&self.config.artifact_path).await {
                Ok(artifact) if !artifact.routes.is_empty() => {
                    info!(
                        generation = artifact.generation,
                        routes = artifact.routes.len(),
                        attempt,
                        "Route artifact loaded"
                    );
                    return Ok(artifact);
                }
                Ok(_) => {
                    debug!(attempt, "Artifact present but empty, waiting");
                }
                Err(e) => {
                    debug!(error = %e, attempt, "Artifact not ready");
                }
            }
            if attempt < attempts {
                tokio::time::sleep(Duration::from_millis(self.config.loader_backoff_ms)).await;
            }
        }
        Err(GatewayError::ArtifactLoad { attempts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutation::routes::ArtifactRoute;
    use crate::test_utils::create_test_config;

    fn loader_in(dir: &std::path::Path, max_retries: u32) -> NodeLoader {
        let mut config = Arc::unwrap_or_clone(create_test_config());
        config.artifact_path = dir.join("active_routes.json");
        config.loader_max_retries = max_retries;
        config.loader_backoff_ms = 50;
        NodeLoader::new(Arc::new(config))
    }

    fn sample_artifact(generation: u64) -> RouteArtifact {
        RouteArtifact {
            generation,
            routes: vec![ArtifactRoute {
                method: "GET".to_string(),
                path: "/api/balance_abc123".to_string(),
                handler: "get_balance_abc123".to_string(),
                response: serde_json::json!({"balance": 1337}),
                status: 200,
            }],
        }
    }

    #[tokio::test]
    async fn test_load_immediately_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let loader = loader_in(dir.path(), 3);
        tokio::fs::write(
            dir.path().join("active_routes.json"),
            serde_json::to_vec(&sample_artifact(7)).unwrap(),
        )
        .await
        .unwrap();

        let artifact = loader.load().await.unwrap();
        assert_eq!(artifact.generation, 7);
        assert_eq!(artifact.routes.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_waits_for_late_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let loader = loader_in(dir.path(), 8);

        let path = dir.path().join("active_routes.json");
        let writer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(120)).await;
            tokio::fs::write(&path, serde_json::to_vec(&sample_artifact(1)).unwrap())
                .await
                .unwrap();
        });

        let artifact = loader.load().await.unwrap();
        writer.await.unwrap();
        assert_eq!(artifact.generation, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_exhausts_attempt_budget() {
        let dir = tempfile::tempdir().unwrap();
        let loader = loader_in(dir.path(), 4);

        let err = loader.load().await.unwrap_err();
        assert!(matches!(err, GatewayError::ArtifactLoad { attempts: 4 }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_artifact_is_not_usable() {
        let dir = tempfile::tempdir().unwrap();
        let loader = loader_in(dir.path(), 2);
        tokio::fs::write(
            dir.path().join("active_routes.json"),
            serde_json::to_vec(&RouteArtifact {
                generation: 1,
                routes: vec![],
            })
            .unwrap(),
        )
        .await
        .unwrap();

        let err = loader.load().await.unwrap_err();
        assert!(matches!(err, GatewayError::ArtifactLoad { attempts: 2 }));
    }
}
