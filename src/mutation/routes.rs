//! Route table and mutation data model.
//!
//! The route table is the one fixed, human-authored input to the
//! mutation engine: an ordered JSON array of method/path/handler
//! records, each optionally marked stable. Everything derived from it
//! (snapshots, artifacts) is regenerated per generation.

use crate::config::{GatewayError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

fn default_status() -> u16 {
    200
}

/// One baseline route. `stable` routes are never mutated across
/// generations and provide the permanently reachable identity surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteDefinition {
    pub method: String,
    pub path: String,
    pub handler: String,
    #[serde(default)]
    pub stable: bool,
    /// Canned JSON body the handler responds with.
    #[serde(default)]
    pub response: serde_json::Value,
    #[serde(default = "default_status")]
    pub status: u16,
}

/// The ordered baseline route set.
#[derive(Debug, Clone)]
pub struct RouteTable {
    pub routes: Vec<RouteDefinition>,
}

impl RouteTable {
    /// Loads the route table from disk.
    ///
    /// # Errors
    ///
    /// Returns `TemplateMissing` if the file does not exist and
    /// `Persistence` if it cannot be read or parsed.
    pub async fn load(path: &Path) -> Result<Self> {
        let raw = match tokio::fs::read(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(GatewayError::TemplateMissing(path.to_path_buf()));
            }
            Err(e) => return Err(GatewayError::Persistence(e.to_string())),
        };

        let routes: Vec<RouteDefinition> =
            serde_json::from_slice(&raw).map_err(|e| GatewayError::Persistence(e.to_string()))?;
        Ok(Self { routes })
    }
}

/// One mutated route of one generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationRecord {
    pub original_path: String,
    pub mutated_path: String,
    pub handler: String,
    pub generation: u64,
}

/// Immutable mapping from original to mutated paths for one generation.
///
/// Published as a whole `Arc` replacement; entries are never mutated in
/// place, so any request that captured a snapshot completes against it
/// even if a rotation swaps the current one mid-flight.
#[derive(Debug, Clone, Default)]
pub struct MappingSnapshot {
    pub generation: u64,
    pub entries: HashMap<String, String>,
    pub created_at: u64,
}

impl MappingSnapshot {
    /// Builds a snapshot from an entry map, stamped with the current time.
    #[must_use]
    pub fn new(generation: u64, entries: HashMap<String, String>) -> Self {
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Self {
            generation,
            entries,
            created_at,
        }
    }

    /// Resolves an original path to its mutated counterpart.
    #[must_use]
    pub fn resolve(&self, original_path: &str) -> Option<&str> {
        self.entries.get(original_path).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One route binding of a regenerated artifact. Self-contained: the
/// node needs nothing beyond this record to serve the route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactRoute {
    pub method: String,
    pub path: String,
    pub handler: String,
    #[serde(default)]
    pub response: serde_json::Value,
    #[serde(default = "default_status")]
    pub status: u16,
}

/// A regenerated, directly loadable service definition exposing exactly
/// the mutated paths of one generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteArtifact {
    pub generation: u64,
    pub routes: Vec<ArtifactRoute>,
}

impl RouteArtifact {
    /// Reads an artifact from disk.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the file is absent, unreadable, or
    /// fails to parse.
    pub async fn load(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read(path)
            .await
            .map_err(|e| GatewayError::Persistence(e.to_string()))?;
        serde_json::from_slice(&raw).map_err(|e| GatewayError::Persistence(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_route_table_missing_is_template_missing() {
        let err = RouteTable::load(Path::new("/nonexistent/routes.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::TemplateMissing(_)));
    }

    #[tokio::test]
    async fn test_route_table_parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routes.json");
        tokio::fs::write(
            &path,
            r#"[
                {"method":"GET","path":"/admin/login","handler":"admin_login",
                 "response":{"status":"Login Page"}},
                {"method":"GET","path":"/","handler":"home","stable":true}
            ]"#,
        )
        .await
        .unwrap();

        let table = RouteTable::load(&path).await.unwrap();
        assert_eq!(table.routes.len(), 2);
        assert!(!table.routes[0].stable);
        assert_eq!(table.routes[0].status, 200);
        assert!(table.routes[1].stable);
        assert!(table.routes[1].response.is_null());
    }

    #[tokio::test]
    async fn test_route_table_garbage_is_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routes.json");
        tokio::fs::write(&path, b"not json").await.unwrap();

        let err = RouteTable::load(&path).await.unwrap_err();
        assert!(matches!(err, GatewayError::Persistence(_)));
    }

    #[test]
    fn test_snapshot_resolve() {
        let mut entries = HashMap::new();
        entries.insert("/admin/login".to_string(), "/admin/login_x1y2z3".to_string());
        let snapshot = MappingSnapshot::new(1, entries);

        assert_eq!(snapshot.resolve("/admin/login"), Some("/admin/login_x1y2z3"));
        assert_eq!(snapshot.resolve("/unknown"), None);
        assert!(!snapshot.is_empty());
        assert!(snapshot.created_at > 0);
    }

    #[test]
    fn test_default_snapshot_is_empty() {
        let snapshot = MappingSnapshot::default();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.generation, 0);
    }

    #[tokio::test]
    async fn test_artifact_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifact.json");
        let artifact = RouteArtifact {
            generation: 3,
            routes: vec![ArtifactRoute {
                method: "GET".to_string(),
                path: "/api/balance_abc123".to_string(),
                handler: "get_balance_abc123".to_string(),
                response: serde_json::json!({"user": "admin"}),
                status: 200,
            }],
        };
        tokio::fs::write(&path, serde_json::to_vec(&artifact).unwrap())
            .await
            .unwrap();

        let loaded = RouteArtifact::load(&path).await.unwrap();
        assert_eq!(loaded.generation, 3);
        assert_eq!(loaded.routes[0].path, "/api/balance_abc123");
    }
}
