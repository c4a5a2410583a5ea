//! Mapping store.
//!
//! Durable shared location for the latest mapping snapshot. The on-disk
//! format is a flat JSON object of original-path to mutated-path string
//! pairs, written atomically so readers never observe a partial file.
//! Absence is a valid, handled state.

use crate::config::{GatewayError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Reads and writes the shared mapping state file.
#[derive(Debug, Clone)]
pub struct MappingStore {
    path: PathBuf,
}

impl MappingStore {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the latest persisted mapping, or `None` if no state file
    /// exists yet.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the file exists but cannot be read or
    /// parsed.
    pub async fn load(&self) -> Result<Option<HashMap<String, String>>> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(GatewayError::Persistence(e.to_string())),
        };

        let entries: HashMap<String, String> =
            serde_json::from_slice(&raw).map_err(|e| GatewayError::Persistence(e.to_string()))?;
        Ok(Some(entries))
    }

    /// Persists the mapping atomically: write to a temp sibling, then
    /// rename over the published path.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` on serialization or I/O failure.
    pub async fn save(&self, entries: &HashMap<String, String>) -> Result<()> {
        let payload = serde_json::to_vec_pretty(entries)
            .map_err(|e| GatewayError::Persistence(e.to_string()))?;
        write_atomic(&self.path, &payload).await
    }
}

/// Atomic write-temp-then-publish used for both the mapping state and
/// the route artifact.
pub async fn write_atomic(path: &Path, payload: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, payload)
        .await
        .map_err(|e| GatewayError::Persistence(e.to_string()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| GatewayError::Persistence(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_absent_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = MappingStore::new(dir.path().join("mutation_state.json"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = MappingStore::new(dir.path().join("mutation_state.json"));

        let mut entries = HashMap::new();
        entries.insert("/".to_string(), "/".to_string());
        entries.insert("/admin/login".to_string(), "/admin/login_q8r2m1".to_string());
        store.save(&entries).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded, entries);
    }

    #[tokio::test]
    async fn test_save_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = MappingStore::new(dir.path().join("state.json"));
        store.save(&HashMap::new()).await.unwrap();

        assert!(!dir.path().join("state.json.tmp").exists());
        assert!(dir.path().join("state.json").exists());
    }

    #[tokio::test]
    async fn test_load_corrupt_is_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        tokio::fs::write(&path, b"{broken").await.unwrap();

        let store = MappingStore::new(path);
        assert!(matches!(
            store.load().await.unwrap_err(),
            GatewayError::Persistence(_)
        ));
    }

    #[tokio::test]
    async fn test_save_is_readable_as_plain_object() {
        // External readers (the node loader side) expect a flat JSON map.
        let dir = tempfile::tempdir().unwrap();
        let store = MappingStore::new(dir.path().join("state.json"));

        let mut entries = HashMap::new();
        entries.insert("/api/balance".to_string(), "/api/balance_z9".to_string());
        store.save(&entries).await.unwrap();

        let raw = tokio::fs::read(store.path()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(value["/api/balance"], "/api/balance_z9");
    }
}
