//! In-memory secret-store double, mirroring the shape of
//! [`super::memory_objectstore::MemoryObjectStore`]. Versions are assigned
//! sequentially per name, matching the "get by name, or by name+version"
//! contract without depending on a real Key Vault.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::secretstore::client::{validate_name, SecretListEntry, SecretStoreClient, SecretStoreClientFactory};
use crate::secretstore::error::SecretStoreError;

struct SecretEntry {
    tags: HashMap<String, String>,
    versions: Vec<(String, String)>, // (version, value), append-only
    deleted: bool,
}

#[derive(Default)]
pub struct MemorySecretStore {
    secrets: Mutex<HashMap<String, SecretEntry>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SecretStoreClient for MemorySecretStore {
    async fn set(&self, name: &str, value: &str, tags: HashMap<String, String>) -> Result<String, SecretStoreError> {
        validate_name(name)?;
        let mut guard = self.secrets.lock();
        let entry = guard.entry(name.to_string()).or_insert_with(|| SecretEntry {
            tags: HashMap::new(),
            versions: Vec::new(),
            deleted: false,
        });
        entry.deleted = false;
        entry.tags = tags;
        let version = format!("v{}", entry.versions.len() + 1);
        entry.versions.push((version.clone(), value.to_string()));
        Ok(version)
    }

    async fn get(&self, name: &str, version: &str) -> Result<String, SecretStoreError> {
        validate_name(name)?;
        let guard = self.secrets.lock();
        let entry = guard
            .get(name)
            .filter(|e| !e.deleted)
            .ok_or_else(|| SecretStoreError::Fatal(format!("secret {name} not found")))?;

        if version.is_empty() {
            entry
                .versions
                .last()
                .map(|(_, value)| value.clone())
                .ok_or_else(|| SecretStoreError::Fatal(format!("secret {name} has no versions")))
        } else {
            entry
                .versions
                .iter()
                .find(|(v, _)| v == version)
                .map(|(_, value)| value.clone())
                .ok_or_else(|| SecretStoreError::Fatal(format!("secret {name} has no version {version}")))
        }
    }

    async fn delete(&self, name: &str) -> Result<(), SecretStoreError> {
        validate_name(name)?;
        let mut guard = self.secrets.lock();
        if let Some(entry) = guard.get_mut(name) {
            entry.deleted = true;
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<SecretListEntry>, SecretStoreError> {
        let guard = self.secrets.lock();
        Ok(guard
            .iter()
            .filter(|(_, entry)| !entry.deleted)
            .map(|(id, entry)| SecretListEntry {
                id: id.clone(),
                tags: entry.tags.clone(),
            })
            .collect())
    }
}

/// Factory handing out one isolated [`MemorySecretStore`] per workspace
/// name, standing in for the per-workspace vault a real deployment derives
/// by naming convention.
#[derive(Default)]
pub struct MemorySecretStoreFactory {
    namespaces: DashMap<String, Arc<MemorySecretStore>>,
}

impl MemorySecretStoreFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecretStoreClientFactory for MemorySecretStoreFactory {
    fn client_for(&self, workspace: &str) -> Arc<dyn SecretStoreClient> {
        self.namespaces
            .entry(workspace.to_string())
            .or_insert_with(|| Arc::new(MemorySecretStore::new()))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_latest_version() {
        let store = MemorySecretStore::new();
        store.set("db.password", "first", HashMap::new()).await.unwrap();
        let v2 = store.set("db.password", "second", HashMap::new()).await.unwrap();
        assert_eq!(store.get("db.password", "").await.unwrap(), "second");
        assert_eq!(store.get("db.password", &v2).await.unwrap(), "second");
    }

    #[tokio::test]
    async fn get_specific_version_after_overwrite() {
        let store = MemorySecretStore::new();
        let v1 = store.set("db.password", "first", HashMap::new()).await.unwrap();
        store.set("db.password", "second", HashMap::new()).await.unwrap();
        assert_eq!(store.get("db.password", &v1).await.unwrap(), "first");
    }

    #[tokio::test]
    async fn deleted_secret_is_absent_from_list_and_get() {
        let store = MemorySecretStore::new();
        store.set("db.password", "first", HashMap::new()).await.unwrap();
        store.delete("db.password").await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
        assert!(store.get("db.password", "").await.is_err());
    }
}
