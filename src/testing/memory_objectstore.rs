//! In-memory object-store double. Used by unit/integration tests and
//! the local smoke binary; not part of the production contract.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::objectstore::client::{ObjectStoreClient, ObjectStoreClientFactory};
use crate::objectstore::error::ObjectStoreError;
use crate::objectstore::lease::{DeleteOptions, LeaseDuration, MetadataOptions, ReadOptions, WriteOptions};

type OsResult<T> = Result<T, ObjectStoreError>;

struct BlobRecord {
    content: Option<Vec<u8>>,
    metadata: HashMap<String, String>,
    lease: Option<String>,
    snapshot_count: u32,
}

impl Default for BlobRecord {
    fn default() -> Self {
        Self {
            content: None,
            metadata: HashMap::new(),
            lease: None,
            snapshot_count: 0,
        }
    }
}

/// Shared backing store for every blob in one container, so that a
/// [`MemoryObjectStore`] handle bound to one blob can still answer `list`
/// for its siblings, exactly as a real `ContainerClient`-derived
/// `BlobClient` can.
pub struct MemoryContainer {
    blobs: DashMap<String, Mutex<BlobRecord>>,
}

impl MemoryContainer {
    pub fn new() -> Self {
        Self { blobs: DashMap::new() }
    }
}

impl Default for MemoryContainer {
    fn default() -> Self {
        Self::new()
    }
}

/// Typed access to a single named blob backed by a [`MemoryContainer`].
pub struct MemoryObjectStore {
    container: Arc<MemoryContainer>,
    blob_name: String,
}

impl MemoryObjectStore {
    /// Creates a standalone single-blob store with a fresh container.
    pub fn new() -> Self {
        Self::in_container(Arc::new(MemoryContainer::new()), "state")
    }

    pub fn in_container(container: Arc<MemoryContainer>, blob_name: impl Into<String>) -> Self {
        Self {
            container,
            blob_name: blob_name.into(),
        }
    }

    pub fn container(&self) -> Arc<MemoryContainer> {
        self.container.clone()
    }
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStoreClient for MemoryObjectStore {
    async fn exists(&self) -> OsResult<bool> {
        Ok(self
            .container
            .blobs
            .get(&self.blob_name)
            .map(|r| r.lock().content.is_some())
            .unwrap_or(false))
    }

    async fn get(&self, _opts: ReadOptions) -> OsResult<Option<Vec<u8>>> {
        Ok(self
            .container
            .blobs
            .get(&self.blob_name)
            .and_then(|r| r.lock().content.clone())
            .filter(|c| !c.is_empty()))
    }

    async fn create_block_from_bytes(&self, bytes: Vec<u8>, opts: WriteOptions) -> OsResult<()> {
        let entry = self.container.blobs.entry(self.blob_name.clone()).or_default();
        let mut record = entry.lock();
        if let Some(current_lease) = &record.lease {
            if opts.lease_id.as_deref() != Some(current_lease.as_str()) {
                return Err(ObjectStoreError::Conflict { existing_lockinfo: None });
            }
        }
        record.content = Some(bytes);
        // Real "Put Blob" replaces metadata wholesale; preservation is the
        // caller's job (see `BlobSession::put`).
        record.metadata = opts.metadata.unwrap_or_default();
        Ok(())
    }

    async fn delete(&self, opts: DeleteOptions) -> OsResult<()> {
        let Some(entry) = self.container.blobs.get(&self.blob_name) else {
            return Err(ObjectStoreError::NotFound);
        };
        {
            let record = entry.lock();
            if record.content.is_none() {
                return Err(ObjectStoreError::NotFound);
            }
            if let Some(current_lease) = &record.lease {
                if opts.lease_id.as_deref() != Some(current_lease.as_str()) {
                    return Err(ObjectStoreError::Conflict { existing_lockinfo: None });
                }
            }
        }
        drop(entry);
        self.container.blobs.remove(&self.blob_name);
        Ok(())
    }

    async fn create_snapshot(&self) -> OsResult<()> {
        let entry = self.container.blobs.get(&self.blob_name).ok_or(ObjectStoreError::NotFound)?;
        entry.lock().snapshot_count += 1;
        Ok(())
    }

    async fn get_metadata(&self, _opts: MetadataOptions) -> OsResult<HashMap<String, String>> {
        let entry = self.container.blobs.get(&self.blob_name).ok_or(ObjectStoreError::NotFound)?;
        Ok(entry.lock().metadata.clone())
    }

    async fn set_metadata(&self, metadata: HashMap<String, String>, opts: MetadataOptions) -> OsResult<()> {
        let entry = self.container.blobs.get(&self.blob_name).ok_or(ObjectStoreError::NotFound)?;
        let mut record = entry.lock();
        if let Some(current_lease) = &record.lease {
            if opts.lease_id.as_deref() != Some(current_lease.as_str()) {
                return Err(ObjectStoreError::Conflict { existing_lockinfo: None });
            }
        }
        record.metadata = metadata;
        Ok(())
    }

    async fn acquire_lease(&self, _duration: LeaseDuration, proposed_id: Option<String>) -> OsResult<String> {
        let entry = self.container.blobs.get(&self.blob_name).ok_or(ObjectStoreError::NotFound)?;
        let mut record = entry.lock();
        if let Some(existing) = &record.lease {
            let _ = existing;
            return Err(ObjectStoreError::Conflict {
                existing_lockinfo: record.metadata.get("lockinfo").cloned(),
            });
        }
        let lease_id = proposed_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        record.lease = Some(lease_id.clone());
        Ok(lease_id)
    }

    async fn release_lease(&self, lease_id: &str) -> OsResult<()> {
        let entry = self.container.blobs.get(&self.blob_name).ok_or(ObjectStoreError::NotFound)?;
        let mut record = entry.lock();
        if record.lease.as_deref() != Some(lease_id) {
            return Err(ObjectStoreError::Fatal("lease id mismatch on release".to_string()));
        }
        record.lease = None;
        Ok(())
    }

    async fn list(&self, prefix: Option<&str>, max: Option<u32>) -> OsResult<Vec<String>> {
        let mut names: Vec<String> = self
            .container
            .blobs
            .iter()
            .filter(|entry| entry.value().lock().content.is_some())
            .map(|entry| entry.key().clone())
            .filter(|name| prefix.map(|p| name.starts_with(p)).unwrap_or(true))
            .collect();
        names.sort();
        if let Some(max) = max {
            names.truncate(max as usize);
        }
        Ok(names)
    }
}

/// Factory handing out [`MemoryObjectStore`] handles sharing one container,
/// used by the workspace registry's tests and the smoke binary.
pub struct MemoryObjectStoreFactory {
    container: String,
    backing: Arc<MemoryContainer>,
}

impl MemoryObjectStoreFactory {
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            backing: Arc::new(MemoryContainer::new()),
        }
    }
}

impl ObjectStoreClientFactory for MemoryObjectStoreFactory {
    fn client_for(&self, blob_name: &str) -> Arc<dyn ObjectStoreClient> {
        Arc::new(MemoryObjectStore::in_container(self.backing.clone(), blob_name))
    }

    fn container(&self) -> &str {
        &self.container
    }
}
