//! Blob session: one process-local object bound to
//! `(container, blob-name)`, holding at most one lease at a time.

use std::collections::HashMap;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{CoreError, CoreResult};
use crate::objectstore::{
    DeleteOptions, LeaseDuration, ObjectStoreClient, ObjectStoreError, ReadOptions, WriteOptions,
};
use crate::session::lockinfo::LockInfo;
use crate::state::{codec, StateDocument};

const LOCKINFO_KEY: &str = "lockinfo";

/// One blob-bound session. Exclusively owns the lease identifier once a
/// lease is held.
pub struct BlobSession {
    container: String,
    blob_name: String,
    client: Arc<dyn ObjectStoreClient>,
    genesis_terraform_version: String,
    held_lease: Mutex<Option<String>>,
}

impl BlobSession {
    pub fn new(
        container: impl Into<String>,
        blob_name: impl Into<String>,
        client: Arc<dyn ObjectStoreClient>,
        genesis_terraform_version: impl Into<String>,
    ) -> Self {
        Self {
            container: container.into(),
            blob_name: blob_name.into(),
            client,
            genesis_terraform_version: genesis_terraform_version.into(),
            held_lease: Mutex::new(None),
        }
    }

    fn path(&self) -> String {
        format!("{}/{}", self.container, self.blob_name)
    }

    pub async fn exists(&self) -> CoreResult<bool> {
        self.client.exists().await.map_err(map_store_error)
    }

    /// Acquires an infinite-duration lease using `info.id` as the proposed
    /// identifier. Initializes the blob on `NotFound` and retries exactly
    /// once.
    pub async fn lock(&self, info: LockInfo) -> CoreResult<String> {
        match self.try_acquire(&info).await {
            Ok(lease_id) => {
                self.commit_lockinfo(&info, &lease_id).await?;
                *self.held_lease.lock() = Some(lease_id.clone());
                Ok(lease_id)
            }
            Err(ObjectStoreError::NotFound) => {
                debug!(path = %self.path(), "blob missing, initializing before retrying lock");
                let genesis = StateDocument::genesis(&self.genesis_terraform_version);
                let bytes = codec::encode(&genesis)?;
                self.client
                    .create_block_from_bytes(
                        bytes,
                        WriteOptions {
                            content_type: Some("application/json".to_string()),
                            ..Default::default()
                        },
                    )
                    .await
                    .map_err(map_store_error)?;

                let lease_id = self.try_acquire(&info).await.map_err(map_store_error)?;
                self.commit_lockinfo(&info, &lease_id).await?;
                *self.held_lease.lock() = Some(lease_id.clone());
                Ok(lease_id)
            }
            Err(ObjectStoreError::Conflict { existing_lockinfo }) => {
                let existing = match existing_lockinfo.as_deref().and_then(decode_lockinfo) {
                    Some(holder) => Some(holder),
                    None => self.read_back_lockinfo().await,
                }
                .unwrap_or_else(|| {
                    warn!(path = %self.path(), "lock conflict but could not read existing lockinfo");
                    empty_lockinfo()
                });
                Err(CoreError::LockConflict { existing })
            }
            Err(other) => Err(map_store_error(other)),
        }
    }

    async fn try_acquire(&self, info: &LockInfo) -> Result<String, ObjectStoreError> {
        self.client
            .acquire_lease(LeaseDuration::Infinite, Some(info.id.clone()))
            .await
    }

    /// Best-effort read-back of the holder's LockInfo for a conflict the
    /// backend reported without attaching metadata (the real Azure lease
    /// acquire call classifies 409 without reading blob metadata itself).
    async fn read_back_lockinfo(&self) -> Option<LockInfo> {
        let metadata = self
            .client
            .get_metadata(crate::objectstore::lease::MetadataOptions { lease_id: None })
            .await
            .ok()?;
        metadata.get(LOCKINFO_KEY).and_then(|v| decode_lockinfo(v))
    }

    async fn commit_lockinfo(&self, info: &LockInfo, lease_id: &str) -> CoreResult<()> {
        let granted = info.with_lease(lease_id, self.path());
        let encoded = encode_lockinfo(&granted)?;
        let mut metadata = HashMap::new();
        metadata.insert(LOCKINFO_KEY.to_string(), encoded);
        self.client
            .set_metadata(
                metadata,
                crate::objectstore::lease::MetadataOptions {
                    lease_id: Some(lease_id.to_string()),
                },
            )
            .await
            .map_err(map_store_error)
    }

    /// Unlocks, failing `LockMismatch` if `expected_id` does not match the
    /// currently recorded lock holder.
    pub async fn unlock(&self, expected_id: &str) -> CoreResult<()> {
        let metadata = self
            .client
            .get_metadata(crate::objectstore::lease::MetadataOptions { lease_id: None })
            .await
            .map_err(map_store_error)?;

        let existing = metadata
            .get(LOCKINFO_KEY)
            .and_then(|v| decode_lockinfo(v))
            .ok_or_else(|| CoreError::LockMetadataCorrupt("no lockinfo present".to_string()))?;

        if existing.id != expected_id {
            return Err(CoreError::LockMismatch {
                existing,
                expected: expected_id.to_string(),
                actual: String::new(),
            });
        }

        self.client
            .set_metadata(
                HashMap::new(),
                crate::objectstore::lease::MetadataOptions {
                    lease_id: Some(expected_id.to_string()),
                },
            )
            .await
            .map_err(map_store_error)?;

        self.client.release_lease(expected_id).await.map_err(map_store_error)?;
        *self.held_lease.lock() = None;
        Ok(())
    }

    /// Overwrites the blob content. Requires a held lease.
    pub async fn put(&self, bytes: Vec<u8>) -> CoreResult<()> {
        let lease_id = self
            .held_lease
            .lock()
            .clone()
            .ok_or_else(|| CoreError::BackendFatal("put called without a held lease".to_string()))?;

        let mut preserved_metadata = None;
        if self.exists().await? {
            if let Err(e) = self.client.create_snapshot().await {
                warn!(path = %self.path(), error = %e, "best-effort snapshot before overwrite failed");
            }
            preserved_metadata = self
                .client
                .get_metadata(crate::objectstore::lease::MetadataOptions {
                    lease_id: Some(lease_id.clone()),
                })
                .await
                .ok();
        }

        self.client
            .create_block_from_bytes(
                bytes.clone(),
                WriteOptions {
                    lease_id: Some(lease_id),
                    content_type: Some("application/json".to_string()),
                    metadata: preserved_metadata,
                },
            )
            .await
            .map_err(map_store_error)
    }

    /// Returns the blob payload, or `None` if the blob does not exist or is
    /// empty.
    pub async fn get(&self) -> CoreResult<Option<Vec<u8>>> {
        self.client.get(ReadOptions::default()).await.map_err(map_store_error)
    }

    /// Deletes the blob and all its snapshots. Requires a held lease.
    pub async fn delete(&self) -> CoreResult<()> {
        let lease_id = self
            .held_lease
            .lock()
            .clone()
            .ok_or_else(|| CoreError::BackendFatal("delete called without a held lease".to_string()))?;
        self.client
            .delete(DeleteOptions {
                lease_id: Some(lease_id),
                delete_snapshots: true,
            })
            .await
            .map_err(map_store_error)
    }
}

fn encode_lockinfo(info: &LockInfo) -> CoreResult<String> {
    let bytes = serde_json::to_vec(info).map_err(|e| CoreError::LockMetadataCorrupt(e.to_string()))?;
    Ok(BASE64.encode(bytes))
}

fn decode_lockinfo(encoded: &str) -> Option<LockInfo> {
    let bytes = BASE64.decode(encoded).ok()?;
    serde_json::from_slice(&bytes).ok()
}

fn empty_lockinfo() -> LockInfo {
    LockInfo {
        id: String::new(),
        path: String::new(),
        operation: String::new(),
        who: String::new(),
        version: String::new(),
        created: chrono::Utc::now(),
        info: None,
    }
}

fn map_store_error(err: ObjectStoreError) -> CoreError {
    match err {
        ObjectStoreError::Unavailable(msg) => CoreError::BackendUnavailable(msg),
        ObjectStoreError::Fatal(msg) => CoreError::BackendFatal(msg),
        ObjectStoreError::NotFound => CoreError::BackendFatal("blob not found".to_string()),
        ObjectStoreError::Conflict { .. } => {
            CoreError::LockConflict { existing: empty_lockinfo() }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lockinfo_round_trips_through_base64() {
        let info = LockInfo::new("Apply", "alice", "1.7.0").with_lease("lease-1", "c/blob");
        let encoded = encode_lockinfo(&info).unwrap();
        let decoded = decode_lockinfo(&encoded).unwrap();
        assert_eq!(decoded, info);
    }

    #[test]
    fn decode_lockinfo_rejects_garbage() {
        assert!(decode_lockinfo("not-base64!!").is_none());
    }
}
