//! State manager: the public contract used by the driver.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::warn;

use crate::error::{CoreError, CoreResult};
use crate::masking::MaskingEngine;
use crate::secretstore::SecretStoreClient;
use crate::session::{BlobSession, LockInfo};
use crate::state::{codec, StateDocument};

/// Holds the in-memory state document and the last-read snapshot used for
/// structural-equality and lineage checks. One instance per workspace,
/// owned exclusively by the workspace that created it.
pub struct StateManager {
    inner: Mutex<Inner>,
    blob_session: Arc<BlobSession>,
    masking_context: Arc<MaskingEngine>,
    #[allow(dead_code)]
    secret_store: Arc<dyn SecretStoreClient>,
}

struct Inner {
    state: Option<StateDocument>,
    read_state: Option<StateDocument>,
}

impl StateManager {
    pub fn new(
        blob_session: Arc<BlobSession>,
        masking_context: Arc<MaskingEngine>,
        secret_store: Arc<dyn SecretStoreClient>,
    ) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: None,
                read_state: None,
            }),
            blob_session,
            masking_context,
            secret_store,
        }
    }

    /// Loads the blob, decodes and unmasks it, and stores both the working
    /// copy and the last-read snapshot. If the blob is empty, both become
    /// `None`.
    pub async fn refresh_state(&self) -> CoreResult<()> {
        let bytes = self.blob_session.get().await?;
        let mut guard = self.inner.lock().await;
        let Some(bytes) = bytes else {
            guard.state = None;
            guard.read_state = None;
            return Ok(());
        };

        let mut doc = codec::decode(&bytes)?;
        self.masking_context.unmask(&mut doc).await?;
        guard.read_state = Some(codec::deep_copy(&doc));
        guard.state = Some(doc);
        Ok(())
    }

    /// Returns a deep copy of the current in-memory state, if any.
    pub async fn state(&self) -> Option<StateDocument> {
        let guard = self.inner.lock().await;
        guard.state.as_ref().map(codec::deep_copy)
    }

    /// Replaces the in-memory state. A lineage mismatch against the last
    /// read is logged but never fails the call. The serial is reset
    /// to the last-read serial; only `persist_state` advances it.
    pub async fn write_state(&self, new: StateDocument) {
        let mut guard = self.inner.lock().await;

        if let Some(read_state) = &guard.read_state {
            if !codec::same_lineage(&new, read_state) {
                warn!(
                    expected = %read_state.lineage,
                    actual = %new.lineage,
                    "write_state: lineage mismatch against last read"
                );
            }
        }

        let mut next = codec::deep_copy(&new);
        if let Some(read_state) = &guard.read_state {
            next.serial = read_state.serial;
        }
        guard.state = Some(next);
    }

    /// Masks a copy of the in-memory state, bumps `serial` if it differs
    /// structurally from the last-read snapshot, encodes it, and writes it
    /// to the blob under the held lease. On success, the last-read
    /// snapshot is updated to the just-persisted state.
    pub async fn persist_state(&self) -> CoreResult<()> {
        let mut guard = self.inner.lock().await;
        let Some(state) = guard.state.clone() else {
            return Err(CoreError::EmptyState);
        };

        let mut next = state;
        let changed = match &guard.read_state {
            Some(read_state) => !codec::structural_equal(&next, read_state),
            None => true,
        };
        if changed {
            next.serial += 1;
        }

        let mut masked = codec::deep_copy(&next);
        self.masking_context.mask(&mut masked).await?;
        let bytes = codec::encode(&masked)?;
        self.blob_session.put(bytes).await?;

        guard.state = Some(next.clone());
        guard.read_state = Some(next);
        Ok(())
    }

    /// Delegates to the blob session.
    pub async fn lock(&self, info: LockInfo) -> CoreResult<String> {
        self.blob_session.lock(info).await
    }

    /// Delegates to the blob session.
    pub async fn unlock(&self, lease_id: &str) -> CoreResult<()> {
        self.blob_session.unlock(lease_id).await
    }
}
