//! Workspace registry: enumerates workspaces and creates or
//! deletes `(blob, secret-namespace)` pairs.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::info;

use crate::error::{CoreError, CoreResult};
use crate::manager::StateManager;
use crate::masking::{MaskingEngine, SchemaOracle};
use crate::objectstore::client::ObjectStoreClientFactory;
use crate::secretstore::SecretStoreClientFactory;
use crate::session::{BlobSession, LockInfo};

/// Name reserved for the implicit, non-deletable workspace.
pub const DEFAULT_WORKSPACE: &str = "default";

/// Creates and tears down `StateManager`s, one per workspace, sharing the
/// same object-store container and schema oracle but giving each workspace
/// its own blob-bound client and secret namespace.
pub struct WorkspaceRegistry {
    object_store_factory: Arc<dyn ObjectStoreClientFactory>,
    secret_store_factory: Arc<dyn SecretStoreClientFactory>,
    schema_oracle: Arc<dyn SchemaOracle>,
    genesis_terraform_version: String,
    managers: DashMap<String, Arc<StateManager>>,
}

impl WorkspaceRegistry {
    pub fn new(
        object_store_factory: Arc<dyn ObjectStoreClientFactory>,
        secret_store_factory: Arc<dyn SecretStoreClientFactory>,
        schema_oracle: Arc<dyn SchemaOracle>,
        genesis_terraform_version: impl Into<String>,
    ) -> Self {
        Self {
            object_store_factory,
            secret_store_factory,
            schema_oracle,
            genesis_terraform_version: genesis_terraform_version.into(),
            managers: DashMap::new(),
        }
    }

    fn blob_name(workspace: &str) -> String {
        format!("{workspace}.tfstate")
    }

    /// Enumerates blobs in the container and strips the `.tfstate` suffix;
    /// the default workspace is implicit and always included even if its
    /// blob has not been created yet.
    pub async fn workspaces(&self) -> CoreResult<Vec<String>> {
        let probe = self.object_store_factory.client_for(&Self::blob_name(DEFAULT_WORKSPACE));
        let blobs = probe
            .list(None, None)
            .await
            .map_err(|e| CoreError::BackendFatal(e.to_string()))?;

        let mut names: Vec<String> = blobs
            .iter()
            .filter_map(|b| b.strip_suffix(".tfstate").map(str::to_string))
            .collect();
        if !names.iter().any(|n| n == DEFAULT_WORKSPACE) {
            names.push(DEFAULT_WORKSPACE.to_string());
        }
        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Returns the `StateManager` for `name`, creating the blob and secret
    /// namespace on first use. Managers are cached so repeated calls for the
    /// same name return the same instance within this registry's lifetime.
    pub async fn get_state_manager(&self, name: &str) -> CoreResult<Arc<StateManager>> {
        if let Some(existing) = self.managers.get(name) {
            return Ok(existing.clone());
        }

        let object_store = self.object_store_factory.client_for(&Self::blob_name(name));
        if !object_store.exists().await.map_err(|e| CoreError::BackendFatal(e.to_string()))? {
            info!(workspace = name, "creating workspace blob on first access");
            let genesis = crate::state::StateDocument::genesis(&self.genesis_terraform_version);
            let bytes = crate::state::codec::encode(&genesis)?;
            object_store
                .create_block_from_bytes(
                    bytes,
                    crate::objectstore::lease::WriteOptions {
                        content_type: Some("application/json".to_string()),
                        ..Default::default()
                    },
                )
                .await
                .map_err(|e| CoreError::BackendFatal(e.to_string()))?;
        }

        let container = self.object_store_factory.container().to_string();
        let session = Arc::new(BlobSession::new(container, Self::blob_name(name), object_store, self.genesis_terraform_version.clone()));

        let secret_store = self.secret_store_factory.client_for(name);
        let masking = Arc::new(MaskingEngine::new(self.schema_oracle.clone(), secret_store.clone()));
        let manager = Arc::new(StateManager::new(session, masking, secret_store));

        self.managers.insert(name.to_string(), manager.clone());
        Ok(manager)
    }

    /// Deletes a workspace's blob (and snapshots) and its secret namespace.
    /// Rejects the default workspace. Acquires the blob lease first so no
    /// other session is mid-write; on failure, whatever was already cleaned
    /// up stays cleaned up and a composite error is returned.
    pub async fn delete_workspace(&self, name: &str) -> CoreResult<()> {
        if name == DEFAULT_WORKSPACE {
            return Err(CoreError::WorkspaceError(
                "the default workspace cannot be deleted".to_string(),
            ));
        }

        let object_store = self.object_store_factory.client_for(&Self::blob_name(name));
        let container = self.object_store_factory.container().to_string();
        let session = BlobSession::new(container, Self::blob_name(name), object_store, self.genesis_terraform_version.clone());

        let mut errors = Vec::new();
        match session
            .lock(LockInfo::new("DeleteWorkspace", "registry", env!("CARGO_PKG_VERSION")))
            .await
        {
            Ok(_) => {
                if let Err(e) = session.delete().await {
                    errors.push(format!("blob delete failed: {e}"));
                }
            }
            Err(e) => errors.push(format!("could not lock blob for deletion: {e}")),
        }

        let secret_store = self.secret_store_factory.client_for(name);
        match secret_store.list().await {
            Ok(entries) => {
                for entry in entries {
                    if let Err(e) = secret_store.delete(&entry.id).await {
                        errors.push(format!("secret {} delete failed: {}", entry.id, e));
                    }
                }
            }
            Err(e) => errors.push(format!("secret namespace listing failed: {e}")),
        }

        self.managers.remove(name);

        if errors.is_empty() {
            info!(workspace = name, "deleted workspace");
            Ok(())
        } else {
            Err(CoreError::WorkspaceError(errors.join("; ")))
        }
    }
}
