//! Object-store client wrapper implementation.

use async_trait::async_trait;
use azure_core::StatusCode;
use azure_storage_blobs::prelude::{BlobClient, ContainerClient};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use super::error::ObjectStoreError;
use super::lease::{DeleteOptions, LeaseDuration, MetadataOptions, ReadOptions, WriteOptions};

type OsResult<T> = Result<T, ObjectStoreError>;

/// Typed access to a single named blob: read/write/exists/delete, metadata
/// get/set, snapshot, lease acquire/release, list.
#[async_trait]
pub trait ObjectStoreClient: Send + Sync {
    async fn exists(&self) -> OsResult<bool>;
    async fn get(&self, opts: ReadOptions) -> OsResult<Option<Vec<u8>>>;
    async fn create_block_from_bytes(&self, bytes: Vec<u8>, opts: WriteOptions) -> OsResult<()>;
    async fn delete(&self, opts: DeleteOptions) -> OsResult<()>;
    async fn create_snapshot(&self) -> OsResult<()>;
    async fn get_metadata(&self, opts: MetadataOptions) -> OsResult<HashMap<String, String>>;
    async fn set_metadata(&self, metadata: HashMap<String, String>, opts: MetadataOptions) -> OsResult<()>;
    async fn acquire_lease(&self, duration: LeaseDuration, proposed_id: Option<String>) -> OsResult<String>;
    async fn release_lease(&self, lease_id: &str) -> OsResult<()>;
    async fn list(&self, prefix: Option<&str>, max: Option<u32>) -> OsResult<Vec<String>>;
}

/// Binds a new [`ObjectStoreClient`] to a blob name, used by the workspace
/// registry to create one blob-bound client per workspace.
pub trait ObjectStoreClientFactory: Send + Sync {
    fn client_for(&self, blob_name: &str) -> Arc<dyn ObjectStoreClient>;
    fn container(&self) -> &str;
}

/// Real factory backed by a single Azure `ContainerClient`.
pub struct AzureObjectStoreClientFactory {
    container: String,
    container_client: ContainerClient,
}

impl AzureObjectStoreClientFactory {
    pub fn new(container: impl Into<String>, container_client: ContainerClient) -> Self {
        Self {
            container: container.into(),
            container_client,
        }
    }
}

impl ObjectStoreClientFactory for AzureObjectStoreClientFactory {
    fn client_for(&self, blob_name: &str) -> Arc<dyn ObjectStoreClient> {
        Arc::new(AzureObjectStoreClient::new(
            self.container.clone(),
            blob_name.to_string(),
            self.container_client.blob_client(blob_name),
        ))
    }

    fn container(&self) -> &str {
        &self.container
    }
}

/// Real implementation backed by the Azure Blob Storage SDK.
pub struct AzureObjectStoreClient {
    container: String,
    blob_name: String,
    blob_client: BlobClient,
}

impl AzureObjectStoreClient {
    pub fn new(container: impl Into<String>, blob_name: impl Into<String>, blob_client: BlobClient) -> Self {
        Self {
            container: container.into(),
            blob_name: blob_name.into(),
            blob_client,
        }
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn blob_name(&self) -> &str {
        &self.blob_name
    }
}

/// Classifies an `azure_core` SDK error into the wrapper's error kinds.
///
/// Network timeouts and 5xx/429 responses are transient; anything else that
/// is not a recognized 404/409/412 is treated as fatal.
fn classify(err: azure_core::Error) -> ObjectStoreError {
    if let Some(status) = err.as_http_error().map(|e| e.status()) {
        match status {
            StatusCode::NotFound => return ObjectStoreError::NotFound,
            StatusCode::Conflict | StatusCode::PreconditionFailed => {
                return ObjectStoreError::Conflict { existing_lockinfo: None }
            }
            s if s.as_u16() == 429 || s.is_server_error() => {
                return ObjectStoreError::Unavailable(err.to_string())
            }
            _ => {}
        }
    }
    ObjectStoreError::Fatal(err.to_string())
}

#[async_trait]
impl ObjectStoreClient for AzureObjectStoreClient {
    async fn exists(&self) -> OsResult<bool> {
        match self.blob_client.get_properties().await {
            Ok(_) => Ok(true),
            Err(e) => match classify(e) {
                ObjectStoreError::NotFound => Ok(false),
                other => Err(other),
            },
        }
    }

    async fn get(&self, opts: ReadOptions) -> OsResult<Option<Vec<u8>>> {
        let mut builder = self.blob_client.get();
        if let Some(lease_id) = &opts.lease_id {
            builder = builder.lease_id(lease_id.parse().map_err(|_| {
                ObjectStoreError::Fatal("invalid lease id".to_string())
            })?);
        }
        match builder.await {
            Ok(response) => {
                let bytes = response
                    .data
                    .collect()
                    .await
                    .map_err(|e| ObjectStoreError::Fatal(e.to_string()))?;
                if bytes.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(bytes.to_vec()))
                }
            }
            Err(e) => match classify(e) {
                ObjectStoreError::NotFound => Ok(None),
                other => Err(other),
            },
        }
    }

    async fn create_block_from_bytes(&self, bytes: Vec<u8>, opts: WriteOptions) -> OsResult<()> {
        let mut builder = self.blob_client.put_block_blob(bytes);
        if let Some(content_type) = &opts.content_type {
            builder = builder.content_type(content_type.clone());
        }
        if let Some(metadata) = &opts.metadata {
            let mut azure_metadata = azure_core::request_options::Metadata::new();
            for (k, v) in metadata {
                azure_metadata.insert(k.clone(), v.clone());
            }
            builder = builder.metadata(azure_metadata);
        }
        if let Some(lease_id) = &opts.lease_id {
            builder = builder
                .lease_id(lease_id.parse().map_err(|_| ObjectStoreError::Fatal("invalid lease id".to_string()))?);
        }
        builder.await.map(|_| ()).map_err(classify)
    }

    async fn delete(&self, opts: DeleteOptions) -> OsResult<()> {
        let mut builder = self.blob_client.delete();
        if opts.delete_snapshots {
            builder = builder.delete_snapshots_method(
                azure_storage_blobs::blob::operations::DeleteSnapshotsMethod::Include,
            );
        }
        if let Some(lease_id) = &opts.lease_id {
            builder = builder
                .lease_id(lease_id.parse().map_err(|_| ObjectStoreError::Fatal("invalid lease id".to_string()))?);
        }
        builder.await.map(|_| ()).map_err(classify)
    }

    async fn create_snapshot(&self) -> OsResult<()> {
        match self.blob_client.snapshot().await {
            Ok(_) => Ok(()),
            Err(e) => {
                // Snapshots are a best-effort safety net;
                // callers decide whether to surface or swallow this.
                warn!(container = %self.container, blob = %self.blob_name, "snapshot failed");
                Err(classify(e))
            }
        }
    }

    async fn get_metadata(&self, opts: MetadataOptions) -> OsResult<HashMap<String, String>> {
        let mut builder = self.blob_client.get_properties();
        if let Some(lease_id) = &opts.lease_id {
            builder = builder
                .lease_id(lease_id.parse().map_err(|_| ObjectStoreError::Fatal("invalid lease id".to_string()))?);
        }
        let response = builder.await.map_err(classify)?;
        Ok(response.blob.metadata.unwrap_or_default())
    }

    async fn set_metadata(&self, metadata: HashMap<String, String>, opts: MetadataOptions) -> OsResult<()> {
        let mut builder = self.blob_client.set_metadata(metadata);
        if let Some(lease_id) = &opts.lease_id {
            builder = builder
                .lease_id(lease_id.parse().map_err(|_| ObjectStoreError::Fatal("invalid lease id".to_string()))?);
        }
        builder.await.map(|_| ()).map_err(classify)
    }

    async fn acquire_lease(&self, duration: LeaseDuration, proposed_id: Option<String>) -> OsResult<String> {
        let seconds = match duration {
            LeaseDuration::Infinite => -1,
            LeaseDuration::Seconds(s) => s as i32,
        };
        let mut builder = self.blob_client.acquire_lease(
            azure_core::time::Duration::seconds(seconds as i64),
        );
        if let Some(id) = &proposed_id {
            builder = builder.proposed_lease_id(
                id.parse().map_err(|_| ObjectStoreError::Fatal("invalid proposed lease id".to_string()))?,
            );
        }
        match builder.await {
            Ok(response) => Ok(response.lease_id.to_string()),
            Err(e) => Err(classify(e)),
        }
    }

    async fn release_lease(&self, lease_id: &str) -> OsResult<()> {
        let lease_client = self
            .blob_client
            .blob_lease_client(lease_id.parse().map_err(|_| ObjectStoreError::Fatal("invalid lease id".to_string()))?);
        lease_client.release().await.map(|_| ()).map_err(classify)
    }

    async fn list(&self, prefix: Option<&str>, max: Option<u32>) -> OsResult<Vec<String>> {
        // Listing is a container-level operation; this wrapper forwards it
        // through the blob client's parent container client for
        // enumerating sibling blobs (used by the workspace registry).
        use futures::StreamExt;

        let container_client = self.blob_client.container_client();
        let mut builder = container_client.list_blobs();
        if let Some(p) = prefix {
            builder = builder.prefix(p.to_string());
        }
        if let Some(m) = max {
            builder = builder.max_results(std::num::NonZeroU32::new(m).unwrap_or(std::num::NonZeroU32::new(5000).unwrap()));
        }
        let mut stream = builder.into_stream();
        let mut names = Vec::new();
        while let Some(page) = stream.next().await {
            let page = page.map_err(classify)?;
            for blob in page.blobs.blobs() {
                names.push(blob.name.clone());
            }
        }
        Ok(names)
    }
}
