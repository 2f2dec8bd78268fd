//! Secret-store client wrapper implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use azure_core::auth::TokenCredential;
use azure_security_keyvault::SecretClient;

use super::error::SecretStoreError;

/// Names are case-insensitive ASCII, at most this many characters.
pub const MAX_SECRET_NAME_LEN: usize = 127;

#[derive(Debug, Clone)]
pub struct SecretListEntry {
    pub id: String,
    pub tags: HashMap<String, String>,
}

/// Get/set/delete/list versioned secrets with arbitrary tags. Deletes are
/// logical: a deleted secret is simply absent from subsequent `get`/`list`
/// calls.
#[async_trait]
pub trait SecretStoreClient: Send + Sync {
    async fn set(
        &self,
        name: &str,
        value: &str,
        tags: HashMap<String, String>,
    ) -> Result<String, SecretStoreError>;
    async fn get(&self, name: &str, version: &str) -> Result<String, SecretStoreError>;
    async fn delete(&self, name: &str) -> Result<(), SecretStoreError>;
    async fn list(&self) -> Result<Vec<SecretListEntry>, SecretStoreError>;
}

/// Validates a secret name against the store's constraints.
pub fn validate_name(name: &str) -> Result<(), SecretStoreError> {
    if name.is_empty() || name.len() > MAX_SECRET_NAME_LEN {
        return Err(SecretStoreError::InvalidName(format!(
            "name must be 1..={} chars, got {}",
            MAX_SECRET_NAME_LEN,
            name.len()
        )));
    }
    if !name.is_ascii() {
        return Err(SecretStoreError::InvalidName(
            "name must be ASCII".to_string(),
        ));
    }
    Ok(())
}

/// Real implementation backed by Azure Key Vault.
pub struct AzureSecretStoreClient {
    client: SecretClient,
}

impl AzureSecretStoreClient {
    pub fn new(client: SecretClient) -> Self {
        Self { client }
    }
}

/// Binds a new [`SecretStoreClient`] to a workspace's secret namespace. The
/// vault per workspace is derived from a provisioning convention outside
/// this crate; this factory only knows a URL template of the form
/// `https://<prefix>-<workspace>.vault.azure.net`.
pub trait SecretStoreClientFactory: Send + Sync {
    fn client_for(&self, workspace: &str) -> Arc<dyn SecretStoreClient>;
}

pub struct AzureSecretStoreClientFactory {
    vault_prefix: String,
    credential: Arc<dyn TokenCredential>,
}

impl AzureSecretStoreClientFactory {
    pub fn new(vault_prefix: impl Into<String>, credential: Arc<dyn TokenCredential>) -> Self {
        Self {
            vault_prefix: vault_prefix.into(),
            credential,
        }
    }
}

impl SecretStoreClientFactory for AzureSecretStoreClientFactory {
    fn client_for(&self, workspace: &str) -> Arc<dyn SecretStoreClient> {
        let vault_url = format!("https://{}-{}.vault.azure.net", self.vault_prefix, workspace);
        let client = SecretClient::new(&vault_url, self.credential.clone())
            .expect("vault url derived from naming convention is always valid");
        Arc::new(AzureSecretStoreClient::new(client))
    }
}

fn classify(err: azure_core::Error) -> SecretStoreError {
    if let Some(status) = err.as_http_error().map(|e| e.status()) {
        if status.as_u16() == 429 || status.is_server_error() {
            return SecretStoreError::Unavailable(err.to_string());
        }
    }
    SecretStoreError::Fatal(err.to_string())
}

#[async_trait]
impl SecretStoreClient for AzureSecretStoreClient {
    async fn set(
        &self,
        name: &str,
        value: &str,
        tags: HashMap<String, String>,
    ) -> Result<String, SecretStoreError> {
        validate_name(name)?;
        let mut properties = self.client.set(name, value);
        if !tags.is_empty() {
            properties = properties.tags(tags);
        }
        let secret = properties.await.map_err(classify)?;
        Ok(secret.resource_id().and_then(|id| id.version.clone()).unwrap_or_default())
    }

    async fn get(&self, name: &str, version: &str) -> Result<String, SecretStoreError> {
        validate_name(name)?;
        let secret = if version.is_empty() {
            self.client.get(name).await.map_err(classify)?
        } else {
            self.client
                .get_with_version(name, version)
                .await
                .map_err(classify)?
        };
        Ok(secret.value)
    }

    async fn delete(&self, name: &str) -> Result<(), SecretStoreError> {
        validate_name(name)?;
        self.client.delete(name).await.map(|_| ()).map_err(classify)
    }

    async fn list(&self) -> Result<Vec<SecretListEntry>, SecretStoreError> {
        use futures::StreamExt;

        let mut stream = self.client.list_secrets().into_stream();
        let mut entries = Vec::new();
        while let Some(page) = stream.next().await {
            let page = page.map_err(classify)?;
            for item in page.value {
                if item.attributes.enabled == Some(false) {
                    continue;
                }
                let id = item
                    .id
                    .rsplit('/')
                    .next()
                    .unwrap_or(&item.id)
                    .to_string();
                entries.push(SecretListEntry {
                    id,
                    tags: item.tags.unwrap_or_default(),
                });
            }
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_name_over_limit() {
        let name = "a".repeat(MAX_SECRET_NAME_LEN + 1);
        assert!(validate_name(&name).is_err());
    }

    #[test]
    fn accepts_name_at_limit() {
        let name = "a".repeat(MAX_SECRET_NAME_LEN);
        assert!(validate_name(&name).is_ok());
    }

    #[test]
    fn rejects_non_ascii() {
        assert!(validate_name("sécret").is_err());
    }
}
