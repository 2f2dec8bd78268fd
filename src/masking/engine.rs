//! The masking engine: schema-driven walk that rewrites
//! sensitive leaves to secret references on persist, and inverts the walk
//! on refresh.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{CoreError, CoreResult};
use crate::masking::schema::{Block, SchemaOracle};
use crate::masking::secret_id;
use crate::secretstore::{SecretStoreClient, SecretStoreError};
use crate::state::document::{SecretReference, StateDocument};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Schema-driven mask/unmask pair shared by the state manager.
///
/// Borrows both the state document it is asked to transform and a handle
/// to the secret store; it owns no persistent state of its own.
pub struct MaskingEngine {
    schema_oracle: Arc<dyn SchemaOracle>,
    secret_store: Arc<dyn SecretStoreClient>,
}

impl MaskingEngine {
    pub fn new(schema_oracle: Arc<dyn SchemaOracle>, secret_store: Arc<dyn SecretStoreClient>) -> Self {
        Self {
            schema_oracle,
            secret_store,
        }
    }

    /// Masks `doc` in place and garbage-collects secrets that are no
    /// longer addressed by any live attribute. Meant to be called on a deep copy, never on the state
    /// manager's canonical in-memory document.
    pub async fn mask(&self, doc: &mut StateDocument) -> CoreResult<()> {
        let mut live_addresses: HashSet<String> = HashSet::new();

        for resource in &mut doc.resources {
            let Some(schema) = self.schema_oracle.schema_for(&resource.resource_type) else {
                continue;
            };
            for instance in &mut resource.instances {
                if let Value::Object(map) = &mut instance.attributes_raw {
                    self.mask_object(&schema, &resource.module, &resource.name, "", map, &mut live_addresses)
                        .await?;
                }
            }
        }

        self.garbage_collect(&live_addresses).await?;
        Ok(())
    }

    /// Replaces every SecretReference in `doc` with its cleartext. The
    /// unmasker never consults schemas; it recognizes references purely
    /// by shape.
    pub async fn unmask(&self, doc: &mut StateDocument) -> CoreResult<()> {
        for resource in &mut doc.resources {
            for instance in &mut resource.instances {
                self.unmask_value(&mut instance.attributes_raw).await?;
            }
        }
        Ok(())
    }

    fn mask_object<'a>(
        &'a self,
        block: &'a Block,
        module: &'a str,
        resource_name: &'a str,
        path_prefix: &'a str,
        map: &'a mut Map<String, Value>,
        live: &'a mut HashSet<String>,
    ) -> BoxFuture<'a, CoreResult<()>> {
        Box::pin(async move {
            let keys: Vec<String> = map.keys().cloned().collect();
            for key in keys {
                if !block.declares(&key) {
                    continue; // unknown key: leave untouched
                }
                let dotted_key = if path_prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{path_prefix}.{key}")
                };

                if block.is_sensitive(&key) {
                    let address = format!("{module}.{resource_name}.{dotted_key}");
                    let value = map.get_mut(&key).expect("key just observed in map");
                    self.mask_sensitive_value(&address, value, live).await?;
                } else if let Some(nested) = block.nested_block(&key) {
                    let value = map.get_mut(&key).expect("key just observed in map");
                    self.descend_into_nested_block(nested, module, resource_name, &dotted_key, value, live)
                        .await?;
                }
            }
            Ok(())
        })
    }

    fn descend_into_nested_block<'a>(
        &'a self,
        nested: &'a Block,
        module: &'a str,
        resource_name: &'a str,
        dotted_key: &'a str,
        value: &'a mut Value,
        live: &'a mut HashSet<String>,
    ) -> BoxFuture<'a, CoreResult<()>> {
        Box::pin(async move {
            match value {
                Value::Object(obj) => {
                    self.mask_object(nested, module, resource_name, dotted_key, obj, live).await?;
                }
                Value::Array(items) => {
                    for item in items.iter_mut() {
                        if let Value::Object(obj) = item {
                            self.mask_object(nested, module, resource_name, dotted_key, obj, live).await?;
                        }
                    }
                }
                _ => {}
            }
            Ok(())
        })
    }

    /// Masks a single schema-sensitive leaf value, which may be a scalar
    /// string or a sequence of strings.
    async fn mask_sensitive_value(
        &self,
        address: &str,
        value: &mut Value,
        live: &mut HashSet<String>,
    ) -> CoreResult<()> {
        match value {
            Value::String(s) if !s.is_empty() => {
                if let Some(reference) = self.write_secret(address, s, None).await? {
                    live.insert(address.to_string());
                    *value = serde_json::to_value(reference).expect("SecretReference serializes");
                }
            }
            Value::Array(items) => {
                let mut wrote_any = false;
                for (index, item) in items.iter_mut().enumerate() {
                    if let Value::String(s) = item {
                        if s.is_empty() {
                            continue;
                        }
                        if let Some(reference) = self.write_secret(address, s, Some(index)).await? {
                            wrote_any = true;
                            *item = serde_json::to_value(reference).expect("SecretReference serializes");
                        }
                    }
                }
                if wrote_any {
                    live.insert(address.to_string());
                }
            }
            Value::Object(_) => {
                return Err(CoreError::NotImplemented(format!(
                    "map-typed sensitive attribute at {address}"
                )));
            }
            _ => {}
        }
        Ok(())
    }

    async fn write_secret(
        &self,
        address: &str,
        cleartext: &str,
        index: Option<usize>,
    ) -> CoreResult<Option<SecretReference>> {
        let Some(id) = secret_id::encode_within_limit(address, crate::secretstore::client::MAX_SECRET_NAME_LEN)
        else {
            warn!(address, "secret address too long, leaving leaf in cleartext");
            return Ok(None);
        };

        let mut tags = HashMap::new();
        let mut parts = address.splitn(3, '.');
        if let Some(module) = parts.next() {
            tags.insert("module".to_string(), module.to_string());
        }
        if let Some(resource) = parts.next() {
            tags.insert("resource".to_string(), resource.to_string());
        }
        if let Some(attribute) = parts.next() {
            tags.insert("attribute".to_string(), attribute.to_string());
        }
        if let Some(index) = index {
            tags.insert("index".to_string(), index.to_string());
        }

        let version = self
            .secret_store
            .set(&id, cleartext, tags)
            .await
            .map_err(|e| CoreError::SecretSetFailed {
                address: address.to_string(),
                source: Box::new(map_secret_store_error(e)),
            })?;

        Ok(Some(SecretReference::new_string(id, version)))
    }

    fn unmask_value<'a>(&'a self, value: &'a mut Value) -> BoxFuture<'a, CoreResult<()>> {
        Box::pin(async move {
            match value {
                Value::Object(map) => {
                    if let Some(reference) = parse_reference(map) {
                        let cleartext =
                            self.secret_store.get(&reference.id, &reference.version).await.map_err(
                                |e| match e {
                                    SecretStoreError::Unavailable(msg) => CoreError::BackendUnavailable(msg),
                                    _ => CoreError::SecretMissing { address: reference.id.clone() },
                                },
                            )?;
                        *value = Value::String(cleartext);
                    } else {
                        for v in map.values_mut() {
                            self.unmask_value(v).await?;
                        }
                    }
                }
                Value::Array(items) => {
                    for item in items.iter_mut() {
                        self.unmask_value(item).await?;
                    }
                }
                _ => {}
            }
            Ok(())
        })
    }

    /// Deletes every secret whose decoded address is not among the live
    /// sensitive-attribute addresses observed during this mask pass. Runs
    /// only after all writes succeeded.
    async fn garbage_collect(&self, live_addresses: &HashSet<String>) -> CoreResult<()> {
        let listed = self
            .secret_store
            .list()
            .await
            .map_err(|e| CoreError::BackendFatal(e.to_string()))?;

        for entry in listed {
            let Some(address) = secret_id::decode(&entry.id) else {
                continue;
            };
            if !live_addresses.contains(&address) {
                self.secret_store
                    .delete(&entry.id)
                    .await
                    .map_err(|e| CoreError::BackendFatal(e.to_string()))?;
            }
        }
        Ok(())
    }
}

/// Preserves a transient secret-store failure as `BackendUnavailable`
/// instead of collapsing it into a fatal/missing-secret variant.
fn map_secret_store_error(err: SecretStoreError) -> CoreError {
    match err {
        SecretStoreError::Unavailable(msg) => CoreError::BackendUnavailable(msg),
        other => CoreError::BackendFatal(other.to_string()),
    }
}

/// Recognizes a SecretReference purely by shape: an object containing
/// `type`, `id`, and `version` string fields.
fn parse_reference(map: &Map<String, Value>) -> Option<SecretReference> {
    let ref_type = map.get("type")?.as_str()?.to_string();
    let id = map.get("id")?.as_str()?.to_string();
    let version = map.get("version")?.as_str()?.to_string();
    Some(SecretReference { ref_type, id, version })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::masking::schema::StaticSchemaOracle;
    use crate::secretstore::client::SecretListEntry;
    use crate::state::document::{InstanceObjectState, ResourceMode, ResourceState};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;

    #[derive(Default)]
    struct FakeSecretStore {
        secrets: Mutex<HashMap<String, Vec<(String, String)>>>, // name -> [(version, value)]
    }

    #[async_trait]
    impl SecretStoreClient for FakeSecretStore {
        async fn set(&self, name: &str, value: &str, _tags: HashMap<String, String>) -> Result<String, SecretStoreError> {
            let mut guard = self.secrets.lock();
            let versions = guard.entry(name.to_string()).or_default();
            let version = format!("v{}", versions.len() + 1);
            versions.push((version.clone(), value.to_string()));
            Ok(version)
        }

        async fn get(&self, name: &str, version: &str) -> Result<String, SecretStoreError> {
            let guard = self.secrets.lock();
            let versions = guard.get(name).ok_or_else(|| SecretStoreError::Fatal("not found".into()))?;
            versions
                .iter()
                .find(|(v, _)| v == version)
                .map(|(_, val)| val.clone())
                .ok_or_else(|| SecretStoreError::Fatal("version not found".into()))
        }

        async fn delete(&self, name: &str) -> Result<(), SecretStoreError> {
            self.secrets.lock().remove(name);
            Ok(())
        }

        async fn list(&self) -> Result<Vec<SecretListEntry>, SecretStoreError> {
            Ok(self
                .secrets
                .lock()
                .keys()
                .map(|id| SecretListEntry { id: id.clone(), tags: HashMap::new() })
                .collect())
        }
    }

    fn db_resource() -> ResourceState {
        ResourceState {
            module: "root".to_string(),
            mode: ResourceMode::Managed,
            resource_type: "db".to_string(),
            name: "db".to_string(),
            each_mode: None,
            provider_config: None,
            instances: vec![InstanceObjectState {
                index_key: None,
                status: None,
                deposed: None,
                schema_version: 0,
                attributes_raw: json!({"password": "p@ss", "user": "u"}),
                private_raw: None,
                depends_on: vec![],
            }],
        }
    }

    #[tokio::test]
    async fn masks_sensitive_string_leaf_and_unmasks_it_back() {
        let schema = StaticSchemaOracle::new().with_schema(
            "db",
            Block::new().with_attribute("password", true).with_attribute("user", false),
        );
        let secret_store = Arc::new(FakeSecretStore::default());
        let engine = MaskingEngine::new(Arc::new(schema), secret_store.clone());

        let mut doc = StateDocument::genesis("1.7.0");
        doc.resources.push(db_resource());

        engine.mask(&mut doc).await.unwrap();
        let attrs = &doc.resources[0].instances[0].attributes_raw;
        assert_eq!(attrs["user"], json!("u"));
        assert_eq!(attrs["password"]["type"], json!("string"));
        assert!(attrs["password"]["id"].is_string());

        engine.unmask(&mut doc).await.unwrap();
        assert_eq!(doc.resources[0].instances[0].attributes_raw["password"], json!("p@ss"));
    }

    #[tokio::test]
    async fn gc_removes_secrets_no_longer_live() {
        let schema = StaticSchemaOracle::new().with_schema("db", Block::new().with_attribute("password", true));
        let secret_store = Arc::new(FakeSecretStore::default());
        let engine = MaskingEngine::new(Arc::new(schema), secret_store.clone());

        let mut doc = StateDocument::genesis("1.7.0");
        doc.resources.push(db_resource());
        engine.mask(&mut doc).await.unwrap();
        assert_eq!(secret_store.list().await.unwrap().len(), 1);

        doc.resources.clear();
        engine.mask(&mut doc).await.unwrap();
        assert_eq!(secret_store.list().await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn empty_string_leaf_is_not_uploaded() {
        let schema = StaticSchemaOracle::new().with_schema("db", Block::new().with_attribute("password", true));
        let secret_store = Arc::new(FakeSecretStore::default());
        let engine = MaskingEngine::new(Arc::new(schema), secret_store.clone());

        let mut doc = StateDocument::genesis("1.7.0");
        let mut resource = db_resource();
        resource.instances[0].attributes_raw = json!({"password": ""});
        doc.resources.push(resource);

        engine.mask(&mut doc).await.unwrap();
        assert_eq!(doc.resources[0].instances[0].attributes_raw["password"], json!(""));
        assert_eq!(secret_store.list().await.unwrap().len(), 0);
    }
}
