//! Shared fixtures for integration tests. Requires the library to be built
//! with `--features test-support` so the in-memory object-store and
//! secret-store doubles are compiled in.

use std::sync::Arc;

use tfstate_core::masking::schema::{Block, StaticSchemaOracle};
use tfstate_core::state::{InstanceObjectState, ResourceMode, ResourceState};
use tfstate_core::testing::{MemoryObjectStoreFactory, MemorySecretStoreFactory};
use tfstate_core::WorkspaceRegistry;

/// A schema oracle covering the resource types these tests exercise.
pub fn schema_oracle() -> StaticSchemaOracle {
    StaticSchemaOracle::new()
        .with_schema(
            "db",
            Block::new()
                .with_attribute("password", true)
                .with_attribute("user", false),
        )
        .with_schema("my_resource", Block::new().with_attribute("name", false))
}

pub fn registry() -> WorkspaceRegistry {
    WorkspaceRegistry::new(
        Arc::new(MemoryObjectStoreFactory::new("tfstate")),
        Arc::new(MemorySecretStoreFactory::new()),
        Arc::new(schema_oracle()),
        "1.7.0",
    )
}

/// One resource with one instance, attributes as given, used across the
/// masking/state-manager scenarios.
pub fn single_instance_resource(resource_type: &str, name: &str, attrs: serde_json::Value) -> ResourceState {
    ResourceState {
        module: "root".to_string(),
        mode: ResourceMode::Managed,
        resource_type: resource_type.to_string(),
        name: name.to_string(),
        each_mode: None,
        provider_config: None,
        instances: vec![InstanceObjectState {
            index_key: None,
            status: None,
            deposed: None,
            schema_version: 0,
            attributes_raw: attrs,
            private_raw: None,
            depends_on: vec![],
        }],
    }
}
