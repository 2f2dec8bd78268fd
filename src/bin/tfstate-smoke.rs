//! Local smoke harness for the state backend core, run against in-memory
//! object-store and secret-store doubles. Not part of the production
//! contract; exercises the workspace registry end to end for local
//! development.

use std::sync::Arc;

use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use tfstate_core::config::{Args, BackendConfig};
use tfstate_core::masking::schema::{Block, StaticSchemaOracle};
use tfstate_core::testing::{MemoryObjectStoreFactory, MemorySecretStoreFactory};
use tfstate_core::{StateDocument, WorkspaceRegistry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("failed to set tracing subscriber");

    let config = BackendConfig::try_from(args)?;
    info!(
        resource_group = %config.resource_group_name,
        storage_account = %config.storage_account_name,
        container = %config.container_name,
        "running smoke pass against in-memory doubles"
    );

    let schema = StaticSchemaOracle::new().with_schema(
        "example_secret",
        Block::new().with_attribute("value", true).with_attribute("name", false),
    );

    let registry = WorkspaceRegistry::new(
        Arc::new(MemoryObjectStoreFactory::new(config.container_name.clone())),
        Arc::new(MemorySecretStoreFactory::new()),
        Arc::new(schema),
        "1.7.0",
    );

    info!("workspaces before first access: {:?}", registry.workspaces().await?);

    let manager = registry.get_state_manager("dev").await?;
    manager.refresh_state().await?;
    info!("workspaces after first access: {:?}", registry.workspaces().await?);

    let lease_id = manager
        .lock(tfstate_core::session::LockInfo::new("Apply", "smoke", "1.7.0"))
        .await?;

    let mut doc = StateDocument::genesis("1.7.0");
    doc.resources.push(tfstate_core::state::ResourceState {
        module: "root".to_string(),
        mode: tfstate_core::state::ResourceMode::Managed,
        resource_type: "example_secret".to_string(),
        name: "demo".to_string(),
        each_mode: None,
        provider_config: None,
        instances: vec![tfstate_core::state::InstanceObjectState {
            index_key: None,
            status: None,
            deposed: None,
            schema_version: 0,
            attributes_raw: serde_json::json!({"name": "demo", "value": "top-secret"}),
            private_raw: None,
            depends_on: vec![],
        }],
    });
    manager.write_state(doc).await;
    manager.persist_state().await?;
    manager.unlock(&lease_id).await?;

    manager.refresh_state().await?;
    let state = manager.state().await.expect("state present after refresh");
    info!(serial = state.serial, "smoke pass complete, state round-tripped");

    Ok(())
}
