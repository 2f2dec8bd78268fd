//! Workspace registry end-to-end scenarios.

mod common;

use tfstate_core::registry::DEFAULT_WORKSPACE;

#[tokio::test]
async fn fresh_workspace_appears_after_first_access() {
    let registry = common::registry();

    assert_eq!(registry.workspaces().await.unwrap(), vec![DEFAULT_WORKSPACE.to_string()]);

    let manager = registry.get_state_manager("dev").await.unwrap();
    manager.refresh_state().await.unwrap();

    let mut names = registry.workspaces().await.unwrap();
    names.sort();
    assert_eq!(names, vec!["default".to_string(), "dev".to_string()]);

    let state = manager.state().await.unwrap();
    assert_eq!(state.serial, 0);
    assert!(state.resources.is_empty());
    assert!(state.outputs.is_empty());
    assert_eq!(state.version, tfstate_core::state::STATE_FORMAT_VERSION);
}

#[tokio::test]
async fn default_workspace_survives_delete_attempts() {
    let registry = common::registry();
    let err = registry.delete_workspace(DEFAULT_WORKSPACE).await.unwrap_err();
    assert!(matches!(err, tfstate_core::CoreError::WorkspaceError(_)));
    assert_eq!(registry.workspaces().await.unwrap(), vec![DEFAULT_WORKSPACE.to_string()]);
}

#[tokio::test]
async fn deleting_a_workspace_removes_its_blob_and_secrets() {
    let registry = common::registry();
    let manager = registry.get_state_manager("dev").await.unwrap();
    manager.refresh_state().await.unwrap();

    let lease_id = manager
        .lock(tfstate_core::session::LockInfo::new("Apply", "alice", "1.7.0"))
        .await
        .unwrap();
    let mut doc = manager.state().await.unwrap();
    doc.resources.push(common::single_instance_resource(
        "db",
        "primary",
        serde_json::json!({"password": "p@ss", "user": "root"}),
    ));
    manager.write_state(doc).await;
    manager.persist_state().await.unwrap();
    manager.unlock(&lease_id).await.unwrap();

    registry.delete_workspace("dev").await.unwrap();
    assert_eq!(registry.workspaces().await.unwrap(), vec![DEFAULT_WORKSPACE.to_string()]);
}
