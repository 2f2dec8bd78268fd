//! Masking and garbage-collection scenarios.

mod common;

use tfstate_core::session::LockInfo;

#[tokio::test]
async fn sensitive_leaf_is_masked_on_persist_and_restored_on_refresh() {
    let registry = common::registry();
    let manager = registry.get_state_manager("dev").await.unwrap();
    manager.refresh_state().await.unwrap();

    let lease_id = manager.lock(LockInfo::new("Apply", "alice", "1.7.0")).await.unwrap();
    let mut doc = manager.state().await.unwrap();
    doc.resources.push(common::single_instance_resource(
        "db",
        "primary",
        serde_json::json!({"password": "p@ss", "user": "u"}),
    ));
    manager.write_state(doc).await;
    manager.persist_state().await.unwrap();
    manager.unlock(&lease_id).await.unwrap();

    manager.refresh_state().await.unwrap();
    let state = manager.state().await.unwrap();
    let attrs = &state.resources[0].instances[0].attributes_raw;
    assert_eq!(attrs["password"], serde_json::json!("p@ss"));
    assert_eq!(attrs["user"], serde_json::json!("u"));
}

#[tokio::test]
async fn removing_a_sensitive_attribute_garbage_collects_its_secret() {
    let registry = common::registry();
    let manager = registry.get_state_manager("dev").await.unwrap();
    manager.refresh_state().await.unwrap();

    let lease_id = manager.lock(LockInfo::new("Apply", "alice", "1.7.0")).await.unwrap();
    let mut doc = manager.state().await.unwrap();
    doc.resources.push(common::single_instance_resource(
        "db",
        "primary",
        serde_json::json!({"password": "p@ss", "user": "u"}),
    ));
    doc.resources.push(common::single_instance_resource(
        "db",
        "secondary",
        serde_json::json!({"password": "other-secret", "user": "u2"}),
    ));
    manager.write_state(doc).await;
    manager.persist_state().await.unwrap();

    let mut doc = manager.state().await.unwrap();
    doc.resources.retain(|r| r.name != "secondary");
    manager.write_state(doc).await;
    manager.persist_state().await.unwrap();
    manager.unlock(&lease_id).await.unwrap();

    manager.refresh_state().await.unwrap();
    let state = manager.state().await.unwrap();
    assert_eq!(state.resources.len(), 1);
    assert_eq!(
        state.resources[0].instances[0].attributes_raw["password"],
        serde_json::json!("p@ss")
    );
}

#[tokio::test]
async fn empty_string_sensitive_leaf_is_never_uploaded_as_a_secret() {
    let registry = common::registry();
    let manager = registry.get_state_manager("dev").await.unwrap();
    manager.refresh_state().await.unwrap();

    let lease_id = manager.lock(LockInfo::new("Apply", "alice", "1.7.0")).await.unwrap();
    let mut doc = manager.state().await.unwrap();
    doc.resources
        .push(common::single_instance_resource("db", "primary", serde_json::json!({"password": ""})));
    manager.write_state(doc).await;
    manager.persist_state().await.unwrap();
    manager.unlock(&lease_id).await.unwrap();

    manager.refresh_state().await.unwrap();
    let state = manager.state().await.unwrap();
    assert_eq!(state.resources[0].instances[0].attributes_raw["password"], serde_json::json!(""));
}
