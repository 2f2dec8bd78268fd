//! State manager invariants: serial bumping, lineage stability, idempotent persist.

mod common;

use tfstate_core::session::LockInfo;

#[tokio::test]
async fn non_sensitive_attribute_round_trips_verbatim_and_bumps_serial() {
    let registry = common::registry();
    let manager = registry.get_state_manager("dev").await.unwrap();
    manager.refresh_state().await.unwrap();

    let lease_id = manager.lock(LockInfo::new("Apply", "alice", "1.7.0")).await.unwrap();
    let mut doc = manager.state().await.unwrap();
    let lineage = doc.lineage;
    doc.resources
        .push(common::single_instance_resource("my_resource", "web", serde_json::json!({"name": "web"})));
    manager.write_state(doc).await;
    manager.persist_state().await.unwrap();
    manager.unlock(&lease_id).await.unwrap();

    manager.refresh_state().await.unwrap();
    let state = manager.state().await.unwrap();
    assert_eq!(state.serial, 1);
    assert_eq!(state.lineage, lineage);
    assert_eq!(state.resources[0].instances[0].attributes_raw["name"], serde_json::json!("web"));
}

#[tokio::test]
async fn idempotent_persist_leaves_serial_unchanged() {
    let registry = common::registry();
    let manager = registry.get_state_manager("dev").await.unwrap();
    manager.refresh_state().await.unwrap();

    let lease_id = manager.lock(LockInfo::new("Apply", "alice", "1.7.0")).await.unwrap();
    let mut doc = manager.state().await.unwrap();
    doc.resources
        .push(common::single_instance_resource("my_resource", "web", serde_json::json!({"name": "web"})));
    manager.write_state(doc).await;
    manager.persist_state().await.unwrap();
    let after_first = manager.state().await.unwrap().serial;
    assert_eq!(after_first, 1);

    manager.persist_state().await.unwrap();
    let after_second = manager.state().await.unwrap().serial;
    assert_eq!(after_first, after_second);
    manager.unlock(&lease_id).await.unwrap();
}

#[tokio::test]
async fn lineage_is_stable_across_refreshes() {
    let registry = common::registry();
    let manager = registry.get_state_manager("dev").await.unwrap();
    manager.refresh_state().await.unwrap();
    let lineage = manager.state().await.unwrap().lineage;

    for _ in 0..3 {
        manager.refresh_state().await.unwrap();
        assert_eq!(manager.state().await.unwrap().lineage, lineage);
    }
}

#[tokio::test]
async fn persist_without_prior_write_state_fails() {
    let registry = common::registry();
    let manager = registry.get_state_manager("dev").await.unwrap();
    let err = manager.persist_state().await.unwrap_err();
    assert!(matches!(err, tfstate_core::CoreError::EmptyState));
}
