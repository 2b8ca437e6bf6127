//! Namespace bootstrap across the tenant lifecycle.

use pretty_assertions::assert_eq;

use e2e_tests::{fixture_store, TestHarness, STORE_ID};
use rag_namespaces::{NamespaceState, TenantLifecycle};
use rag_platform::Credential;
use rag_types::DataType;

/// Bootstrapping twice writes nothing the second time.
#[tokio::test(flavor = "multi_thread")]
async fn test_bootstrap_is_idempotent() {
    let harness = TestHarness::new(fixture_store()).await;

    let first = harness.manager.create_namespaces(STORE_ID).await.unwrap();
    let snapshot: Vec<(String, Vec<String>)> = harness
        .backend
        .namespaces()
        .into_iter()
        .map(|ns| {
            let ids = harness.backend.ids(&ns);
            (ns, ids)
        })
        .collect();

    let second = harness.manager.create_namespaces(STORE_ID).await.unwrap();

    assert_eq!(first.created.len(), DataType::ALL.len());
    assert_eq!(second.created, vec![]);
    assert_eq!(second.existing.len(), DataType::ALL.len());
    let after: Vec<(String, Vec<String>)> = harness
        .backend
        .namespaces()
        .into_iter()
        .map(|ns| {
            let ids = harness.backend.ids(&ns);
            (ns, ids)
        })
        .collect();
    assert_eq!(after, snapshot);
}

/// Reconnecting an indexed store re-bootstraps without reintroducing
/// placeholders and re-indexes with the fresh token.
#[tokio::test(flavor = "multi_thread")]
async fn test_reconnect_after_index_keeps_real_data() {
    let harness = TestHarness::new(fixture_store()).await;
    harness.manager.on_connected(STORE_ID).await.unwrap();
    harness.manager.background_tasks().wait_idle().await;
    let indexed = harness.real_document_count();
    assert_eq!(indexed, 9);

    harness.manager.on_disconnected(STORE_ID).await.unwrap();
    assert!(!harness.manager.has_periodic_sync(STORE_ID));

    // The connector only accepts the original token, so reuse it
    let result = harness
        .manager
        .on_reconnected(
            STORE_ID,
            Some(Credential::new(e2e_tests::ACCESS_TOKEN).with_platform_id(Some(STORE_ID.into()))),
        )
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(harness.real_document_count(), indexed);
    assert_eq!(
        harness.backend.namespace_len(&harness.namespace(DataType::Products)),
        3
    );
    assert_eq!(harness.manager.namespace_state(STORE_ID), NamespaceState::Indexed);
    assert!(harness.manager.has_periodic_sync(STORE_ID));
    assert_eq!(harness.locks.status().total_leases, 0);
}

/// A reconnect with a token the platform rejects reports the failure
/// instead of erroring, and leaves indexed data alone.
#[tokio::test(flavor = "multi_thread")]
async fn test_reconnect_with_rejected_token() {
    let harness = TestHarness::new(fixture_store()).await;
    harness.manager.create_namespaces(STORE_ID).await.unwrap();
    harness.manager.trigger_sync(STORE_ID).await.unwrap();

    let result = harness
        .manager
        .on_reconnected(STORE_ID, Some(Credential::new("revoked")))
        .await
        .unwrap();

    assert!(!result.success);
    assert!(result.error.is_some());
    assert_eq!(harness.real_document_count(), 9);
}

/// A store deleted and then reconnected goes back through placeholders to
/// indexed data.
#[tokio::test(flavor = "multi_thread")]
async fn test_reconnect_after_delete_reindexes() {
    let harness = TestHarness::new(fixture_store()).await;
    harness.manager.create_namespaces(STORE_ID).await.unwrap();
    harness.manager.on_deleted(STORE_ID).await.unwrap();
    assert_eq!(harness.manager.namespace_state(STORE_ID), NamespaceState::Deleted);

    let result = harness.manager.on_reconnected(STORE_ID, None).await.unwrap();

    assert!(result.success);
    assert_eq!(harness.real_document_count(), 9);
    assert_eq!(harness.manager.namespace_state(STORE_ID), NamespaceState::Indexed);
    assert!(harness.manager.has_periodic_sync(STORE_ID));
}
