//! Retrieval behaviour across namespaces: fallbacks and score ordering.

use pretty_assertions::assert_eq;

use e2e_tests::{fixture_store, TestHarness, STORE_ID};
use rag_engine::{AgentRole, SearchContext, SearchOptions, APOLOGY_ANSWER, NO_INFORMATION_ANSWER};
use rag_types::{ChunkMetadata, DataType, DocumentChunk, NamespaceKey};

fn chunk(data_type: DataType, id: &str, content: &str) -> DocumentChunk {
    DocumentChunk::new(id, content, ChunkMetadata::new(data_type, STORE_ID, "platform"))
}

/// Every failure mode comes back as an answer, never an error or panic.
#[tokio::test(flavor = "multi_thread")]
async fn test_retrieval_never_fails() {
    let harness = TestHarness::new(fixture_store()).await;
    let context = SearchContext::new(STORE_ID, AgentRole::General);

    // Nothing indexed yet
    let answer = harness
        .engine
        .search("What products do you have?", &context, &SearchOptions::default())
        .await;
    assert_eq!(answer.answer, NO_INFORMATION_ANSWER);
    assert!(answer.sources.is_empty());

    // Empty query
    let answer = harness.engine.search("   ", &context, &SearchOptions::default()).await;
    assert_eq!(answer.answer, APOLOGY_ANSWER);

    // Index unreachable after a successful sync
    harness.manager.create_namespaces(STORE_ID).await.unwrap();
    harness.manager.trigger_sync(STORE_ID).await.unwrap();
    harness.switch.set_queries_down(true);

    let answer = harness
        .engine
        .search("What products do you have?", &context, &SearchOptions::default())
        .await;
    assert_eq!(answer.answer, APOLOGY_ANSWER);
    assert!(answer.is_fallback());
    assert!(answer.sources.is_empty());

    // Recovers once the index is back
    harness.switch.set_queries_down(false);
    let answer = harness
        .engine
        .search("What products do you have?", &context, &SearchOptions::default())
        .await;
    assert!(!answer.is_fallback());
    assert!(!answer.sources.is_empty());
}

/// Sources are ranked by score across namespaces, not grouped by namespace.
#[tokio::test(flavor = "multi_thread")]
async fn test_merge_is_score_global() {
    let harness = TestHarness::new(fixture_store()).await;
    let store = harness.engine.vector_store();

    store
        .add_documents(
            &NamespaceKey::new(STORE_ID, DataType::Products),
            vec![
                chunk(DataType::Products, "product-a", "Espresso grinder"),
                chunk(
                    DataType::Products,
                    "product-b",
                    "Espresso grinder ceramic burr stainless hopper matte black finish",
                ),
            ],
        )
        .await
        .unwrap();
    store
        .add_documents(
            &NamespaceKey::new(STORE_ID, DataType::Store),
            vec![chunk(DataType::Store, "store-1", "Espresso grinder workshop")],
        )
        .await
        .unwrap();

    let answer = harness
        .engine
        .search(
            "espresso grinder",
            &SearchContext::new(STORE_ID, AgentRole::Product),
            &SearchOptions::default().with_min_score(0.0),
        )
        .await;

    let ids: Vec<&str> = answer.sources.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["product-a", "store-1", "product-b"]);
    assert!(answer
        .sources
        .windows(2)
        .all(|pair| pair[0].score >= pair[1].score));
}

/// A role only sees its own namespaces.
#[tokio::test(flavor = "multi_thread")]
async fn test_role_scopes_namespaces() {
    let harness = TestHarness::new(fixture_store()).await;
    harness.manager.create_namespaces(STORE_ID).await.unwrap();
    harness.manager.trigger_sync(STORE_ID).await.unwrap();

    let answer = harness
        .engine
        .search(
            "Sara Ali customer",
            &SearchContext::new(STORE_ID, AgentRole::Product),
            &SearchOptions::default().with_min_score(0.0),
        )
        .await;

    assert!(answer
        .sources
        .iter()
        .all(|s| AgentRole::Product.data_types().contains(&s.data_type)));
    assert_eq!(
        answer.metadata.namespaces,
        vec![
            format!("tenant-{STORE_ID}-products"),
            format!("tenant-{STORE_ID}"),
            format!("tenant-{STORE_ID}-analytics"),
        ]
    );
}
