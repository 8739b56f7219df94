//! End-to-end pipeline tests with a deterministic mock provider and an
//! in-memory SQLite store.

use std::sync::Arc;

use chunksmith::{
    EmbeddingBackend, MemoryConfig, MemoryError, MemoryService, MetaValue, Metadata,
    MockEmbeddingProvider, SqliteMemoryStore, VectorStore,
};

const DIM: usize = 16;

fn base_config() -> MemoryConfig {
    MemoryConfig::default()
        .with_provider(EmbeddingBackend::Mock)
        .with_model("mock")
        .with_dimension(DIM)
        .with_chunking(200, 20)
        .with_dedup(true, 0.98)
}

async fn service_with(
    config: MemoryConfig,
    provider: MockEmbeddingProvider,
) -> (MemoryService, Arc<SqliteMemoryStore>) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
    let store = Arc::new(
        SqliteMemoryStore::open_in_memory(config.dimension)
            .await
            .unwrap(),
    );
    let service = MemoryService::builder()
        .config(config)
        .provider(Arc::new(provider))
        .store(store.clone())
        .build()
        .unwrap();
    (service, store)
}

fn meta(pairs: &[(&str, MetaValue)]) -> Metadata {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[tokio::test]
async fn store_splits_and_persists_chunks() {
    let (service, store) = service_with(base_config(), MockEmbeddingProvider::new(DIM)).await;

    let receipt = service
        .store_document(
            "d1",
            "Alice studies glaciers in Norway. Bob repairs violins in Vienna.",
            Metadata::new(),
        )
        .await
        .unwrap();

    assert_eq!(receipt.doc_id, "d1");
    assert!(receipt.chunks_stored >= 1);

    let rows = store.document_chunks("d1").await.unwrap();
    assert_eq!(rows.len(), receipt.chunks_stored);
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(row.ordinal, i, "ordinals must be contiguous from zero");
        assert_eq!(row.embedding.len(), DIM);
        assert!(!row.text.is_empty());
    }
}

#[tokio::test]
async fn storing_twice_is_idempotent() {
    let (service, store) = service_with(base_config(), MockEmbeddingProvider::new(DIM)).await;
    let text = "The same fact, stored twice, should not duplicate anything.";

    service.store_document("d1", text, Metadata::new()).await.unwrap();
    let first: Vec<String> = store
        .document_chunks("d1")
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.text)
        .collect();

    service.store_document("d1", text, Metadata::new()).await.unwrap();
    let second: Vec<String> = store
        .document_chunks("d1")
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.text)
        .collect();

    assert_eq!(first, second);
    assert_eq!(store.count().await.unwrap(), first.len());
}

#[tokio::test]
async fn reingesting_replaces_the_old_chunk_set() {
    let (service, store) = service_with(base_config(), MockEmbeddingProvider::new(DIM)).await;

    service
        .store_document("d1", "Original content about sailing ships.", Metadata::new())
        .await
        .unwrap();
    service
        .store_document("d1", "Replacement content about steam engines.", Metadata::new())
        .await
        .unwrap();

    let rows = store.document_chunks("d1").await.unwrap();
    assert!(rows.iter().all(|r| !r.text.contains("sailing")));

    // The old text is no longer retrievable even when searching for it.
    let hits = service
        .search("sailing ships", 10, None, Some("d1"))
        .await
        .unwrap();
    assert!(hits.iter().all(|h| !h.text.contains("sailing")));
}

#[tokio::test]
async fn empty_text_clears_prior_rows() {
    let (service, store) = service_with(base_config(), MockEmbeddingProvider::new(DIM)).await;

    service
        .store_document("d1", "Something worth remembering.", Metadata::new())
        .await
        .unwrap();
    assert!(store.count().await.unwrap() > 0);

    let receipt = service
        .store_document("d1", "   \n\t ", Metadata::new())
        .await
        .unwrap();
    assert_eq!(receipt.chunks_stored, 0);
    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn near_duplicate_chunks_are_dropped() {
    // Two paragraphs the chunker will split apart, pinned to vectors with
    // cosine similarity ~0.995 against a 0.98 threshold.
    let para_one = "first paragraph of modest length.";
    let para_two = "second paragraph follows here.";
    let text = format!("{para_one}\n\n{para_two}");

    let mut v1 = vec![0.0f32; DIM];
    v1[0] = 1.0;
    let mut v2 = vec![0.0f32; DIM];
    v2[0] = 0.995;
    v2[1] = 0.0999;

    let provider = MockEmbeddingProvider::new(DIM)
        .with_vector(para_one, v1)
        .with_vector(para_two, v2);
    let config = base_config().with_chunking(40, 0);
    let (service, store) = service_with(config, provider).await;

    let receipt = service
        .store_document("d1", &text, Metadata::new())
        .await
        .unwrap();
    assert_eq!(receipt.chunks_stored, 1);
    assert_eq!(receipt.chunks_deduped, 1);

    let rows = store.document_chunks("d1").await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].text, para_one, "the earlier chunk survives");
    assert_eq!(rows[0].ordinal, 0);
}

#[tokio::test]
async fn disabling_dedup_keeps_everything() {
    let para_one = "first paragraph of modest length.";
    let para_two = "second paragraph follows here.";
    let text = format!("{para_one}\n\n{para_two}");

    let mut v1 = vec![0.0f32; DIM];
    v1[0] = 1.0;
    let mut v2 = vec![0.0f32; DIM];
    v2[0] = 0.995;
    v2[1] = 0.0999;

    let provider = MockEmbeddingProvider::new(DIM)
        .with_vector(para_one, v1)
        .with_vector(para_two, v2);
    let config = base_config().with_chunking(40, 0).with_dedup(false, 0.98);
    let (service, _store) = service_with(config, provider).await;

    let receipt = service
        .store_document("d1", &text, Metadata::new())
        .await
        .unwrap();
    assert_eq!(receipt.chunks_stored, 2);
    assert_eq!(receipt.chunks_deduped, 0);
}

#[tokio::test]
async fn metadata_filter_is_a_conjunction_of_exact_matches() {
    let (service, _store) = service_with(base_config(), MockEmbeddingProvider::new(DIM)).await;

    service
        .store_document(
            "demo-doc",
            "A note that came from the demo environment.",
            meta(&[("source", "demo".into()), ("year", 2024i64.into())]),
        )
        .await
        .unwrap();
    service
        .store_document(
            "prod-doc",
            "A note that came from production.",
            meta(&[("source", "prod".into()), ("year", 2024i64.into())]),
        )
        .await
        .unwrap();
    service
        .store_document("bare-doc", "A note with no metadata at all.", Metadata::new())
        .await
        .unwrap();

    let filter = meta(&[("source", "demo".into())]);
    let hits = service.search("a note", 10, Some(&filter), None).await.unwrap();
    assert!(!hits.is_empty());
    assert!(hits.iter().all(|h| h.doc_id == "demo-doc"));

    // Both keys must match; a row missing a key is excluded, not an error.
    let filter = meta(&[("source", "demo".into()), ("year", 2025i64.into())]);
    let hits = service.search("a note", 10, Some(&filter), None).await.unwrap();
    assert!(hits.is_empty());

    let filter = meta(&[("year", 2024i64.into())]);
    let hits = service.search("a note", 10, Some(&filter), None).await.unwrap();
    assert!(hits.iter().all(|h| h.doc_id != "bare-doc"));
    assert_eq!(hits.len(), 2);
}

#[tokio::test]
async fn searching_an_empty_store_returns_nothing() {
    let (service, _store) = service_with(base_config(), MockEmbeddingProvider::new(DIM)).await;
    let hits = service.search("anything", 5, None, None).await.unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn top_k_results_are_a_prefix_of_larger_k() {
    let (service, _store) = service_with(base_config(), MockEmbeddingProvider::new(DIM)).await;

    for (i, text) in [
        "Glaciers calve into the fjord each spring.",
        "Violin varnish recipes are closely guarded.",
        "Steam engines transformed ore transport.",
        "Sourdough starters need regular feeding.",
        "Tidal pools host surprisingly fierce crabs.",
    ]
    .iter()
    .enumerate()
    {
        service
            .store_document(&format!("d{i}"), text, Metadata::new())
            .await
            .unwrap();
    }

    let smaller = service.search("engines and ore", 3, None, None).await.unwrap();
    let larger = service.search("engines and ore", 4, None, None).await.unwrap();

    assert_eq!(smaller.len(), 3);
    assert_eq!(larger.len(), 4);
    for (a, b) in smaller.iter().zip(larger.iter()) {
        assert_eq!(a.doc_id, b.doc_id);
        assert_eq!(a.text, b.text);
    }
}

#[tokio::test]
async fn exact_text_match_scores_highest() {
    let (service, _store) = service_with(base_config(), MockEmbeddingProvider::new(DIM)).await;

    service
        .store_document("d1", "The aurora was visible from the cabin.", Metadata::new())
        .await
        .unwrap();
    service
        .store_document("d2", "Completely unrelated grocery list.", Metadata::new())
        .await
        .unwrap();

    let hits = service
        .search("The aurora was visible from the cabin.", 2, None, None)
        .await
        .unwrap();
    assert_eq!(hits[0].doc_id, "d1");
    assert!(hits[0].score > 0.99, "self-similarity should be ~1, got {}", hits[0].score);
    assert!(hits[0].score >= hits[1].score);
}

#[tokio::test]
async fn validation_failures_are_immediate() {
    let (service, _store) = service_with(base_config(), MockEmbeddingProvider::new(DIM)).await;

    let err = service
        .store_document("  ", "text", Metadata::new())
        .await
        .unwrap_err();
    assert!(matches!(err, MemoryError::Validation(_)));

    let err = service.search("  ", 5, None, None).await.unwrap_err();
    assert!(matches!(err, MemoryError::Validation(_)));

    let err = service.search("query", 0, None, None).await.unwrap_err();
    assert!(matches!(err, MemoryError::Validation(_)));
}

#[tokio::test]
async fn stored_embeddings_all_have_the_configured_dimension() {
    let (service, store) = service_with(base_config(), MockEmbeddingProvider::new(DIM)).await;

    for (i, text) in ["one fact", "another fact", "a third fact"].iter().enumerate() {
        service
            .store_document(&format!("d{i}"), text, Metadata::new())
            .await
            .unwrap();
        let rows = store.document_chunks(&format!("d{i}")).await.unwrap();
        assert!(rows.iter().all(|r| r.embedding.len() == DIM));
    }
}

#[tokio::test]
async fn dimension_guard_reports_all_three_values() {
    // Provider that produces 8-wide vectors against a config expecting 16.
    let config = base_config();
    let (service, _store) = service_with(config, MockEmbeddingProvider::new(8)).await;

    let report = service.check_dimensions().await.unwrap();
    assert_eq!(report.embedding_dim, 8);
    assert_eq!(report.configured_dim, DIM);
    assert_eq!(report.storage_dim, DIM);
    assert!(!report.consistent);
}

#[tokio::test]
async fn diagnostics_echo_configuration_without_secrets() {
    let config = base_config().with_api_key("super-secret");
    let (service, _store) = service_with(config, MockEmbeddingProvider::new(DIM)).await;

    let report = service.diagnostics().await.unwrap();
    assert!(report.dimensions.consistent);
    assert_eq!(report.provider, "mock");
    assert_eq!(report.chunk_size, 200);
    assert_eq!(report.chunk_overlap, 20);
    assert!(report.dedup_enabled);

    let serialized = serde_json::to_string(&report).unwrap();
    assert!(!serialized.contains("super-secret"));
}
