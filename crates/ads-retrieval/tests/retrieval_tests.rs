//! End-to-end retrieval over the in-process store.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use ads_core::InsertAdRequest;
use ads_retrieval::{
    CollectionSettings, CollectionState, HashingEmbedder, LocalVectorStore, RetrievalError, RetrievalService,
    RetryPolicy, ServiceSettings, TextEmbedder, VectorCollection, WriteRejection,
};
use ads_vectordb::{ConsistencyLevel, Database};
use async_trait::async_trait;

/// Returns fixed vectors for known texts.
struct TableEmbedder {
    dimension: usize,
    table: HashMap<String, Vec<f32>>,
}

impl TableEmbedder {
    fn new(dimension: usize, entries: &[(&str, Vec<f32>)]) -> Self {
        let table = entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
        Self { dimension, table }
    }
}

#[async_trait]
impl TextEmbedder for TableEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> ads_retrieval::Result<Vec<f32>> {
        self.table
            .get(text)
            .cloned()
            .ok_or_else(|| RetrievalError::embedding(format!("no vector for `{text}`")))
    }
}

fn unit(dim: usize, hot: usize) -> Vec<f32> {
    let mut v = vec![0.0; dim];
    v[hot] = 1.0;
    v
}

fn service_with(embedder: Arc<dyn TextEmbedder>, dim: usize, db: Arc<Database>) -> RetrievalService {
    let store = Arc::new(LocalVectorStore::new(db));
    let collection = Arc::new(VectorCollection::new(
        store,
        CollectionSettings::new("ads", dim).with_ivf(4, 4),
        RetryPolicy::none(),
    ));
    let settings = ServiceSettings {
        top_k: 3,
        consistency: ConsistencyLevel::Bounded,
        normalize_text: true,
        embed_timeout: Duration::from_secs(1),
    };
    RetrievalService::new(collection, embedder, settings, RetryPolicy::none())
}

async fn ready(embedder: Arc<dyn TextEmbedder>, dim: usize) -> (RetrievalService, Arc<Database>) {
    let db = Arc::new(Database::default());
    let svc = service_with(embedder, dim, db.clone());
    svc.bootstrap().await.unwrap();
    (svc, db)
}

fn scenario_embedder() -> Arc<dyn TextEmbedder> {
    Arc::new(TableEmbedder::new(
        8,
        &[("alpha", unit(8, 0)), ("beta", unit(8, 1)), ("gamma", unit(8, 0)), ("short", vec![1.0; 3])],
    ))
}

#[tokio::test]
async fn test_project_scoped_search_scenario() {
    let (svc, _) = ready(scenario_embedder(), 8).await;
    svc.insert(1, "p1", "alpha").await.unwrap();
    svc.insert(2, "p1", "beta").await.unwrap();
    svc.insert(3, "p2", "gamma").await.unwrap();

    let hits = svc.search_with("p1", "alpha", 2, ConsistencyLevel::Strong).await.unwrap();
    let got: Vec<(i64, &str, f32)> = hits.iter().map(|h| (h.id, h.project.as_str(), h.distance)).collect();
    assert_eq!(got, vec![(1, "p1", 0.0), (2, "p1", 2.0)]);
    assert_eq!(svc.collection().state(), CollectionState::Loaded);
}

#[tokio::test]
async fn test_search_never_crosses_projects() {
    let embedder = Arc::new(HashingEmbedder::new(64));
    let (svc, _) = ready(embedder, 64).await;
    let words = ["shoes", "boots", "hats", "socks", "coats", "bags", "belts", "scarves"];
    for (i, word) in words.iter().enumerate() {
        for (j, project) in ["p1", "p2", "p3"].iter().enumerate() {
            let id = (i * 3 + j) as i64;
            svc.insert(id, project, &format!("cheap {word} for {project}")).await.unwrap();
        }
    }

    for project in ["p1", "p2", "p3"] {
        for query in ["cheap shoes", "warm coats", "p2 bags"] {
            let hits = svc.search_with(project, query, 10, ConsistencyLevel::Strong).await.unwrap();
            assert_eq!(hits.len(), words.len());
            assert!(hits.iter().all(|h| h.project == project));
            assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
        }
    }
}

#[tokio::test]
async fn test_inserted_text_finds_itself() {
    let (svc, _) = ready(Arc::new(HashingEmbedder::new(128)), 128).await;
    let texts = [
        "Summer sale on running shoes",
        "Fresh coffee beans delivered weekly",
        "Learn Rust in thirty days",
        "Vintage guitars and amplifiers",
        "Family dentist now accepting patients",
    ];
    for (id, text) in texts.iter().enumerate() {
        svc.insert(id as i64, "p1", text).await.unwrap();
    }
    for (id, text) in texts.iter().enumerate() {
        let hits = svc.search_with("p1", text, 3, ConsistencyLevel::Strong).await.unwrap();
        assert!(
            hits.iter().any(|h| h.id == id as i64 && h.distance < 1e-4),
            "{text:?} not found in {hits:?}"
        );
    }
}

#[tokio::test]
async fn test_deleted_ad_is_not_returned() {
    let (svc, _) = ready(scenario_embedder(), 8).await;
    svc.insert(1, "p1", "alpha").await.unwrap();
    svc.insert(2, "p1", "beta").await.unwrap();
    assert_eq!(svc.search("p1", "alpha").await.unwrap()[0].id, 1);

    svc.delete(1).await.unwrap();
    let hits = svc.search_with("p1", "alpha", 3, ConsistencyLevel::Strong).await.unwrap();
    assert!(hits.iter().all(|h| h.id != 1));
    assert_eq!(hits.len(), 1);

    // Deleting again, or deleting an id that never existed, succeeds.
    svc.delete(1).await.unwrap();
    svc.delete(404).await.unwrap();
}

#[tokio::test]
async fn test_unknown_project_returns_empty() {
    let (svc, _) = ready(scenario_embedder(), 8).await;
    svc.insert(1, "p1", "alpha").await.unwrap();
    assert!(svc.search("nobody", "alpha").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_fewer_matches_than_k() {
    let (svc, _) = ready(scenario_embedder(), 8).await;
    svc.insert(3, "p2", "gamma").await.unwrap();
    svc.insert(1, "p1", "alpha").await.unwrap();
    let hits = svc.search_with("p2", "alpha", 3, ConsistencyLevel::Bounded).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, 3);
}

#[tokio::test]
async fn test_wrong_dimension_leaves_collection_unchanged() {
    let (svc, db) = ready(scenario_embedder(), 8).await;
    svc.insert(1, "p1", "alpha").await.unwrap();

    let err = svc.insert(2, "p1", "short").await.unwrap_err();
    assert!(matches!(err, RetrievalError::DimensionMismatch { expected: 8, got: 3 }));
    assert_eq!(db.collection("ads").unwrap().num_entities(), 1);
}

#[tokio::test]
async fn test_duplicate_id_is_rejected() {
    let (svc, db) = ready(scenario_embedder(), 8).await;
    svc.insert(1, "p1", "alpha").await.unwrap();
    let err = svc.insert(1, "p2", "beta").await.unwrap_err();
    assert!(matches!(err, RetrievalError::WriteRejected(WriteRejection::DuplicateKey(1))));
    assert_eq!(db.collection("ads").unwrap().num_entities(), 1);

    // Delete-then-insert replaces it.
    svc.delete(1).await.unwrap();
    svc.insert(1, "p2", "beta").await.unwrap();
    let hits = svc.search_with("p2", "beta", 1, ConsistencyLevel::Strong).await.unwrap();
    assert_eq!(hits[0].id, 1);
}

#[tokio::test]
async fn test_search_before_any_data_is_not_ready() {
    let (svc, _) = ready(scenario_embedder(), 8).await;
    assert_eq!(svc.collection().state(), CollectionState::Created);
    let err = svc.search("p1", "alpha").await.unwrap_err();
    assert!(matches!(err, RetrievalError::NotReady(_)));

    svc.insert(1, "p1", "alpha").await.unwrap();
    assert_eq!(svc.search("p1", "alpha").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_rows_added_after_load_are_searchable() {
    let (svc, _) = ready(scenario_embedder(), 8).await;
    svc.insert(1, "p1", "alpha").await.unwrap();
    svc.search("p1", "alpha").await.unwrap();
    assert_eq!(svc.collection().state(), CollectionState::Loaded);

    svc.insert(2, "p1", "beta").await.unwrap();
    let hits = svc.search("p1", "beta").await.unwrap();
    assert_eq!(hits[0].id, 2);
    assert_eq!(hits[0].distance, 0.0);
}

#[tokio::test]
async fn test_explicit_rebuild_keeps_collection_loaded() {
    let (svc, _) = ready(scenario_embedder(), 8).await;
    svc.insert(1, "p1", "alpha").await.unwrap();
    svc.insert(2, "p1", "beta").await.unwrap();
    svc.search("p1", "alpha").await.unwrap();

    svc.collection().build_index().await.unwrap();
    assert_eq!(svc.collection().state(), CollectionState::Loaded);
    assert_eq!(svc.search("p1", "beta").await.unwrap()[0].id, 2);
}

#[tokio::test]
async fn test_bootstrap_loads_existing_rows() {
    let db = Arc::new(Database::default());
    let first = service_with(scenario_embedder(), 8, db.clone());
    first.bootstrap().await.unwrap();
    first.insert(1, "p1", "alpha").await.unwrap();
    first.insert(2, "p1", "beta").await.unwrap();

    // A fresh service over the same store picks the data up at startup.
    let second = service_with(scenario_embedder(), 8, db.clone());
    second.bootstrap().await.unwrap();
    assert_eq!(second.collection().state(), CollectionState::Loaded);
    assert_eq!(second.search("p1", "beta").await.unwrap()[0].id, 2);
}

#[tokio::test]
async fn test_bootstrap_detects_schema_conflict() {
    let db = Arc::new(Database::default());
    service_with(scenario_embedder(), 8, db.clone()).bootstrap().await.unwrap();

    let other = service_with(Arc::new(HashingEmbedder::new(16)), 16, db);
    assert!(matches!(other.bootstrap().await, Err(RetrievalError::SchemaConflict(_))));
}

#[tokio::test]
async fn test_insert_batch() {
    let (svc, db) = ready(Arc::new(HashingEmbedder::new(32)), 32).await;
    let ads: Vec<InsertAdRequest> = (0..6)
        .map(|i| InsertAdRequest {
            id: i,
            project_name: if i % 2 == 0 { "even".into() } else { "odd".into() },
            text: format!("ad number {i}"),
        })
        .collect();
    assert_eq!(svc.insert_batch(&ads).await.unwrap(), 6);
    assert_eq!(db.collection("ads").unwrap().num_entities(), 6);

    let hits = svc.search_with("odd", "ad number 3", 3, ConsistencyLevel::Strong).await.unwrap();
    assert_eq!(hits.len(), 3);
    assert!(hits.iter().all(|h| h.id % 2 == 1));

    let err = svc.insert_batch(&[]).await.unwrap_err();
    assert!(matches!(err, RetrievalError::WriteRejected(WriteRejection::EmptyBatch)));
}

#[tokio::test]
async fn test_drop_returns_to_uninitialized() {
    let (svc, db) = ready(scenario_embedder(), 8).await;
    svc.insert(1, "p1", "alpha").await.unwrap();
    svc.collection().drop_collection().await.unwrap();

    assert_eq!(svc.collection().state(), CollectionState::Uninitialized);
    assert!(!db.has_collection("ads"));
    assert!(matches!(svc.search("p1", "alpha").await, Err(RetrievalError::NotReady(_))));
    assert!(matches!(svc.insert(2, "p1", "beta").await, Err(RetrievalError::NotReady(_))));
}

#[tokio::test]
async fn test_invalid_k() {
    let (svc, _) = ready(scenario_embedder(), 8).await;
    assert!(matches!(
        svc.search_with("p1", "alpha", 0, ConsistencyLevel::Strong).await,
        Err(RetrievalError::InvalidRequest(_))
    ));
}

#[tokio::test]
async fn test_concurrent_requests() {
    let (svc, _) = ready(Arc::new(HashingEmbedder::new(256)), 256).await;
    let svc = Arc::new(svc);
    svc.insert(0, "p1", "seed ad").await.unwrap();
    svc.search("p1", "seed ad").await.unwrap();

    let mut handles = Vec::new();
    for i in 1..=20i64 {
        let svc = svc.clone();
        handles.push(tokio::spawn(async move {
            svc.insert(i, "p1", &format!("ad {i}")).await?;
            svc.search_with("p1", &format!("ad {i}"), 5, ConsistencyLevel::Strong).await
        }));
    }
    for (i, handle) in handles.into_iter().enumerate() {
        let hits = handle.await.unwrap().unwrap();
        assert!(hits.iter().any(|h| h.id == i as i64 + 1), "ad {} missing", i + 1);
    }
}

#[tokio::test]
async fn test_index_retrains_as_collection_grows() {
    let mut entries = vec![("seed".to_string(), vec![0.0, 0.0])];
    for i in 0..20 {
        entries.push((format!("near{i}"), vec![i as f32 * 0.01, 0.0]));
        entries.push((format!("far{i}"), vec![10.0 + i as f32 * 0.01, 10.0]));
    }
    let refs: Vec<(&str, Vec<f32>)> = entries.iter().map(|(k, v)| (k.as_str(), v.clone())).collect();
    let embedder: Arc<dyn TextEmbedder> = Arc::new(TableEmbedder::new(2, &refs));

    let store = Arc::new(LocalVectorStore::new(Arc::new(Database::default())));
    let collection = Arc::new(VectorCollection::new(
        store,
        CollectionSettings::new("ads", 2).with_ivf(2, 1),
        RetryPolicy::none(),
    ));
    let settings = ServiceSettings {
        top_k: 100,
        consistency: ConsistencyLevel::Bounded,
        normalize_text: true,
        embed_timeout: Duration::from_secs(1),
    };
    let svc = RetrievalService::new(collection.clone(), embedder, settings, RetryPolicy::none());
    svc.bootstrap().await.unwrap();

    // First index is trained on a single row, so it has one list.
    svc.insert(0, "p1", "seed").await.unwrap();
    assert_eq!(svc.search("p1", "seed").await.unwrap().len(), 1);

    let ads: Vec<InsertAdRequest> = (0..20)
        .flat_map(|i| {
            [
                InsertAdRequest { id: 1 + i, project_name: "p1".into(), text: format!("near{i}") },
                InsertAdRequest { id: 101 + i, project_name: "p1".into(), text: format!("far{i}") },
            ]
        })
        .collect();
    svc.insert_batch(&ads).await.unwrap();
    assert!(collection.index_outgrown());

    // With two trained lists, nprobe=1 scans only the cluster near the query.
    let hits = svc.search("p1", "seed").await.unwrap();
    assert!(!collection.index_outgrown());
    assert_eq!(hits.len(), 21);
    assert!(hits.iter().all(|h| h.id <= 20));
    assert_eq!(collection.state(), CollectionState::Loaded);
}

#[tokio::test]
async fn test_huge_k_returns_every_match() {
    let (svc, _) = ready(scenario_embedder(), 8).await;
    svc.insert(1, "p1", "alpha").await.unwrap();
    svc.insert(2, "p1", "beta").await.unwrap();
    let hits = svc.search_with("p1", "alpha", usize::MAX, ConsistencyLevel::Strong).await.unwrap();
    assert_eq!(hits.iter().map(|h| h.id).collect::<Vec<_>>(), vec![1, 2]);
}
