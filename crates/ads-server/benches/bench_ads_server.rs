use std::sync::Arc;
use std::time::Duration;

use ads_retrieval::{
    CollectionSettings, HashingEmbedder, LocalVectorStore, RetrievalService, RetryPolicy, ServiceSettings,
    VectorCollection,
};
use ads_server::{app_with_state, state::AppState};
use axum::body::Body;
use axum::http::Request;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tokio::runtime::Runtime;
use tower::ServiceExt;

const DIM: usize = 256;

fn seeded_state(rt: &Runtime, ads: i64) -> AppState {
    rt.block_on(async {
        let collection = Arc::new(VectorCollection::new(
            Arc::new(LocalVectorStore::default()),
            CollectionSettings::new("ads", DIM).with_ivf(16, 4),
            RetryPolicy::none(),
        ));
        let settings = ServiceSettings { embed_timeout: Duration::from_secs(5), ..ServiceSettings::default() };
        let service = RetrievalService::new(collection, Arc::new(HashingEmbedder::new(DIM)), settings, RetryPolicy::none());
        service.bootstrap().await.unwrap();
        for id in 0..ads {
            let project = format!("p{}", id % 4);
            service.insert(id, &project, &format!("ad {id} about topic {}", id % 17)).await.unwrap();
        }
        AppState::new(Arc::new(service))
    })
}

fn bench_http_search(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let state = seeded_state(&rt, 2_000);

    c.bench_function("http_search_2k_ads", |b| {
        b.iter(|| {
            rt.block_on(async {
                let body = serde_json::json!({"projectName": "p1", "text": "topic 5"});
                let req = Request::builder()
                    .method("POST")
                    .uri("/api/search")
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::to_vec(&body).unwrap()))
                    .unwrap();
                let resp = app_with_state(state.clone()).oneshot(req).await.unwrap();
                black_box(resp.status());
            })
        })
    });
}

fn bench_http_insert(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let state = seeded_state(&rt, 100);
    let mut next_id = 1_000_000i64;

    c.bench_function("http_insert", |b| {
        b.iter(|| {
            next_id += 1;
            rt.block_on(async {
                let body = serde_json::json!({"id": next_id, "projectName": "p0", "text": "fresh ad copy"});
                let req = Request::builder()
                    .method("POST")
                    .uri("/api/insert")
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::to_vec(&body).unwrap()))
                    .unwrap();
                let resp = app_with_state(state.clone()).oneshot(req).await.unwrap();
                black_box(resp.status());
            })
        })
    });
}

criterion_group!(benches, bench_http_search, bench_http_insert);
criterion_main!(benches);
