use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ads_vectordb::index::{FlatIndex, IvfFlatIndex, SearchParams, VectorIndex};
use ads_vectordb::distance::DistanceMetric;
use rand::Rng;

fn random_vector(dim: usize) -> Vec<f32> {
    let mut rng = rand::thread_rng();
    (0..dim).map(|_| rng.gen::<f32>()).collect()
}

fn accept_all(_: i64) -> bool {
    true
}

fn bench_ivf_train(c: &mut Criterion) {
    let dim = 128;
    let samples: Vec<(i64, Vec<f32>)> = (0..5000i64).map(|i| (i, random_vector(dim))).collect();
    c.bench_function("ivf_train_5k_128d_nlist64", |b| {
        b.iter(|| {
            black_box(IvfFlatIndex::train(dim, DistanceMetric::L2, 64, &samples).unwrap());
        })
    });
}

fn bench_search(c: &mut Criterion) {
    let dim = 128;
    let samples: Vec<(i64, Vec<f32>)> = (0..10000i64).map(|i| (i, random_vector(dim))).collect();
    let ivf = IvfFlatIndex::train(dim, DistanceMetric::L2, 128, &samples).unwrap();
    let flat = FlatIndex::with_capacity(dim, DistanceMetric::L2, samples.len());
    for (label, v) in &samples {
        flat.insert(*label, v).unwrap();
    }
    let query = random_vector(dim);

    c.bench_function("flat_search_top3_from_10k", |b| {
        b.iter(|| {
            black_box(flat.search(&query, 3, &SearchParams::default(), &accept_all).unwrap());
        })
    });

    for nprobe in [8, 32] {
        c.bench_function(&format!("ivf_search_top3_from_10k_nprobe{nprobe}"), |b| {
            let params = SearchParams { nprobe };
            b.iter(|| {
                black_box(ivf.search(&query, 3, &params, &accept_all).unwrap());
            })
        });
    }
}

criterion_group!(benches, bench_ivf_train, bench_search);
criterion_main!(benches);
