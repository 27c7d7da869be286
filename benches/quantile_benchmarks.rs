use criterion::{black_box, criterion_group, criterion_main, Criterion};
use quantile_forest::data::Matrix;
use quantile_forest::forest::{ForestConfig, QuantileForest};
use quantile_forest::interpolation::Interpolation;
use quantile_forest::quantile::{unweighted_quantiles, weighted_quantiles, QuantileSpec};
use quantile_forest::tree::{Forest, Node, Tree};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

const N_SAMPLES: usize = 10_000;
const N_TREES: usize = 50;

/// A depth one tree on feature `feature` with a random split.
fn stump(rng: &mut StdRng, feature: usize) -> Tree {
    Tree::new(vec![
        Node::split(0, feature, rng.gen_range(-1.0..1.0), 1, 2, 2),
        Node::leaf(1, 0),
        Node::leaf(2, 1),
    ])
    .unwrap()
}

pub fn quantile_benchmarks(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0);
    let values: Vec<f64> = (0..1000).map(|_| rng.gen()).collect();
    let weights: Vec<f64> = (0..1000).map(|_| rng.gen_range(1..5) as f64).collect();
    let replicas: Vec<u64> = weights.iter().map(|w| *w as u64).collect();
    let levels = [0.025, 0.25, 0.5, 0.75, 0.975];

    c.bench_function("weighted quantiles", |b| {
        b.iter(|| weighted_quantiles(black_box(&values), black_box(&weights), &levels, Interpolation::Linear))
    });
    c.bench_function("unweighted quantiles", |b| {
        b.iter(|| unweighted_quantiles(black_box(&values), black_box(&replicas), &levels, Interpolation::Linear))
    });

    let n_features = 5;
    let data_vec: Vec<f64> = (0..N_SAMPLES * n_features).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let y: Vec<f64> = (0..N_SAMPLES).map(|_| rng.gen()).collect();
    let data = Matrix::new(&data_vec, N_SAMPLES, n_features);
    let router = Forest::new((0..N_TREES).map(|t| stump(&mut rng, t % n_features)).collect());
    let forest = QuantileForest::from_training(router, &data, y, 1, None, ForestConfig::default()).unwrap();
    let table = forest.table();
    println!("{} trees over {} samples", table.n_trees(), table.n_samples());

    let query_vec: Vec<f64> = (0..100 * n_features).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let query = Matrix::new(&query_vec, 100, n_features);
    let spec = QuantileSpec::Levels(levels.to_vec());
    let mut group = c.benchmark_group("predict");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(5));
    group.bench_function("weighted", |b| {
        b.iter(|| forest.predict(black_box(&query), &spec, Interpolation::Linear, true))
    });
    group.bench_function("unweighted", |b| {
        b.iter(|| forest.predict(black_box(&query), &spec, Interpolation::Linear, false))
    });
    group.finish();
}

criterion_group!(benches, quantile_benchmarks);
criterion_main!(benches);
