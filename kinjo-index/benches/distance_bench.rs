//! Distance metric benchmarks.
//!
//! Run with: cargo bench --package kinjo-index

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use kinjo_index::Metric;

fn random_pair(dim: usize, seed: u64) -> (Vec<f64>, Vec<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let a = (0..dim).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let b = (0..dim).map(|_| rng.gen_range(-1.0..1.0)).collect();
    (a, b)
}

fn bench_metric(c: &mut Criterion, metric: Metric, name: &str) {
    let dims = [16, 64, 256, 1024];
    let mut group = c.benchmark_group(name);
    for dim in dims {
        let (a, b) = random_pair(dim, dim as u64);
        group.throughput(Throughput::Elements(1));
        group.bench_function(format!("dim_{dim}"), |bencher| {
            bencher.iter(|| black_box(metric.distance(black_box(&a), black_box(&b)).unwrap()))
        });
    }
    group.finish();
}

fn bench_l2(c: &mut Criterion) {
    bench_metric(c, Metric::L2, "l2_distance");
}

fn bench_squared_l2(c: &mut Criterion) {
    bench_metric(c, Metric::SquaredL2, "l2_distance_squared");
}

fn bench_cosine(c: &mut Criterion) {
    bench_metric(c, Metric::Cosine, "cosine_distance");
}

fn bench_inner_product(c: &mut Criterion) {
    bench_metric(c, Metric::InnerProduct, "inner_product");
}

criterion_group!(
    benches,
    bench_l2,
    bench_squared_l2,
    bench_cosine,
    bench_inner_product
);
criterion_main!(benches);
