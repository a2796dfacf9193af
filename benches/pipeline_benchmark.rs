use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fraud_ring_engine::pipeline::{analyze, DetectionMode};
use fraud_ring_engine::simulation::generator::{generate_random_batch, BatchConfig};

fn bench_analyze_small(c: &mut Criterion) {
    let config = BatchConfig {
        account_count: 50,
        transaction_count: 500,
        ..Default::default()
    };
    let batch = generate_random_batch(&config);

    c.bench_function("analyze_50_accounts", |b| {
        b.iter(|| analyze(black_box(batch.clone()), DetectionMode::All))
    });
}

fn bench_analyze_medium(c: &mut Criterion) {
    let config = BatchConfig {
        account_count: 500,
        transaction_count: 5_000,
        ..Default::default()
    };
    let batch = generate_random_batch(&config);

    c.bench_function("analyze_500_accounts", |b| {
        b.iter(|| analyze(black_box(batch.clone()), DetectionMode::All))
    });
}

fn bench_cycles_only(c: &mut Criterion) {
    let config = BatchConfig {
        account_count: 200,
        transaction_count: 2_000,
        ..Default::default()
    };
    let batch = generate_random_batch(&config);

    c.bench_function("analyze_cycles_only", |b| {
        b.iter(|| analyze(black_box(batch.clone()), DetectionMode::Cycles))
    });
}

criterion_group!(
    benches,
    bench_analyze_small,
    bench_analyze_medium,
    bench_cycles_only
);
criterion_main!(benches);
