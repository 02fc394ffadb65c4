//! Benchmarks for the kerb spatial core:
//! - neighborhood enrichment (R-tree bucketed point-in-polygon)
//! - subgraph construction, cold cache vs cache hit
//! - the rule-based scorer

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tempfile::TempDir;

use kerb_core::synthetic::grid_city;
use kerb_graph::builder::{BuilderConfig, SubgraphBuilder};
use kerb_graph::cache::CacheStore;
use kerb_graph::enrich::enrich_neighborhoods;
use kerb_graph::scoring::WalkabilityScorer;

fn bench_enrichment(c: &mut Criterion) {
    let mut group = c.benchmark_group("enrich_neighborhoods");

    for side in [4usize, 8] {
        let city = grid_city(side, side, 42);
        group.bench_with_input(BenchmarkId::from_parameter(side * side), &city, |b, city| {
            b.iter_batched(
                || city.neighborhoods.clone(),
                |mut neighborhoods| {
                    enrich_neighborhoods(&mut neighborhoods, &city.trees, &city.transit);
                    black_box(neighborhoods)
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_subgraph_build(c: &mut Criterion) {
    let city = grid_city(6, 6, 42);
    let mut group = c.benchmark_group("subgraph_build");

    group.bench_function("cold_cache", |b| {
        b.iter_batched(
            || TempDir::new().expect("temp cache dir"),
            |dir| {
                let builder = SubgraphBuilder::new(
                    &city,
                    BuilderConfig::default(),
                    CacheStore::new(dir.path()),
                );
                for index in 0..city.neighborhoods.len() {
                    black_box(builder.build(index).expect("build"));
                }
            },
            BatchSize::PerIteration,
        );
    });

    group.bench_function("cache_hit", |b| {
        let dir = TempDir::new().expect("temp cache dir");
        let builder =
            SubgraphBuilder::new(&city, BuilderConfig::default(), CacheStore::new(dir.path()));
        for index in 0..city.neighborhoods.len() {
            builder.build(index).expect("prime cache");
        }
        b.iter(|| {
            for index in 0..city.neighborhoods.len() {
                black_box(builder.build(index).expect("cached build"));
            }
        });
    });

    group.finish();
}

fn bench_rule_scorer(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let inputs: Vec<(f64, f64, f64, Option<f64>, u32, u32)> = (0..1024)
        .map(|_| {
            (
                rng.gen_range(0.0..100.0),
                rng.gen_range(0.0..100.0),
                rng.gen_range(0.0..100.0),
                Some(rng.gen_range(-1.0..1.0)),
                rng.gen_range(0..300),
                rng.gen_range(0..50),
            )
        })
        .collect();
    let scorer = WalkabilityScorer::default();

    c.bench_function("rule_scorer_1024", |b| {
        b.iter(|| {
            for &(res, com, edu, ndvi, trees, stops) in &inputs {
                black_box(scorer.score(res, com, edu, ndvi, trees, stops));
            }
        });
    });
}

criterion_group!(benches, bench_enrichment, bench_subgraph_build, bench_rule_scorer);
criterion_main!(benches);
