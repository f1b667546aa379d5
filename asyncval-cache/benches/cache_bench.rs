//! Criterion benchmarks for asyncval: hit path, miss path, and maintenance.

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use futures::future::ready;
use tokio::runtime::Runtime;

use asyncval_cache::{AsyncValueCache, CacheConfig};

type Cache = AsyncValueCache<u64, u64, ()>;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn bench_hit(c: &mut Criterion) {
    let rt = runtime();
    let cache = Cache::new();
    rt.block_on(cache.get_or_add(1, |k| ready(Ok(k)))).unwrap();

    let mut g = c.benchmark_group("get_or_add");
    g.throughput(Throughput::Elements(1));
    g.bench_function("hit", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(cache.get_or_add(1, |k| ready(Ok(k))).await) });
    });
    g.finish();
}

fn bench_miss(c: &mut Criterion) {
    let rt = runtime();

    let mut g = c.benchmark_group("get_or_add");
    g.throughput(Throughput::Elements(1_000));
    g.bench_function("miss_1000_keys", |b| {
        b.iter_batched(
            Cache::new,
            |cache| {
                rt.block_on(async {
                    for key in 0..1_000u64 {
                        black_box(cache.get_or_add(key, |k| ready(Ok(k))).await).unwrap();
                    }
                })
            },
            BatchSize::SmallInput,
        );
    });
    g.finish();
}

fn bench_maintenance(c: &mut Criterion) {
    let rt = runtime();

    let mut g = c.benchmark_group("handle_expiration");
    g.bench_function("evict_half_of_2000", |b| {
        b.iter_batched(
            || {
                let config = CacheConfig::default()
                    .with_max_items(1_000)
                    .default_ttl(Duration::from_secs(60));
                let cache = Cache::with_config(config).unwrap();
                rt.block_on(async {
                    for key in 0..2_000u64 {
                        cache.get_or_add(key, |k| ready(Ok(k))).await.unwrap();
                    }
                });
                cache
            },
            |cache| cache.handle_expiration(),
            BatchSize::SmallInput,
        );
    });
    g.finish();
}

criterion_group!(benches, bench_hit, bench_miss, bench_maintenance);
criterion_main!(benches);
