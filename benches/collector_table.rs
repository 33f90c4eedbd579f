//! Benchmark for the collector table and provider dispatch

use collector_provider::{
    Collector, CollectorId, CollectorInstanceRef, CollectorTable, DummyCollector, Provider,
    ProviderConfig,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::sync::Arc;

fn instance() -> CollectorInstanceRef {
    Arc::new(DummyCollector::new(serde_json::json!({})))
}

fn filled_table(n: usize) -> (CollectorTable, Vec<CollectorId>) {
    let table = CollectorTable::new();
    let ids = (0..n)
        .map(|_| {
            let id = CollectorId::generate();
            let _ = table.insert(Collector::new(id, "dummy", instance()));
            id
        })
        .collect();
    (table, ids)
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("collector_table");
    group.throughput(Throughput::Elements(1));

    group.bench_function("insert", |b| {
        let table = CollectorTable::new();
        b.iter(|| {
            let collector = Collector::new(CollectorId::generate(), "dummy", instance());
            let _ = table.insert(black_box(collector));
        });
    });

    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("collector_table");
    group.throughput(Throughput::Elements(1));

    let (table, ids) = filled_table(1000);

    group.bench_function("get", |b| {
        let mut counter = 0usize;
        b.iter(|| {
            counter += 1;
            let _ = table.get(black_box(&ids[counter % ids.len()]));
        });
    });

    group.bench_function("list_64", |b| {
        b.iter(|| table.list(black_box(64)));
    });

    group.finish();
}

fn bench_concurrent_sums(c: &mut Criterion) {
    let mut group = c.benchmark_group("provider");
    group.throughput(Throughput::Elements(100));

    let rt = tokio::runtime::Runtime::new().unwrap();
    let provider = Provider::new(ProviderConfig::default());
    let ids: Vec<CollectorId> = rt.block_on(async {
        let mut ids = Vec::new();
        for _ in 0..16 {
            ids.push(provider.create_collector(None, "dummy", None).await.unwrap());
        }
        ids
    });

    group.bench_function("concurrent_100_sums", |b| {
        b.iter(|| {
            rt.block_on(async {
                let mut handles = Vec::new();
                for i in 0..100 {
                    let provider = provider.clone();
                    let id = ids[i % ids.len()];
                    handles.push(tokio::spawn(async move {
                        let _ = provider.sum(id, i as i32, 1).await;
                    }));
                }
                for handle in handles {
                    let _ = handle.await;
                }
            });
        });
    });

    group.finish();
}

criterion_group!(benches, bench_insert, bench_lookup, bench_concurrent_sums);
criterion_main!(benches);
