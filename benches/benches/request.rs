//! Benchmarks for dispatching requests through a scripted transport.
//!
//! Run with: `cargo bench --package rxhttp-benches --bench request`

// Allow missing docs for criterion_group! macro generated functions
#![allow(missing_docs)]

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rxhttp_client::HttpRequest;
use rxhttp_core::{DeliveryMode, RequestOptions};
use rxhttp_testing::{StubResponse, StubTransport, fixtures};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Change {
    seq: u64,
    id: String,
}

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");

    group.bench_function("simple", |b| {
        b.to_async(&runtime).iter(|| async {
            let stub = StubTransport::with_responses([StubResponse::json(fixtures::sample_user())]);
            let mut request = HttpRequest::<Value, _>::new(
                Arc::new(stub),
                "http://localhost/db/doc",
                RequestOptions::new(),
                DeliveryMode::Simple,
            );
            let observable = request.dispatch();
            while let Some(item) = observable.next().await {
                let _ = black_box(item);
            }
        });
    });

    for rows in [10u64, 1_000] {
        let feed = fixtures::ndjson(&fixtures::changes(rows));
        group.bench_with_input(BenchmarkId::new("stream", rows), &feed, |b, feed| {
            b.to_async(&runtime).iter(|| async {
                let stub = StubTransport::with_responses([StubResponse::chunks(
                    fixtures::split_every(feed, 512),
                )]);
                let mut request = HttpRequest::<Change, _>::new(
                    Arc::new(stub),
                    "http://localhost/db/_changes",
                    RequestOptions::new(),
                    DeliveryMode::Stream,
                );
                let observable = request.dispatch();
                while let Some(item) = observable.next().await {
                    let _ = black_box(item);
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_dispatch);
criterion_main!(benches);
