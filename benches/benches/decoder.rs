//! Benchmarks for incremental JSON decoding.
//!
//! Run with: `cargo bench --package rxhttp-benches --bench decoder`

// Allow missing docs for criterion_group! macro generated functions
#![allow(missing_docs)]

use bytes::Bytes;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rxhttp_client::{FrameDecoder, Utf8Decoder};
use rxhttp_testing::fixtures;
use serde_json::{Value, json};

/// A feed of `count` change rows.
fn change_feed(count: u64) -> Vec<u8> {
    fixtures::ndjson(&fixtures::changes(count))
}

/// A feed of `count` documents, each carrying `fields` string fields.
fn document_feed(count: usize, fields: usize) -> Vec<u8> {
    let docs: Vec<Value> = (0..count)
        .map(|i| {
            let body: serde_json::Map<String, Value> = (0..fields)
                .map(|f| (format!("field_{f}"), json!(format!("value {f} of document {i}"))))
                .collect();
            json!({"_id": format!("doc-{i}"), "_rev": "1-abc", "body": body})
        })
        .collect();
    fixtures::ndjson(&docs)
}

fn decode_all(chunks: &[Bytes]) -> usize {
    let mut decoder = FrameDecoder::new();
    let mut count = 0;
    for chunk in chunks {
        count += decoder.push(chunk).len();
    }
    count
}

fn bench_chunk_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_decoder_chunk_size");
    let feed = change_feed(1_000);
    group.throughput(Throughput::Bytes(feed.len() as u64));

    for size in [1usize, 16, 256, 4096, 65536] {
        let chunks = fixtures::split_every(&feed, size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &chunks, |b, chunks| {
            b.iter(|| black_box(decode_all(chunks)));
        });
    }

    group.finish();
}

fn bench_document_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_decoder_document_size");

    for (name, feed) in [
        ("rows", change_feed(500)),
        ("small_docs", document_feed(500, 4)),
        ("large_docs", document_feed(20, 500)),
    ] {
        let chunks = fixtures::split_every(&feed, 1024);
        group.throughput(Throughput::Bytes(feed.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), &chunks, |b, chunks| {
            b.iter(|| black_box(decode_all(chunks)));
        });
    }

    group.finish();
}

fn bench_utf8(c: &mut Criterion) {
    let mut group = c.benchmark_group("utf8_decoder");
    let text = fixtures::MULTIBYTE_TEXT.repeat(256);
    group.throughput(Throughput::Bytes(text.len() as u64));

    group.bench_function("split_every_byte", |b| {
        b.iter(|| {
            let mut decoder = Utf8Decoder::new();
            let mut out = String::with_capacity(text.len());
            for byte in text.as_bytes().chunks(1) {
                out.push_str(&decoder.decode(byte));
            }
            black_box(out)
        });
    });

    group.bench_function("whole", |b| {
        b.iter(|| {
            let mut decoder = Utf8Decoder::new();
            black_box(decoder.decode(text.as_bytes()))
        });
    });

    group.finish();
}

criterion_group!(benches, bench_chunk_size, bench_document_size, bench_utf8);
criterion_main!(benches);
