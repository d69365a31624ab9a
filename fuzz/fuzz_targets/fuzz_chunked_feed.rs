//! Structure-aware fuzz target for chunk boundary independence.
//!
//! Builds a well-formed newline-delimited feed from arbitrary rows, cuts it
//! at arbitrary points and checks that every row comes back in order.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use rxhttp_client::FrameDecoder;
use serde_json::{Value, json};

#[derive(Debug, Arbitrary)]
struct Row {
    seq: u64,
    id: String,
    deleted: bool,
}

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    rows: Vec<Row>,
    /// Chunk lengths, cycled until the feed is used up.
    cuts: Vec<u8>,
}

fuzz_target!(|input: FuzzInput| {
    let expected: Vec<Value> = input
        .rows
        .iter()
        .map(|row| json!({"seq": row.seq, "id": row.id, "deleted": row.deleted}))
        .collect();

    let mut feed = Vec::new();
    for value in &expected {
        feed.extend_from_slice(value.to_string().as_bytes());
        feed.push(b'\n');
    }

    let mut decoder = FrameDecoder::new();
    let mut decoded = Vec::new();
    let mut rest = feed.as_slice();
    let mut cuts = input.cuts.iter().map(|c| usize::from(*c).max(1)).cycle();
    while !rest.is_empty() {
        let size = cuts.next().unwrap_or(rest.len()).min(rest.len());
        let (chunk, tail) = rest.split_at(size);
        decoded.extend(decoder.push(chunk));
        rest = tail;
    }

    assert_eq!(decoded, expected);
    assert!(decoder.is_empty());
});
