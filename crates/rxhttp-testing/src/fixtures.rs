//! Test fixtures.
//!
//! Sample payloads in the shape of a continuous change feed, plus helpers to
//! cut a body into awkward chunks.

use bytes::Bytes;
use serde_json::{Value, json};

/// The canonical one-shot response body.
#[must_use]
pub fn sample_user() -> Value {
    json!({"id": 11, "name": "mike"})
}

/// One change-feed entry.
#[must_use]
pub fn change(seq: u64, id: &str) -> Value {
    json!({
        "seq": seq,
        "id": id,
        "changes": [{"rev": format!("{seq}-{id}")}]
    })
}

/// `count` change-feed entries with ids `doc-1`, `doc-2`, ...
#[must_use]
pub fn changes(count: u64) -> Vec<Value> {
    (1..=count).map(|seq| change(seq, &format!("doc-{seq}"))).collect()
}

/// Serialize values one per line, the way a continuous feed sends them.
#[must_use]
pub fn ndjson(values: &[Value]) -> Vec<u8> {
    let mut body = Vec::new();
    for value in values {
        body.extend_from_slice(value.to_string().as_bytes());
        body.push(b'\n');
    }
    body
}

/// Cut `body` into chunks of at most `size` bytes, ignoring character and
/// token boundaries.
///
/// # Panics
///
/// Panics if `size` is zero.
#[must_use]
pub fn split_every(body: &[u8], size: usize) -> Vec<Bytes> {
    assert!(size > 0, "chunk size must be positive");
    body.chunks(size).map(Bytes::copy_from_slice).collect()
}

/// Text containing two-, three- and four-byte UTF-8 characters.
pub const MULTIBYTE_TEXT: &str = "café ☕ 🦀";
