//! Benchmarks for rxhttp.
//!
//! This crate contains Criterion benchmarks for measuring performance of:
//!
//! - **Decoding**: turning a chunked byte feed into JSON values
//! - **Requests**: a full dispatch through a scripted transport
//!
//! ## Running Benchmarks
//!
//! Run all benchmarks:
//! ```bash
//! cargo bench --package rxhttp-benches
//! ```
//!
//! Run a specific benchmark:
//! ```bash
//! cargo bench --package rxhttp-benches --bench decoder
//! cargo bench --package rxhttp-benches --bench request
//! ```
//!
//! Results are written to `target/criterion/` with HTML reports.
//!
//! ## Benchmark Groups
//!
//! ### Decoder (`benches/decoder.rs`)
//! - `frame_decoder_chunk_size`: one feed pushed in chunks of varying size
//! - `frame_decoder_document_size`: small rows against large documents
//! - `utf8_decoder`: multibyte text split at every byte
//!
//! ### Request (`benches/request.rs`)
//! - `dispatch`: simple and stream dispatches end to end

// This is a benchmark-only crate, no library code needed.
