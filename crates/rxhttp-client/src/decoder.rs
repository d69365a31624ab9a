//! Incremental decoding of a chunked byte feed into JSON values.
//!
//! Bytes arrive with arbitrary boundaries: mid-character, mid-token, several
//! values per chunk or one value over many chunks. Decoding happens in two
//! stages:
//!
//! 1. [`Utf8Decoder`] turns chunks into text. An incomplete multi-byte
//!    sequence at the end of a chunk is held back until the next chunk
//!    completes it. Invalid sequences are dropped.
//! 2. [`FrameDecoder`] appends that text to a buffer and parses complete
//!    top-level JSON values off its front. A value that is still incomplete
//!    stays buffered until more text arrives.
//!
//! [`StreamDecoder`] wraps both around a byte stream and an abort signal and
//! yields typed values. Decoding problems are logged and skipped; they never
//! end the stream.

use std::collections::VecDeque;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::Bytes;
use futures::Stream;
use pin_project_lite::pin_project;
use rxhttp_transport::{AbortSignal, TransportError};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace, warn};

/// Default upper bound on the undecoded buffer (16 MiB).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Decoder configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Largest amount of undecoded text kept while waiting for a value to
    /// complete. Exceeding it discards the buffer.
    pub max_frame_size: usize,
}

impl DecoderConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Set the maximum frame size.
    #[must_use]
    pub const fn with_max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// UTF-8
// =============================================================================

/// Streaming UTF-8 decoder.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    /// Start of a multi-byte sequence cut off by a chunk boundary (at most 3
    /// bytes).
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Create a decoder with nothing pending.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one chunk.
    ///
    /// Returns all text that is complete so far. A trailing partial sequence
    /// is kept for the next call.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(chunk);

        let mut text = String::with_capacity(bytes.len());
        let mut rest = bytes.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    text.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            warn!(dropped = len, "dropping invalid UTF-8 sequence");
                            rest = &after[len..];
                        }
                        None => {
                            self.pending = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        text
    }

    /// Whether an incomplete sequence is being held back.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Discard any held-back bytes, returning how many there were.
    pub fn finish(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }
}

// =============================================================================
// Frames
// =============================================================================

/// Synchronous frame decoder: bytes in, complete JSON values out.
///
/// The buffer always holds exactly the received text that has not yet been
/// parsed as a complete value.
///
/// ```rust
/// use rxhttp_client::decoder::FrameDecoder;
/// use serde_json::json;
///
/// let mut decoder = FrameDecoder::new();
/// assert!(decoder.push(br#"{"a""#).is_empty());
/// assert_eq!(decoder.push(b":1}"), vec![json!({"a": 1})]);
/// assert!(decoder.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct FrameDecoder {
    utf8: Utf8Decoder,
    buffer: String,
    config: DecoderConfig,
    /// Set while the rest of a malformed or discarded value is being skipped.
    resync: Option<Resync>,
}

/// Scanner state for skipping the remainder of a bad top-level value.
///
/// Tracks string and nesting state so that an opener inside the bad value
/// is never mistaken for the start of the next one.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Resync {
    depth: usize,
    in_string: bool,
    escaped: bool,
}

impl Resync {
    /// Start skipping `fragment`, a non-empty value that failed to parse.
    ///
    /// Returns the state after its first character and that character's
    /// length.
    fn begin(fragment: &str) -> (Self, usize) {
        let mut resync = Self::default();
        let Some(first) = fragment.chars().next() else {
            return (resync, 0);
        };
        match first {
            '{' | '[' => resync.depth = 1,
            '"' => resync.in_string = true,
            _ => {}
        }
        (resync, first.len_utf8())
    }

    /// Scan `text` for the point where parsing can resume: an opener at
    /// depth zero outside any string, or just past a newline at depth zero.
    ///
    /// Returns `None` when all of `text` still belongs to the bad value.
    fn scan(&mut self, text: &str) -> Option<usize> {
        for (i, c) in text.char_indices() {
            // JSON strings cannot hold a raw newline.
            if c == '\n' {
                self.in_string = false;
                self.escaped = false;
                if self.depth == 0 {
                    return Some(i + 1);
                }
                continue;
            }
            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if c == '\\' {
                    self.escaped = true;
                } else if c == '"' {
                    self.in_string = false;
                }
                continue;
            }
            match c {
                '"' => self.in_string = true,
                '{' | '[' if self.depth == 0 => return Some(i),
                '{' | '[' => self.depth += 1,
                '}' | ']' => self.depth = self.depth.saturating_sub(1),
                _ => {}
            }
        }
        None
    }
}

impl FrameDecoder {
    /// Create a decoder with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a decoder with a custom configuration.
    #[must_use]
    pub fn with_config(config: DecoderConfig) -> Self {
        Self {
            utf8: Utf8Decoder::new(),
            buffer: String::new(),
            config,
            resync: None,
        }
    }

    /// Feed one chunk and return every value it completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Value> {
        let text = self.utf8.decode(chunk);
        self.buffer.push_str(&text);

        let values = self.drain();

        if self.buffer.len() > self.config.max_frame_size {
            warn!(
                buffered = self.buffer.len(),
                max_frame_size = self.config.max_frame_size,
                "discarding oversized frame"
            );
            // What is left is one incomplete value; skip the rest of it too.
            let fragment = self.buffer.trim_start();
            let (mut resync, first) = Resync::begin(fragment);
            let _ = resync.scan(&fragment[first..]);
            self.resync = Some(resync);
            self.buffer.clear();
        }

        values
    }

    /// The text buffered but not yet parsed.
    #[must_use]
    pub fn buffered(&self) -> &str {
        &self.buffer
    }

    /// Whether nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty() && !self.utf8.has_pending()
    }

    /// Discard everything buffered, returning the number of bytes dropped.
    pub fn finish(&mut self) -> usize {
        let dropped = self.buffer.len() + self.utf8.finish();
        self.buffer.clear();
        self.resync = None;
        dropped
    }

    /// Parse complete values off the front of the buffer.
    fn drain(&mut self) -> Vec<Value> {
        let mut values = Vec::new();
        let mut consumed = 0;

        loop {
            if let Some(resync) = self.resync.as_mut() {
                match resync.scan(&self.buffer[consumed..]) {
                    Some(offset) => {
                        trace!(skipped = offset, "resuming after malformed value");
                        consumed += offset;
                        self.resync = None;
                    }
                    None => {
                        consumed = self.buffer.len();
                        break;
                    }
                }
            }

            let rest = &self.buffer[consumed..];
            let mut parsed = serde_json::Deserializer::from_str(rest).into_iter::<Value>();

            match parsed.next() {
                // Only whitespace left.
                None => {
                    consumed = self.buffer.len();
                    break;
                }
                Some(Ok(value)) => {
                    consumed += parsed.byte_offset();
                    values.push(value);
                }
                // Incomplete: wait for more text.
                Some(Err(e)) if e.is_eof() => break,
                Some(Err(e)) => {
                    // Malformed text never becomes valid; drop the whole
                    // top-level value it belongs to.
                    let start = rest.len() - rest.trim_start().len();
                    let (resync, first) = Resync::begin(&rest[start..]);
                    warn!(error = %e, "skipping malformed JSON value");
                    consumed += start + first;
                    self.resync = Some(resync);
                }
            }
        }

        self.buffer.drain(..consumed);
        values
    }
}

// =============================================================================
// Stream
// =============================================================================

/// Why a [`StreamDecoder`] stopped.
#[derive(Debug)]
pub enum StreamOutcome {
    /// The byte stream ended normally.
    Finished,
    /// The abort signal fired.
    Aborted,
    /// The byte stream failed.
    Dropped {
        /// Bytes received before the failure.
        bytes_received: u64,
        /// The failure.
        error: TransportError,
    },
}

pin_project! {
    /// Typed stream of values decoded from a byte stream.
    ///
    /// Ends when the byte stream ends, fails, or the abort signal fires.
    /// Once aborted nothing more is yielded, including values that were
    /// already decoded. [`outcome`](Self::outcome) tells which of the three
    /// happened.
    pub struct StreamDecoder<S, T> {
        #[pin]
        source: S,
        signal: AbortSignal,
        aborted: Pin<Box<dyn Future<Output = ()> + Send>>,
        frames: FrameDecoder,
        pending: VecDeque<Value>,
        bytes_received: u64,
        outcome: Option<StreamOutcome>,
        _marker: PhantomData<fn() -> T>,
    }
}

impl<S, T> StreamDecoder<S, T>
where
    S: Stream<Item = Result<Bytes, TransportError>>,
{
    /// Decode `source` until it ends or `signal` fires.
    pub fn new(source: S, signal: AbortSignal) -> Self {
        Self::with_config(source, signal, DecoderConfig::default())
    }

    /// Decode with a custom configuration.
    pub fn with_config(source: S, signal: AbortSignal, config: DecoderConfig) -> Self {
        Self {
            source,
            aborted: Box::pin(signal.clone().into_aborted()),
            signal,
            frames: FrameDecoder::with_config(config),
            pending: VecDeque::new(),
            bytes_received: 0,
            outcome: None,
            _marker: PhantomData,
        }
    }

    /// Bytes received so far.
    #[must_use]
    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    /// Why the stream stopped, once it has.
    #[must_use]
    pub fn outcome(&self) -> Option<&StreamOutcome> {
        self.outcome.as_ref()
    }

    /// Take the outcome, consuming the decoder.
    #[must_use]
    pub fn into_outcome(self) -> Option<StreamOutcome> {
        self.outcome
    }
}

impl<S, T> Stream for StreamDecoder<S, T>
where
    S: Stream<Item = Result<Bytes, TransportError>>,
    T: DeserializeOwned,
{
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        let mut this = self.project();

        loop {
            if this.outcome.is_some() {
                return Poll::Ready(None);
            }

            if this.aborted.as_mut().poll(cx).is_ready() {
                let dropped = this.pending.len();
                this.pending.clear();
                this.frames.finish();
                debug!(dropped_values = dropped, "stream decoding aborted");
                *this.outcome = Some(StreamOutcome::Aborted);
                return Poll::Ready(None);
            }

            if let Some(value) = this.pending.pop_front() {
                match serde_json::from_value::<T>(value) {
                    Ok(item) => return Poll::Ready(Some(item)),
                    Err(e) => {
                        warn!(error = %e, "skipping value that does not match the expected type");
                        continue;
                    }
                }
            }

            match ready!(this.source.as_mut().poll_next(cx)) {
                Some(Ok(chunk)) => {
                    *this.bytes_received += chunk.len() as u64;
                    let values = this.frames.push(&chunk);
                    trace!(
                        chunk_len = chunk.len(),
                        values = values.len(),
                        "decoded chunk"
                    );
                    this.pending.extend(values);
                }
                Some(Err(error)) => {
                    *this.outcome = Some(if error.is_aborted() || this.signal.is_aborted() {
                        StreamOutcome::Aborted
                    } else {
                        StreamOutcome::Dropped {
                            bytes_received: *this.bytes_received,
                            error,
                        }
                    });
                    return Poll::Ready(None);
                }
                None => {
                    let discarded = this.frames.finish();
                    if discarded > 0 {
                        debug!(discarded, "discarding incomplete frame at end of stream");
                    }
                    *this.outcome = Some(if this.signal.is_aborted() {
                        StreamOutcome::Aborted
                    } else {
                        StreamOutcome::Finished
                    });
                    return Poll::Ready(None);
                }
            }
        }
    }
}
