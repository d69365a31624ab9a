//! A scripted transport.
//!
//! [`StubTransport`] answers calls from a queue of [`StubResponse`]s, in
//! order, and records every request it was handed. Body chunks are delivered
//! exactly as scripted so tests control chunk boundaries.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::stream::{self, StreamExt};
use rxhttp_core::config::{APPLICATION_JSON, CONTENT_TYPE, Headers, RequestConfig};
use rxhttp_transport::runtime::{self, sleep_or_abort};
use rxhttp_transport::{
    AbortSignal, ByteStream, HttpResponse, ResponseBody, Transport, TransportError,
    TransportMetadata,
};

/// How the body ends after its scripted chunks.
#[derive(Debug, Clone)]
enum Tail {
    /// End of stream.
    End,
    /// Fail with a body read error.
    Fail(String),
    /// Never end; only an abort stops the body.
    Pending,
}

#[derive(Debug, Clone)]
enum Outcome {
    Respond { chunks: Vec<Bytes>, tail: Tail },
    Refuse(String),
}

/// One scripted answer.
#[derive(Debug, Clone)]
pub struct StubResponse {
    status: u16,
    headers: Headers,
    outcome: Outcome,
    delay: Duration,
    chunk_delay: Duration,
    buffered: bool,
}

impl StubResponse {
    fn respond(status: u16, chunks: Vec<Bytes>) -> Self {
        Self {
            status,
            headers: Headers::new(),
            outcome: Outcome::Respond {
                chunks,
                tail: Tail::End,
            },
            delay: Duration::ZERO,
            chunk_delay: Duration::ZERO,
            buffered: false,
        }
    }

    /// A 200 response whose body is `value` as JSON, in one chunk.
    #[must_use]
    pub fn json(value: serde_json::Value) -> Self {
        Self::respond(200, vec![Bytes::from(value.to_string())])
            .with_header(CONTENT_TYPE, APPLICATION_JSON)
    }

    /// A 200 response whose body is delivered as the given chunks.
    pub fn chunks<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self::respond(200, chunks.into_iter().map(Into::into).collect())
    }

    /// A response with the given status and JSON body.
    #[must_use]
    pub fn status(status: u16, body: serde_json::Value) -> Self {
        Self::respond(status, vec![Bytes::from(body.to_string())])
            .with_header(CONTENT_TYPE, APPLICATION_JSON)
    }

    /// A response with the given status and a plain text body.
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::respond(status, vec![Bytes::from(body.into())])
            .with_header(CONTENT_TYPE, "text/plain")
    }

    /// No response at all: the call fails as if the connection was refused.
    pub fn refused(message: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Refuse(message.into()),
            ..Self::respond(0, Vec::new())
        }
    }

    /// Add a response header.
    #[must_use]
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Wait before answering. An abort during the wait fails the call with
    /// [`TransportError::Aborted`].
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Wait before each body chunk.
    #[must_use]
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    /// Fail the body with a read error after the scripted chunks.
    #[must_use]
    pub fn fail_after(mut self, message: impl Into<String>) -> Self {
        if let Outcome::Respond { tail, .. } = &mut self.outcome {
            *tail = Tail::Fail(message.into());
        }
        self
    }

    /// Keep the body open after the scripted chunks until aborted.
    #[must_use]
    pub fn keep_open(mut self) -> Self {
        if let Outcome::Respond { tail, .. } = &mut self.outcome {
            *tail = Tail::Pending;
        }
        self
    }

    /// Hand the body over already buffered instead of as a stream.
    ///
    /// Only applies to bodies that end normally.
    #[must_use]
    pub fn buffered(mut self) -> Self {
        self.buffered = true;
        self
    }

    fn into_response(
        self,
        signal: AbortSignal,
        chunks: Vec<Bytes>,
        tail: Tail,
    ) -> HttpResponse {
        let body = match tail {
            Tail::End if self.buffered => {
                let mut buf = BytesMut::new();
                for chunk in &chunks {
                    buf.extend_from_slice(chunk);
                }
                ResponseBody::Buffered(buf.freeze())
            }
            tail => ResponseBody::Stream(body_stream(chunks, tail, self.chunk_delay, signal)),
        };
        HttpResponse::new(self.status, self.headers, body)
    }
}

fn body_stream(chunks: Vec<Bytes>, tail: Tail, delay: Duration, signal: AbortSignal) -> ByteStream {
    let scripted = stream::iter(chunks).then(move |chunk| async move {
        if !delay.is_zero() {
            runtime::sleep(delay).await;
        }
        Ok::<_, TransportError>(chunk)
    });

    let body: ByteStream = match tail {
        Tail::End => scripted.boxed(),
        Tail::Fail(message) => scripted
            .chain(stream::once(async move { Err(TransportError::body(message)) }))
            .boxed(),
        Tail::Pending => scripted.chain(stream::pending()).boxed(),
    };

    // Same as the HTTP transport: an abort ends the body.
    body.take_until(signal.into_aborted()).boxed()
}

#[derive(Default)]
struct Script {
    queue: VecDeque<StubResponse>,
    requests: Vec<RequestConfig>,
}

/// A transport that answers from a script.
///
/// Clones share the script, so a test can keep one handle to inspect
/// recorded requests while the request controller owns another. A call with
/// an empty script fails as a refused connection.
///
/// # Example
///
/// ```rust
/// use rxhttp_testing::{StubResponse, StubTransport};
/// use serde_json::json;
///
/// let stub = StubTransport::new();
/// stub.push(StubResponse::json(json!({"id": 11, "name": "mike"})));
/// stub.push(StubResponse::chunks(vec![r#"{"a""#, ":1}"]));
/// assert_eq!(stub.remaining(), 2);
/// ```
#[derive(Clone, Default)]
pub struct StubTransport {
    script: Arc<Mutex<Script>>,
}

impl StubTransport {
    /// Create a transport with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport scripted with `responses`.
    pub fn with_responses(responses: impl IntoIterator<Item = StubResponse>) -> Self {
        let stub = Self::new();
        stub.lock().queue.extend(responses);
        stub
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue another response.
    pub fn push(&self, response: StubResponse) {
        self.lock().queue.push_back(response);
    }

    /// Every request received so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<RequestConfig> {
        self.lock().requests.clone()
    }

    /// Number of requests received so far.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    /// Number of responses not yet used.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.lock().queue.len()
    }
}

impl fmt::Debug for StubTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let script = self.lock();
        f.debug_struct("StubTransport")
            .field("remaining", &script.queue.len())
            .field("requests", &script.requests.len())
            .finish()
    }
}

impl Transport for StubTransport {
    async fn call(
        &self,
        request: RequestConfig,
        signal: AbortSignal,
    ) -> Result<HttpResponse, TransportError> {
        let scripted = {
            let mut script = self.lock();
            script.requests.push(request);
            script.queue.pop_front()
        };

        let Some(response) = scripted else {
            return Err(TransportError::connection("no scripted response"));
        };

        if !response.delay.is_zero() && !sleep_or_abort(response.delay, &signal).await {
            return Err(TransportError::Aborted);
        }
        if signal.is_aborted() {
            return Err(TransportError::Aborted);
        }

        match response.outcome.clone() {
            Outcome::Refuse(message) => Err(TransportError::Connection {
                message,
                source: Some(Box::new(std::io::Error::from(
                    std::io::ErrorKind::ConnectionRefused,
                ))),
            }),
            Outcome::Respond { chunks, tail } => Ok(response.into_response(signal, chunks, tail)),
        }
    }

    fn metadata(&self) -> TransportMetadata {
        TransportMetadata::new("stub").streaming(true)
    }
}
