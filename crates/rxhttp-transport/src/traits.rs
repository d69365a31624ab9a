//! The transport boundary.
//!
//! A [`Transport`] performs exactly one HTTP exchange per
//! [`call`](Transport::call) and hands back an [`HttpResponse`] whose body is
//! either fully buffered or a stream of byte chunks. Everything above this
//! trait (merging options, decoding JSON, routing results to observers) lives
//! in `rxhttp-client`.
//!
//! # Implementing Transport
//!
//! Implementations must honor the [`AbortSignal`] they are given: once it
//! fires, the pending call should resolve to [`TransportError::Aborted`] and a
//! streaming body should stop yielding chunks.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use futures::Stream;
use futures::stream::{self, StreamExt};
use rxhttp_core::config::{Headers, RequestConfig};

use crate::abort::AbortSignal;
use crate::error::TransportError;

/// A boxed stream of body chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// The body of a response.
pub enum ResponseBody {
    /// The whole body, already read.
    Buffered(Bytes),
    /// Chunks as they arrive.
    Stream(ByteStream),
}

impl ResponseBody {
    /// An empty buffered body.
    #[must_use]
    pub fn empty() -> Self {
        Self::Buffered(Bytes::new())
    }

    /// A streaming body from any chunk stream.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, TransportError>> + Send + 'static,
    {
        Self::Stream(Box::pin(stream))
    }

    /// View the body as a chunk stream. A buffered body yields one chunk, or
    /// none when empty.
    #[must_use]
    pub fn into_stream(self) -> ByteStream {
        match self {
            Self::Buffered(bytes) if bytes.is_empty() => Box::pin(stream::empty()),
            Self::Buffered(bytes) => Box::pin(stream::once(async move { Ok(bytes) })),
            Self::Stream(stream) => stream,
        }
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buffered(bytes) => f.debug_tuple("Buffered").field(&bytes.len()).finish(),
            Self::Stream(_) => f.debug_tuple("Stream").field(&"<stream>").finish(),
        }
    }
}

/// A response as returned by a transport.
#[derive(Debug)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: Headers,
    /// Response body.
    pub body: ResponseBody,
}

impl HttpResponse {
    /// Create a response.
    #[must_use]
    pub fn new(status: u16, headers: Headers, body: ResponseBody) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Whether the status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The response content type, if present.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(rxhttp_core::CONTENT_TYPE)
    }

    /// Read the whole body, counting received bytes into `received` as they
    /// arrive so a failure can be classified by the caller.
    pub async fn read_body(self, received: &mut u64) -> Result<Bytes, TransportError> {
        match self.body {
            ResponseBody::Buffered(bytes) => {
                *received += bytes.len() as u64;
                Ok(bytes)
            }
            ResponseBody::Stream(mut stream) => {
                let mut buf = bytes::BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    let chunk = chunk?;
                    *received += chunk.len() as u64;
                    buf.extend_from_slice(&chunk);
                }
                Ok(buf.freeze())
            }
        }
    }
}

/// Metadata about a transport.
#[derive(Debug, Clone, Default)]
pub struct TransportMetadata {
    /// Transport type identifier (e.g., "http", "stub").
    pub transport_type: String,
    /// Whether bodies are delivered incrementally.
    pub streaming: bool,
}

impl TransportMetadata {
    /// Create new metadata for a transport type.
    #[must_use]
    pub fn new(transport_type: impl Into<String>) -> Self {
        Self {
            transport_type: transport_type.into(),
            streaming: true,
        }
    }

    /// Set the streaming flag.
    #[must_use]
    pub fn streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }
}

/// Core transport trait.
///
/// The trait uses `impl Future` return types so implementations can be
/// written with `async fn`. Futures must be `Send` because the client drives
/// each call on a spawned task.
pub trait Transport: Send + Sync {
    /// Perform one HTTP exchange.
    ///
    /// Resolves once the status line and headers are available; the body may
    /// still be streaming.
    fn call(
        &self,
        request: RequestConfig,
        signal: AbortSignal,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;

    /// Get metadata about this transport.
    fn metadata(&self) -> TransportMetadata;
}

impl<T: Transport> Transport for Arc<T> {
    fn call(
        &self,
        request: RequestConfig,
        signal: AbortSignal,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send {
        (**self).call(request, signal)
    }

    fn metadata(&self) -> TransportMetadata {
        (**self).metadata()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_body_counts_stream_bytes() {
        let chunks = vec![
            Ok(Bytes::from_static(b"{\"a\"")),
            Ok(Bytes::from_static(b":1}")),
        ];
        let response = HttpResponse::new(
            200,
            Headers::new(),
            ResponseBody::from_stream(stream::iter(chunks)),
        );

        let mut received = 0;
        let body = response.read_body(&mut received).await.unwrap();
        assert_eq!(&body[..], b"{\"a\":1}");
        assert_eq!(received, 7);
    }

    #[tokio::test]
    async fn test_read_body_reports_partial_count_on_failure() {
        let chunks = vec![
            Ok(Bytes::from_static(b"{\"a\"")),
            Err(TransportError::body("connection reset")),
        ];
        let response = HttpResponse::new(
            200,
            Headers::new(),
            ResponseBody::from_stream(stream::iter(chunks)),
        );

        let mut received = 0;
        let result = response.read_body(&mut received).await;
        assert!(matches!(result, Err(TransportError::Body { .. })));
        assert_eq!(received, 4);
    }

    #[tokio::test]
    async fn test_buffered_into_stream() {
        let chunks: Vec<_> = ResponseBody::Buffered(Bytes::from_static(b"[]"))
            .into_stream()
            .collect()
            .await;
        assert_eq!(chunks.len(), 1);

        let empty: Vec<_> = ResponseBody::empty().into_stream().collect().await;
        assert!(empty.is_empty());
    }

    #[test]
    fn test_success_range() {
        let ok = HttpResponse::new(204, Headers::new(), ResponseBody::empty());
        let err = HttpResponse::new(404, Headers::new(), ResponseBody::empty());
        assert!(ok.is_success());
        assert!(!err.is_success());
    }
}
