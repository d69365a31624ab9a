//! The request controller.
//!
//! An [`HttpRequest`] owns one request configuration and turns it into
//! notifications on an [`Observable`]. Each [`dispatch`](HttpRequest::dispatch)
//! issues a fresh transport call; at most one call is in flight per
//! controller, and a newer dispatch silences the one before it.
//!
//! # Failure handling
//!
//! | Situation | Observer sees |
//! |-----------|---------------|
//! | [`cancel`](HttpRequest::cancel) | completion |
//! | [`disconnect`](HttpRequest::disconnect) | nothing |
//! | transport fails before any byte arrived | [`RxHttpError::ConnectionRefused`] |
//! | transport fails after some bytes | completion (logged) |
//! | non-2xx status | [`RxHttpError::Server`] |
//! | bad URL or header | [`RxHttpError::InvalidRequest`] |
//! | unparsable or mistyped value | nothing (logged) |

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use rxhttp_core::config::{DeliveryMode, Headers, RequestConfig, RequestOptions};
use rxhttp_core::error::{FailureClass, RxHttpError};
use rxhttp_transport::runtime::{self, abortable};
use rxhttp_transport::{AbortController, AbortSignal, HttpResponse, Transport, TransportError};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::backoff::RetryDelay;
use crate::decoder::{DecoderConfig, StreamDecoder, StreamOutcome};
use crate::observer::{Binding, Emitter, Observable};

/// A reconfigurable, cancellable HTTP request whose results are observed.
///
/// `T` is the type each JSON value is decoded into. For
/// [`DeliveryMode::SimpleWithHeaders`] it is expected to be
/// [`ResponseWithHeaders<P>`](rxhttp_core::ResponseWithHeaders) (or
/// [`serde_json::Value`]).
///
/// Dropping the controller aborts any call in flight.
pub struct HttpRequest<T, Tr: Transport> {
    transport: Arc<Tr>,
    url: String,
    options: RequestOptions,
    mode: DeliveryMode,
    defaults: RequestOptions,
    decoder: DecoderConfig,
    retry: RetryDelay,
    abort: AbortController,
    binding: Binding<T>,
}

impl<T, Tr> HttpRequest<T, Tr>
where
    T: DeserializeOwned + Send + 'static,
    Tr: Transport + 'static,
{
    /// Create a controller. Nothing is sent until [`dispatch`](Self::dispatch).
    pub fn new(
        transport: Arc<Tr>,
        url: impl Into<String>,
        options: RequestOptions,
        mode: DeliveryMode,
    ) -> Self {
        Self::from_parts(
            transport,
            url.into(),
            options,
            mode,
            DecoderConfig::default(),
            RetryDelay::default(),
        )
    }

    pub(crate) fn from_parts(
        transport: Arc<Tr>,
        url: String,
        options: RequestOptions,
        mode: DeliveryMode,
        decoder: DecoderConfig,
        retry: RetryDelay,
    ) -> Self {
        Self {
            transport,
            url,
            options,
            mode,
            defaults: RequestOptions::defaults(),
            decoder,
            retry,
            abort: AbortController::new(),
            binding: Binding::new(),
        }
    }

    /// Replace the configuration.
    ///
    /// A call in flight is cancelled first, completing its observer. The new
    /// configuration is used by the next dispatch.
    pub fn configure(&mut self, url: impl Into<String>, options: RequestOptions, mode: DeliveryMode) {
        if self.binding.is_in_flight() {
            self.cancel();
        }
        self.url = url.into();
        self.options = options;
        self.mode = mode;
    }

    /// Issue the request and return the observable its results go to.
    ///
    /// Any earlier call from this controller is aborted and can no longer
    /// reach the observer. The returned observable is the same one earlier
    /// dispatches returned unless the binding was cancelled or reached a
    /// terminal notification in between.
    pub fn dispatch(&mut self) -> Observable<T> {
        self.abort.abort();
        self.abort = AbortController::new();
        let signal = self.abort.signal();

        let emitter = self.binding.begin(signal.clone());
        let observable = self.binding.observable();

        match RequestConfig::resolve(&self.url, &self.defaults, &self.options) {
            Ok(request) => {
                debug!(
                    url = %request.url,
                    method = %request.method,
                    mode = %self.mode,
                    "dispatching request"
                );
                let call = Call {
                    transport: Arc::clone(&self.transport),
                    request,
                    mode: self.mode,
                    decoder: self.decoder,
                    signal,
                    emitter,
                };
                runtime::spawn(call.run());
            }
            Err(error) => {
                debug!(url = %self.url, %error, "request could not be built");
                emitter.error(error);
            }
        }

        observable
    }

    /// Abort the call in flight and complete the observer.
    ///
    /// The next dispatch starts on a fresh observable.
    pub fn cancel(&mut self) {
        self.abort.abort();
        self.abort = AbortController::new();
        self.binding.complete_and_rebind();
        debug!(url = %self.url, "request cancelled");
    }

    /// Abort the call in flight without notifying the observer.
    pub fn disconnect(&mut self) {
        self.abort.abort();
        self.abort = AbortController::new();
        self.binding.release();
        debug!(url = %self.url, "request disconnected");
    }

    /// The observable of the current binding, without dispatching.
    #[must_use]
    pub fn observable(&self) -> Observable<T> {
        self.binding.observable()
    }

    /// Whether a dispatched call has not yet reached a terminal state.
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.binding.is_in_flight()
    }

    /// A fresh, randomly jittered delay to wait before reconnecting.
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        self.retry.sample()
    }

    /// The configured URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The configured per-call options.
    #[must_use]
    pub fn options(&self) -> &RequestOptions {
        &self.options
    }

    /// The configured delivery mode.
    #[must_use]
    pub fn mode(&self) -> DeliveryMode {
        self.mode
    }

    /// The transport calls are issued on.
    #[must_use]
    pub fn transport(&self) -> &Arc<Tr> {
        &self.transport
    }
}

impl<T, Tr: Transport> Drop for HttpRequest<T, Tr> {
    fn drop(&mut self) {
        self.abort.abort();
    }
}

impl<T, Tr: Transport> std::fmt::Debug for HttpRequest<T, Tr> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRequest")
            .field("url", &self.url)
            .field("mode", &self.mode)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Call task
// =============================================================================

/// Everything one dispatched call needs, moved onto its task.
struct Call<T, Tr> {
    transport: Arc<Tr>,
    request: RequestConfig,
    mode: DeliveryMode,
    decoder: DecoderConfig,
    signal: AbortSignal,
    emitter: Emitter<T>,
}

impl<T, Tr> Call<T, Tr>
where
    T: DeserializeOwned + Send + 'static,
    Tr: Transport + 'static,
{
    async fn run(self) {
        let url = self.request.url.clone();
        let call = self.transport.call(self.request.clone(), self.signal.clone());

        let response = match abortable(&self.signal, call).await {
            None | Some(Err(TransportError::Aborted)) => {
                debug!(%url, class = %FailureClass::Cancelled, "call aborted");
                return;
            }
            Some(Err(error)) => {
                let error = RxHttpError::from(error);
                debug!(%url, class = %error.class(), %error, "transport call failed");
                self.emitter.error(error);
                return;
            }
            Some(Ok(response)) => response,
        };

        if !response.is_success() {
            self.server_error(response).await;
            return;
        }

        match self.mode {
            DeliveryMode::Simple | DeliveryMode::SimpleWithHeaders => self.single(response).await,
            DeliveryMode::Stream => self.stream(response).await,
        }
    }

    /// Read the body of a non-2xx response and surface it as a server error.
    async fn server_error(self, response: HttpResponse) {
        let status = response.status;
        let mut received = 0;
        let body = match abortable(&self.signal, response.read_body(&mut received)).await {
            None => return self.cancelled(),
            Some(Ok(bytes)) => error_body(&bytes),
            Some(Err(error)) => {
                debug!(status, %error, "failed to read error body");
                None
            }
        };

        let error = RxHttpError::server(status, body);
        debug!(url = %self.request.url, status, class = %error.class(), "server error");
        self.emitter.error(error);
    }

    /// Buffer the body and deliver it as one value.
    async fn single(self, response: HttpResponse) {
        let headers = response.headers.clone();
        let mut received = 0;
        let bytes = match abortable(&self.signal, response.read_body(&mut received)).await {
            None | Some(Err(TransportError::Aborted)) => return self.cancelled(),
            Some(Err(error)) => return self.dropped(received, error),
            Some(Ok(bytes)) => bytes,
        };

        let value = match serde_json::from_slice::<Value>(&bytes) {
            Ok(value) => value,
            Err(error) => {
                warn!(
                    url = %self.request.url,
                    %error,
                    len = bytes.len(),
                    class = %FailureClass::DecodeIgnored,
                    "response body is not JSON"
                );
                if self.mode.completes_after_value() {
                    self.emitter.complete();
                }
                return;
            }
        };

        let value = match self.mode {
            DeliveryMode::SimpleWithHeaders => with_headers(value, &headers),
            _ => value,
        };

        match serde_json::from_value::<T>(value) {
            Ok(item) => {
                self.emitter.next(item);
            }
            Err(error) => warn!(
                url = %self.request.url,
                %error,
                class = %FailureClass::DecodeIgnored,
                "response does not match the expected type"
            ),
        }

        if self.mode.completes_after_value() {
            debug!(url = %self.request.url, bytes = received, "request complete");
            self.emitter.complete();
        }
    }

    /// Decode the body as a continuous sequence of values.
    async fn stream(self, response: HttpResponse) {
        let body = response.body.into_stream();
        let mut decoder = StreamDecoder::<_, T>::with_config(body, self.signal.clone(), self.decoder);

        let mut emitted = 0_u64;
        while let Some(item) = decoder.next().await {
            if !self.emitter.next(item) {
                return self.cancelled();
            }
            emitted += 1;
        }

        match decoder.into_outcome() {
            Some(StreamOutcome::Finished) => {
                debug!(url = %self.request.url, emitted, "stream ended");
                self.emitter.complete();
            }
            Some(StreamOutcome::Dropped {
                bytes_received,
                error,
            }) => self.dropped(bytes_received, error),
            Some(StreamOutcome::Aborted) | None => self.cancelled(),
        }
    }

    /// A body read failed after `received` bytes.
    fn dropped(self, received: u64, error: TransportError) {
        if received == 0 {
            let error = RxHttpError::from(error);
            debug!(url = %self.request.url, class = %error.class(), %error, "no response bytes");
            self.emitter.error(error);
        } else {
            warn!(
                url = %self.request.url,
                bytes_received = received,
                %error,
                class = %FailureClass::MidStreamDrop,
                "connection dropped mid-response; completing"
            );
            self.emitter.complete();
        }
    }

    fn cancelled(self) {
        debug!(url = %self.request.url, class = %FailureClass::Cancelled, "call superseded");
    }
}

/// Wrap a payload with the headers it arrived with, in the shape of
/// [`ResponseWithHeaders`](rxhttp_core::ResponseWithHeaders).
fn with_headers(payload: Value, headers: &Headers) -> Value {
    let mut object = serde_json::Map::with_capacity(2);
    object.insert("payload".to_string(), payload);
    object.insert(
        "headers".to_string(),
        Value::Object(
            headers
                .iter()
                .map(|(name, value)| (name.to_string(), Value::String(value.to_string())))
                .collect(),
        ),
    );
    Value::Object(object)
}

/// The body of an error response: JSON if it parses, text otherwise.
fn error_body(bytes: &Bytes) -> Option<Value> {
    if bytes.is_empty() {
        return None;
    }
    serde_json::from_slice(bytes).ok().or_else(|| {
        let text = String::from_utf8_lossy(bytes);
        let text = text.trim();
        (!text.is_empty()).then(|| Value::String(text.to_string()))
    })
}
