//! Fluent construction of request controllers.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use rxhttp_core::config::{DeliveryMode, RequestConfig, RequestOptions};
use rxhttp_core::error::RxHttpError;
use rxhttp_transport::Transport;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::backoff::RetryDelay;
use crate::decoder::DecoderConfig;
use crate::request::HttpRequest;

/// Builder for [`HttpRequest`].
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use rxhttp_client::HttpRequestBuilder;
/// use rxhttp_core::DeliveryMode;
/// use rxhttp_transport::HttpTransport;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let transport = Arc::new(HttpTransport::new(Default::default())?);
/// let mut changes = HttpRequestBuilder::new("http://localhost:5984/db/_changes?feed=continuous")
///     .header("Authorization", "Basic YWRtaW46cGFzcw==")
///     .mode(DeliveryMode::Stream)
///     .build::<serde_json::Value, _>(transport)?;
///
/// let observable = changes.dispatch();
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct HttpRequestBuilder {
    url: String,
    options: RequestOptions,
    mode: DeliveryMode,
    decoder: DecoderConfig,
    retry: RetryDelay,
    body_error: Option<RxHttpError>,
}

impl HttpRequestBuilder {
    /// Start building a request for `url`.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            options: RequestOptions::new(),
            mode: DeliveryMode::default(),
            decoder: DecoderConfig::default(),
            retry: RetryDelay::default(),
            body_error: None,
        }
    }

    /// Set the HTTP method.
    #[must_use]
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.options = self.options.with_method(method);
        self
    }

    /// Add a header.
    #[must_use]
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.options = self.options.with_header(name, value);
        self
    }

    /// Set a raw body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.options = self.options.with_body(body);
        self
    }

    /// Serialize `value` as the JSON body.
    ///
    /// A serialization failure is reported by [`build`](Self::build).
    #[must_use]
    pub fn json_body<B: Serialize>(mut self, value: &B) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => self.options = self.options.with_body(body),
            Err(e) => {
                self.body_error = Some(RxHttpError::invalid_request(format!(
                    "failed to serialize request body: {e}"
                )));
            }
        }
        self
    }

    /// Set the credentials mode.
    #[must_use]
    pub fn credentials(mut self, credentials: impl Into<String>) -> Self {
        self.options = self.options.with_credentials(credentials);
        self
    }

    /// Set the referrer.
    #[must_use]
    pub fn referrer(mut self, referrer: impl Into<String>) -> Self {
        self.options = self.options.with_referrer(referrer);
        self
    }

    /// Set the referrer policy.
    #[must_use]
    pub fn referrer_policy(mut self, policy: impl Into<String>) -> Self {
        self.options = self.options.with_referrer_policy(policy);
        self
    }

    /// Replace all options at once.
    #[must_use]
    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the delivery mode.
    #[must_use]
    pub fn mode(mut self, mode: DeliveryMode) -> Self {
        self.mode = mode;
        self
    }

    /// Limit how much undecoded text a stream may buffer.
    #[must_use]
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.decoder = self.decoder.with_max_frame_size(size);
        self
    }

    /// Set the range [`HttpRequest::retry_delay`] draws from.
    #[must_use]
    pub fn retry_range(mut self, min: Duration, max: Duration) -> Self {
        self.retry = RetryDelay::between(min, max);
        self
    }

    /// Build the controller.
    ///
    /// The URL, method and body are checked here so mistakes surface before
    /// the first dispatch.
    pub fn build<T, Tr>(self, transport: Arc<Tr>) -> Result<HttpRequest<T, Tr>, RxHttpError>
    where
        T: DeserializeOwned + Send + 'static,
        Tr: Transport + 'static,
    {
        if let Some(error) = self.body_error {
            return Err(error);
        }
        RequestConfig::resolve(&self.url, &RequestOptions::defaults(), &self.options)?;

        Ok(HttpRequest::from_parts(
            transport,
            self.url,
            self.options,
            self.mode,
            self.decoder,
            self.retry,
        ))
    }
}
