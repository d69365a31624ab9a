//! HTTP transport client implementation.

use futures::StreamExt;
use reqwest::{
    Client, Method,
    header::{HeaderMap, HeaderName, HeaderValue, REFERER},
};
use rxhttp_core::config::{Headers, RequestConfig};
use tracing::{debug, trace};

use crate::abort::AbortSignal;
use crate::error::TransportError;
use crate::runtime::abortable;
use crate::traits::{HttpResponse, ResponseBody, Transport, TransportMetadata};

use super::config::{HttpTransportBuilder, HttpTransportConfig};

/// HTTP transport backed by `reqwest`.
///
/// The response body is always handed back as a stream; the client decides
/// whether to buffer it. Aborting the signal drops the in-flight request or
/// ends the body stream at the next chunk boundary, which releases the
/// connection.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    config: HttpTransportConfig,
    client: Client,
}

impl HttpTransport {
    /// Create a new HTTP transport with the given configuration.
    ///
    /// No connection is made until the first call.
    pub fn new(config: HttpTransportConfig) -> Result<Self, TransportError> {
        let mut builder = Client::builder()
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .user_agent(config.user_agent.clone());

        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(|e| TransportError::Connection {
            message: format!("Failed to create HTTP client: {e}"),
            source: Some(Box::new(e)),
        })?;

        Ok(Self { config, client })
    }

    /// Get the transport configuration.
    #[must_use]
    pub fn config(&self) -> &HttpTransportConfig {
        &self.config
    }

    /// Build headers for a request: transport-wide headers first, then the
    /// request's own headers, then `Referer` when a referrer is set.
    fn build_headers(&self, request: &RequestConfig) -> Result<HeaderMap, TransportError> {
        let mut headers = HeaderMap::new();

        let configured = self
            .config
            .headers
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()));
        for (name, value) in configured.chain(request.headers.iter()) {
            headers.insert(
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                    TransportError::invalid_request(format!("Invalid header name '{name}': {e}"))
                })?,
                HeaderValue::from_str(value).map_err(|e| {
                    TransportError::invalid_request(format!(
                        "Invalid header value for '{name}': {e}"
                    ))
                })?,
            );
        }

        if let Some(referrer) = &request.referrer {
            headers.insert(
                REFERER,
                HeaderValue::from_str(referrer).map_err(|e| {
                    TransportError::invalid_request(format!("Invalid referrer: {e}"))
                })?,
            );
        }

        Ok(headers)
    }

    fn build_request(
        &self,
        request: &RequestConfig,
    ) -> Result<reqwest::RequestBuilder, TransportError> {
        let method = Method::from_bytes(request.method.as_bytes()).map_err(|e| {
            TransportError::invalid_request(format!("Invalid method '{}': {e}", request.method))
        })?;

        // Browser-only request settings have no reqwest equivalent.
        if request.credentials.is_some() || request.referrer_policy.is_some() {
            trace!(
                credentials = ?request.credentials,
                referrer_policy = ?request.referrer_policy,
                "ignoring browser-only request settings"
            );
        }

        let mut builder = self
            .client
            .request(method, &request.url)
            .headers(self.build_headers(request)?);

        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        Ok(builder)
    }

    fn map_send_error(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout {
                operation: "HTTP request".to_string(),
                duration: self
                    .config
                    .request_timeout
                    .unwrap_or(self.config.connect_timeout),
            }
        } else if err.is_builder() {
            TransportError::invalid_request(err.to_string())
        } else {
            TransportError::Connection {
                message: format!("HTTP request failed: {err}"),
                source: Some(Box::new(err)),
            }
        }
    }
}

impl Transport for HttpTransport {
    async fn call(
        &self,
        request: RequestConfig,
        signal: AbortSignal,
    ) -> Result<HttpResponse, TransportError> {
        if signal.is_aborted() {
            return Err(TransportError::Aborted);
        }

        let send = self.build_request(&request)?.send();
        let Some(result) = abortable(&signal, send).await else {
            debug!(url = %request.url, "request aborted before response");
            return Err(TransportError::Aborted);
        };
        let response = result.map_err(|e| self.map_send_error(e))?;

        let status = response.status().as_u16();
        let headers: Headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v)))
            .collect();

        debug!(url = %request.url, status, "response headers received");

        let body = response
            .bytes_stream()
            .map(|chunk| {
                chunk.map_err(|e| TransportError::Body {
                    message: format!("HTTP body stream error: {e}"),
                    source: Some(Box::new(e)),
                })
            })
            .take_until(signal.into_aborted());

        Ok(HttpResponse::new(
            status,
            headers,
            ResponseBody::from_stream(body),
        ))
    }

    fn metadata(&self) -> TransportMetadata {
        TransportMetadata::new("http").streaming(true)
    }
}

impl HttpTransportBuilder {
    /// Build the transport.
    pub fn build(self) -> Result<HttpTransport, TransportError> {
        HttpTransport::new(self.config)
    }
}
