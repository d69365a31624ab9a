//! Error types surfaced to rxhttp callers.
//!
//! Only failures a caller can act on become an [`RxHttpError`]. Cancellation,
//! a connection dropped after data arrived, and fragments that fail to decode
//! are resolved inside the client and never show up here; see
//! [`FailureClass`] for the full taxonomy.

use std::fmt;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Type alias for boxed errors that are Send + Sync.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Body of a non-2xx response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerErrorResponse {
    /// HTTP status code.
    pub error_code: u16,
    /// Response body, parsed as JSON when possible.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<serde_json::Value>,
}

/// Errors delivered to an observer.
#[derive(Error, Diagnostic, Debug)]
pub enum RxHttpError {
    /// The transport failed before any byte of a response was received.
    #[error("Connection refused: {message}")]
    #[diagnostic(
        code(rxhttp::connection::refused),
        help("The server was never reached; retry after a randomized delay")
    )]
    ConnectionRefused {
        /// Human-readable error message.
        message: String,
        /// The underlying transport error, if available.
        #[source]
        source: Option<BoxError>,
    },

    /// The server answered with a non-2xx status.
    #[error("Server responded with status {}", .0.error_code)]
    #[diagnostic(code(rxhttp::server::error))]
    Server(Box<ServerErrorResponse>),

    /// The request could not be built.
    #[error("Invalid request: {message}")]
    #[diagnostic(
        code(rxhttp::request::invalid),
        help("Check the URL, method and header names/values")
    )]
    InvalidRequest {
        /// Human-readable error message.
        message: String,
    },
}

impl RxHttpError {
    /// Create a connection refused error.
    pub fn connection_refused(message: impl Into<String>) -> Self {
        Self::ConnectionRefused {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection refused error carrying its cause.
    pub fn connection_refused_with(
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::ConnectionRefused {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a server error from a status and optional parsed body.
    #[must_use]
    pub fn server(status: u16, body: Option<serde_json::Value>) -> Self {
        Self::Server(Box::new(ServerErrorResponse {
            error_code: status,
            error_message: body,
        }))
    }

    /// Create an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// The HTTP status, for server errors.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server(details) => Some(details.error_code),
            _ => None,
        }
    }

    /// The server error body, for server errors.
    #[must_use]
    pub fn server_response(&self) -> Option<&ServerErrorResponse> {
        match self {
            Self::Server(details) => Some(details),
            _ => None,
        }
    }

    /// Whether the server was never reached.
    #[must_use]
    pub fn is_connection_refused(&self) -> bool {
        matches!(self, Self::ConnectionRefused { .. })
    }

    /// Whether retrying the same request later can reasonably succeed.
    ///
    /// True for refused connections, 5xx responses, 408 and 429.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConnectionRefused { .. } => true,
            Self::Server(details) => {
                details.error_code >= 500 || matches!(details.error_code, 408 | 429)
            }
            Self::InvalidRequest { .. } => false,
        }
    }

    /// The failure class this error belongs to.
    #[must_use]
    pub fn class(&self) -> FailureClass {
        match self {
            Self::ConnectionRefused { .. } => FailureClass::ConnectionRefused,
            Self::Server(_) => FailureClass::ServerError,
            Self::InvalidRequest { .. } => FailureClass::InvalidRequest,
        }
    }
}

/// How a failure is resolved at the client boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// Caused by the client's own abort. Surfaces as completion.
    Cancelled,
    /// Nothing was received. Surfaces as [`RxHttpError::ConnectionRefused`].
    ConnectionRefused,
    /// The connection dropped after data arrived. Surfaces as completion.
    MidStreamDrop,
    /// Non-2xx response. Surfaces as [`RxHttpError::Server`].
    ServerError,
    /// A fragment failed to decode. Logged only.
    DecodeIgnored,
    /// The request could not be built. Surfaces as [`RxHttpError::InvalidRequest`].
    InvalidRequest,
}

impl FailureClass {
    /// Whether the observer sees an error (as opposed to completion or nothing).
    #[must_use]
    pub const fn is_surfaced(self) -> bool {
        matches!(
            self,
            Self::ConnectionRefused | Self::ServerError | Self::InvalidRequest
        )
    }
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "cancelled"),
            Self::ConnectionRefused => write!(f, "connection refused"),
            Self::MidStreamDrop => write!(f, "mid-stream drop"),
            Self::ServerError => write!(f, "server error"),
            Self::DecodeIgnored => write!(f, "decode ignored"),
            Self::InvalidRequest => write!(f, "invalid request"),
        }
    }
}

/// Classification of transport errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportErrorKind {
    /// The call was aborted through its abort signal.
    Aborted,
    /// The request could not be turned into a wire request.
    InvalidRequest,
    /// Connection could not be established.
    ConnectionFailed,
    /// Operation timed out.
    Timeout,
    /// Reading the response body failed.
    ReadFailed,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aborted => write!(f, "aborted"),
            Self::InvalidRequest => write!(f, "invalid request"),
            Self::ConnectionFailed => write!(f, "connection failed"),
            Self::Timeout => write!(f, "timeout"),
            Self::ReadFailed => write!(f, "read failed"),
        }
    }
}
