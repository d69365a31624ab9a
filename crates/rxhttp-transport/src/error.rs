//! Transport error types.

use rxhttp_core::error::{BoxError, RxHttpError, TransportErrorKind};
use thiserror::Error;

/// Errors that can occur during a transport call.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The call was aborted through its abort signal.
    #[error("Request aborted")]
    Aborted,

    /// The request could not be turned into a wire request.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of the problem.
        message: String,
    },

    /// Connection error before a response arrived.
    #[error("Connection error: {message}")]
    Connection {
        /// Error message.
        message: String,
        /// The underlying error, if available.
        #[source]
        source: Option<BoxError>,
    },

    /// Timeout occurred.
    #[error("{operation} timed out after {duration:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// How long the operation waited.
        duration: std::time::Duration,
    },

    /// Reading the response body failed.
    #[error("Body read error: {message}")]
    Body {
        /// Error message.
        message: String,
        /// The underlying error, if available.
        #[source]
        source: Option<BoxError>,
    },

    /// I/O error from `std::io::Error`.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl TransportError {
    /// Create an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a connection error without a source.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            source: None,
        }
    }

    /// Create a body read error without a source.
    pub fn body(message: impl Into<String>) -> Self {
        Self::Body {
            message: message.into(),
            source: None,
        }
    }

    /// Whether this error is the result of an abort.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }

    /// Get the transport error kind.
    #[must_use]
    pub fn kind(&self) -> TransportErrorKind {
        match self {
            Self::Aborted => TransportErrorKind::Aborted,
            Self::InvalidRequest { .. } => TransportErrorKind::InvalidRequest,
            Self::Connection { .. } => TransportErrorKind::ConnectionFailed,
            Self::Timeout { .. } => TransportErrorKind::Timeout,
            Self::Body { .. } => TransportErrorKind::ReadFailed,
            Self::IoError(e) => match e.kind() {
                std::io::ErrorKind::ConnectionRefused
                | std::io::ErrorKind::ConnectionAborted
                | std::io::ErrorKind::NotConnected
                | std::io::ErrorKind::AddrNotAvailable => TransportErrorKind::ConnectionFailed,
                std::io::ErrorKind::TimedOut => TransportErrorKind::Timeout,
                _ => TransportErrorKind::ReadFailed,
            },
        }
    }
}

/// Converts a transport failure into the error an observer sees.
///
/// Aborts never reach an observer, so they are not special-cased here: the
/// client filters them out before converting.
impl From<TransportError> for RxHttpError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::InvalidRequest { message } => Self::InvalidRequest { message },
            other => Self::ConnectionRefused {
                message: other.to_string(),
                source: Some(Box::new(other)),
            },
        }
    }
}
