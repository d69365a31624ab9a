//! # rxhttp
//!
//! Cancellable, reconfigurable HTTP requests that deliver JSON as observable
//! sequences.
//!
//! ## Features
//!
//! - **One controller per logical request**: reconfigure, re-dispatch, cancel
//!   or disconnect without rebuilding subscriptions
//! - **Latest dispatch wins**: a superseded attempt can never emit
//! - **Streaming JSON**: newline-delimited or concatenated documents decoded
//!   across arbitrary chunk boundaries, including split UTF-8 sequences
//! - **Classified failures**: refused connection, server error (with status
//!   and body) and invalid request, each with miette diagnostics
//! - **Jittered reconnect delays** for feed-style consumers
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use rxhttp::prelude::*;
//! use serde_json::Value;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = Arc::new(HttpTransport::new(HttpTransportConfig::default())?);
//!     let mut doc = HttpRequestBuilder::new("http://localhost:5984/db/doc-1")
//!         .header("Authorization", "Basic YWRtaW46cGFzcw==")
//!         .build::<Value, _>(transport)?;
//!
//!     let observable = doc.dispatch();
//!     if let Some(value) = observable.next().await {
//!         println!("{}", value?);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Crate Organization
//!
//! - [`rxhttp_core`] - Request options, delivery modes and errors (no async runtime)
//! - [`rxhttp_transport`] - Transport trait, abort signals and the HTTP transport
//! - [`rxhttp_client`] - Request controllers, observables and the stream decoder
//! - `rxhttp_testing` - Scripted transport and fixtures (feature `testing`)

#![deny(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]

// Re-export all public items from core
pub use rxhttp_core::*;

// Re-export client types
pub use rxhttp_client::{
    HttpRequest, HttpRequestBuilder, Notification, Observable, Observer, RetryDelay,
    Subscription, retry_delay,
};

// Re-export transport types
#[cfg(feature = "http")]
pub use rxhttp_transport::HttpTransport;
pub use rxhttp_transport::{
    AbortController, AbortSignal, HttpResponse, HttpTransportConfig, Transport, TransportError,
    TransportMetadata,
};

pub mod prelude;

/// Transport module re-exports
pub mod transport {
    //! Transport layer types.
    pub use rxhttp_transport::*;
}

/// Client module re-exports
pub mod client {
    //! Request controller types.
    pub use rxhttp_client::*;
}

/// Testing module re-exports
#[cfg(feature = "testing")]
pub mod testing {
    //! Scripted transports and fixtures.
    pub use rxhttp_testing::*;
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_prelude_imports() {
        use crate::prelude::*;
        let _ = std::any::type_name::<RxHttpError>();
        let _ = std::any::type_name::<HttpRequestBuilder>();
        assert!(DeliveryMode::Stream.is_stream());
    }

    #[test]
    fn test_module_paths() {
        let _ = std::any::type_name::<crate::client::FrameDecoder>();
        let _ = std::any::type_name::<crate::transport::AbortController>();
    }
}
