//! Transport layer for rxhttp.
//!
//! A transport turns an effective [`RequestConfig`](rxhttp_core::RequestConfig)
//! into one HTTP exchange. The client above it never talks to the network
//! directly, which keeps the decoding and observer logic testable against a
//! scripted transport.
//!
//! # Available Transports
//!
//! | Transport | Use Case | Feature Flag |
//! |-----------|----------|--------------|
//! | [`http::HttpTransport`] | Real HTTP via `reqwest` | `http` (default) |
//! | `rxhttp_testing::StubTransport` | Scripted responses in tests | separate crate |
//!
//! # Cancellation
//!
//! Every call receives an [`AbortSignal`]. Firing the owning
//! [`AbortController`] resolves a pending call to
//! [`TransportError::Aborted`] and ends a streaming body.
//!
//! # Example
//!
//! ```no_run
//! use rxhttp_core::{RequestConfig, RequestOptions};
//! use rxhttp_transport::{AbortController, Transport, http::HttpTransport};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = HttpTransport::new(Default::default())?;
//!     let request = RequestConfig::resolve(
//!         "http://localhost:5984/_all_dbs",
//!         &RequestOptions::defaults(),
//!         &RequestOptions::new(),
//!     )?;
//!
//!     let controller = AbortController::new();
//!     let response = transport.call(request, controller.signal()).await?;
//!
//!     let mut received = 0;
//!     let body = response.read_body(&mut received).await?;
//!     println!("{} bytes", body.len());
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]

pub mod abort;
pub mod error;
pub mod http;
pub mod runtime;
pub mod traits;

pub use abort::{AbortController, AbortSignal};
pub use error::TransportError;
pub use traits::{ByteStream, HttpResponse, ResponseBody, Transport, TransportMetadata};

#[cfg(feature = "http")]
pub use http::HttpTransport;
pub use http::{HttpTransportBuilder, HttpTransportConfig};

// Re-export bytes types so transports can be written without a direct dependency
pub use bytes::{Bytes, BytesMut};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::abort::{AbortController, AbortSignal};
    pub use crate::error::TransportError;
    #[cfg(feature = "http")]
    pub use crate::http::HttpTransport;
    pub use crate::http::{HttpTransportBuilder, HttpTransportConfig};
    pub use crate::traits::{HttpResponse, ResponseBody, Transport, TransportMetadata};
}
