//! Observable HTTP requests for rxhttp.
//!
//! This crate holds the request lifecycle on top of a
//! [`Transport`](rxhttp_transport::Transport):
//!
//! - [`HttpRequest`]: a reconfigurable, cancellable request controller
//! - [`Observable`], [`Observer`], [`Subscription`]: how results reach the
//!   caller
//! - [`decoder`]: incremental decoding of a chunked byte feed into JSON values
//! - [`backoff`]: jittered reconnect delays
//!
//! # Delivery modes
//!
//! | Mode | Behavior |
//! |------|----------|
//! | [`DeliveryMode::Simple`] | one value, then completion |
//! | [`DeliveryMode::SimpleWithHeaders`] | one `{ payload, headers }` value per dispatch, stays open |
//! | [`DeliveryMode::Stream`] | every JSON value as it arrives, completion at end of stream |
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use rxhttp_client::HttpRequest;
//! use rxhttp_core::{DeliveryMode, RequestOptions};
//! use rxhttp_transport::HttpTransport;
//! use serde_json::Value;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = Arc::new(HttpTransport::new(Default::default())?);
//!     let mut feed = HttpRequest::<Value, _>::new(
//!         transport,
//!         "http://localhost:5984/db/_changes?feed=continuous&heartbeat=10000",
//!         RequestOptions::new(),
//!         DeliveryMode::Stream,
//!     );
//!
//!     let changes = feed.dispatch();
//!     while let Some(change) = changes.next().await {
//!         println!("{}", change?);
//!     }
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]

pub mod backoff;
pub mod builder;
pub mod decoder;
pub mod observer;
pub mod request;

// Re-export commonly used types
pub use backoff::{RETRY_DELAY_MAX, RETRY_DELAY_MIN, RetryDelay, retry_delay};
pub use builder::HttpRequestBuilder;
pub use decoder::{DecoderConfig, FrameDecoder, StreamDecoder, StreamOutcome, Utf8Decoder};
pub use observer::{Notification, Observable, Observer, Subscription};
pub use request::HttpRequest;

pub use rxhttp_core::{DeliveryMode, RequestOptions, ResponseWithHeaders, RxHttpError};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::backoff::{RetryDelay, retry_delay};
    pub use crate::builder::HttpRequestBuilder;
    pub use crate::decoder::DecoderConfig;
    pub use crate::observer::{Notification, Observable, Observer, Subscription};
    pub use crate::request::HttpRequest;
}
