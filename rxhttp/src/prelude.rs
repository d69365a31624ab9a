//! Prelude module for convenient imports.
//!
//! ```rust
//! use rxhttp::prelude::*;
//!
//! let options = RequestOptions::new().with_method("POST");
//! assert_eq!(options.method.as_deref(), Some("POST"));
//! assert!(DeliveryMode::Stream.is_stream());
//! ```
//!
//! ## Included Types
//!
//! ### Core Types
//! - `RequestOptions`, `DeliveryMode`, `ResponseWithHeaders`, `Headers`
//! - `RxHttpError`, `FailureClass`
//!
//! ### Client Types
//! - `HttpRequest` and `HttpRequestBuilder`
//! - `Observable`, `Observer`, `Notification`, `Subscription`
//! - `RetryDelay` and `retry_delay`
//!
//! ### Transport Types
//! - `Transport`, `HttpResponse`, `TransportError`
//! - `HttpTransport` and its config
//! - `AbortController` and `AbortSignal`

// Core types
pub use rxhttp_core::{
    DeliveryMode, FailureClass, Headers, RequestOptions, ResponseWithHeaders, RxHttpError,
};

// Client types
pub use rxhttp_client::prelude::*;

// Transport types
pub use rxhttp_transport::prelude::*;
