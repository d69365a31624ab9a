//! # rxhttp-core
//!
//! Core types for the rxhttp client.
//!
//! This crate holds the pieces every other rxhttp crate agrees on:
//!
//! - **Request configuration**: [`RequestOptions`] (per-call, all optional)
//!   and [`RequestConfig`] (the effective request after merging defaults)
//! - **Headers**: a case-insensitive [`Headers`] map
//! - **Delivery modes**: [`DeliveryMode`] selects one-shot or streaming JSON
//! - **Errors**: the caller-facing [`RxHttpError`] with miette diagnostics
//!
//! It does not depend on any async runtime or HTTP implementation.
//!
//! # Example
//!
//! ```rust
//! use rxhttp_core::{RequestConfig, RequestOptions};
//!
//! let options = RequestOptions::new()
//!     .with_method("post")
//!     .with_header("Authorization", "Basic YWRtaW46cGFzcw==");
//!
//! let config = RequestConfig::resolve(
//!     "http://localhost:5984/db/_changes?feed=continuous",
//!     &RequestOptions::defaults(),
//!     &options,
//! )
//! .unwrap();
//!
//! assert_eq!(config.method, "POST");
//! assert_eq!(config.headers.get("content-type"), Some("application/json"));
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;

pub use config::{
    APPLICATION_JSON, CONTENT_TYPE, DeliveryMode, Headers, RequestConfig, RequestOptions,
    ResponseWithHeaders,
};
pub use error::{BoxError, FailureClass, RxHttpError, ServerErrorResponse, TransportErrorKind};
