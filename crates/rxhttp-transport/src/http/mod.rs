//! HTTP transport built on `reqwest`.
//!
//! One [`HttpTransport`] is meant to be shared between many requests: it owns
//! a connection pool, and every call borrows from it.
//!
//! # Example
//!
//! ```rust
//! use rxhttp_transport::http::HttpTransportConfig;
//! use std::time::Duration;
//!
//! let config = HttpTransportConfig::new()
//!     .with_connect_timeout(Duration::from_secs(10))
//!     .with_header("Authorization", "Basic YWRtaW46cGFzcw==");
//!
//! assert_eq!(config.connect_timeout, Duration::from_secs(10));
//! assert!(config.request_timeout.is_none());
//! ```

#[cfg(feature = "http")]
mod client;
mod config;

#[cfg(feature = "http")]
pub use client::HttpTransport;
pub use config::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_POOL_IDLE_TIMEOUT, DEFAULT_USER_AGENT, HttpTransportBuilder,
    HttpTransportConfig,
};
