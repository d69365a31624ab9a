//! Testing utilities for rxhttp.
//!
//! - [`StubTransport`]: a scripted [`Transport`](rxhttp_transport::Transport)
//!   that records requests and replays responses chunk by chunk
//! - [`fixtures`]: sample payloads and chunking helpers
//! - [`assertions`]: checks on the errors a request surfaces
//!
//! # Example
//!
//! ```rust
//! use rxhttp_testing::{StubResponse, StubTransport, fixtures};
//!
//! let body = fixtures::ndjson(&fixtures::changes(3));
//! let stub = StubTransport::with_responses([
//!     StubResponse::chunks(fixtures::split_every(&body, 5)),
//!     StubResponse::refused("connection refused"),
//! ]);
//! assert_eq!(stub.remaining(), 2);
//! ```

#![deny(missing_docs)]

pub mod assertions;
pub mod fixtures;
pub mod stub;

// Re-export commonly used types
pub use assertions::{assert_connection_refused, assert_invalid_request, assert_server_error};
pub use fixtures::{change, changes, ndjson, sample_user, split_every};
pub use stub::{StubResponse, StubTransport};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::assertions::{
        assert_connection_refused, assert_invalid_request, assert_server_error,
    };
    pub use crate::fixtures::{change, changes, ndjson, sample_user, split_every};
    pub use crate::stub::{StubResponse, StubTransport};
}
