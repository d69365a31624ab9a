//! Assertions on errors a request surfaces.

use rxhttp_core::error::RxHttpError;

/// Assert that `error` is a server error with the given status.
///
/// # Panics
///
/// Panics if the error is of another kind or carries another status.
pub fn assert_server_error(error: &RxHttpError, status: u16) {
    match error.server_response() {
        Some(response) => assert_eq!(
            response.error_code, status,
            "Expected server error {status}, got {}",
            response.error_code
        ),
        None => panic!("Expected server error {status}, got {error:?}"),
    }
}

/// Assert that `error` reports a refused connection.
///
/// # Panics
///
/// Panics if the error is of another kind.
pub fn assert_connection_refused(error: &RxHttpError) {
    assert!(
        error.is_connection_refused(),
        "Expected connection refused, got {error:?}"
    );
}

/// Assert that `error` reports a request that could not be built.
///
/// # Panics
///
/// Panics if the error is of another kind.
pub fn assert_invalid_request(error: &RxHttpError) {
    assert!(
        matches!(error, RxHttpError::InvalidRequest { .. }),
        "Expected invalid request, got {error:?}"
    );
}
