//! Cooperative cancellation for in-flight calls.
//!
//! An [`AbortController`] owns the right to abort; every party that needs to
//! observe the abort holds a cloned [`AbortSignal`]. A controller aborts at
//! most once and is never reset: callers that want to issue another call
//! create a fresh controller, so an old abort can never reach a new call.
//!
//! ```rust
//! use rxhttp_transport::AbortController;
//!
//! let controller = AbortController::new();
//! let signal = controller.signal();
//! assert!(!signal.is_aborted());
//!
//! controller.abort();
//! assert!(signal.is_aborted());
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use event_listener::Event;

struct AbortState {
    aborted: AtomicBool,
    event: Event,
}

/// The observing half of an abort controller.
#[derive(Clone)]
pub struct AbortSignal {
    state: Arc<AbortState>,
}

impl AbortSignal {
    fn new() -> Self {
        Self {
            state: Arc::new(AbortState {
                aborted: AtomicBool::new(false),
                event: Event::new(),
            }),
        }
    }

    /// Check if abort has been requested.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.state.aborted.load(Ordering::Acquire)
    }

    /// Wait until abort is requested.
    ///
    /// Resolves immediately if the signal already fired.
    pub async fn aborted(&self) {
        loop {
            if self.is_aborted() {
                return;
            }
            // Register before re-checking so an abort between the two checks
            // still wakes us.
            let listener = self.state.event.listen();
            if self.is_aborted() {
                return;
            }
            listener.await;
        }
    }

    /// Owned variant of [`aborted`](Self::aborted), for combinators that need
    /// a `'static` future.
    pub fn into_aborted(self) -> impl Future<Output = ()> + Send + 'static {
        async move { self.aborted().await }
    }

    /// Whether two signals belong to the same controller.
    #[must_use]
    pub fn same_as(&self, other: &AbortSignal) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl fmt::Debug for AbortSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbortSignal")
            .field("aborted", &self.is_aborted())
            .finish()
    }
}

/// The owning half: aborts every signal handed out.
#[derive(Debug)]
pub struct AbortController {
    signal: AbortSignal,
}

impl AbortController {
    /// Create a controller that has not fired.
    #[must_use]
    pub fn new() -> Self {
        Self {
            signal: AbortSignal::new(),
        }
    }

    /// A signal tied to this controller.
    #[must_use]
    pub fn signal(&self) -> AbortSignal {
        self.signal.clone()
    }

    /// Fire the abort. Idempotent.
    pub fn abort(&self) {
        if !self.signal.state.aborted.swap(true, Ordering::AcqRel) {
            self.signal.state.event.notify(usize::MAX);
        }
    }

    /// Check if this controller has fired.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.signal.is_aborted()
    }
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_aborted_wakes_waiters() {
        let controller = AbortController::new();
        let signal = controller.signal();

        let waiter = tokio::spawn(async move {
            signal.aborted().await;
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        controller.abort();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
    }

    #[tokio::test]
    async fn test_aborted_resolves_immediately_after_fire() {
        let controller = AbortController::new();
        controller.abort();
        controller.abort();
        tokio::time::timeout(Duration::from_millis(100), controller.signal().aborted())
            .await
            .expect("already-fired signal should resolve");
    }

    #[test]
    fn test_fresh_controller_is_independent() {
        let first = AbortController::new();
        let stale = first.signal();
        first.abort();

        let second = AbortController::new();
        assert!(stale.is_aborted());
        assert!(!second.is_aborted());
        assert!(!stale.same_as(&second.signal()));
        assert!(stale.same_as(&first.signal()));
    }
}
