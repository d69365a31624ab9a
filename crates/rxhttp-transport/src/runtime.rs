//! Runtime helpers.
//!
//! The client spawns one task per dispatched call and the stub transport
//! paces scripted chunks with timers. Both go through this module so the
//! executor shows up in one place.

use std::future::Future;
use std::pin::pin;
use std::time::Duration;

use futures::future::{self, Either};

use crate::abort::AbortSignal;

/// An async mutex that does not tie callers to an executor.
pub use async_lock::Mutex as AsyncMutex;

/// Handle to a spawned task.
pub type TaskHandle = tokio::task::JoinHandle<()>;

/// Spawn a task on the current Tokio runtime.
///
/// # Panics
///
/// Panics when called outside a Tokio runtime.
pub fn spawn<F>(future: F) -> TaskHandle
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(future)
}

/// Sleep for the specified duration.
pub async fn sleep(duration: Duration) {
    tokio::time::sleep(duration).await;
}

/// Sleep for `duration` unless `signal` fires first.
///
/// Returns `true` when the full duration elapsed and `false` when the sleep
/// was cut short by an abort.
pub async fn sleep_or_abort(duration: Duration, signal: &AbortSignal) -> bool {
    match future::select(pin!(sleep(duration)), pin!(signal.aborted())).await {
        Either::Left(((), _)) => true,
        Either::Right(((), _)) => false,
    }
}

/// Run `future` to completion unless `signal` fires first.
///
/// Returns `None` when aborted. The future is dropped at that point.
pub async fn abortable<F, T>(signal: &AbortSignal, future: F) -> Option<T>
where
    F: Future<Output = T>,
{
    if signal.is_aborted() {
        return None;
    }
    match future::select(pin!(future), pin!(signal.aborted())).await {
        Either::Left((value, _)) => Some(value),
        Either::Right(((), _)) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abort::AbortController;

    #[tokio::test]
    async fn test_abortable_completes() {
        let controller = AbortController::new();
        let value = abortable(&controller.signal(), async { 42 }).await;
        assert_eq!(value, Some(42));
    }

    #[tokio::test]
    async fn test_abortable_drops_future_on_abort() {
        let controller = AbortController::new();
        let signal = controller.signal();

        let pending = spawn(async move {
            let result = abortable(&signal, future::pending::<()>()).await;
            assert!(result.is_none());
        });

        sleep(Duration::from_millis(10)).await;
        controller.abort();
        tokio::time::timeout(Duration::from_secs(1), pending)
            .await
            .expect("abort should resolve the pending future")
            .unwrap();
    }

    #[tokio::test]
    async fn test_abortable_with_fired_signal_skips_future() {
        let controller = AbortController::new();
        controller.abort();
        let value = abortable(&controller.signal(), async { 1 }).await;
        assert_eq!(value, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_or_abort() {
        let controller = AbortController::new();
        assert!(sleep_or_abort(Duration::from_millis(5), &controller.signal()).await);

        controller.abort();
        assert!(!sleep_or_abort(Duration::from_secs(60), &controller.signal()).await);
    }
}
