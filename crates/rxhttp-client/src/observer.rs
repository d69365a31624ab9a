//! Push notifications from a request to its consumers.
//!
//! A request delivers its results as [`Notification`]s: any number of values
//! followed by at most one terminal notification (error or completion).
//! Consumers hold an [`Observable`] and either pull from it
//! ([`Observable::next`], [`Observable::into_stream`]) or push into an
//! [`Observer`] with [`Observable::subscribe`].
//!
//! The request side writes through an emitter that is tied to one dispatch.
//! Once that dispatch is superseded or cancelled its emitter goes quiet, so a
//! stale call can never reach the consumer.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures::stream::{self, Stream, StreamExt};
use rxhttp_core::error::RxHttpError;
use rxhttp_transport::AbortSignal;
use rxhttp_transport::runtime::{self, AsyncMutex, TaskHandle};
use tracing::trace;

/// One event delivered to a consumer.
#[derive(Debug)]
pub enum Notification<T> {
    /// A value.
    Next(T),
    /// The request failed. Terminal.
    Error(RxHttpError),
    /// The request finished. Terminal.
    Complete,
}

impl<T> Notification<T> {
    /// Whether nothing follows this notification.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Next(_))
    }
}

/// Receives the notifications of a subscription.
///
/// Only [`next`](Observer::next) is required. Callbacks run on the
/// subscription's task, one at a time and in order.
pub trait Observer<T>: Send + 'static {
    /// Handle a value.
    fn next(&mut self, value: T);

    /// Handle a failure. Nothing follows.
    fn error(&mut self, error: RxHttpError) {
        trace!(%error, "unhandled observer error");
    }

    /// Handle completion. Nothing follows.
    fn complete(&mut self) {}
}

/// Observer built from closures.
struct FnObserver<N, E, C> {
    on_next: N,
    on_error: Option<E>,
    on_complete: Option<C>,
}

impl<T, N, E, C> Observer<T> for FnObserver<N, E, C>
where
    N: FnMut(T) + Send + 'static,
    E: FnOnce(RxHttpError) + Send + 'static,
    C: FnOnce() + Send + 'static,
{
    fn next(&mut self, value: T) {
        (self.on_next)(value);
    }

    fn error(&mut self, error: RxHttpError) {
        if let Some(on_error) = self.on_error.take() {
            on_error(error);
        }
    }

    fn complete(&mut self) {
        if let Some(on_complete) = self.on_complete.take() {
            on_complete();
        }
    }
}

// =============================================================================
// Observable
// =============================================================================

struct Shared<T> {
    receiver: AsyncMutex<UnboundedReceiver<Notification<T>>>,
    closed: AtomicBool,
}

/// The consuming end of a request's notifications.
///
/// Cloning is cheap; clones share one queue, so each notification is seen by
/// exactly one consumer.
pub struct Observable<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl<T> Observable<T> {
    fn channel() -> (UnboundedSender<Notification<T>>, Self) {
        let (sender, receiver) = mpsc::unbounded();
        let observable = Self {
            shared: Arc::new(Shared {
                receiver: AsyncMutex::new(receiver),
                closed: AtomicBool::new(false),
            }),
        };
        (sender, observable)
    }

    /// Whether a terminal notification has been consumed, or the producing
    /// request is gone.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Whether two observables share one queue.
    #[must_use]
    pub fn same_as(&self, other: &Observable<T>) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Wait for the next raw notification.
    ///
    /// Returns `None` once closed.
    pub async fn recv(&self) -> Option<Notification<T>> {
        if self.is_closed() {
            return None;
        }
        let mut receiver = self.shared.receiver.lock().await;
        if self.is_closed() {
            return None;
        }
        let notification = receiver.next().await;
        match &notification {
            Some(Notification::Next(_)) => {}
            Some(_) | None => self.shared.closed.store(true, Ordering::Release),
        }
        notification
    }

    /// Wait for the next value.
    ///
    /// Returns `Some(Err(_))` once on failure and `None` after completion.
    pub async fn next(&self) -> Option<Result<T, RxHttpError>> {
        match self.recv().await? {
            Notification::Next(value) => Some(Ok(value)),
            Notification::Error(error) => Some(Err(error)),
            Notification::Complete => None,
        }
    }

    /// Consume as a stream of results.
    pub fn into_stream(self) -> impl Stream<Item = Result<T, RxHttpError>> + Send
    where
        T: Send,
    {
        stream::unfold(self, |observable| async move {
            let item = observable.next().await?;
            Some((item, observable))
        })
    }
}

impl<T: Send + 'static> Observable<T> {
    /// Subscribe with closures.
    ///
    /// `on_error` and `on_complete` are called at most once, and never both.
    pub fn subscribe<N, E, C>(&self, on_next: N, on_error: E, on_complete: C) -> Subscription
    where
        N: FnMut(T) + Send + 'static,
        E: FnOnce(RxHttpError) + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        self.subscribe_with(FnObserver {
            on_next,
            on_error: Some(on_error),
            on_complete: Some(on_complete),
        })
    }

    /// Subscribe with an [`Observer`].
    ///
    /// The observer is driven from a spawned task until a terminal
    /// notification arrives or the subscription is cancelled.
    pub fn subscribe_with<O: Observer<T>>(&self, mut observer: O) -> Subscription {
        let observable = self.clone();
        let handle = runtime::spawn(async move {
            while let Some(notification) = observable.recv().await {
                match notification {
                    Notification::Next(value) => observer.next(value),
                    Notification::Error(error) => {
                        observer.error(error);
                        break;
                    }
                    Notification::Complete => {
                        observer.complete();
                        break;
                    }
                }
            }
        });
        Subscription { handle }
    }
}

/// A running subscription.
///
/// Dropping it leaves the subscription running; call
/// [`unsubscribe`](Self::unsubscribe) to stop it.
#[derive(Debug)]
pub struct Subscription {
    handle: TaskHandle,
}

impl Subscription {
    /// Stop delivering notifications to the observer.
    pub fn unsubscribe(&self) {
        self.handle.abort();
    }

    /// Whether the subscription has ended.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the subscription to end.
    pub async fn closed(self) {
        // A cancelled task is the only possible join error here.
        let _ = self.handle.await;
    }
}

// =============================================================================
// Binding
// =============================================================================

struct BindingState<T> {
    generation: u64,
    sender: UnboundedSender<Notification<T>>,
    observable: Observable<T>,
    terminated: bool,
    in_flight: bool,
}

impl<T> BindingState<T> {
    /// Attach a fresh observable and invalidate every outstanding emitter.
    fn rebind(&mut self) {
        let (sender, observable) = Observable::channel();
        self.sender = sender;
        self.observable = observable;
        self.generation += 1;
        self.terminated = false;
        self.in_flight = false;
    }
}

/// The request side of the current observer binding.
pub(crate) struct Binding<T> {
    state: Arc<Mutex<BindingState<T>>>,
}

impl<T> Binding<T> {
    pub(crate) fn new() -> Self {
        let (sender, observable) = Observable::channel();
        Self {
            state: Arc::new(Mutex::new(BindingState {
                generation: 0,
                sender,
                observable,
                terminated: false,
                in_flight: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BindingState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn observable(&self) -> Observable<T> {
        self.lock().observable.clone()
    }

    pub(crate) fn is_in_flight(&self) -> bool {
        self.lock().in_flight
    }

    /// Start a new dispatch. Emitters of earlier dispatches go quiet. A
    /// binding that already delivered a terminal notification is replaced.
    pub(crate) fn begin(&self, signal: AbortSignal) -> Emitter<T> {
        let mut state = self.lock();
        if state.terminated {
            state.rebind();
        }
        state.generation += 1;
        state.in_flight = true;
        Emitter {
            state: Arc::clone(&self.state),
            generation: state.generation,
            signal,
        }
    }

    /// Complete the current observer unless it already terminated, then
    /// attach a fresh one.
    pub(crate) fn complete_and_rebind(&self) {
        let mut state = self.lock();
        if !state.terminated {
            // A closed channel means nobody is listening any more.
            let _ = state.sender.unbounded_send(Notification::Complete);
        }
        state.rebind();
    }

    /// Silence outstanding emitters without notifying the observer.
    pub(crate) fn release(&self) {
        let mut state = self.lock();
        state.generation += 1;
        state.in_flight = false;
    }
}

/// Write access to the binding for one dispatch.
pub(crate) struct Emitter<T> {
    state: Arc<Mutex<BindingState<T>>>,
    generation: u64,
    signal: AbortSignal,
}

impl<T> Emitter<T> {
    fn lock(&self) -> MutexGuard<'_, BindingState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deliver a notification if this dispatch is still the current one.
    ///
    /// Returns `false` when the notification was suppressed.
    fn emit(&self, notification: Notification<T>) -> bool {
        let mut state = self.lock();
        if self.signal.is_aborted() || state.generation != self.generation || state.terminated {
            return false;
        }
        if notification.is_terminal() {
            state.terminated = true;
            state.in_flight = false;
        }
        state.sender.unbounded_send(notification).is_ok()
    }

    pub(crate) fn next(&self, value: T) -> bool {
        self.emit(Notification::Next(value))
    }

    pub(crate) fn error(&self, error: RxHttpError) -> bool {
        self.emit(Notification::Error(error))
    }

    pub(crate) fn complete(&self) -> bool {
        self.emit(Notification::Complete)
    }
}

impl<T> Drop for Emitter<T> {
    fn drop(&mut self) {
        let mut state = self.lock();
        if state.generation == self.generation {
            state.in_flight = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rxhttp_transport::AbortController;
    use std::sync::Mutex as StdMutex;

    #[tokio::test]
    async fn test_values_then_completion() {
        let binding = Binding::new();
        let controller = AbortController::new();
        let emitter = binding.begin(controller.signal());
        let observable = binding.observable();

        assert!(emitter.next(1));
        assert!(emitter.next(2));
        assert!(emitter.complete());
        assert!(!emitter.next(3));

        assert_eq!(observable.next().await.unwrap().unwrap(), 1);
        assert_eq!(observable.next().await.unwrap().unwrap(), 2);
        assert!(observable.next().await.is_none());
        assert!(observable.is_closed());
    }

    #[tokio::test]
    async fn test_superseded_emitter_is_silent() {
        let binding = Binding::new();
        let first = AbortController::new();
        let second = AbortController::new();

        let stale = binding.begin(first.signal());
        let current = binding.begin(second.signal());

        assert!(!stale.next("stale"));
        assert!(current.next("fresh"));

        let observable = binding.observable();
        assert_eq!(observable.next().await.unwrap().unwrap(), "fresh");
    }

    #[tokio::test]
    async fn test_aborted_emitter_is_silent() {
        let binding = Binding::<u8>::new();
        let controller = AbortController::new();
        let emitter = binding.begin(controller.signal());

        controller.abort();
        assert!(!emitter.next(1));
        assert!(!emitter.complete());
        assert!(binding.is_in_flight());

        drop(emitter);
        assert!(!binding.is_in_flight());
    }

    #[tokio::test]
    async fn test_complete_and_rebind() {
        let binding = Binding::<u8>::new();
        let before = binding.observable();

        binding.complete_and_rebind();
        let after = binding.observable();

        assert!(!before.same_as(&after));
        assert!(before.next().await.is_none());
        assert!(!after.is_closed());
    }

    #[tokio::test]
    async fn test_begin_after_terminal_attaches_fresh_observable() {
        let binding = Binding::<u8>::new();
        let controller = AbortController::new();
        let first = binding.observable();

        let emitter = binding.begin(controller.signal());
        emitter.error(RxHttpError::connection_refused("refused"));
        drop(emitter);

        let _next = binding.begin(controller.signal());
        assert!(!binding.observable().same_as(&first));
        assert!(first.next().await.unwrap().is_err());
        assert!(first.next().await.is_none());
    }

    #[tokio::test]
    async fn test_subscribe_routes_callbacks() {
        let binding = Binding::new();
        let controller = AbortController::new();
        let emitter = binding.begin(controller.signal());

        let seen = Arc::new(StdMutex::new(Vec::new()));
        let completed = Arc::new(AtomicBool::new(false));

        let subscription = binding.observable().subscribe(
            {
                let seen = Arc::clone(&seen);
                move |value: u32| seen.lock().unwrap().push(value)
            },
            |error| panic!("unexpected error: {error}"),
            {
                let completed = Arc::clone(&completed);
                move || completed.store(true, Ordering::SeqCst)
            },
        );

        emitter.next(11);
        emitter.next(12);
        emitter.complete();

        subscription.closed().await;
        assert_eq!(*seen.lock().unwrap(), vec![11, 12]);
        assert!(completed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_into_stream_ends_after_error() {
        let binding = Binding::<u8>::new();
        let controller = AbortController::new();
        let emitter = binding.begin(controller.signal());
        emitter.next(1);
        emitter.error(RxHttpError::server(500, None));

        let items: Vec<_> = binding.observable().into_stream().collect().await;
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert_eq!(items[1].as_ref().unwrap_err().status(), Some(500));
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let binding = Binding::<u8>::new();
        let subscription = binding.observable().subscribe(|_| {}, |_| {}, || {});

        subscription.unsubscribe();
        tokio::time::timeout(std::time::Duration::from_secs(1), async {
            while !subscription.is_closed() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
    }
}
