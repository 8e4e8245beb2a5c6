//! Event dispatch: the plain store core and the trait decorators wrap.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use tickbox_core::{TodoEvent, TodoState};

/// Callback invoked with every newly committed state.
pub type Listener = Arc<dyn Fn(&Arc<TodoState>) + Send + Sync>;

/// Handle returned by [`Dispatcher::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Applies events to shared state.
///
/// [`CoreDispatcher`] owns the state; decorators such as
/// [`Persisted`](crate::Persisted) and [`Logged`](crate::Logged) wrap another
/// dispatcher and add one concern each.
pub trait Dispatcher: Send + Sync {
    /// Current state.
    fn state(&self) -> Arc<TodoState>;

    /// Apply `event` atomically; returns the committed state, or `None` when the
    /// event was a no-op.
    fn dispatch(&self, event: TodoEvent) -> Option<Arc<TodoState>>;

    /// Register a change listener.
    fn subscribe(&self, listener: Listener) -> SubscriptionId;

    /// Remove a listener; returns whether it was registered.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;

    /// Wait for side effects queued by earlier dispatches.
    fn flush(&self) {}
}

impl<D: Dispatcher + ?Sized> Dispatcher for Box<D> {
    fn state(&self) -> Arc<TodoState> {
        (**self).state()
    }

    fn dispatch(&self, event: TodoEvent) -> Option<Arc<TodoState>> {
        (**self).dispatch(event)
    }

    fn subscribe(&self, listener: Listener) -> SubscriptionId {
        (**self).subscribe(listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        (**self).unsubscribe(id)
    }

    fn flush(&self) {
        (**self).flush();
    }
}

pub(crate) fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Committed states waiting to reach listeners, in commit order.
#[derive(Default)]
struct Outbox {
    queue: VecDeque<Arc<TodoState>>,
    delivering: bool,
}

/// Clears `delivering` if a listener panics mid-delivery.
struct DeliveryGuard<'a>(&'a Mutex<Outbox>);

impl Drop for DeliveryGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            let mut outbox = guard(self.0);
            outbox.delivering = false;
            outbox.queue.clear();
        }
    }
}

/// Owner of the canonical state and the listener list.
///
/// Listeners see committed states in commit order, one delivery at a time,
/// even when several threads dispatch concurrently. A listener may dispatch;
/// the resulting state is delivered after the current round finishes.
pub struct CoreDispatcher {
    state: Mutex<Arc<TodoState>>,
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
    outbox: Mutex<Outbox>,
    next_subscription: AtomicU64,
}

impl CoreDispatcher {
    /// Start from `initial`.
    #[must_use]
    pub fn new(initial: TodoState) -> Self {
        Self {
            state: Mutex::new(Arc::new(initial)),
            listeners: Mutex::new(Vec::new()),
            outbox: Mutex::new(Outbox::default()),
            next_subscription: AtomicU64::new(0),
        }
    }

    // Whoever finds the outbox idle drains it; everyone else only enqueues.
    fn deliver(&self) {
        {
            let mut outbox = guard(&self.outbox);
            if outbox.delivering {
                return;
            }
            outbox.delivering = true;
        }
        let _reset = DeliveryGuard(&self.outbox);
        loop {
            let state = {
                let mut outbox = guard(&self.outbox);
                let Some(state) = outbox.queue.pop_front() else {
                    outbox.delivering = false;
                    return;
                };
                state
            };
            let listeners: Vec<Listener> = guard(&self.listeners)
                .iter()
                .map(|(_, listener)| Arc::clone(listener))
                .collect();
            for listener in listeners {
                listener(&state);
            }
        }
    }
}

impl Dispatcher for CoreDispatcher {
    fn state(&self) -> Arc<TodoState> {
        Arc::clone(&guard(&self.state))
    }

    fn dispatch(&self, event: TodoEvent) -> Option<Arc<TodoState>> {
        let committed = {
            let mut current = guard(&self.state);
            let next = Arc::new(current.apply(&event)?);
            *current = Arc::clone(&next);
            // Enqueue under the state lock so queue order is commit order.
            guard(&self.outbox).queue.push_back(Arc::clone(&next));
            next
        };

        // Listeners run outside the state lock so they may read or dispatch.
        self.deliver();
        Some(committed)
    }

    fn subscribe(&self, listener: Listener) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        guard(&self.listeners).push((id, listener));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = guard(&self.listeners);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }
}
