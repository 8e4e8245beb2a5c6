//! Transition tracing decorator.

use std::sync::Arc;

use tickbox_core::{TodoEvent, TodoState};
use tracing::{debug, debug_span};

use crate::dispatch::{Dispatcher, Listener, SubscriptionId};

/// Emits a `debug` record for every dispatched event, tagged with the store name.
pub struct Logged<D> {
    inner: D,
    name: String,
}

impl<D: Dispatcher> Logged<D> {
    /// Wrap `inner`, labelling records with `name`.
    pub fn new(inner: D, name: impl Into<String>) -> Self {
        Self {
            inner,
            name: name.into(),
        }
    }

    /// Store name used in records.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<D: Dispatcher> Dispatcher for Logged<D> {
    fn state(&self) -> Arc<TodoState> {
        self.inner.state()
    }

    fn dispatch(&self, event: TodoEvent) -> Option<Arc<TodoState>> {
        let kind = event.kind();
        let _span = debug_span!("dispatch", store = %self.name, event = kind).entered();
        let outcome = self.inner.dispatch(event);
        match &outcome {
            Some(state) => {
                let stats = state.stats();
                debug!(
                    tasks = stats.total,
                    completed = stats.completed,
                    filter = %state.filter(),
                    editing = state.editing_task_id().map(ToString::to_string),
                    "state committed"
                );
            }
            None => debug!("event left state unchanged"),
        }
        outcome
    }

    fn subscribe(&self, listener: Listener) -> SubscriptionId {
        self.inner.subscribe(listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.unsubscribe(id)
    }

    fn flush(&self) {
        self.inner.flush();
    }
}
