//! Persistence decorator backed by a background writer thread.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use tickbox_core::{TodoEvent, TodoState};
use tickbox_storage::{PersistedState, PersistenceAdapter};
use tracing::{debug, warn};

use crate::dispatch::{Dispatcher, Listener, SubscriptionId};

enum WriteCommand {
    /// Persisted data changed; write the latest committed state.
    Save,
    /// Acknowledge once every earlier command has been handled.
    Flush(Sender<()>),
}

struct Writer {
    commands: Sender<WriteCommand>,
    handle: JoinHandle<()>,
}

/// Writes `{tasks, filter}` after every committed mutation of the wrapped dispatcher.
///
/// Mutations never wait on storage: they only enqueue a save request. The
/// writer reads the newest state when it gets to the request, so bursts of
/// mutations collapse into a single write and a late write never overwrites a
/// newer one. Write failures are logged and dropped.
pub struct Persisted<D: Dispatcher + 'static> {
    inner: Arc<D>,
    adapter: Arc<PersistenceAdapter>,
    writer: Option<Writer>,
}

impl<D: Dispatcher + 'static> Persisted<D> {
    /// Wrap `inner`, persisting through `adapter`.
    ///
    /// Falls back to synchronous writes when the writer thread cannot be spawned.
    pub fn new(inner: D, adapter: PersistenceAdapter) -> Self {
        let inner = Arc::new(inner);
        let adapter = Arc::new(adapter);
        let (commands, receiver) = mpsc::channel();
        let source = Arc::clone(&inner);
        let sink = Arc::clone(&adapter);
        let spawned = thread::Builder::new()
            .name("tickbox-persist".into())
            .spawn(move || run_writer(&*source, &sink, &receiver));
        let writer = match spawned {
            Ok(handle) => Some(Writer { commands, handle }),
            Err(err) => {
                warn!(error = %err, "could not start persistence writer, writing inline");
                None
            }
        };
        Self {
            inner,
            adapter,
            writer,
        }
    }

    /// Adapter used for writes.
    #[must_use]
    pub fn adapter(&self) -> &PersistenceAdapter {
        &self.adapter
    }

    fn request_save(&self) {
        let queued = self
            .writer
            .as_ref()
            .is_some_and(|writer| writer.commands.send(WriteCommand::Save).is_ok());
        if !queued {
            write_state(&self.adapter, &self.inner.state());
        }
    }
}

impl<D: Dispatcher + 'static> Dispatcher for Persisted<D> {
    fn state(&self) -> Arc<TodoState> {
        self.inner.state()
    }

    fn dispatch(&self, event: TodoEvent) -> Option<Arc<TodoState>> {
        let persist = event.touches_persisted_state();
        let committed = self.inner.dispatch(event)?;
        if persist {
            self.request_save();
        }
        Some(committed)
    }

    fn subscribe(&self, listener: Listener) -> SubscriptionId {
        self.inner.subscribe(listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.unsubscribe(id)
    }

    fn flush(&self) {
        self.inner.flush();
        let Some(writer) = &self.writer else {
            return;
        };
        let (ack, done) = mpsc::channel();
        if writer.commands.send(WriteCommand::Flush(ack)).is_ok() {
            // A closed ack channel means the writer is gone; nothing left to wait for.
            done.recv().ok();
        }
    }
}

impl<D: Dispatcher + 'static> Drop for Persisted<D> {
    fn drop(&mut self) {
        if let Some(Writer { commands, handle }) = self.writer.take() {
            drop(commands);
            if handle.join().is_err() {
                warn!("persistence writer panicked");
            }
        }
    }
}

fn run_writer<D: Dispatcher + ?Sized>(source: &D, adapter: &PersistenceAdapter, commands: &Receiver<WriteCommand>) {
    while let Ok(first) = commands.recv() {
        let mut dirty = false;
        let mut acks = Vec::new();
        for command in std::iter::once(first).chain(commands.try_iter()) {
            match command {
                WriteCommand::Save => dirty = true,
                WriteCommand::Flush(ack) => acks.push(ack),
            }
        }
        if dirty {
            write_state(adapter, &source.state());
        }
        for ack in acks {
            ack.send(()).ok();
        }
    }
    debug!(key = adapter.key(), "persistence writer stopped");
}

fn write_state(adapter: &PersistenceAdapter, state: &TodoState) {
    if let Err(err) = adapter.save(&PersistedState::from(state)) {
        warn!(key = adapter.key(), error = %err, "failed to persist state");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::CoreDispatcher;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tickbox_core::{Filter, Task, TaskName, clock};
    use tickbox_storage::{KeyValueStorage, MemoryStorage, StorageError, StorageMedium};

    #[derive(Clone, Default)]
    struct CountingStorage {
        inner: Arc<MemoryStorage>,
        writes: Arc<AtomicUsize>,
    }

    impl KeyValueStorage for CountingStorage {
        fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get_item(key)
        }

        fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.set_item(key, value)
        }

        fn remove_item(&self, key: &str) -> Result<(), StorageError> {
            self.inner.remove_item(key)
        }
    }

    struct FailingStorage;

    impl KeyValueStorage for FailingStorage {
        fn get_item(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Ok(None)
        }

        fn set_item(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("quota exceeded".into()))
        }

        fn remove_item(&self, _key: &str) -> Result<(), StorageError> {
            Ok(())
        }
    }

    fn persisted(storage: CountingStorage) -> Persisted<CoreDispatcher> {
        let adapter = PersistenceAdapter::with_storage("tasks", StorageMedium::Memory, storage);
        Persisted::new(CoreDispatcher::new(TodoState::default()), adapter)
    }

    fn add(dispatcher: &impl Dispatcher, name: &str) {
        let name = TaskName::new(name).unwrap_or_else(|| panic!("valid name"));
        let task = Task::new(name, None, clock::now());
        dispatcher.dispatch(TodoEvent::TaskAdded { task });
    }

    #[test]
    fn flush_makes_latest_state_readable() {
        let storage = CountingStorage::default();
        let store = persisted(storage.clone());
        add(&store, "Buy milk");
        store.dispatch(TodoEvent::FilterSet { filter: Filter::Active });
        store.flush();

        let saved = store
            .adapter()
            .try_load()
            .unwrap_or_else(|err| panic!("{err}"))
            .unwrap_or_else(|| panic!("state should be persisted"));
        assert_eq!(saved.tasks.len(), 1);
        assert_eq!(saved.filter, Filter::Active);
    }

    #[test]
    fn no_ops_and_edit_mode_do_not_write() {
        let storage = CountingStorage::default();
        let store = persisted(storage.clone());
        store.dispatch(TodoEvent::CompletedCleared);
        store.dispatch(TodoEvent::EditingCancelled);
        store.flush();
        assert_eq!(storage.writes.load(Ordering::SeqCst), 0);

        add(&store, "Walk dog");
        let id = store.state().tasks()[0].id().clone();
        store.flush();
        let after_add = storage.writes.load(Ordering::SeqCst);
        assert_eq!(after_add, 1);

        store.dispatch(TodoEvent::EditingStarted { id });
        store.flush();
        assert_eq!(storage.writes.load(Ordering::SeqCst), after_add);
    }

    #[test]
    fn drop_drains_pending_writes() {
        let storage = CountingStorage::default();
        {
            let store = persisted(storage.clone());
            for name in ["a", "b", "c"] {
                add(&store, name);
            }
        }
        let writes = storage.writes.load(Ordering::SeqCst);
        assert!((1..=3).contains(&writes), "writes = {writes}");
        let raw = storage
            .inner
            .get_item("tasks")
            .unwrap_or_else(|err| panic!("{err}"))
            .unwrap_or_else(|| panic!("record should exist"));
        let state = tickbox_storage::decode(&raw).unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(state.tasks.len(), 3);
    }

    #[test]
    fn write_failures_leave_memory_state_intact() {
        let adapter = PersistenceAdapter::with_storage("tasks", StorageMedium::Memory, FailingStorage);
        let store = Persisted::new(CoreDispatcher::new(TodoState::default()), adapter);
        add(&store, "still here");
        store.flush();
        add(&store, "and here");
        store.flush();
        assert_eq!(store.state().tasks().len(), 2);
    }
}
