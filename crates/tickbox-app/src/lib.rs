//! Application layer for tickbox.
//!
//! This crate wires the pure state transitions from `tickbox-core` to a store
//! handle with persistence, logging, change notification and memoized selectors.

pub mod config;
pub mod dispatch;
pub mod logging;
pub mod persist;
pub mod selector;
pub mod store;

// Re-exports for convenience
pub use config::{FileConfig, StoreConfig, StoreSection};
pub use dispatch::{CoreDispatcher, Dispatcher, Listener, SubscriptionId};
pub use logging::Logged;
pub use persist::Persisted;
pub use selector::{MemoSelector, shallow_equal};
pub use store::{TodoStore, create_store};
