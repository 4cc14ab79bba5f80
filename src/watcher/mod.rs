//! Watch registry and lifecycle dispatcher.
//!
//! Callers register interest in a property of an entity type. The persistence
//! engine then drives the watcher through [`LifecycleListener`](crate::session::LifecycleListener),
//! and every matching registration whose filters pass receives a
//! [`PropertyChangeset`](crate::changeset::PropertyChangeset).

/// Lifecycle event dispatch.
pub mod dispatcher;
/// Watch options and registry configuration.
pub mod options;
/// Registration bookkeeping.
pub mod registry;
/// Property arguments.
pub mod selector;

pub use options::{WatchOptions, WatchOverrides, WatcherConfig};
pub use registry::{WatchCallback, Watcher};
pub use selector::PropertySelector;
