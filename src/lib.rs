//! # entity-watcher - Property-level change detection for persistence lifecycles
//!
//! entity-watcher sits between an object-relational persistence engine and
//! application callbacks. A caller registers interest in one property of one
//! entity type; whenever an instance of that type is inserted or updated, and
//! optionally only when that property actually changed, the callback receives
//! a structured changeset: old value, new value, and for collection-valued
//! properties the exact elements added and removed.
//!
//! ## Core Concepts
//!
//! - **Entity**: an application record the persistence engine tracks
//! - **EntitySchema**: statically declared field metadata (defaults and accessors)
//! - **PropertyChangeset**: how one property changed during one operation
//! - **Watcher**: the registry of watches, driven by lifecycle hooks
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use entity_watcher::{InMemorySession, Watcher, WatcherConfig, WatchOverrides};
//!
//! let mut watcher = Watcher::new(WatcherConfig::default());
//! watcher.watch_collection("User", "roles", |changeset, _op, _user, _property| {
//!     for role in changeset.additions()?.values() {
//!         println!("granted {role}");
//!     }
//!     Ok(())
//! }, WatchOverrides::new())?;
//!
//! let mut session = InMemorySession::new();
//! session.register_schema(user_schema());
//! session.subscribe(Arc::new(watcher));
//! session.persist(User::new("John"));
//! session.flush()?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod changeset;
pub mod entity;
pub mod error;
pub mod schema;
pub mod session;
pub mod value;
pub mod watcher;

// Re-export primary types at crate root for convenience
pub use changeset::{
    ChangesetFactory, ChangesetKind, Collection, CollectionDiff, PropertyChangeset,
};
pub use entity::{Entity, EntityId, EntityType};
pub use error::{CallbackError, ChangesetError, ValidationError, WatchError, WatchResult};
pub use schema::{EntitySchema, FieldDescriptor};
pub use session::{
    ChangeData, EntityState, FieldChange, FlushStats, InMemorySession, LifecycleEvent,
    LifecycleListener, Operation, Session, TrackingState,
};
pub use value::{Key, Value};
pub use watcher::{
    PropertySelector, WatchCallback, WatchOptions, WatchOverrides, Watcher, WatcherConfig,
};
