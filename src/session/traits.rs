//! Persistence engine boundary.
//!
//! These traits define what the watcher consumes from an object-relational
//! persistence engine: per-instance tracking state, the change ledger for
//! tracked instances, field metadata, and concrete type resolution. The
//! engine drives the watcher through [`LifecycleListener`].

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::entity::{Entity, EntityType};
use crate::error::WatchResult;
use crate::schema::EntitySchema;
use crate::value::Value;

/// Lifecycle operation that triggered a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// First write of a not-yet-tracked instance.
    Insert,
    /// Write of an instance the engine already tracks.
    Update,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert => write!(f, "insert"),
            Self::Update => write!(f, "update"),
        }
    }
}

/// Tracking state of an entity instance within the persistence engine.
///
/// The watcher only distinguishes `New` from everything else. `Detached` and
/// `Removed` exist so that a [`TrackingState`] backed by a full engine can
/// report its states faithfully; the in-memory session only produces `New`
/// and `Managed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityState {
    /// Never recorded by the engine. Its first write is an insert.
    New,
    /// Recorded and snapshotted; changes are diffed against the snapshot.
    Managed,
    /// Previously recorded, no longer attached to the session.
    Detached,
    /// Scheduled for removal.
    Removed,
}

/// Prior and current value of one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub old: Value,
    pub new: Value,
}

impl FieldChange {
    #[must_use]
    pub fn new(old: impl Into<Value>, new: impl Into<Value>) -> Self {
        Self {
            old: old.into(),
            new: new.into(),
        }
    }

    /// True when old and new are not strictly identical.
    #[must_use]
    pub fn is_change(&self) -> bool {
        self.old != self.new
    }
}

/// Field name to (old, new) mapping for one entity instance.
///
/// Only fields whose values differ belong here; [`ChangeData::insert`]
/// drops identical pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeData(IndexMap<String, FieldChange>);

impl ChangeData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a field change. Returns false if old and new are identical and
    /// nothing was recorded.
    pub fn insert(&mut self, field: impl Into<String>, change: FieldChange) -> bool {
        if !change.is_change() {
            return false;
        }
        self.0.insert(field.into(), change);
        true
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldChange> {
        self.0.get(field)
    }

    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Names of changed fields.
    pub fn fields(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, FieldChange)> for ChangeData {
    fn from_iter<I: IntoIterator<Item = (K, FieldChange)>>(iter: I) -> Self {
        let mut data = Self::new();
        for (field, change) in iter {
            data.insert(field, change);
        }
        data
    }
}

/// Per-instance bookkeeping of the persistence engine.
pub trait TrackingState {
    /// Tracking state of `entity`.
    fn entity_state(&self, entity: &dyn Entity) -> EntityState;

    /// Change ledger of a tracked instance: only fields whose value differs
    /// from the engine's snapshot. Undefined for `EntityState::New`.
    fn change_data(&self, entity: &dyn Entity) -> ChangeData;
}

/// Handle to the persistence session owning an entity instance.
pub trait Session {
    /// Tracking state of the session.
    fn tracking_state(&self) -> &dyn TrackingState;

    /// Field metadata for an entity type.
    fn schema(&self, entity_type: &EntityType) -> Option<&EntitySchema>;

    /// Concrete runtime type of `entity`.
    ///
    /// Engines that hand out proxy types override this to return the real
    /// entity type the application registered watches against.
    fn resolve_type(&self, entity: &dyn Entity) -> EntityType {
        entity.entity_type()
    }
}

/// Event handle passed to lifecycle hooks.
#[derive(Clone, Copy)]
pub struct LifecycleEvent<'a> {
    entity: &'a dyn Entity,
    session: &'a dyn Session,
}

impl<'a> LifecycleEvent<'a> {
    #[must_use]
    pub fn new(entity: &'a dyn Entity, session: &'a dyn Session) -> Self {
        Self { entity, session }
    }

    /// The affected entity instance.
    #[must_use]
    pub fn entity(&self) -> &'a dyn Entity {
        self.entity
    }

    /// The session owning the entity.
    #[must_use]
    pub fn session(&self) -> &'a dyn Session {
        self.session
    }
}

impl fmt::Debug for LifecycleEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleEvent")
            .field("entity", &self.entity)
            .finish_non_exhaustive()
    }
}

/// Hooks fired by the persistence engine around inserts and updates.
///
/// Errors abort the engine's current write and must be surfaced to its caller.
pub trait LifecycleListener: Send + Sync {
    /// An entity is about to be, or was, inserted.
    fn on_insert(&self, event: &LifecycleEvent<'_>) -> WatchResult<()>;

    /// An entity is about to be, or was, updated.
    fn on_update(&self, event: &LifecycleEvent<'_>) -> WatchResult<()>;
}
