//! In-memory persistence session.
//!
//! A minimal unit of work: an identity map of entities, one snapshot per
//! flushed entity, and lifecycle listeners fired on `flush`. It is intended
//! for embedded usage, tests, and as a reference for integrating a real
//! persistence engine.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::trace;

use crate::entity::{same_instance, Entity, EntityId, EntityType};
use crate::error::{ChangesetError, WatchResult};
use crate::schema::EntitySchema;
use crate::value::Value;

use super::traits::{
    ChangeData, EntityState, FieldChange, LifecycleEvent, LifecycleListener, Operation, Session,
    TrackingState,
};

/// Heap slot of one stored entity. The trailing byte keeps the allocation
/// non-empty, so every live slot has a distinct address even when `T` is
/// zero-sized, and instance identity by address stays sound.
#[repr(C)]
struct Slot<T> {
    entity: T,
    _anchor: u8,
}

trait Stored: Send + Sync {
    fn entity(&self) -> &(dyn Entity + 'static);
    fn entity_mut(&mut self) -> &mut (dyn Entity + 'static);
}

impl<T: Entity> Stored for Slot<T> {
    fn entity(&self) -> &(dyn Entity + 'static) {
        &self.entity
    }

    fn entity_mut(&mut self) -> &mut (dyn Entity + 'static) {
        &mut self.entity
    }
}

struct Tracked {
    slot: Box<dyn Stored>,
    snapshot: Option<IndexMap<String, Value>>,
}

impl Tracked {
    fn entity(&self) -> &(dyn Entity + 'static) {
        self.slot.entity()
    }
}

/// Counts of lifecycle events fired by one flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStats {
    pub inserted: usize,
    pub updated: usize,
}

/// Single-threaded in-memory session.
#[derive(Default)]
pub struct InMemorySession {
    schemas: HashMap<EntityType, EntitySchema>,
    entities: IndexMap<EntityId, Tracked>,
    pending: HashMap<EntityId, ChangeData>,
    listeners: Vec<Arc<dyn LifecycleListener>>,
}

impl InMemorySession {
    /// Create a new empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare field metadata for an entity type. Replaces any earlier schema.
    pub fn register_schema(&mut self, schema: EntitySchema) {
        self.schemas.insert(schema.entity_type().clone(), schema);
    }

    /// Attach a lifecycle listener. Listeners fire in subscription order.
    pub fn subscribe(&mut self, listener: Arc<dyn LifecycleListener>) {
        self.listeners.push(listener);
    }

    /// Schedule a new entity for insertion on the next flush.
    pub fn persist<T: Entity>(&mut self, entity: T) -> EntityId {
        let id = EntityId::new();
        self.entities.insert(
            id,
            Tracked {
                slot: Box::new(Slot { entity, _anchor: 0 }),
                snapshot: None,
            },
        );
        id
    }

    #[must_use]
    pub fn get<T: Entity>(&self, id: EntityId) -> Option<&T> {
        self.entities.get(&id).and_then(|t| t.entity().downcast_ref::<T>())
    }

    pub fn get_mut<T: Entity>(&mut self, id: EntityId) -> Option<&mut T> {
        self.entities
            .get_mut(&id)
            .and_then(|t| t.slot.entity_mut().downcast_mut::<T>())
    }

    /// Tracking state of the entity stored under `id`, if any.
    #[must_use]
    pub fn state_of(&self, id: EntityId) -> Option<EntityState> {
        self.entities.get(&id).map(|t| {
            if t.snapshot.is_some() {
                EntityState::Managed
            } else {
                EntityState::New
            }
        })
    }

    /// Write every pending change and fire lifecycle hooks.
    ///
    /// New entities fire `on_insert`; tracked entities fire `on_update` only
    /// when at least one field differs from the last flushed snapshot.
    /// Snapshots are refreshed only once every listener has succeeded.
    ///
    /// # Errors
    /// Returns the first listener error, or a changeset error if an entity has
    /// no registered schema. The session is left as it was before the flush.
    pub fn flush(&mut self) -> WatchResult<FlushStats> {
        let plan = self.compute_plan()?;

        let listeners = self.listeners.clone();
        let fired = self.fire(&plan, &listeners);
        if let Err(e) = fired {
            self.pending.clear();
            return Err(e);
        }

        let mut stats = FlushStats::default();
        for (id, op) in &plan {
            let Some(tracked) = self.entities.get(id) else {
                continue;
            };
            let entity_type = tracked.entity().entity_type();
            let schema = self
                .schemas
                .get(&entity_type)
                .ok_or(ChangesetError::UnknownEntityType { entity_type })?;
            let snapshot = schema.read_all(tracked.entity())?.into_iter().collect();
            if let Some(tracked) = self.entities.get_mut(id) {
                tracked.snapshot = Some(snapshot);
            }
            match op {
                Operation::Insert => stats.inserted += 1,
                Operation::Update => stats.updated += 1,
            }
        }
        self.pending.clear();

        Ok(stats)
    }

    fn compute_plan(&mut self) -> WatchResult<Vec<(EntityId, Operation)>> {
        self.pending.clear();
        let mut plan = Vec::new();

        for (id, tracked) in &self.entities {
            let entity_type = tracked.entity().entity_type();
            let schema = self
                .schemas
                .get(&entity_type)
                .ok_or_else(|| ChangesetError::UnknownEntityType {
                    entity_type: entity_type.clone(),
                })?;

            let Some(snapshot) = tracked.snapshot.as_ref() else {
                plan.push((*id, Operation::Insert));
                continue;
            };

            let mut data = ChangeData::new();
            for (field, current) in schema.read_all(tracked.entity())? {
                let old = snapshot.get(&field).cloned().unwrap_or_default();
                data.insert(field, FieldChange::new(old, current));
            }

            if !data.is_empty() {
                trace!(
                    entity_type = %entity_type,
                    entity_id = %id,
                    changed = data.len(),
                    "scheduled update"
                );
                self.pending.insert(*id, data);
                plan.push((*id, Operation::Update));
            }
        }

        Ok(plan)
    }

    fn fire(
        &self,
        plan: &[(EntityId, Operation)],
        listeners: &[Arc<dyn LifecycleListener>],
    ) -> WatchResult<()> {
        for (id, op) in plan {
            let Some(tracked) = self.entities.get(id) else {
                continue;
            };
            let event = LifecycleEvent::new(tracked.entity(), self);
            for listener in listeners {
                match op {
                    Operation::Insert => listener.on_insert(&event)?,
                    Operation::Update => listener.on_update(&event)?,
                }
            }
        }
        Ok(())
    }

    fn find(&self, entity: &dyn Entity) -> Option<(&EntityId, &Tracked)> {
        self.entities
            .iter()
            .find(|(_, t)| same_instance(t.entity(), entity))
    }
}

impl TrackingState for InMemorySession {
    fn entity_state(&self, entity: &dyn Entity) -> EntityState {
        match self.find(entity) {
            Some((_, tracked)) if tracked.snapshot.is_some() => EntityState::Managed,
            _ => EntityState::New,
        }
    }

    fn change_data(&self, entity: &dyn Entity) -> ChangeData {
        self.find(entity)
            .and_then(|(id, _)| self.pending.get(id))
            .cloned()
            .unwrap_or_default()
    }
}

impl Session for InMemorySession {
    fn tracking_state(&self) -> &dyn TrackingState {
        self
    }

    fn schema(&self, entity_type: &EntityType) -> Option<&EntitySchema> {
        self.schemas.get(entity_type)
    }
}

impl fmt::Debug for InMemorySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemorySession")
            .field("schemas", &self.schemas.len())
            .field("entities", &self.entities.len())
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}
