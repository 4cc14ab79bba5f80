//! Changeset computation from persistence engine bookkeeping.
//!
//! Tracked instances are diffed through the engine's change ledger. A
//! not-yet-tracked instance has no ledger, so every declared field is compared
//! against its declared default and only differing fields are kept.

use tracing::trace;

use crate::entity::Entity;
use crate::error::ChangesetError;
use crate::schema::EntitySchema;
use crate::session::{ChangeData, EntityState, FieldChange, TrackingState};

use super::property::{ChangesetKind, PropertyChangeset};

/// Builds property changesets for one entity at a time.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangesetFactory;

impl ChangesetFactory {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// True iff the engine has no prior record of `entity`.
    #[must_use]
    pub fn is_not_yet_tracked(&self, entity: &dyn Entity, tracking: &dyn TrackingState) -> bool {
        tracking.entity_state(entity) == EntityState::New
    }

    /// Field name to (old, new) for every field whose value differs.
    ///
    /// # Errors
    /// `EntityTypeMismatch` if a not-yet-tracked `entity` cannot be read
    /// through `schema`.
    pub fn entity_change_data(
        &self,
        entity: &dyn Entity,
        tracking: &dyn TrackingState,
        schema: &EntitySchema,
    ) -> Result<ChangeData, ChangesetError> {
        if !self.is_not_yet_tracked(entity, tracking) {
            return Ok(tracking.change_data(entity));
        }

        let mut data = ChangeData::new();
        for field in schema.fields() {
            let current = field.read(schema.entity_type(), entity)?;
            data.insert(field.name(), FieldChange::new(field.default_value().clone(), current));
        }
        trace!(
            entity_type = %schema.entity_type(),
            changed = data.len(),
            "diffed new entity against defaults"
        );
        Ok(data)
    }

    /// Names of every property whose value changed. Callers must not depend on
    /// the order.
    ///
    /// # Errors
    /// See [`ChangesetFactory::entity_change_data`].
    pub fn list_changed_properties(
        &self,
        entity: &dyn Entity,
        tracking: &dyn TrackingState,
        schema: &EntitySchema,
    ) -> Result<Vec<String>, ChangesetError> {
        let data = self.entity_change_data(entity, tracking, schema)?;
        Ok(data.fields().map(str::to_string).collect())
    }

    /// True iff `property` has a recorded change.
    ///
    /// # Errors
    /// `UnknownProperty` if `schema` does not declare `property`.
    pub fn has_changes(
        &self,
        entity: &dyn Entity,
        property: &str,
        tracking: &dyn TrackingState,
        schema: &EntitySchema,
    ) -> Result<bool, ChangesetError> {
        ensure_declared(schema, property)?;
        Ok(self.entity_change_data(entity, tracking, schema)?.contains(property))
    }

    /// Builds the changeset of one property.
    ///
    /// A property with no recorded change yields a changeset whose old and
    /// new values are both `Null`.
    ///
    /// # Errors
    /// `UnknownProperty` if `schema` does not declare `property`.
    pub fn build_changeset<'a>(
        &self,
        entity: &'a dyn Entity,
        property: &str,
        tracking: &dyn TrackingState,
        schema: &EntitySchema,
        kind: ChangesetKind,
    ) -> Result<PropertyChangeset<'a>, ChangesetError> {
        ensure_declared(schema, property)?;
        let data = self.entity_change_data(entity, tracking, schema)?;
        self.changeset_from(entity, property, &data, schema, kind)
    }

    /// Builds the changeset of one property from already computed change data.
    ///
    /// # Errors
    /// `UnknownProperty` if `schema` does not declare `property`.
    pub fn changeset_from<'a>(
        &self,
        entity: &'a dyn Entity,
        property: &str,
        data: &ChangeData,
        schema: &EntitySchema,
        kind: ChangesetKind,
    ) -> Result<PropertyChangeset<'a>, ChangesetError> {
        ensure_declared(schema, property)?;
        let Some(change) = data.get(property) else {
            return Ok(PropertyChangeset::unchanged(kind, entity, property));
        };
        let (old, new) = (change.old.clone(), change.new.clone());
        Ok(PropertyChangeset::new(kind, entity, property, old, new))
    }
}

fn ensure_declared(schema: &EntitySchema, property: &str) -> Result<(), ChangesetError> {
    if schema.has_field(property) {
        Ok(())
    } else {
        Err(ChangesetError::UnknownProperty {
            entity_type: schema.entity_type().clone(),
            property: property.to_string(),
        })
    }
}
