//! Statically declared field metadata per entity type.
//!
//! The watcher never reflects over arbitrary objects. An integration declares,
//! for each entity type, the tracked fields with their default value and a
//! typed accessor. Defaults are what a not-yet-tracked instance is diffed
//! against on its first insert.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::entity::{Entity, EntityType};
use crate::error::ChangesetError;
use crate::value::Value;

type FieldGetter = Arc<dyn Fn(&dyn Entity) -> Option<Value> + Send + Sync>;

/// One tracked field of an entity type.
#[derive(Clone)]
pub struct FieldDescriptor {
    name: String,
    default: Value,
    getter: FieldGetter,
}

impl FieldDescriptor {
    /// Field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared default value.
    #[must_use]
    pub const fn default_value(&self) -> &Value {
        &self.default
    }

    /// Reads the current value of this field from `entity`.
    ///
    /// # Errors
    /// `EntityTypeMismatch` if `entity` is not of the Rust type the schema was
    /// built for.
    pub fn read(
        &self,
        entity_type: &EntityType,
        entity: &dyn Entity,
    ) -> Result<Value, ChangesetError> {
        (self.getter)(entity).ok_or_else(|| ChangesetError::EntityTypeMismatch {
            entity_type: entity_type.clone(),
            property: self.name.clone(),
        })
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("default", &self.default)
            .finish_non_exhaustive()
    }
}

/// Field metadata for one entity type.
#[derive(Debug, Clone)]
pub struct EntitySchema {
    entity_type: EntityType,
    fields: Vec<FieldDescriptor>,
}

impl EntitySchema {
    /// Starts a schema for the entity struct `T`.
    ///
    /// # Examples
    ///
    /// ```
    /// use entity_watcher::{Entity, EntitySchema, EntityType, Value};
    ///
    /// #[derive(Debug, Default)]
    /// struct User {
    ///     name: Option<String>,
    ///     roles: Vec<String>,
    /// }
    ///
    /// impl Entity for User {
    ///     fn entity_type(&self) -> EntityType {
    ///         EntityType::new("User")
    ///     }
    /// }
    ///
    /// let schema = EntitySchema::builder::<User>("User")
    ///     .field("name", Value::Null, |u| u.name.clone().into())
    ///     .field("roles", Value::Null, |u| u.roles.clone().into())
    ///     .build();
    ///
    /// assert!(schema.has_field("roles"));
    /// ```
    pub fn builder<T: Entity>(entity_type: impl Into<EntityType>) -> EntitySchemaBuilder<T> {
        EntitySchemaBuilder {
            entity_type: entity_type.into(),
            fields: Vec::new(),
            _entity: PhantomData,
        }
    }

    #[must_use]
    pub const fn entity_type(&self) -> &EntityType {
        &self.entity_type
    }

    /// Declared field names, in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.iter().map(FieldDescriptor::name)
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Declared default of `name`, if the field exists.
    #[must_use]
    pub fn default_of(&self, name: &str) -> Option<&Value> {
        self.field(name).map(FieldDescriptor::default_value)
    }

    /// Reads every declared field from `entity`, in declaration order.
    ///
    /// # Errors
    /// `EntityTypeMismatch` if `entity` is not of this schema's Rust type.
    pub fn read_all(&self, entity: &dyn Entity) -> Result<Vec<(String, Value)>, ChangesetError> {
        self.fields
            .iter()
            .map(|f| Ok((f.name.clone(), f.read(&self.entity_type, entity)?)))
            .collect()
    }
}

/// Builder for [`EntitySchema`] with accessors typed on the entity struct.
pub struct EntitySchemaBuilder<T> {
    entity_type: EntityType,
    fields: Vec<FieldDescriptor>,
    _entity: PhantomData<fn(&T)>,
}

impl<T: Entity> EntitySchemaBuilder<T> {
    /// Declares a tracked field. Redeclaring a name replaces the earlier entry.
    #[must_use]
    pub fn field<F>(mut self, name: impl Into<String>, default: impl Into<Value>, getter: F) -> Self
    where
        F: Fn(&T) -> Value + Send + Sync + 'static,
    {
        let name = name.into();
        let getter: FieldGetter =
            Arc::new(move |entity: &dyn Entity| entity.downcast_ref::<T>().map(&getter));
        let descriptor = FieldDescriptor {
            name,
            default: default.into(),
            getter,
        };

        match self.fields.iter_mut().find(|f| f.name == descriptor.name) {
            Some(existing) => *existing = descriptor,
            None => self.fields.push(descriptor),
        }
        self
    }

    #[must_use]
    pub fn build(self) -> EntitySchema {
        EntitySchema {
            entity_type: self.entity_type,
            fields: self.fields,
        }
    }
}
