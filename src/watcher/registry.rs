//! Watch registrations.
//!
//! Registration is a setup phase: `watch` takes `&mut self`, dispatch only
//! needs `&self`. Share a fully configured `Watcher` behind an `Arc` to
//! dispatch from several threads.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::changeset::{ChangesetFactory, ChangesetKind, PropertyChangeset};
use crate::entity::{Entity, EntityType};
use crate::error::{CallbackError, WatchResult};
use crate::session::Operation;

use super::options::{WatchOptions, WatchOverrides, WatcherConfig};
use super::selector::PropertySelector;

/// Callback invoked with `(changeset, operation, entity, property)`.
pub type WatchCallback = Arc<
    dyn Fn(&PropertyChangeset<'_>, Operation, &dyn Entity, &str) -> Result<(), CallbackError>
        + Send
        + Sync,
>;

pub(crate) struct Registration {
    pub(crate) entity_type: EntityType,
    pub(crate) property: String,
    pub(crate) callback: WatchCallback,
    pub(crate) options: WatchOptions,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("entity_type", &self.entity_type)
            .field("property", &self.property)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Registry of property watches and lifecycle dispatcher.
///
/// # Examples
///
/// ```
/// use entity_watcher::{Watcher, WatcherConfig, WatchOverrides};
///
/// let mut watcher = Watcher::new(WatcherConfig::default());
/// watcher
///     .watch("User", ["name", "email"], |changeset, _op, _entity, property| {
///         println!("{property}: {} -> {}", changeset.old_value(), changeset.new_value());
///         Ok(())
///     }, WatchOverrides::new().trigger_on_persist(false))
///     .unwrap();
///
/// assert_eq!(watcher.registration_count(&"User".into()), 2);
/// ```
#[derive(Debug, Default)]
pub struct Watcher {
    pub(crate) config: WatcherConfig,
    pub(crate) factory: ChangesetFactory,
    pub(crate) listeners: HashMap<EntityType, Vec<Registration>>,
}

impl Watcher {
    #[must_use]
    pub fn new(config: WatcherConfig) -> Self {
        Self::with_factory(config, ChangesetFactory::new())
    }

    #[must_use]
    pub fn with_factory(config: WatcherConfig, factory: ChangesetFactory) -> Self {
        Self {
            config,
            factory,
            listeners: HashMap::new(),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &WatcherConfig {
        &self.config
    }

    /// Registers `callback` for each selected property of `entity_type`.
    ///
    /// All registrations created by one call share the callback and the
    /// resolved options. Registrations are never removed.
    ///
    /// # Errors
    /// `InvalidArgument` if the selector is empty or contains a blank name.
    pub fn watch<F>(
        &mut self,
        entity_type: impl Into<EntityType>,
        properties: impl Into<PropertySelector>,
        callback: F,
        overrides: WatchOverrides,
    ) -> WatchResult<()>
    where
        F: Fn(&PropertyChangeset<'_>, Operation, &dyn Entity, &str) -> Result<(), CallbackError>
            + Send
            + Sync
            + 'static,
    {
        self.watch_shared(entity_type, properties, Arc::new(callback), overrides)
    }

    /// Same as [`Watcher::watch`] with the changeset type forced to
    /// [`ChangesetKind::Collection`].
    ///
    /// # Errors
    /// See [`Watcher::watch`].
    pub fn watch_collection<F>(
        &mut self,
        entity_type: impl Into<EntityType>,
        properties: impl Into<PropertySelector>,
        callback: F,
        overrides: WatchOverrides,
    ) -> WatchResult<()>
    where
        F: Fn(&PropertyChangeset<'_>, Operation, &dyn Entity, &str) -> Result<(), CallbackError>
            + Send
            + Sync
            + 'static,
    {
        self.watch(entity_type, properties, callback, overrides.kind(ChangesetKind::Collection))
    }

    /// Registers an already shared callback.
    ///
    /// # Errors
    /// See [`Watcher::watch`].
    pub fn watch_shared(
        &mut self,
        entity_type: impl Into<EntityType>,
        properties: impl Into<PropertySelector>,
        callback: WatchCallback,
        overrides: WatchOverrides,
    ) -> WatchResult<()> {
        let entity_type = entity_type.into();
        let names = properties.into().into_names()?;
        let options = overrides.resolve(&self.config.defaults);

        let registrations = self.listeners.entry(entity_type.clone()).or_default();
        for property in names {
            debug!(
                entity_type = %entity_type,
                property = %property,
                trigger_on_persist = options.trigger_on_persist,
                trigger_when_no_changes = options.trigger_when_no_changes,
                kind = %options.kind,
                "registered watch"
            );
            registrations.push(Registration {
                entity_type: entity_type.clone(),
                property,
                callback: Arc::clone(&callback),
                options,
            });
        }
        Ok(())
    }

    /// Number of registrations under `entity_type`.
    #[must_use]
    pub fn registration_count(&self, entity_type: &EntityType) -> usize {
        self.listeners.get(entity_type).map_or(0, Vec::len)
    }

    /// True if at least one registration watches `property` of `entity_type`.
    #[must_use]
    pub fn is_watching(&self, entity_type: &EntityType, property: &str) -> bool {
        self.listeners
            .get(entity_type)
            .is_some_and(|regs| regs.iter().any(|r| r.property == property))
    }

    /// Resolved options of every registration under `entity_type`, in
    /// registration order.
    pub fn registrations(
        &self,
        entity_type: &EntityType,
    ) -> impl Iterator<Item = (&str, &WatchOptions)> + '_ {
        self.listeners
            .get(entity_type)
            .into_iter()
            .flatten()
            .map(|r| (r.property.as_str(), &r.options))
    }
}
