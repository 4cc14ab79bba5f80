//! Lifecycle dispatch.
//!
//! For each insert or update event the watcher resolves the entity's concrete
//! type, then walks that type's registrations in registration order. Each
//! registration passes through its filters before its callback runs. The
//! first error, from change computation or from a callback, aborts the pass
//! and propagates to the persistence engine; callbacks that already ran are
//! not undone.

use std::cell::OnceCell;

use tracing::{debug, trace};

use crate::entity::EntityType;
use crate::error::{ChangesetError, WatchError, WatchResult};
use crate::session::{ChangeData, LifecycleEvent, LifecycleListener, Operation};

use super::registry::{Registration, Watcher};

impl Watcher {
    /// Runs every registration matching the event's entity type.
    ///
    /// # Errors
    /// The first changeset or callback error raised during the pass.
    pub fn dispatch(&self, event: &LifecycleEvent<'_>, operation: Operation) -> WatchResult<()> {
        let entity_type = event.session().resolve_type(event.entity());
        let Some(registrations) = self.listeners.get(&entity_type) else {
            trace!(entity_type = %entity_type, %operation, "no watches registered");
            return Ok(());
        };

        // Change data is computed on demand and shared by the whole pass.
        let changes = OnceCell::new();
        for registration in registrations {
            self.dispatch_one(registration, &entity_type, event, operation, &changes)?;
        }
        Ok(())
    }

    fn dispatch_one(
        &self,
        registration: &Registration,
        entity_type: &EntityType,
        event: &LifecycleEvent<'_>,
        operation: Operation,
        changes: &OnceCell<ChangeData>,
    ) -> WatchResult<()> {
        let entity = event.entity();
        let property = registration.property.as_str();
        let options = &registration.options;

        if &registration.entity_type != entity_type {
            debug!(entity_type = %entity_type, property, "skipped: entity type does not match");
            return Ok(());
        }

        if operation == Operation::Insert && !options.trigger_on_persist {
            debug!(entity_type = %entity_type, property, "skipped: insert not watched");
            return Ok(());
        }

        let session = event.session();
        let schema = session
            .schema(entity_type)
            .ok_or_else(|| ChangesetError::UnknownEntityType {
                entity_type: entity_type.clone(),
            })?;

        let data = match changes.get() {
            Some(data) => data,
            None => {
                let computed = self
                    .factory
                    .entity_change_data(entity, session.tracking_state(), schema)?;
                changes.get_or_init(|| computed)
            }
        };

        if !data.contains(property) && !options.trigger_when_no_changes {
            debug!(entity_type = %entity_type, property, "skipped: property unchanged");
            return Ok(());
        }

        let changeset = self
            .factory
            .changeset_from(entity, property, data, schema, options.kind)?;

        trace!(entity_type = %entity_type, property, %operation, "invoking watch callback");
        (registration.callback)(&changeset, operation, entity, property).map_err(|source| {
            WatchError::Callback {
                entity_type: entity_type.clone(),
                property: property.to_string(),
                operation,
                source,
            }
        })
    }
}

impl LifecycleListener for Watcher {
    fn on_insert(&self, event: &LifecycleEvent<'_>) -> WatchResult<()> {
        self.dispatch(event, Operation::Insert)
    }

    fn on_update(&self, event: &LifecycleEvent<'_>) -> WatchResult<()> {
        self.dispatch(event, Operation::Update)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::changeset::ChangesetKind;
    use crate::entity::Entity;
    use crate::schema::EntitySchema;
    use crate::session::{EntityState, FieldChange, Session, TrackingState};
    use crate::value::Value;
    use crate::watcher::{WatchOverrides, WatcherConfig};

    #[derive(Debug, Default)]
    struct User {
        name: Option<String>,
        title: Option<String>,
    }

    impl Entity for User {
        fn entity_type(&self) -> EntityType {
            EntityType::new("User")
        }
    }

    /// Proxy type standing in for `User`, as lazy-loading engines produce.
    #[derive(Debug, Default)]
    struct UserProxy;

    impl Entity for UserProxy {
        fn entity_type(&self) -> EntityType {
            EntityType::new("UserProxy")
        }
    }

    struct FakeSession {
        state: EntityState,
        data: ChangeData,
        schema: EntitySchema,
        unproxy: bool,
    }

    impl FakeSession {
        fn tracked(data: ChangeData) -> Self {
            Self {
                state: EntityState::Managed,
                data,
                schema: EntitySchema::builder::<User>("User")
                    .field("name", Value::Null, |u| u.name.clone().into())
                    .field("title", Value::Null, |u| u.title.clone().into())
                    .build(),
                unproxy: false,
            }
        }
    }

    impl TrackingState for FakeSession {
        fn entity_state(&self, _entity: &dyn Entity) -> EntityState {
            self.state
        }

        fn change_data(&self, _entity: &dyn Entity) -> ChangeData {
            self.data.clone()
        }
    }

    impl Session for FakeSession {
        fn tracking_state(&self) -> &dyn TrackingState {
            self
        }

        fn schema(&self, entity_type: &EntityType) -> Option<&EntitySchema> {
            (entity_type == self.schema.entity_type()).then_some(&self.schema)
        }

        fn resolve_type(&self, entity: &dyn Entity) -> EntityType {
            if self.unproxy && entity.downcast_ref::<UserProxy>().is_some() {
                return EntityType::new("User");
            }
            entity.entity_type()
        }
    }

    fn name_changed() -> ChangeData {
        [("name", FieldChange::new("foo", "bar"))].into_iter().collect()
    }

    #[test]
    fn callback_receives_changeset_and_context() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut watcher = Watcher::new(WatcherConfig::default());
        watcher
            .watch(
                "User",
                "name",
                move |cs, op, entity, property| {
                    sink.lock().unwrap().push((
                        cs.new_value().clone(),
                        op,
                        entity.entity_type(),
                        property.to_string(),
                    ));
                    Ok(())
                },
                WatchOverrides::new(),
            )
            .unwrap();

        let session = FakeSession::tracked(name_changed());
        let user = User::default();
        watcher.on_update(&LifecycleEvent::new(&user, &session)).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(
            seen.as_slice(),
            &[(Value::from("bar"), Operation::Update, EntityType::new("User"), "name".to_string())]
        );
    }

    #[test]
    fn failing_callback_stops_the_pass() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut watcher = Watcher::new(WatcherConfig::default());
        for (i, fail) in [(1, false), (2, true), (3, false)] {
            let calls = Arc::clone(&calls);
            watcher
                .watch(
                    "User",
                    "name",
                    move |_, _, _, _| {
                        calls.lock().unwrap().push(i);
                        if fail {
                            return Err("rejected".into());
                        }
                        Ok(())
                    },
                    WatchOverrides::new(),
                )
                .unwrap();
        }

        let session = FakeSession::tracked(name_changed());
        let user = User::default();
        let err = watcher.on_update(&LifecycleEvent::new(&user, &session)).unwrap_err();

        assert!(err.is_callback());
        assert_eq!(*calls.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn unknown_property_surfaces_when_dispatching_unchanged() {
        let mut watcher = Watcher::new(WatcherConfig::default());
        watcher
            .watch("User", "nickname", |_, _, _, _| Ok(()), WatchOverrides::new())
            .unwrap();

        let session = FakeSession::tracked(name_changed());
        let user = User::default();
        let err = watcher.on_update(&LifecycleEvent::new(&user, &session)).unwrap_err();
        assert!(matches!(
            err,
            WatchError::Changeset(ChangesetError::UnknownProperty { .. })
        ));
    }

    #[test]
    fn resolved_type_drives_lookup() {
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        let mut watcher = Watcher::new(WatcherConfig::default());
        watcher
            .watch(
                "User",
                "name",
                move |_, _, _, _| {
                    *counter.lock().unwrap() += 1;
                    Ok(())
                },
                WatchOverrides::new().kind(ChangesetKind::Scalar),
            )
            .unwrap();

        let proxy = UserProxy::default();
        let mut session = FakeSession::tracked(name_changed());
        watcher.on_update(&LifecycleEvent::new(&proxy, &session)).unwrap();
        assert_eq!(*calls.lock().unwrap(), 0);

        session.unproxy = true;
        assert!(watcher.on_update(&LifecycleEvent::new(&proxy, &session)).is_ok());
        assert_eq!(*calls.lock().unwrap(), 1);
    }
}
