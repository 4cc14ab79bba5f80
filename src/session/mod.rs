//! Persistence session boundary and an in-memory reference session.

mod memory;
mod traits;

pub use memory::{FlushStats, InMemorySession};
pub use traits::{
    ChangeData, EntityState, FieldChange, LifecycleEvent, LifecycleListener, Operation, Session,
    TrackingState,
};
