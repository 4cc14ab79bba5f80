//! Changeset engine.
//!
//! Pure computation: given an entity's prior and current field values, as
//! reported by the persistence engine, describe how one named property changed.

/// Collection normalization and diffing.
pub mod collection;
/// Changeset construction from tracking state.
pub mod factory;
/// Scalar and collection changeset variants.
pub mod property;

pub use collection::{diff_collections, Collection, CollectionDiff};
pub use factory::ChangesetFactory;
pub use property::{ChangesetKind, CollectionChangeset, PropertyChangeset, ScalarChangeset};
