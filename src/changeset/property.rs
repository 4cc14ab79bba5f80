//! Property changesets handed to watch callbacks.

use std::cell::OnceCell;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::error::{ChangesetError, ValidationError};
use crate::value::Value;

use super::collection::{diff_collections, Collection, CollectionDiff};

/// Which changeset variant a watch builds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangesetKind {
    /// Old and new value only.
    #[default]
    #[serde(alias = "default")]
    Scalar,
    /// Old and new value plus element additions and removals.
    #[serde(alias = "iterable")]
    Collection,
}

impl fmt::Display for ChangesetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar => write!(f, "scalar"),
            Self::Collection => write!(f, "collection"),
        }
    }
}

impl FromStr for ChangesetKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scalar" | "default" => Ok(Self::Scalar),
            "collection" | "iterable" => Ok(Self::Collection),
            other => Err(ValidationError::invalid_argument(format!(
                "unknown changeset type '{other}', expected 'scalar' or 'collection'"
            ))),
        }
    }
}

/// Change of a single-valued property.
pub struct ScalarChangeset<'a> {
    entity: &'a dyn Entity,
    property: String,
    old: Value,
    new: Value,
}

/// Change of a collection-valued property.
///
/// Additions and removals are computed on first access and cached.
pub struct CollectionChangeset<'a> {
    entity: &'a dyn Entity,
    property: String,
    old: Value,
    new: Value,
    diff: OnceCell<Result<CollectionDiff, ChangesetError>>,
}

impl CollectionChangeset<'_> {
    fn diff(&self) -> Result<&CollectionDiff, ChangesetError> {
        self.diff
            .get_or_init(|| {
                let old = self.normalize(&self.old)?;
                let new = self.normalize(&self.new)?;
                Ok(diff_collections(&old, &new))
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    fn normalize(&self, value: &Value) -> Result<Collection, ChangesetError> {
        Collection::from_value(value).ok_or_else(|| ChangesetError::NotACollection {
            property: self.property.clone(),
            type_name: value.type_name(),
        })
    }
}

/// How one property of one entity changed during one lifecycle operation.
///
/// Borrowed from the triggering event; it does not outlive the callback.
pub enum PropertyChangeset<'a> {
    Scalar(ScalarChangeset<'a>),
    Collection(CollectionChangeset<'a>),
}

impl<'a> PropertyChangeset<'a> {
    /// Builds a changeset of the requested kind.
    #[must_use]
    pub fn new(
        kind: ChangesetKind,
        entity: &'a dyn Entity,
        property: impl Into<String>,
        old: Value,
        new: Value,
    ) -> Self {
        let property = property.into();
        match kind {
            ChangesetKind::Scalar => Self::Scalar(ScalarChangeset {
                entity,
                property,
                old,
                new,
            }),
            ChangesetKind::Collection => Self::Collection(CollectionChangeset {
                entity,
                property,
                old,
                new,
                diff: OnceCell::new(),
            }),
        }
    }

    /// A changeset recording no change: both sides absent.
    #[must_use]
    pub fn unchanged(
        kind: ChangesetKind,
        entity: &'a dyn Entity,
        property: impl Into<String>,
    ) -> Self {
        Self::new(kind, entity, property, Value::Null, Value::Null)
    }

    #[must_use]
    pub const fn kind(&self) -> ChangesetKind {
        match self {
            Self::Scalar(_) => ChangesetKind::Scalar,
            Self::Collection(_) => ChangesetKind::Collection,
        }
    }

    /// The entity under inspection.
    #[must_use]
    pub fn entity(&self) -> &'a dyn Entity {
        match self {
            Self::Scalar(c) => c.entity,
            Self::Collection(c) => c.entity,
        }
    }

    #[must_use]
    pub fn property(&self) -> &str {
        match self {
            Self::Scalar(c) => &c.property,
            Self::Collection(c) => &c.property,
        }
    }

    #[must_use]
    pub const fn old_value(&self) -> &Value {
        match self {
            Self::Scalar(c) => &c.old,
            Self::Collection(c) => &c.old,
        }
    }

    #[must_use]
    pub const fn new_value(&self) -> &Value {
        match self {
            Self::Scalar(c) => &c.new,
            Self::Collection(c) => &c.new,
        }
    }

    /// Scalar: old and new are not strictly identical.
    /// Collection: at least one element was added or removed.
    ///
    /// # Errors
    /// `NotACollection` if a collection changeset holds a scalar value.
    pub fn has_changes(&self) -> Result<bool, ChangesetError> {
        match self {
            Self::Scalar(c) => Ok(c.old != c.new),
            Self::Collection(c) => Ok(c.diff()?.has_changes()),
        }
    }

    /// Elements present in the new collection but not in the old one.
    ///
    /// # Errors
    /// `InvalidOperation` on a scalar changeset.
    pub fn additions(&self) -> Result<&Collection, ChangesetError> {
        Ok(&self.collection("additions")?.diff()?.additions)
    }

    /// Elements present in the old collection but not in the new one.
    ///
    /// # Errors
    /// `InvalidOperation` on a scalar changeset.
    pub fn removals(&self) -> Result<&Collection, ChangesetError> {
        Ok(&self.collection("removals")?.diff()?.removals)
    }

    /// # Errors
    /// `InvalidOperation` on a scalar changeset.
    pub fn has_additions(&self) -> Result<bool, ChangesetError> {
        Ok(!self.collection("has_additions")?.diff()?.additions.is_empty())
    }

    /// # Errors
    /// `InvalidOperation` on a scalar changeset.
    pub fn has_removals(&self) -> Result<bool, ChangesetError> {
        Ok(!self.collection("has_removals")?.diff()?.removals.is_empty())
    }

    fn collection(
        &self,
        operation: &'static str,
    ) -> Result<&CollectionChangeset<'a>, ChangesetError> {
        match self {
            Self::Collection(c) => Ok(c),
            Self::Scalar(_) => Err(ChangesetError::InvalidOperation {
                operation,
                kind: ChangesetKind::Scalar,
            }),
        }
    }
}

impl fmt::Debug for PropertyChangeset<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyChangeset")
            .field("kind", &self.kind())
            .field("property", &self.property())
            .field("old", self.old_value())
            .field("new", self.new_value())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::entity::EntityType;
    use crate::value::Key;

    #[derive(Debug)]
    struct User;

    impl Entity for User {
        fn entity_type(&self) -> EntityType {
            EntityType::new("User")
        }
    }

    #[test]
    fn scalar_changeset_reports_values() {
        let user = User;
        let cs = PropertyChangeset::new(
            ChangesetKind::Scalar,
            &user,
            "name",
            "foo".into(),
            "bar".into(),
        );
        assert_eq!(cs.old_value(), &Value::from("foo"));
        assert_eq!(cs.new_value(), &Value::from("bar"));
        assert_eq!(cs.has_changes(), Ok(true));
        assert_eq!(cs.property(), "name");
        assert_eq!(cs.kind(), ChangesetKind::Scalar);
    }

    #[test]
    fn unchanged_changeset_has_no_changes() {
        let user = User;
        assert_eq!(
            PropertyChangeset::unchanged(ChangesetKind::Scalar, &user, "name").has_changes(),
            Ok(false)
        );
        assert_eq!(
            PropertyChangeset::unchanged(ChangesetKind::Collection, &user, "roles").has_changes(),
            Ok(false)
        );
    }

    #[test]
    fn collection_accessors_fail_on_scalar() {
        let user = User;
        let cs =
            PropertyChangeset::new(ChangesetKind::Scalar, &user, "name", "a".into(), "b".into());
        assert_eq!(
            cs.additions().unwrap_err(),
            ChangesetError::InvalidOperation {
                operation: "additions",
                kind: ChangesetKind::Scalar,
            }
        );
        assert!(cs.removals().is_err());
        assert!(cs.has_additions().is_err());
        assert!(cs.has_removals().is_err());
    }

    #[test]
    fn keyed_collection_changeset() {
        let user = User;
        let old = Value::map([("a", "foo"), ("b", "bar")]);
        let new = Value::map([("a", "foo"), ("b", "bar"), ("c", "baz")]);
        let cs = PropertyChangeset::new(ChangesetKind::Collection, &user, "roles", old, new);

        let expected: indexmap::IndexMap<Key, Value> =
            [(Key::from("c"), Value::from("baz"))].into_iter().collect();
        assert_eq!(cs.additions().unwrap(), &Collection::Keyed(expected));
        assert!(cs.removals().unwrap().is_empty());
        assert_eq!(cs.has_changes(), Ok(true));
    }

    #[test]
    fn diff_is_cached() {
        let user = User;
        let cs = PropertyChangeset::new(
            ChangesetKind::Collection,
            &user,
            "roles",
            Value::from(vec!["foo", "bar"]),
            Value::from(vec!["foo", "boom"]),
        );
        let first = cs.additions().unwrap();
        let second = cs.additions().unwrap();
        assert!(std::ptr::eq(first, second));
        assert_eq!(cs.removals().unwrap(), &Collection::List(vec![Value::from("bar")]));
    }

    #[test]
    fn scalar_under_collection_kind_fails() {
        let user = User;
        let cs = PropertyChangeset::new(
            ChangesetKind::Collection,
            &user,
            "age",
            Value::Int(1),
            Value::Int(2),
        );
        assert!(matches!(
            cs.additions().unwrap_err(),
            ChangesetError::NotACollection { type_name: "int", .. }
        ));
        assert!(cs.has_changes().is_err());
    }

    #[test]
    fn kind_parsing() {
        assert_eq!("scalar".parse::<ChangesetKind>(), Ok(ChangesetKind::Scalar));
        assert_eq!("iterable".parse::<ChangesetKind>(), Ok(ChangesetKind::Collection));
        assert!("list".parse::<ChangesetKind>().is_err());
    }
}
