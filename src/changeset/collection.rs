//! Collection diffing.
//!
//! Old and new container values are normalized to a [`Collection`], then
//! compared by strict element membership. Position never matters: an element
//! that moved is neither added nor removed. Duplicates are not counted, so an
//! element present twice in `old` and once in `new` is not a removal.
//!
//! The result shape depends on the inputs. When both sides are dense lists
//! the additions and removals are fresh zero-based lists. When either side is
//! associative, both results keep the keys the elements had in their source
//! container.

use indexmap::IndexMap;

use crate::value::{Key, Value};

/// A normalized container.
#[derive(Debug, Clone, PartialEq)]
pub enum Collection {
    /// Dense, zero-indexed sequence.
    List(Vec<Value>),
    /// Associative container in insertion order.
    Keyed(IndexMap<Key, Value>),
}

impl Default for Collection {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl Collection {
    /// Normalizes a field value. `Null` reads as an empty list, and a map whose
    /// keys are exactly `0..n` in order reads as a list.
    ///
    /// Returns `None` for scalar values.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(Self::default()),
            Value::List(items) => Some(Self::List(items.clone())),
            Value::Map(entries) if is_dense(entries) => {
                Some(Self::List(entries.values().cloned().collect()))
            }
            Value::Map(entries) => Some(Self::Keyed(entries.clone())),
            _ => None,
        }
    }

    /// True for dense, zero-indexed containers.
    #[must_use]
    pub const fn is_ordered(&self) -> bool {
        matches!(self, Self::List(_))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::List(items) => items.len(),
            Self::Keyed(entries) => entries.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates the elements, ignoring keys.
    pub fn values(&self) -> Box<dyn Iterator<Item = &Value> + '_> {
        match self {
            Self::List(items) => Box::new(items.iter()),
            Self::Keyed(entries) => Box::new(entries.values()),
        }
    }

    /// True if any element is strictly identical to `value`.
    #[must_use]
    pub fn contains(&self, value: &Value) -> bool {
        self.values().any(|v| v == value)
    }

    /// Iterates `(key, element)` pairs; list positions become integer keys.
    fn entries(&self) -> Box<dyn Iterator<Item = (Key, &Value)> + '_> {
        match self {
            Self::List(items) => Box::new((0i64..).zip(items).map(|(i, v)| (Key::Int(i), v))),
            Self::Keyed(entries) => Box::new(entries.iter().map(|(k, v)| (k.clone(), v))),
        }
    }

    /// Converts back into a field value.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::List(items) => Value::List(items),
            Self::Keyed(entries) => Value::Map(entries),
        }
    }
}

impl From<Vec<Value>> for Collection {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

impl From<IndexMap<Key, Value>> for Collection {
    fn from(entries: IndexMap<Key, Value>) -> Self {
        Self::Keyed(entries)
    }
}

fn is_dense(entries: &IndexMap<Key, Value>) -> bool {
    entries
        .keys()
        .enumerate()
        .all(|(i, k)| k.as_int().and_then(|k| usize::try_from(k).ok()) == Some(i))
}

/// Elements added to and removed from a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionDiff {
    pub additions: Collection,
    pub removals: Collection,
}

impl CollectionDiff {
    /// True if anything was added or removed.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.additions.is_empty() || !self.removals.is_empty()
    }
}

/// Diffs two normalized collections.
///
/// # Examples
///
/// ```
/// use entity_watcher::changeset::{diff_collections, Collection};
/// use entity_watcher::Value;
///
/// let old = Collection::from_value(&Value::from(vec!["foo", "bar"])).unwrap();
/// let new = Collection::from_value(&Value::from(vec!["foo", "baz", "bar"])).unwrap();
/// let diff = diff_collections(&old, &new);
///
/// assert_eq!(diff.additions, Collection::List(vec![Value::from("baz")]));
/// assert!(diff.removals.is_empty());
/// ```
#[must_use]
pub fn diff_collections(old: &Collection, new: &Collection) -> CollectionDiff {
    if old.is_ordered() && new.is_ordered() {
        return CollectionDiff {
            additions: Collection::List(missing_from(new, old).map(|(_, v)| v.clone()).collect()),
            removals: Collection::List(missing_from(old, new).map(|(_, v)| v.clone()).collect()),
        };
    }

    CollectionDiff {
        additions: Collection::Keyed(missing_from(new, old).map(|(k, v)| (k, v.clone())).collect()),
        removals: Collection::Keyed(missing_from(old, new).map(|(k, v)| (k, v.clone())).collect()),
    }
}

/// Entries of `a` whose element does not occur anywhere in `b`.
fn missing_from<'a>(
    a: &'a Collection,
    b: &'a Collection,
) -> impl Iterator<Item = (Key, &'a Value)> + 'a {
    a.entries().filter(move |(_, v)| !b.contains(v))
}
