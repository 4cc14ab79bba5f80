//! Entity identity and type resolution.
//!
//! Entities are application-defined records whose fields are tracked by the
//! persistence engine. The watcher only needs two things from an instance:
//! its concrete `EntityType`, and a way to downcast it so that typed field
//! accessors declared in an `EntitySchema` can read it.

use std::any::Any;
use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of an entity instance inside a persistence session.
///
/// # Examples
///
/// ```
/// use entity_watcher::EntityId;
///
/// let id = EntityId::new();
/// assert!(!id.is_nil());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Creates a new random entity ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an entity ID from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Returns true if this is a nil (all zeros) UUID.
    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for EntityId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Name of a concrete entity type.
///
/// Registrations are keyed by exact `EntityType`: a registration for one type
/// never matches an instance reporting a different one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityType(Cow<'static, str>);

impl EntityType {
    /// Creates an entity type from a static name.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Returns the type name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for EntityType {
    fn from(name: &'static str) -> Self {
        Self::new(name)
    }
}

impl From<String> for EntityType {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

/// Upcast to `Any`, implemented for every `'static` type.
pub trait AsAny: Any {
    /// Borrow as `&dyn Any`.
    fn as_any(&self) -> &dyn Any;

    /// Borrow as `&mut dyn Any`.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// An instance of an application-defined record type.
///
/// # Examples
///
/// ```
/// use entity_watcher::{Entity, EntityType};
///
/// #[derive(Debug, Default)]
/// struct User {
///     name: Option<String>,
/// }
///
/// impl Entity for User {
///     fn entity_type(&self) -> EntityType {
///         EntityType::new("User")
///     }
/// }
///
/// assert_eq!(User::default().entity_type().as_str(), "User");
/// ```
pub trait Entity: AsAny + fmt::Debug + Send + Sync + 'static {
    /// The concrete runtime type of this instance.
    fn entity_type(&self) -> EntityType;
}

impl dyn Entity {
    /// Downcast to a concrete entity struct.
    pub fn downcast_ref<T: Entity>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Downcast to a concrete entity struct, mutably.
    pub fn downcast_mut<T: Entity>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

/// Returns true when both references point at the same entity instance.
///
/// Identity is the data address. Values of a zero-sized type share one
/// address unless each lives inside a distinct allocation, so engines that
/// track zero-sized entities must store them that way.
#[must_use]
pub fn same_instance(a: &dyn Entity, b: &dyn Entity) -> bool {
    std::ptr::addr_eq(a as *const dyn Entity, b as *const dyn Entity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Post {
        title: String,
    }

    impl Entity for Post {
        fn entity_type(&self) -> EntityType {
            EntityType::new("Post")
        }
    }

    #[test]
    fn test_entity_id_unique() {
        assert_ne!(EntityId::new(), EntityId::new());
    }

    #[test]
    fn test_entity_type_equality() {
        assert_eq!(EntityType::new("Post"), EntityType::from("Post".to_string()));
        assert_ne!(EntityType::new("Post"), EntityType::new("Comment"));
        assert_eq!(EntityType::new("Post").to_string(), "Post");
    }

    #[test]
    fn test_downcast() {
        let mut post: Box<dyn Entity> = Box::new(Post {
            title: "hello".to_string(),
        });
        assert_eq!(post.downcast_ref::<Post>().map(|p| p.title.as_str()), Some("hello"));
        if let Some(p) = post.downcast_mut::<Post>() {
            p.title = "bye".to_string();
        }
        assert_eq!(post.downcast_ref::<Post>().map(|p| p.title.as_str()), Some("bye"));
    }

    #[test]
    fn test_same_instance() {
        let a = Post::default();
        let b = Post::default();
        assert!(same_instance(&a, &a));
        assert!(!same_instance(&a, &b));
    }
}
