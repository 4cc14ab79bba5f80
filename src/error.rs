//! Error types for the watcher.
//!
//! All errors are strongly typed using thiserror and surface synchronously
//! to the immediate caller: the registration call or the lifecycle hook.
//! Nothing is logged, swallowed or retried internally.

use thiserror::Error;

use crate::changeset::ChangesetKind;
use crate::entity::EntityType;
use crate::session::Operation;

/// Opaque error raised by a watch callback.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// Validation errors raised by malformed registration calls.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid argument: {reason}")]
    InvalidArgument {
        reason: String,
    },
}

impl ValidationError {
    /// Creates an invalid argument error.
    #[must_use]
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }
}

/// Errors raised while computing or querying a property changeset.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChangesetError {
    #[error("Entity type '{entity_type}' does not declare property '{property}'")]
    UnknownProperty {
        entity_type: EntityType,
        property: String,
    },

    #[error("No field metadata registered for entity type '{entity_type}'")]
    UnknownEntityType {
        entity_type: EntityType,
    },

    #[error("{operation} can only be called on collection changesets, got a {kind} changeset")]
    InvalidOperation {
        operation: &'static str,
        kind: ChangesetKind,
    },

    #[error("Property '{property}' holds a {type_name} value, expected a collection")]
    NotACollection {
        property: String,
        type_name: &'static str,
    },

    #[error("Field '{property}' of '{entity_type}' cannot be read from this entity instance")]
    EntityTypeMismatch {
        entity_type: EntityType,
        property: String,
    },
}

/// Top-level error type for the watcher.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Changeset error: {0}")]
    Changeset(#[from] ChangesetError),

    #[error("Callback for {entity_type}.{property} failed on {operation}: {source}")]
    Callback {
        entity_type: EntityType,
        property: String,
        operation: Operation,
        #[source]
        source: CallbackError,
    },

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl WatchError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a changeset error.
    #[must_use]
    pub const fn is_changeset(&self) -> bool {
        matches!(self, Self::Changeset(_))
    }

    /// Returns true if a watch callback raised this error.
    #[must_use]
    pub const fn is_callback(&self) -> bool {
        matches!(self, Self::Callback { .. })
    }
}

/// Result type alias for watcher operations.
pub type WatchResult<T> = Result<T, WatchError>;
