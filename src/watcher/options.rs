//! Watch options and registry-wide configuration.
//!
//! Every registration carries a resolved [`WatchOptions`]: the registry's
//! defaults from [`WatcherConfig`] with the call-site [`WatchOverrides`]
//! applied on top.

use serde::{Deserialize, Serialize};

use crate::changeset::ChangesetKind;
use crate::error::ValidationError;

/// Resolved options of one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchOptions {
    /// Dispatch on the first insert of an entity.
    pub trigger_on_persist: bool,
    /// Dispatch even when the watched property did not change.
    pub trigger_when_no_changes: bool,
    /// Changeset variant handed to the callback.
    #[serde(rename = "type")]
    pub kind: ChangesetKind,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            trigger_on_persist: true,
            trigger_when_no_changes: true,
            kind: ChangesetKind::Scalar,
        }
    }
}

/// Call-site overrides. Unset fields fall back to the registry defaults.
///
/// # Examples
///
/// ```
/// use entity_watcher::{ChangesetKind, WatchOptions, WatchOverrides};
///
/// let options = WatchOverrides::new()
///     .trigger_on_persist(false)
///     .resolve(&WatchOptions::default());
///
/// assert!(!options.trigger_on_persist);
/// assert!(options.trigger_when_no_changes);
/// assert_eq!(options.kind, ChangesetKind::Scalar);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_on_persist: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_when_no_changes: Option<bool>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<ChangesetKind>,
}

impl WatchOverrides {
    /// No overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn trigger_on_persist(mut self, value: bool) -> Self {
        self.trigger_on_persist = Some(value);
        self
    }

    #[must_use]
    pub const fn trigger_when_no_changes(mut self, value: bool) -> Self {
        self.trigger_when_no_changes = Some(value);
        self
    }

    #[must_use]
    pub const fn kind(mut self, kind: ChangesetKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Shorthand for `kind(ChangesetKind::Collection)`.
    #[must_use]
    pub const fn collection(self) -> Self {
        self.kind(ChangesetKind::Collection)
    }

    /// Applies these overrides on top of `defaults`.
    #[must_use]
    pub fn resolve(&self, defaults: &WatchOptions) -> WatchOptions {
        WatchOptions {
            trigger_on_persist: self.trigger_on_persist.unwrap_or(defaults.trigger_on_persist),
            trigger_when_no_changes: self
                .trigger_when_no_changes
                .unwrap_or(defaults.trigger_when_no_changes),
            kind: self.kind.unwrap_or(defaults.kind),
        }
    }

    /// Parses an option table such as
    /// `{"trigger_on_persist": false, "type": "collection"}`.
    ///
    /// # Errors
    /// `InvalidArgument` for unknown option names, unknown `type` values, or
    /// values of the wrong shape.
    pub fn from_json(options: &serde_json::Value) -> Result<Self, ValidationError> {
        if options.is_null() {
            return Ok(Self::default());
        }
        if let Some(kind) = options.get("type") {
            let Some(kind) = kind.as_str() else {
                return Err(ValidationError::invalid_argument(format!(
                    "option 'type' must be a string, got {kind}"
                )));
            };
            kind.parse::<ChangesetKind>()?;
        }
        serde_json::from_value(options.clone())
            .map_err(|e| ValidationError::invalid_argument(format!("invalid watch options: {e}")))
    }
}

/// Registry-wide configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatcherConfig {
    /// Options every registration starts from.
    pub defaults: WatchOptions,
}

impl WatcherConfig {
    #[must_use]
    pub const fn with_defaults(defaults: WatchOptions) -> Self {
        Self { defaults }
    }

    /// Parses a JSON configuration document. Missing fields take their
    /// defaults.
    ///
    /// # Errors
    /// `InvalidArgument` if the document is malformed or names unknown options.
    pub fn from_json_str(json: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(json)
            .map_err(|e| ValidationError::invalid_argument(format!("invalid watcher config: {e}")))
    }
}
