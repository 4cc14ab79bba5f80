//! Property arguments accepted by `Watcher::watch`.

use crate::error::ValidationError;

/// One property name, or several sharing a callback and options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertySelector {
    One(String),
    Many(Vec<String>),
}

impl PropertySelector {
    /// Expands into property names, one registration each.
    ///
    /// # Errors
    /// `InvalidArgument` for an empty list or an empty name.
    pub fn into_names(self) -> Result<Vec<String>, ValidationError> {
        let names = match self {
            Self::One(name) => vec![name],
            Self::Many(names) => names,
        };
        if names.is_empty() {
            return Err(ValidationError::invalid_argument("expected at least one property name"));
        }
        if let Some(blank) = names.iter().find(|n| n.trim().is_empty()) {
            return Err(ValidationError::invalid_argument(format!(
                "expected property name, got {blank:?}"
            )));
        }
        Ok(names)
    }
}

impl From<&str> for PropertySelector {
    fn from(name: &str) -> Self {
        Self::One(name.to_string())
    }
}

impl From<String> for PropertySelector {
    fn from(name: String) -> Self {
        Self::One(name)
    }
}

impl From<Vec<String>> for PropertySelector {
    fn from(names: Vec<String>) -> Self {
        Self::Many(names)
    }
}

impl From<Vec<&str>> for PropertySelector {
    fn from(names: Vec<&str>) -> Self {
        Self::Many(names.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for PropertySelector {
    fn from(names: &[&str]) -> Self {
        Self::Many(names.iter().map(|n| (*n).to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for PropertySelector {
    fn from(names: [&str; N]) -> Self {
        Self::Many(names.iter().map(|n| (*n).to_string()).collect())
    }
}

impl TryFrom<&serde_json::Value> for PropertySelector {
    type Error = ValidationError;

    /// Accepts a string or an array of strings.
    fn try_from(value: &serde_json::Value) -> Result<Self, Self::Error> {
        match value {
            serde_json::Value::String(name) => Ok(Self::One(name.clone())),
            serde_json::Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        let reason = format!("expected property name, got {item}");
                        ValidationError::invalid_argument(reason)
                    })
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Many),
            other => Err(ValidationError::invalid_argument(format!(
                "expected property name or list of names, got {other}"
            ))),
        }
    }
}
