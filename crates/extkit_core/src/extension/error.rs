//! Registry operation errors.

use crate::extension::category::CategoryError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ExtensionResult<T> = Result<T, ExtensionError>;

/// Errors returned to callers of registry operations.
///
/// Configuration file read failures are not part of this enum: `configure`
/// logs and skips them per extension (see `ConfigReadError`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionError {
    /// A second `configure` call followed a successful one.
    AlreadyConfigured,
    /// A category failed to apply its populated configuration.
    CategoryConfiguration {
        category_type: String,
        plugin_key: String,
        source: CategoryError,
    },
    /// A category refused a plugin in `add_plugin`.
    PluginRejected {
        category_type: String,
        plugin_key: String,
        source: CategoryError,
    },
    /// A category refused to remove a plugin it owns.
    PluginRemovalFailed {
        category_type: String,
        plugin_key: String,
        source: CategoryError,
    },
    /// The plugin's runtime type does not belong to the recorded category.
    PluginMismatch {
        category_type: String,
        plugin_key: String,
    },
    PluginNotFound(String),
    /// Extension record field was blank.
    InvalidRecord(&'static str),
}

impl Display for ExtensionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyConfigured => write!(
                f,
                "a subsequent call to `configure` was issued after the first had already succeeded; call `configure` only once"
            ),
            Self::CategoryConfiguration {
                category_type,
                plugin_key,
                source,
            } => write!(
                f,
                "category `{category_type}` failed to configure for plugin `{plugin_key}`: {source}"
            ),
            Self::PluginRejected {
                category_type,
                plugin_key,
                source,
            } => write!(
                f,
                "category `{category_type}` rejected plugin `{plugin_key}`: {source}"
            ),
            Self::PluginRemovalFailed {
                category_type,
                plugin_key,
                source,
            } => write!(
                f,
                "category `{category_type}` failed to remove plugin `{plugin_key}`: {source}"
            ),
            Self::PluginMismatch {
                category_type,
                plugin_key,
            } => write!(
                f,
                "plugin `{plugin_key}` does not match the plugin type of category `{category_type}`"
            ),
            Self::PluginNotFound(value) => write!(f, "plugin not registered: {value}"),
            Self::InvalidRecord(field) => {
                write!(f, "extension record field must not be blank: {field}")
            }
        }
    }
}

impl Error for ExtensionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CategoryConfiguration { source, .. }
            | Self::PluginRejected { source, .. }
            | Self::PluginRemovalFailed { source, .. } => Some(source),
            Self::AlreadyConfigured
            | Self::PluginMismatch { .. }
            | Self::PluginNotFound(_)
            | Self::InvalidRecord(_) => None,
        }
    }
}
