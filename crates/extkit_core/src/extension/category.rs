//! Category, plugin and configuration contracts implemented by extensions.
//!
//! # Responsibility
//! - Define the capability set every extension category exposes.
//! - Bind each category to its plugin and configuration types at compile time.
//!
//! # Invariants
//! - `Category::category_type` and `Plugin::plugin_key` are stable for the
//!   lifetime of the instance.
//! - A configuration reports the same type key as its owning category.

use crate::config::HostContext;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::Any;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

/// Runtime type access for trait objects.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Individually addressable unit registered under a category.
pub trait Plugin: AsAny + Send + Sync {
    /// Registry-wide unique key.
    fn plugin_key(&self) -> &str;
}

/// Category-specific configuration value populated from one JSON subtree.
pub trait CategoryConfiguration: AsAny + Debug + Send {
    /// Root JSON key holding this configuration's fields.
    fn category_type(&self) -> &str;

    /// Populates `self` in place from the nested JSON object under
    /// `category_type()`.
    fn populate_from_json(&mut self, section: &Value) -> Result<(), serde_json::Error>;
}

/// Named capability group hosting plugins of one type.
///
/// Categories are shared between the registry and the initialization worker,
/// so every hook takes `&self`; implementations keep their mutable state
/// behind their own locks.
pub trait Category: Send + Sync + 'static {
    type Plugin: Plugin;
    type Configuration: CategoryConfiguration;

    fn category_type(&self) -> &str;

    /// Applies a populated configuration. Called synchronously by
    /// `ExtensionRegistry::configure`; must not call back into that registry.
    fn configure(
        &self,
        config: &Self::Configuration,
        context: &HostContext,
    ) -> Result<(), CategoryError>;

    /// Runs on the initialization worker after `configure` succeeded.
    /// Failures are the category's own business.
    fn initialize(&self, context: &HostContext);

    fn add_plugin(&self, plugin: Arc<Self::Plugin>) -> Result<(), CategoryError>;

    fn remove_plugin(&self, plugin: &Self::Plugin) -> Result<(), CategoryError>;
}

/// Replaces `target` with the value deserialized from `section`.
///
/// Intended for `CategoryConfiguration::populate_from_json` implementations
/// on `serde` types. The whole value is replaced: fields the section omits
/// take their `#[serde(default)]` value, not the value `target` held before.
pub fn populate_from_section<T: DeserializeOwned>(
    target: &mut T,
    section: &Value,
) -> Result<(), serde_json::Error> {
    *target = T::deserialize(section)?;
    Ok(())
}

/// Error reported by a category hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryError {
    message: String,
}

impl CategoryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for CategoryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for CategoryError {}

/// Object-safe view of a `Category` used by registry bookkeeping.
pub(crate) trait ErasedCategory: Send + Sync {
    fn type_key(&self) -> &str;

    fn configure_erased(
        &self,
        config: &dyn CategoryConfiguration,
        context: &HostContext,
    ) -> Result<(), CategoryError>;

    fn initialize_erased(&self, context: &HostContext);

    /// Returns `None` when `plugin` is not this category's plugin type.
    fn remove_plugin_erased(&self, plugin: &dyn Plugin) -> Option<Result<(), CategoryError>>;
}

impl<C: Category> ErasedCategory for C {
    fn type_key(&self) -> &str {
        Category::category_type(self)
    }

    fn configure_erased(
        &self,
        config: &dyn CategoryConfiguration,
        context: &HostContext,
    ) -> Result<(), CategoryError> {
        match config.as_any().downcast_ref::<C::Configuration>() {
            Some(config) => self.configure(config, context),
            None => Err(CategoryError::new(format!(
                "configuration for `{}` has an unexpected type",
                Category::category_type(self)
            ))),
        }
    }

    fn initialize_erased(&self, context: &HostContext) {
        self.initialize(context);
    }

    fn remove_plugin_erased(&self, plugin: &dyn Plugin) -> Option<Result<(), CategoryError>> {
        let plugin = plugin.as_any().downcast_ref::<C::Plugin>()?;
        Some(self.remove_plugin(plugin))
    }
}
