//! Extension record binding one plugin to its category and configuration.
//!
//! # Invariants
//! - Plugin key and configuration file name are never blank.
//! - Category, plugin and template slot are fixed at construction; only the
//!   configuration value inside the slot is mutated (by the loader).

use crate::config::{ConfigReadError, ConfigurationLoader, HostContext, SectionState};
use crate::extension::category::{
    Category, CategoryConfiguration, CategoryError, ErasedCategory, Plugin,
};
use crate::extension::error::{ExtensionError, ExtensionResult};
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type TemplateSlot = Arc<Mutex<Box<dyn CategoryConfiguration>>>;

/// Immutable `{category, plugin, config file, template}` binding.
#[derive(Clone)]
pub struct ExtensionRecord {
    category: Arc<dyn ErasedCategory>,
    plugin: Arc<dyn Plugin>,
    config_file_name: String,
    template: TemplateSlot,
}

impl ExtensionRecord {
    /// Builds a record; plugin and template types are tied to `C`.
    ///
    /// # Errors
    /// - `InvalidRecord("plugin_key")` when the plugin key is blank.
    /// - `InvalidRecord("config_file_name")` when the file name is blank.
    pub fn new<C: Category>(
        category: Arc<C>,
        plugin: Arc<C::Plugin>,
        config_file_name: impl Into<String>,
        template: C::Configuration,
    ) -> ExtensionResult<Self> {
        if plugin.plugin_key().trim().is_empty() {
            return Err(ExtensionError::InvalidRecord("plugin_key"));
        }
        let config_file_name = config_file_name.into().trim().to_string();
        if config_file_name.is_empty() {
            return Err(ExtensionError::InvalidRecord("config_file_name"));
        }

        let template: Box<dyn CategoryConfiguration> = Box::new(template);
        Ok(Self {
            category,
            plugin,
            config_file_name,
            template: Arc::new(Mutex::new(template)),
        })
    }

    pub fn plugin_key(&self) -> &str {
        self.plugin.plugin_key()
    }

    pub fn category_type(&self) -> &str {
        self.category.type_key()
    }

    pub fn config_file_name(&self) -> &str {
        &self.config_file_name
    }

    pub fn plugin(&self) -> &Arc<dyn Plugin> {
        &self.plugin
    }

    /// Runs `f` against the current configuration value.
    pub fn with_configuration<R>(&self, f: impl FnOnce(&dyn CategoryConfiguration) -> R) -> R {
        let guard = self.lock_template();
        f(&**guard)
    }

    /// Returns a copy of the configuration value when it is a `T`.
    pub fn configuration<T: CategoryConfiguration + Clone>(&self) -> Option<T> {
        self.with_configuration(|config| config.as_any().downcast_ref::<T>().cloned())
    }

    pub(crate) fn category(&self) -> &Arc<dyn ErasedCategory> {
        &self.category
    }

    /// Populates the template slot in place from the record's file.
    pub(crate) fn load(
        &self,
        loader: &ConfigurationLoader<'_>,
    ) -> Result<SectionState, ConfigReadError> {
        let mut guard = self.lock_template();
        loader.load(&self.config_file_name, &mut **guard)
    }

    pub(crate) fn configure_category(&self, context: &HostContext) -> Result<(), CategoryError> {
        let guard = self.lock_template();
        self.category.configure_erased(&**guard, context)
    }

    fn lock_template(&self) -> MutexGuard<'_, Box<dyn CategoryConfiguration>> {
        self.template.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PartialEq for ExtensionRecord {
    fn eq(&self, other: &Self) -> bool {
        same_instance(&self.category, &other.category)
            && same_instance(&self.plugin, &other.plugin)
            && self.config_file_name == other.config_file_name
            && Arc::ptr_eq(&self.template, &other.template)
    }
}

impl Eq for ExtensionRecord {}

impl Debug for ExtensionRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionRecord")
            .field("category_type", &self.category_type())
            .field("plugin_key", &self.plugin_key())
            .field("config_file_name", &self.config_file_name)
            .field("template", &*self.lock_template())
            .finish()
    }
}

fn same_instance<T: ?Sized>(left: &Arc<T>, right: &Arc<T>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(left).cast::<()>(),
        Arc::as_ptr(right).cast::<()>(),
    )
}
