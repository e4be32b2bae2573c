//! Category/plugin registry and the one-shot configuration pass.
//!
//! # Responsibility
//! - Keep `category_type -> Category` and `plugin_key -> ExtensionRecord`.
//! - Load each extension's configuration, configure its category and hand
//!   initialization to the scheduler, exactly once per registry.
//!
//! # Invariants
//! - Keys are unique within each mapping; re-registration replaces.
//! - `configure` succeeds at most once; later calls change nothing.
//! - Configuration read failures skip one extension; category configure
//!   failures abort the pass and leave the registry unconfigured.
//! - All operations serialize on one mutex, so registration never overlaps an
//!   in-flight `configure`.

use crate::config::{ConfigReadError, ConfigurationLoader, HostContext, SectionState};
use crate::extension::category::{Category, ErasedCategory, Plugin};
use crate::extension::error::{ExtensionError, ExtensionResult};
use crate::extension::record::ExtensionRecord;
use crate::scheduler::{InitializationScheduler, SchedulerOptions, SingleWorkerScheduler};
use log::{debug, error, info, warn};
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// Type-erased handle kept so lookups can hand back `Arc<C>`.
type CategoryHandle = Arc<dyn Any + Send + Sync>;

#[derive(Default)]
struct RegistryState {
    categories: BTreeMap<String, CategoryHandle>,
    extensions: BTreeMap<String, ExtensionRecord>,
    configured: bool,
}

/// Extension whose category was configured during `configure`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfiguredExtension {
    pub plugin_key: String,
    pub category_type: String,
    pub section: SectionState,
}

/// Extension skipped because its configuration file could not be read.
#[derive(Debug)]
pub struct SkippedExtension {
    pub plugin_key: String,
    pub category_type: String,
    pub error: ConfigReadError,
}

/// Outcome of a successful `configure` pass.
#[derive(Debug, Default)]
pub struct ConfigureReport {
    pub configured: Vec<ConfiguredExtension>,
    pub skipped: Vec<SkippedExtension>,
}

impl ConfigureReport {
    pub fn configured_plugin_keys(&self) -> Vec<&str> {
        self.configured
            .iter()
            .map(|entry| entry.plugin_key.as_str())
            .collect()
    }

    pub fn skipped_plugin_keys(&self) -> Vec<&str> {
        self.skipped
            .iter()
            .map(|entry| entry.plugin_key.as_str())
            .collect()
    }
}

/// Registry of extension categories and their plugins.
///
/// Iteration during `configure` follows ascending plugin key; callers must
/// not depend on any order between categories.
pub struct ExtensionRegistry {
    state: Mutex<RegistryState>,
    scheduler: Box<dyn InitializationScheduler>,
}

impl ExtensionRegistry {
    /// Creates a registry whose initializations run on `scheduler`.
    pub fn with_scheduler(scheduler: Box<dyn InitializationScheduler>) -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
            scheduler,
        }
    }

    /// Creates a registry backed by a worker with default options.
    ///
    /// # Errors
    /// - Returns the OS error when the worker thread cannot be spawned.
    pub fn new() -> std::io::Result<Self> {
        Self::with_worker(SchedulerOptions::default())
    }

    /// Creates a registry backed by a dedicated initialization worker.
    ///
    /// # Errors
    /// - Returns the OS error when the worker thread cannot be spawned.
    pub fn with_worker(options: SchedulerOptions) -> std::io::Result<Self> {
        let scheduler = SingleWorkerScheduler::with_options(options)?;
        Ok(Self::with_scheduler(Box::new(scheduler)))
    }

    /// Registers `category` under its type key, replacing any previous one.
    ///
    /// Returns the typed handle for later `register_plugin` calls.
    pub fn register_category<C: Category>(&self, category: Arc<C>) -> Arc<C> {
        let category_type = category.category_type().to_string();
        let handle: CategoryHandle = category.clone();
        if self
            .lock_state()
            .categories
            .insert(category_type.clone(), handle)
            .is_some()
        {
            debug!(
                "event=category_register module=registry status=replaced category={}",
                category_type
            );
        } else {
            debug!(
                "event=category_register module=registry status=ok category={}",
                category_type
            );
        }
        category
    }

    /// Removes the category registered under `category`'s type key.
    ///
    /// Returns whether an entry was removed.
    pub fn unregister_category<C: Category>(&self, category: &C) -> bool {
        self.unregister_category_type(category.category_type())
    }

    /// Removes the category registered under `category_type`.
    pub fn unregister_category_type(&self, category_type: &str) -> bool {
        let removed = self
            .lock_state()
            .categories
            .remove(category_type)
            .is_some();
        if removed {
            debug!(
                "event=category_unregister module=registry status=ok category={}",
                category_type
            );
        }
        removed
    }

    /// Looks up a category by type key.
    ///
    /// Returns `None` when nothing is registered under `category_type` or the
    /// registered category is not a `C`.
    pub fn lookup_category<C: Category>(&self, category_type: &str) -> Option<Arc<C>> {
        let handle = self
            .lock_state()
            .categories
            .get(category_type)?
            .clone();
        handle.downcast::<C>().ok()
    }

    pub fn contains_category(&self, category_type: &str) -> bool {
        self.lock_state().categories.contains_key(category_type)
    }

    /// Returns sorted category type keys.
    pub fn category_types(&self) -> Vec<String> {
        self.lock_state().categories.keys().cloned().collect()
    }

    pub fn category_count(&self) -> usize {
        self.lock_state().categories.len()
    }

    /// Binds `plugin` to `category` with its configuration file and template.
    ///
    /// The plugin is handed to `Category::add_plugin` first; the record is
    /// stored (replacing any record with the same plugin key) only when the
    /// category accepts it.
    ///
    /// # Errors
    /// - `InvalidRecord` when the plugin key or file name is blank.
    /// - `PluginRejected` when the category refuses the plugin.
    pub fn register_plugin<C: Category>(
        &self,
        category: &Arc<C>,
        plugin: Arc<C::Plugin>,
        config_file_name: impl Into<String>,
        template: C::Configuration,
    ) -> ExtensionResult<()> {
        let record = ExtensionRecord::new(
            category.clone(),
            plugin.clone(),
            config_file_name,
            template,
        )?;
        let plugin_key = record.plugin_key().to_string();

        let mut state = self.lock_state();
        category
            .add_plugin(plugin)
            .map_err(|source| ExtensionError::PluginRejected {
                category_type: category.category_type().to_string(),
                plugin_key: plugin_key.clone(),
                source,
            })?;

        if state.extensions.insert(plugin_key.clone(), record).is_some() {
            warn!(
                "event=plugin_register module=registry status=replaced plugin={} category={}",
                plugin_key,
                category.category_type()
            );
        } else {
            debug!(
                "event=plugin_register module=registry status=ok plugin={} category={}",
                plugin_key,
                category.category_type()
            );
        }
        Ok(())
    }

    /// Removes `plugin` from its recorded category and drops its record.
    ///
    /// # Errors
    /// - `PluginNotFound` when no record exists for the plugin key.
    /// - `PluginMismatch` when the recorded category does not host plugins of
    ///   `plugin`'s runtime type.
    /// - `PluginRemovalFailed` when the category refuses the removal.
    pub fn unregister_plugin(&self, plugin: &dyn Plugin) -> ExtensionResult<()> {
        let plugin_key = plugin.plugin_key();
        let mut state = self.lock_state();
        let record = state
            .extensions
            .get(plugin_key)
            .ok_or_else(|| ExtensionError::PluginNotFound(plugin_key.to_string()))?;
        let category_type = record.category_type().to_string();

        match record.category().remove_plugin_erased(plugin) {
            None => {
                return Err(ExtensionError::PluginMismatch {
                    category_type,
                    plugin_key: plugin_key.to_string(),
                })
            }
            Some(Err(source)) => {
                return Err(ExtensionError::PluginRemovalFailed {
                    category_type,
                    plugin_key: plugin_key.to_string(),
                    source,
                })
            }
            Some(Ok(())) => {}
        }

        state.extensions.remove(plugin_key);
        debug!(
            "event=plugin_unregister module=registry status=ok plugin={} category={}",
            plugin_key, category_type
        );
        Ok(())
    }

    /// Returns the record stored for `plugin_key`.
    pub fn extension(&self, plugin_key: &str) -> Option<ExtensionRecord> {
        self.lock_state().extensions.get(plugin_key).cloned()
    }

    /// Returns sorted plugin keys with a stored record.
    pub fn plugin_keys(&self) -> Vec<String> {
        self.lock_state().extensions.keys().cloned().collect()
    }

    pub fn extension_count(&self) -> usize {
        self.lock_state().extensions.len()
    }

    /// Whether a `configure` call has completed successfully.
    pub fn is_configured(&self) -> bool {
        self.lock_state().configured
    }

    /// Reads every extension's configuration, configures its category and
    /// schedules the category's initialization. Succeeds at most once.
    ///
    /// Initialization runs asynchronously; this call never waits for it.
    ///
    /// # Errors
    /// - `AlreadyConfigured` when a previous call succeeded; nothing is touched.
    /// - `CategoryConfiguration` when a category's `configure` fails. Remaining
    ///   extensions are not processed and the registry stays unconfigured;
    ///   initializations already scheduled still run.
    pub fn configure(&self, context: &HostContext) -> ExtensionResult<ConfigureReport> {
        let started_at = Instant::now();
        let mut state = self.lock_state();
        if state.configured {
            warn!("event=configure module=registry status=rejected error_code=already_configured");
            return Err(ExtensionError::AlreadyConfigured);
        }
        info!(
            "event=configure module=registry status=start app_id={} extensions={}",
            context.app_id(),
            state.extensions.len()
        );

        let loader = ConfigurationLoader::new(context.resources());
        let mut report = ConfigureReport::default();
        for record in state.extensions.values() {
            let section = match record.load(&loader) {
                Ok(section) => section,
                Err(err) => {
                    error!(
                        "event=config_read module=registry status=error plugin={} category={} file={} error_code={} error={}",
                        record.plugin_key(),
                        record.category_type(),
                        record.config_file_name(),
                        err.code(),
                        err
                    );
                    report.skipped.push(SkippedExtension {
                        plugin_key: record.plugin_key().to_string(),
                        category_type: record.category_type().to_string(),
                        error: err,
                    });
                    continue;
                }
            };

            if let Err(source) = record.configure_category(context) {
                error!(
                    "event=configure module=registry status=error plugin={} category={} duration_ms={} error_code=category_configure_failed error={}",
                    record.plugin_key(),
                    record.category_type(),
                    started_at.elapsed().as_millis(),
                    source
                );
                return Err(ExtensionError::CategoryConfiguration {
                    category_type: record.category_type().to_string(),
                    plugin_key: record.plugin_key().to_string(),
                    source,
                });
            }

            self.begin_initialization(record, context);
            report.configured.push(ConfiguredExtension {
                plugin_key: record.plugin_key().to_string(),
                category_type: record.category_type().to_string(),
                section,
            });
        }

        state.configured = true;
        info!(
            "event=configure module=registry status=ok configured={} skipped={} duration_ms={}",
            report.configured.len(),
            report.skipped.len(),
            started_at.elapsed().as_millis()
        );
        Ok(report)
    }

    fn begin_initialization(&self, record: &ExtensionRecord, context: &HostContext) {
        let category = Arc::clone(record.category());
        let context = context.clone();
        self.scheduler.submit(Box::new(move || {
            let started_at = Instant::now();
            category.initialize_erased(&context);
            info!(
                "event=category_init module=registry status=ok category={} duration_ms={}",
                category.type_key(),
                started_at.elapsed().as_millis()
            );
        }));
    }

    fn lock_state(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
