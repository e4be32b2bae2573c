//! Core of extkit: a category/plugin registry with file-backed configuration
//! and one-shot, off-thread initialization.

pub mod config;
pub mod extension;
pub mod logging;
pub mod scheduler;

pub use config::{
    ConfigReadCause, ConfigReadError, ConfigurationLoader, DirectoryResources, HostContext,
    MemoryResources, ResourceResolver, SectionState,
};
pub use extension::category::{
    populate_from_section, AsAny, Category, CategoryConfiguration, CategoryError, Plugin,
};
pub use extension::error::{ExtensionError, ExtensionResult};
pub use extension::record::ExtensionRecord;
pub use extension::registry::{
    ConfigureReport, ConfiguredExtension, ExtensionRegistry, SkippedExtension,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use scheduler::{
    InitializationScheduler, InitializationTask, InlineScheduler, SchedulerOptions,
    SingleWorkerScheduler,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
