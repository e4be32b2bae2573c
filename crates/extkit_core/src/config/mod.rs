//! Configuration resources and per-category configuration loading.
//!
//! # Responsibility
//! - Abstract the host's resource-loading mechanism.
//! - Turn a named JSON resource into populated category configurations.
//!
//! # See also
//! - `extension::registry::ExtensionRegistry::configure`

pub mod loader;
pub mod resources;

pub use loader::{ConfigReadCause, ConfigReadError, ConfigurationLoader, SectionState};
pub use resources::{
    DirectoryResources, HostContext, MemoryResources, ResourceResolver, CONFIG_FILE_EXTENSION,
};
