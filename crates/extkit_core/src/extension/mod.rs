//! Extension categories, plugins and their registry.
//!
//! Categories and plugins are registered explicitly by the host; the registry
//! configures them from JSON resources once and initializes them on a
//! background worker.

pub mod category;
pub mod error;
pub mod record;
pub mod registry;
