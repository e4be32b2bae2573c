//! Host resource resolution and the context handed to categories.

use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// File extension appended to resource names by `DirectoryResources`.
pub const CONFIG_FILE_EXTENSION: &str = "json";

/// Host mechanism that turns a resource name into raw bytes.
pub trait ResourceResolver: Send + Sync {
    /// Opens the named resource (name given without extension).
    ///
    /// A missing resource must be reported as `io::ErrorKind::NotFound`.
    fn open(&self, name: &str) -> io::Result<Box<dyn Read + Send>>;
}

/// Resolves `<root>/<name>.json` on the local filesystem.
#[derive(Debug, Clone)]
pub struct DirectoryResources {
    root: PathBuf,
}

impl DirectoryResources {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path a resource name maps to.
    pub fn resource_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.{CONFIG_FILE_EXTENSION}"))
    }
}

impl ResourceResolver for DirectoryResources {
    fn open(&self, name: &str) -> io::Result<Box<dyn Read + Send>> {
        let file = File::open(self.resource_path(name))?;
        Ok(Box::new(file))
    }
}

/// In-memory resources keyed by name, for tests and embedded configs.
#[derive(Debug, Clone, Default)]
pub struct MemoryResources {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MemoryResources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces one resource.
    pub fn insert(&mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.entries.insert(name.into(), content.into());
    }

    /// Builder-style variant of `insert`.
    pub fn with(mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.insert(name, content);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ResourceResolver for MemoryResources {
    fn open(&self, name: &str) -> io::Result<Box<dyn Read + Send>> {
        match self.entries.get(name) {
            Some(content) => Ok(Box::new(Cursor::new(content.clone()))),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("resource `{name}` is not registered"),
            )),
        }
    }
}

/// Host application context passed to `configure` and `initialize`.
///
/// Cheap to clone; initialization tasks carry their own copy onto the worker.
#[derive(Clone)]
pub struct HostContext {
    app_id: String,
    resources: Arc<dyn ResourceResolver>,
}

impl HostContext {
    pub fn new(app_id: impl Into<String>, resources: Arc<dyn ResourceResolver>) -> Self {
        Self {
            app_id: app_id.into(),
            resources,
        }
    }

    /// Context whose resources live in `root` as `<name>.json` files.
    pub fn with_directory(app_id: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self::new(app_id, Arc::new(DirectoryResources::new(root)))
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn resources(&self) -> &dyn ResourceResolver {
        self.resources.as_ref()
    }
}

impl Debug for HostContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostContext")
            .field("app_id", &self.app_id)
            .finish_non_exhaustive()
    }
}
