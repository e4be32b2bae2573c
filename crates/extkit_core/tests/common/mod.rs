#![allow(dead_code)]

use extkit_core::{
    populate_from_section, Category, CategoryConfiguration, CategoryError, HostContext,
    MemoryResources, Plugin,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use std::time::Duration;

/// Ordered log of category hook calls shared across categories.
#[derive(Default)]
pub struct Journal {
    events: Mutex<Vec<String>>,
    init_threads: Mutex<Vec<ThreadId>>,
    active_inits: AtomicUsize,
    max_parallel_inits: AtomicUsize,
}

impl Journal {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, event: impl Into<String>) {
        self.events.lock().expect("journal lock").push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().expect("journal lock").clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.events().iter().filter(|value| *value == event).count()
    }

    pub fn init_threads(&self) -> Vec<ThreadId> {
        self.init_threads.lock().expect("journal lock").clone()
    }

    pub fn max_parallel_inits(&self) -> usize {
        self.max_parallel_inits.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MediaSettings {
    pub quality: String,
    pub bitrate: u32,
}

/// Configuration template keyed by its category's type string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaConfig {
    category_type: String,
    pub settings: MediaSettings,
}

impl MediaConfig {
    pub fn empty(category_type: &str) -> Self {
        Self {
            category_type: category_type.to_string(),
            settings: MediaSettings::default(),
        }
    }
}

impl CategoryConfiguration for MediaConfig {
    fn category_type(&self) -> &str {
        &self.category_type
    }

    fn populate_from_json(&mut self, section: &Value) -> Result<(), serde_json::Error> {
        populate_from_section(&mut self.settings, section)
    }
}

pub struct MediaPlugin {
    key: String,
}

impl MediaPlugin {
    pub fn new(key: &str) -> Arc<Self> {
        Arc::new(Self {
            key: key.to_string(),
        })
    }
}

impl Plugin for MediaPlugin {
    fn plugin_key(&self) -> &str {
        &self.key
    }
}

pub struct MediaCategory {
    type_key: String,
    journal: Arc<Journal>,
    fail_configure: bool,
    init_delay: Duration,
    plugins: Mutex<Vec<String>>,
    applied: Mutex<Vec<MediaSettings>>,
}

impl MediaCategory {
    pub fn new(type_key: &str, journal: &Arc<Journal>) -> Arc<Self> {
        Arc::new(Self::build(type_key, journal))
    }

    pub fn failing(type_key: &str, journal: &Arc<Journal>) -> Arc<Self> {
        Arc::new(Self {
            fail_configure: true,
            ..Self::build(type_key, journal)
        })
    }

    pub fn slow(type_key: &str, journal: &Arc<Journal>, init_delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            init_delay,
            ..Self::build(type_key, journal)
        })
    }

    fn build(type_key: &str, journal: &Arc<Journal>) -> Self {
        Self {
            type_key: type_key.to_string(),
            journal: journal.clone(),
            fail_configure: false,
            init_delay: Duration::ZERO,
            plugins: Mutex::new(Vec::new()),
            applied: Mutex::new(Vec::new()),
        }
    }

    pub fn plugins(&self) -> Vec<String> {
        self.plugins.lock().expect("plugins lock").clone()
    }

    pub fn applied(&self) -> Vec<MediaSettings> {
        self.applied.lock().expect("applied lock").clone()
    }
}

impl Category for MediaCategory {
    type Plugin = MediaPlugin;
    type Configuration = MediaConfig;

    fn category_type(&self) -> &str {
        &self.type_key
    }

    fn configure(&self, config: &MediaConfig, _context: &HostContext) -> Result<(), CategoryError> {
        self.journal.push(format!("configure:{}", self.type_key));
        if self.fail_configure {
            return Err(CategoryError::new(format!(
                "{} rejected its configuration",
                self.type_key
            )));
        }
        self.applied
            .lock()
            .expect("applied lock")
            .push(config.settings.clone());
        Ok(())
    }

    fn initialize(&self, _context: &HostContext) {
        let journal = &self.journal;
        let active = journal.active_inits.fetch_add(1, Ordering::SeqCst) + 1;
        journal.max_parallel_inits.fetch_max(active, Ordering::SeqCst);
        journal
            .init_threads
            .lock()
            .expect("journal lock")
            .push(thread::current().id());
        if !self.init_delay.is_zero() {
            thread::sleep(self.init_delay);
        }
        journal.push(format!("init:{}", self.type_key));
        journal.active_inits.fetch_sub(1, Ordering::SeqCst);
    }

    fn add_plugin(&self, plugin: Arc<MediaPlugin>) -> Result<(), CategoryError> {
        self.plugins
            .lock()
            .expect("plugins lock")
            .push(plugin.plugin_key().to_string());
        Ok(())
    }

    fn remove_plugin(&self, plugin: &MediaPlugin) -> Result<(), CategoryError> {
        self.plugins
            .lock()
            .expect("plugins lock")
            .retain(|key| key != plugin.plugin_key());
        Ok(())
    }
}

pub fn context_with(resources: MemoryResources) -> HostContext {
    HostContext::new("extkit-tests", Arc::new(resources))
}
