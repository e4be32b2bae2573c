//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `extkit_core` wiring end to end: register a sample category,
//!   configure it from a directory of JSON files and run its initialization.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Usage: `extkit_cli <config_dir> [log_dir]`

use extkit_core::{
    default_log_level, init_logging, populate_from_section, Category, CategoryConfiguration,
    CategoryError, ExtensionRegistry, HostContext, Plugin,
};
use log::info;
use serde::Deserialize;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

const SAMPLE_CATEGORY: &str = "video";
const SAMPLE_CONFIG_FILE: &str = "videoconfiguration";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct VideoSettings {
    quality: String,
    autoplay: bool,
}

#[derive(Debug, Default)]
struct VideoConfiguration {
    settings: VideoSettings,
}

impl CategoryConfiguration for VideoConfiguration {
    fn category_type(&self) -> &str {
        SAMPLE_CATEGORY
    }

    fn populate_from_json(&mut self, section: &serde_json::Value) -> Result<(), serde_json::Error> {
        populate_from_section(&mut self.settings, section)
    }
}

struct VideoPlugin;

impl Plugin for VideoPlugin {
    fn plugin_key(&self) -> &str {
        "sample_video"
    }
}

#[derive(Default)]
struct VideoCategory {
    settings: Mutex<Option<VideoSettings>>,
}

impl Category for VideoCategory {
    type Plugin = VideoPlugin;
    type Configuration = VideoConfiguration;

    fn category_type(&self) -> &str {
        SAMPLE_CATEGORY
    }

    fn configure(
        &self,
        config: &VideoConfiguration,
        _context: &HostContext,
    ) -> Result<(), CategoryError> {
        *self
            .settings
            .lock()
            .map_err(|_| CategoryError::new("video settings lock poisoned"))? =
            Some(config.settings.clone());
        Ok(())
    }

    fn initialize(&self, context: &HostContext) {
        let settings = self.settings.lock().ok().and_then(|value| value.clone());
        info!(
            "event=category_init module=cli status=ok app_id={} settings={:?}",
            context.app_id(),
            settings
        );
        println!("video initialized settings={settings:?}");
    }

    fn add_plugin(&self, _plugin: Arc<VideoPlugin>) -> Result<(), CategoryError> {
        Ok(())
    }

    fn remove_plugin(&self, _plugin: &VideoPlugin) -> Result<(), CategoryError> {
        Ok(())
    }
}

fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);
    let Some(config_dir) = args.next() else {
        eprintln!("usage: extkit_cli <config_dir> [log_dir]");
        return ExitCode::from(2);
    };
    if let Some(log_dir) = args.next() {
        if let Err(err) = init_logging(default_log_level(), &log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    println!("extkit_core version={}", extkit_core::core_version());
    match run(&config_dir) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(config_dir: &str) -> Result<(), Box<dyn std::error::Error>> {
    let registry = ExtensionRegistry::new()?;
    let video = registry.register_category(Arc::new(VideoCategory::default()));
    registry.register_plugin(
        &video,
        Arc::new(VideoPlugin),
        SAMPLE_CONFIG_FILE,
        VideoConfiguration::default(),
    )?;

    let context = HostContext::with_directory("extkit_cli", config_dir);
    let report = registry.configure(&context)?;
    for entry in &report.configured {
        println!(
            "configured plugin={} category={} section={:?}",
            entry.plugin_key, entry.category_type, entry.section
        );
    }
    for entry in &report.skipped {
        println!(
            "skipped plugin={} category={} error={}",
            entry.plugin_key, entry.category_type, entry.error
        );
    }
    // Why: the worker must drain before exit, or the sample init line
    // may never print; dropping the registry joins it.
    drop(registry);
    Ok(())
}
