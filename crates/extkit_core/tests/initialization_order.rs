mod common;

use common::{context_with, Journal, MediaCategory, MediaConfig, MediaPlugin};
use extkit_core::{
    Category, CategoryError, ExtensionRegistry, HostContext, InitializationScheduler,
    InitializationTask, MemoryResources, SchedulerOptions,
};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, Weak};
use std::thread;
use std::time::Duration;

fn register(registry: &ExtensionRegistry, category: &Arc<MediaCategory>, plugin_key: &str) {
    registry
        .register_plugin(
            category,
            MediaPlugin::new(plugin_key),
            "media",
            MediaConfig::empty(category.category_type()),
        )
        .expect("plugin registers");
}

#[test]
fn initializations_run_fifo_on_one_worker() {
    let journal = Journal::new();
    let registry = ExtensionRegistry::with_worker(SchedulerOptions::default()).expect("worker");
    let first = registry.register_category(MediaCategory::slow(
        "c1",
        &journal,
        Duration::from_millis(30),
    ));
    let second = registry.register_category(MediaCategory::new("c2", &journal));
    register(&registry, &first, "a_first");
    register(&registry, &second, "b_second");
    let context = context_with(MemoryResources::new().with("media", "{}"));

    let report = registry.configure(&context).expect("configure succeeds");
    assert_eq!(report.configured_plugin_keys(), vec!["a_first", "b_second"]);
    drop(registry);

    let inits: Vec<String> = journal
        .events()
        .into_iter()
        .filter(|event| event.starts_with("init:"))
        .collect();
    assert_eq!(inits, vec!["init:c1".to_string(), "init:c2".to_string()]);
    assert_eq!(journal.max_parallel_inits(), 1);

    let threads = journal.init_threads();
    assert_eq!(threads.len(), 2);
    assert_eq!(threads[0], threads[1]);
    assert_ne!(threads[0], thread::current().id());
}

/// Category whose initialization waits until the test releases it.
struct GatedCategory {
    gate: Mutex<Option<Receiver<()>>>,
    done: Sender<&'static str>,
}

struct GatedPlugin;

impl extkit_core::Plugin for GatedPlugin {
    fn plugin_key(&self) -> &str {
        "gated"
    }
}

impl Category for GatedCategory {
    type Plugin = GatedPlugin;
    type Configuration = MediaConfig;

    fn category_type(&self) -> &str {
        "gated"
    }

    fn configure(&self, _config: &MediaConfig, _context: &HostContext) -> Result<(), CategoryError> {
        Ok(())
    }

    fn initialize(&self, _context: &HostContext) {
        if let Some(gate) = self.gate.lock().expect("gate lock").take() {
            let _ = gate.recv();
        }
        let _ = self.done.send("initialized");
    }

    fn add_plugin(&self, _plugin: Arc<GatedPlugin>) -> Result<(), CategoryError> {
        Ok(())
    }

    fn remove_plugin(&self, _plugin: &GatedPlugin) -> Result<(), CategoryError> {
        Ok(())
    }
}

#[test]
fn configure_returns_before_initialization_finishes() {
    let (release, gate) = mpsc::channel();
    let (done_tx, done_rx) = mpsc::channel();
    let registry = ExtensionRegistry::with_worker(SchedulerOptions::default()).expect("worker");
    let category = registry.register_category(Arc::new(GatedCategory {
        gate: Mutex::new(Some(gate)),
        done: done_tx,
    }));
    registry
        .register_plugin(
            &category,
            Arc::new(GatedPlugin),
            "media",
            MediaConfig::empty("gated"),
        )
        .expect("plugin registers");
    let context = context_with(MemoryResources::new().with("media", "{}"));

    registry.configure(&context).expect("configure succeeds");
    assert!(done_rx.try_recv().is_err());

    release.send(()).expect("release initialization");
    assert_eq!(
        done_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("initialization completes"),
        "initialized"
    );
}

/// Runs `configure` on another thread and waits a bounded time for it.
fn configure_within(
    registry: &Arc<ExtensionRegistry>,
    context: HostContext,
    limit: Duration,
) -> Vec<String> {
    let (finished_tx, finished_rx) = mpsc::channel();
    let caller = registry.clone();
    thread::spawn(move || {
        let keys = caller
            .configure(&context)
            .map(|report| {
                report
                    .configured_plugin_keys()
                    .into_iter()
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .expect("configure succeeds");
        drop(caller);
        let _ = finished_tx.send(keys);
    });
    finished_rx
        .recv_timeout(limit)
        .expect("configure returns without waiting on initializations")
}

#[test]
fn configure_returns_while_worker_is_blocked_with_deep_queue() {
    let (release, gate) = mpsc::channel();
    let (done_tx, done_rx) = mpsc::channel();
    let journal = Journal::new();
    let registry = Arc::new(ExtensionRegistry::new().expect("worker"));
    let gated = registry.register_category(Arc::new(GatedCategory {
        gate: Mutex::new(Some(gate)),
        done: done_tx,
    }));
    registry
        .register_plugin(&gated, Arc::new(GatedPlugin), "media", MediaConfig::empty("gated"))
        .expect("plugin registers");
    let media = registry.register_category(MediaCategory::new("media", &journal));
    for index in 0..200 {
        register(&registry, &media, &format!("p{index:03}"));
    }
    let context = context_with(MemoryResources::new().with("media", "{}"));

    let configured = configure_within(&registry, context, Duration::from_secs(5));
    assert_eq!(configured.len(), 201);
    assert_eq!(configured[0], "gated");
    assert!(done_rx.try_recv().is_err());
    assert_eq!(journal.count("init:media"), 0);

    release.send(()).expect("release initialization");
    assert_eq!(
        done_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("gated initialization completes"),
        "initialized"
    );
    drop(registry);
    assert_eq!(journal.count("init:media"), 200);
}

/// Category whose initialization queries the registry that scheduled it.
struct ReentrantCategory {
    registry: Weak<ExtensionRegistry>,
    seen: Sender<bool>,
}

impl Category for ReentrantCategory {
    type Plugin = MediaPlugin;
    type Configuration = MediaConfig;

    fn category_type(&self) -> &str {
        "reentrant"
    }

    fn configure(&self, _config: &MediaConfig, _context: &HostContext) -> Result<(), CategoryError> {
        Ok(())
    }

    fn initialize(&self, _context: &HostContext) {
        if let Some(registry) = self.registry.upgrade() {
            let _ = self.seen.send(registry.is_configured());
        }
    }

    fn add_plugin(&self, _plugin: Arc<MediaPlugin>) -> Result<(), CategoryError> {
        Ok(())
    }

    fn remove_plugin(&self, _plugin: &MediaPlugin) -> Result<(), CategoryError> {
        Ok(())
    }
}

#[test]
fn initialization_may_call_back_into_registry() {
    let (seen_tx, seen_rx) = mpsc::channel();
    let registry = Arc::new(ExtensionRegistry::new().expect("worker"));
    let category = registry.register_category(Arc::new(ReentrantCategory {
        registry: Arc::downgrade(&registry),
        seen: seen_tx,
    }));
    let extensions = 150;
    for index in 0..extensions {
        registry
            .register_plugin(
                &category,
                MediaPlugin::new(&format!("r{index:03}")),
                "media",
                MediaConfig::empty("reentrant"),
            )
            .expect("plugin registers");
    }
    let context = context_with(MemoryResources::new().with("media", "{}"));

    let configured = configure_within(&registry, context, Duration::from_secs(5));
    assert_eq!(configured.len(), extensions);

    for _ in 0..extensions {
        let configured_flag = seen_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("initialization reaches the registry");
        assert!(configured_flag);
    }
}

/// Scheduler that records tasks so the test decides when they run.
#[derive(Default)]
struct DeferredScheduler {
    tasks: Arc<Mutex<Vec<InitializationTask>>>,
}

impl InitializationScheduler for DeferredScheduler {
    fn submit(&self, task: InitializationTask) {
        self.tasks.lock().expect("tasks lock").push(task);
    }
}

#[test]
fn injected_scheduler_receives_one_task_per_configured_extension() {
    let journal = Journal::new();
    let scheduler = DeferredScheduler::default();
    let tasks = scheduler.tasks.clone();
    let registry = ExtensionRegistry::with_scheduler(Box::new(scheduler));
    let video = registry.register_category(MediaCategory::new("video", &journal));
    let audio = registry.register_category(MediaCategory::new("audio", &journal));
    register(&registry, &video, "a_video");
    register(&registry, &audio, "b_audio");
    let context = context_with(MemoryResources::new().with("media", "{}"));

    registry.configure(&context).expect("configure succeeds");
    assert_eq!(journal.count("init:video"), 0);

    let queued: Vec<InitializationTask> = tasks.lock().expect("tasks lock").drain(..).collect();
    assert_eq!(queued.len(), 2);
    for task in queued {
        task();
    }
    assert_eq!(journal.count("init:video"), 1);
    assert_eq!(journal.count("init:audio"), 1);
}
