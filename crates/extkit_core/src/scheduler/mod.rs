//! Initialization scheduling for configured categories.
//!
//! # Responsibility
//! - Run category `initialize` hooks off the caller's thread.
//! - Allow tests to swap in a synchronous scheduler.
//!
//! # Invariants
//! - `SingleWorkerScheduler` runs tasks one at a time, in submission order.
//! - `submit` never blocks; the queue is unbounded.
//! - A panicking task never stops later tasks from running.

use log::{error, info, warn};
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;
use std::thread::{self, JoinHandle};

/// Default name of the initialization worker thread.
pub const DEFAULT_WORKER_NAME: &str = "extkit-init";

/// Unit of initialization work.
pub type InitializationTask = Box<dyn FnOnce() + Send + 'static>;

/// Executor receiving one initialization task per configured category.
pub trait InitializationScheduler: Send + Sync {
    /// Enqueues `task`; must neither wait for it to run nor block on queue
    /// space, since the registry calls it while holding its lock.
    fn submit(&self, task: InitializationTask);
}

/// Options for `SingleWorkerScheduler`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerOptions {
    pub thread_name: String,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            thread_name: DEFAULT_WORKER_NAME.to_string(),
        }
    }
}

/// One dedicated worker thread fed by an unbounded FIFO queue.
pub struct SingleWorkerScheduler {
    sender: Mutex<Option<Sender<InitializationTask>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SingleWorkerScheduler {
    /// Spawns the worker with default options.
    pub fn start() -> std::io::Result<Self> {
        Self::with_options(SchedulerOptions::default())
    }

    /// Spawns the worker thread.
    ///
    /// # Errors
    /// - Returns the OS error when the thread cannot be spawned.
    pub fn with_options(options: SchedulerOptions) -> std::io::Result<Self> {
        let (sender, receiver) = mpsc::channel();
        let worker = thread::Builder::new()
            .name(options.thread_name.clone())
            .spawn(move || run_worker(receiver))?;
        info!(
            "event=scheduler_start module=scheduler status=ok thread={}",
            options.thread_name
        );
        Ok(Self {
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Closes the queue, waits for queued tasks to finish and joins the worker.
    ///
    /// Tasks submitted afterwards are dropped with a warning.
    pub fn shutdown(&self) {
        drop(lock(&self.sender).take());
        let Some(worker) = lock(&self.worker).take() else {
            return;
        };
        if worker.thread().id() == thread::current().id() {
            // Why: joining the current thread would never return; the worker
            // exits on its own once the closed queue drains.
            return;
        }
        if worker.join().is_err() {
            error!("event=scheduler_stop module=scheduler status=error error_code=worker_panicked");
            return;
        }
        info!("event=scheduler_stop module=scheduler status=ok");
    }
}

impl InitializationScheduler for SingleWorkerScheduler {
    fn submit(&self, task: InitializationTask) {
        // Why: send outside the sender lock so `shutdown` never waits on a
        // submitting thread.
        let sender = lock(&self.sender).clone();
        let Some(sender) = sender else {
            warn!("event=init_submit module=scheduler status=dropped reason=shut_down");
            return;
        };
        if sender.send(task).is_err() {
            warn!("event=init_submit module=scheduler status=dropped reason=worker_gone");
        }
    }
}

impl Drop for SingleWorkerScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Runs every task immediately on the submitting thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineScheduler;

impl InitializationScheduler for InlineScheduler {
    fn submit(&self, task: InitializationTask) {
        run_task(task);
    }
}

fn run_worker(receiver: Receiver<InitializationTask>) {
    for task in receiver {
        run_task(task);
    }
}

fn run_task(task: InitializationTask) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
        let message = payload
            .downcast_ref::<&str>()
            .map(|value| (*value).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        error!(
            "event=init_task module=scheduler status=error error_code=task_panicked payload={}",
            message.replace(['\n', '\r'], " ")
        );
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
