//! Task manager implementation split into focused submodules.
//!
//! The `TaskManager` struct and its methods are organized by concern:
//! - [`registry`] - Authoritative task records and state transitions
//! - [`queue`] - FIFO of submitted tasks awaiting a worker
//! - [`notifier`] - Progress sink and event broadcast
//! - [`submission`] - Creating and enqueueing tasks
//! - [`control`] - Cancellation, progress reporting and cleanup
//! - [`pool`] - Worker pool startup and shutdown
//! - [`execution`] - Running a single task to a terminal status

mod control;
mod execution;
mod notifier;
mod pool;
mod queue;
mod registry;
mod submission;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use notifier::ProgressSink;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::Result;
use crate::types::{Event, TaskId, TaskRecord, TaskStats};

use notifier::ProgressNotifier;
use queue::TaskQueue;
use registry::TaskRegistry;

/// Worker pool bookkeeping
#[derive(Default)]
pub(crate) struct PoolState {
    /// Cancelled by `stop()`; every execution token is a child of it
    pub(crate) shutdown: CancellationToken,
    /// Handles of the running workers (empty when stopped)
    pub(crate) workers: Vec<JoinHandle<()>>,
}

/// Background task orchestrator (cloneable - all fields are Arc-wrapped)
///
/// Accepts units of work, runs them on a bounded pool of workers, tracks
/// their lifecycle and progress, and lets callers cancel them.
#[derive(Clone)]
pub struct TaskManager {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Every task ever submitted, until cleared
    pub(crate) registry: Arc<TaskRegistry>,
    /// Submitted tasks not yet picked up by a worker
    pub(crate) queue: Arc<TaskQueue>,
    /// Sink and broadcast fan-out for task changes
    pub(crate) notifier: Arc<ProgressNotifier>,
    /// Worker handles and shutdown signal
    pub(crate) pool: Arc<tokio::sync::Mutex<PoolState>>,
    /// Flag to indicate whether new tasks are accepted (false after `stop()`)
    pub(crate) accepting_new: Arc<AtomicBool>,
}

impl TaskManager {
    /// Create a new TaskManager
    ///
    /// The pool is not started; submitted tasks wait in the queue until
    /// [`start`](Self::start) is called.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the configuration
    /// fails validation.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let (event_tx, _rx) = tokio::sync::broadcast::channel(config.event_channel_capacity);

        Ok(Self {
            config: Arc::new(config),
            registry: Arc::new(TaskRegistry::new(event_tx.clone())),
            queue: Arc::new(TaskQueue::new()),
            notifier: Arc::new(ProgressNotifier::new(event_tx)),
            pool: Arc::new(tokio::sync::Mutex::new(PoolState::default())),
            accepting_new: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Subscribe to task events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events independently.
    /// A subscriber that falls behind by more than `event_channel_capacity` events
    /// receives a `RecvError::Lagged` error.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use music_dl_tasks::{Config, TaskManager};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let manager = TaskManager::new(Config::default())?;
    ///
    ///     let mut events = manager.subscribe();
    ///     tokio::spawn(async move {
    ///         while let Ok(event) = events.recv().await {
    ///             tracing::info!(?event, "task event");
    ///         }
    ///     });
    ///
    ///     manager.start().await?;
    ///     Ok(())
    /// }
    /// ```
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.notifier.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Snapshot of one task, or None if unknown
    pub fn get(&self, id: &TaskId) -> Option<TaskRecord> {
        self.registry.get(id)
    }

    /// Snapshots of every task, in submission order
    pub fn list(&self) -> Vec<TaskRecord> {
        self.registry.list()
    }

    /// Task counts per status, plus the current queue length
    pub fn stats(&self) -> TaskStats {
        let mut stats = self.registry.stats();
        stats.queued = self.queue.len();
        stats
    }

    /// Install the external progress sink, replacing any previous one
    ///
    /// The sink is called with the task id after every state change.
    ///
    /// ```
    /// use music_dl_tasks::{BoxError, Config, TaskId, TaskManager};
    /// use std::sync::Arc;
    ///
    /// let manager = TaskManager::new(Config::default()).unwrap();
    /// let reader = manager.clone();
    /// manager.set_progress_sink(Arc::new(move |id: &TaskId| -> Result<(), BoxError> {
    ///     if let Some(task) = reader.get(id) {
    ///         println!("{} {} {:.0}%", task.id, task.status, task.progress);
    ///     }
    ///     Ok(())
    /// }));
    /// ```
    pub fn set_progress_sink(&self, sink: Arc<dyn ProgressSink>) {
        self.notifier.set_sink(sink);
    }

    /// Remove the external progress sink
    pub fn clear_progress_sink(&self) {
        self.notifier.clear_sink();
    }

    /// Whether new submissions are accepted
    pub fn is_accepting(&self) -> bool {
        self.accepting_new.load(Ordering::SeqCst)
    }

    /// Spawn the REST API server in a background task
    ///
    /// Returns the JoinHandle of the server task. The server listens on
    /// `config.api.bind_address` until the process exits.
    pub fn spawn_api_server(&self) -> JoinHandle<Result<()>> {
        let manager = self.clone();
        let config = self.get_config();

        tokio::spawn(async move { crate::api::start_api_server(manager, config).await })
    }
}
