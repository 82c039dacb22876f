//! Work functions and the context they run with.
//!
//! A [`WorkFn`] is resolved once, at construction, into one of two shapes:
//! a native future that the pool awaits on the async runtime, or a blocking
//! closure that the pool dispatches onto tokio's blocking thread pool. Both
//! receive a [`TaskContext`] and produce a [`WorkResult`].

use std::future::Future;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use crate::TaskManager;
use crate::error::BoxError;
use crate::types::{Params, TaskId, TaskStatus};

/// Value returned by a work function, or the error that made it fail
pub type WorkResult = Result<serde_json::Value, BoxError>;

type AsyncWork = Box<dyn FnOnce(TaskContext) -> BoxFuture<'static, WorkResult> + Send>;
type BlockingWork = Box<dyn FnOnce(TaskContext) -> WorkResult + Send>;

/// The operation a task executes
pub enum WorkFn {
    /// Awaited directly on the async runtime; interrupted at its next
    /// suspension point when the task is cancelled.
    Async(AsyncWork),
    /// Run on a blocking thread; must poll [`TaskContext::is_cancelled`] to
    /// honor cancellation.
    Blocking(BlockingWork),
}

impl WorkFn {
    /// Wrap an async closure
    ///
    /// ```
    /// use music_dl_tasks::WorkFn;
    ///
    /// let work = WorkFn::from_async(|ctx| async move {
    ///     ctx.report_progress(50.0, 1, 2);
    ///     Ok(serde_json::json!({ "downloaded": 2 }))
    /// });
    /// assert!(work.is_async());
    /// ```
    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: FnOnce(TaskContext) -> Fut + Send + 'static,
        Fut: Future<Output = WorkResult> + Send + 'static,
    {
        WorkFn::Async(Box::new(move |ctx| f(ctx).boxed()))
    }

    /// Wrap a blocking closure (file I/O, synchronous HTTP clients, ...)
    pub fn blocking<F>(f: F) -> Self
    where
        F: FnOnce(TaskContext) -> WorkResult + Send + 'static,
    {
        WorkFn::Blocking(Box::new(f))
    }

    /// Whether this is the native-async variant
    pub fn is_async(&self) -> bool {
        matches!(self, WorkFn::Async(_))
    }
}

impl std::fmt::Debug for WorkFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkFn::Async(_) => f.write_str("WorkFn::Async"),
            WorkFn::Blocking(_) => f.write_str("WorkFn::Blocking"),
        }
    }
}

/// Handle given to a running work function
///
/// Carries the task's parameters (with the task id injected under
/// [`TASK_ID_KEY`](crate::types::TASK_ID_KEY)), its cancellation signal and a
/// way to report progress back to the manager.
#[derive(Clone)]
pub struct TaskContext {
    id: TaskId,
    params: Params,
    cancel_token: CancellationToken,
    manager: TaskManager,
}

impl TaskContext {
    pub(crate) fn new(
        id: TaskId,
        params: Params,
        cancel_token: CancellationToken,
        manager: TaskManager,
    ) -> Self {
        Self {
            id,
            params,
            cancel_token,
            manager,
        }
    }

    /// The id of the task being executed
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// All parameters, including the injected task id
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// A single parameter
    pub fn param(&self, key: &str) -> Option<&serde_json::Value> {
        self.params.get(key)
    }

    /// Report progress for this task
    ///
    /// Returns false when the update was ignored because the task already
    /// reached a terminal status.
    pub fn report_progress(&self, progress: f64, processed_items: u64, total_items: u64) -> bool {
        self.manager
            .update_progress(&self.id, progress, processed_items, total_items)
    }

    /// Whether cancellation has been requested
    ///
    /// Batch work functions should check this before starting each item.
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Resolves once cancellation has been requested
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancel_token.cancelled()
    }

    /// Current status of this task as seen by the registry
    pub fn status(&self) -> Option<TaskStatus> {
        self.manager.get(&self.id).map(|record| record.status)
    }
}

impl std::fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskContext")
            .field("id", &self.id)
            .field("params", &self.params)
            .field("cancelled", &self.cancel_token.is_cancelled())
            .finish()
    }
}
