//! FIFO queue of pending tasks.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use crate::types::{Params, TaskId};
use crate::work::WorkFn;

/// A submitted task waiting for a worker
#[derive(Debug)]
pub(crate) struct QueuedTask {
    pub(crate) id: TaskId,
    pub(crate) work: WorkFn,
    pub(crate) params: Params,
}

/// Unbounded FIFO shared by the submitters and the worker pool
///
/// Workers suspend in [`pop`](Self::pop) on a [`Notify`] rather than polling.
/// [`remove_if`](Self::remove_if) scans and rebuilds the deque while holding
/// the same lock `pop` takes, so a task matched by the scan can never be
/// handed to a worker concurrently.
#[derive(Default)]
pub(crate) struct TaskQueue {
    items: Mutex<VecDeque<QueuedTask>>,
    available: Notify,
}

impl TaskQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<QueuedTask>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn push(&self, task: QueuedTask) {
        self.lock().push_back(task);
        self.available.notify_one();
    }

    /// Put a popped task back at the head of the queue
    pub(crate) fn requeue(&self, task: QueuedTask) {
        self.lock().push_front(task);
        self.available.notify_one();
    }

    /// Wait for the oldest task
    ///
    /// Cancel safe: dropping the future before it resolves never loses a task.
    pub(crate) async fn pop(&self) -> QueuedTask {
        loop {
            let notified = self.available.notified();
            let next = self.lock().pop_front();
            if let Some(task) = next {
                return task;
            }
            notified.await;
        }
    }

    #[cfg(test)]
    pub(crate) fn try_pop(&self) -> Option<QueuedTask> {
        self.lock().pop_front()
    }

    /// Remove every queued task matching `predicate`, keeping the order of the rest
    pub(crate) fn remove_if<F>(&self, mut predicate: F) -> Vec<QueuedTask>
    where
        F: FnMut(&QueuedTask) -> bool,
    {
        let mut items = self.lock();
        let (removed, kept): (Vec<QueuedTask>, Vec<QueuedTask>) =
            items.drain(..).partition(|task| predicate(task));
        *items = kept.into();
        removed
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
