//! Task registry: the authoritative map from task id to record.
//!
//! Every state transition happens inside one critical section of the
//! registry lock, so a worker picking a task up and a caller cancelling it
//! can never both win. The `TaskUpdated` snapshot is broadcast before that
//! lock is released, so subscribers receive a task's snapshots in the order
//! the changes were made. The lock is a `std::sync::Mutex` held only for map
//! lookups, field writes and the non-blocking broadcast send (never across an
//! `.await`), which lets blocking work functions report progress from their
//! own threads.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::types::{
    ClearCancelledReport, ClearedTask, Event, Metadata, TaskId, TaskRecord, TaskStats, TaskStatus,
    clamp_progress,
};

/// Result of applying a progress report
#[derive(Debug)]
pub(crate) enum ProgressUpdate {
    /// The update was written; snapshot after the write
    Applied(TaskRecord),
    /// The task is terminal; nothing changed
    Ignored(TaskStatus),
    /// No such task
    NotFound,
}

struct TaskEntry {
    /// Insertion order, for stable listing
    seq: u64,
    record: TaskRecord,
    /// Cancellation handle of the in-flight execution (Running only)
    execution: Option<CancellationToken>,
}

#[derive(Default)]
struct RegistryInner {
    entries: HashMap<TaskId, TaskEntry>,
    next_seq: u64,
}

pub(crate) struct TaskRegistry {
    inner: Mutex<RegistryInner>,
    events: broadcast::Sender<Event>,
}

impl TaskRegistry {
    pub(crate) fn new(events: broadcast::Sender<Event>) -> Self {
        Self {
            inner: Mutex::new(RegistryInner::default()),
            events,
        }
    }

    /// Broadcast a snapshot; callers hold the registry lock
    fn publish(&self, record: &TaskRecord) {
        self.events
            .send(Event::TaskUpdated {
                task: record.clone(),
            })
            .ok();
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        // Critical sections only assign fields, so a poisoned map is still consistent
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a Pending record under a fresh, never-used id
    pub(crate) fn create(&self, kind: String, metadata: Metadata) -> TaskRecord {
        let mut inner = self.lock();

        let mut id = TaskId::new();
        while inner.entries.contains_key(&id) {
            id = TaskId::new();
        }

        let record = TaskRecord::new(id, kind, metadata);
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.entries.insert(
            id,
            TaskEntry {
                seq,
                record: record.clone(),
                execution: None,
            },
        );
        self.publish(&record);
        record
    }

    pub(crate) fn get(&self, id: &TaskId) -> Option<TaskRecord> {
        self.lock().entries.get(id).map(|entry| entry.record.clone())
    }

    /// All records in submission order
    pub(crate) fn list(&self) -> Vec<TaskRecord> {
        let inner = self.lock();
        let mut entries: Vec<&TaskEntry> = inner.entries.values().collect();
        entries.sort_by_key(|entry| entry.seq);
        entries.into_iter().map(|entry| entry.record.clone()).collect()
    }

    /// Pending -> Running. Returns None if the task is gone or no longer Pending.
    pub(crate) fn begin_running(
        &self,
        id: &TaskId,
        execution: CancellationToken,
    ) -> Option<TaskRecord> {
        let mut inner = self.lock();
        let entry = inner.entries.get_mut(id)?;
        if entry.record.status != TaskStatus::Pending {
            return None;
        }

        entry.record.status = TaskStatus::Running;
        entry.record.started_at = Some(Utc::now());
        entry.execution = Some(execution);
        self.publish(&entry.record);
        Some(entry.record.clone())
    }

    /// Running -> Completed with the work function's value
    pub(crate) fn complete(&self, id: &TaskId, result: serde_json::Value) -> Option<TaskRecord> {
        let mut inner = self.lock();
        let entry = inner.entries.get_mut(id)?;
        if entry.record.status != TaskStatus::Running {
            return None;
        }

        entry.record.status = TaskStatus::Completed;
        entry.record.progress = 100.0;
        entry.record.result = Some(result);
        entry.record.completed_at = Some(Utc::now());
        entry.execution = None;
        self.publish(&entry.record);
        Some(entry.record.clone())
    }

    /// Running -> Failed, progress left where it was
    pub(crate) fn fail(&self, id: &TaskId, message: String) -> Option<TaskRecord> {
        let mut inner = self.lock();
        let entry = inner.entries.get_mut(id)?;
        if entry.record.status != TaskStatus::Running {
            return None;
        }

        entry.record.status = TaskStatus::Failed;
        entry.record.error_message = Some(message);
        entry.record.completed_at = Some(Utc::now());
        entry.execution = None;
        self.publish(&entry.record);
        Some(entry.record.clone())
    }

    /// {Pending, Running} -> Cancelled, signalling the in-flight execution.
    ///
    /// Returns the snapshot and the status the task had before, or None if
    /// the task is unknown or already terminal.
    pub(crate) fn cancel(&self, id: &TaskId, message: &str) -> Option<(TaskRecord, TaskStatus)> {
        let mut inner = self.lock();
        let entry = inner.entries.get_mut(id)?;
        let previous = entry.record.status;
        if previous.is_terminal() {
            return None;
        }

        entry.record.status = TaskStatus::Cancelled;
        entry.record.error_message = Some(message.to_string());
        entry.record.completed_at = Some(Utc::now());
        if let Some(token) = entry.execution.take() {
            token.cancel();
        }
        self.publish(&entry.record);
        Some((entry.record.clone(), previous))
    }

    /// Apply a progress report to a non-terminal task
    pub(crate) fn update_progress(
        &self,
        id: &TaskId,
        progress: f64,
        processed_items: u64,
        total_items: u64,
        auto_complete: bool,
    ) -> ProgressUpdate {
        let mut inner = self.lock();
        let Some(entry) = inner.entries.get_mut(id) else {
            return ProgressUpdate::NotFound;
        };
        if entry.record.is_terminal() {
            return ProgressUpdate::Ignored(entry.record.status);
        }

        entry.record.progress = clamp_progress(progress);
        entry.record.processed_items = processed_items;
        entry.record.total_items = total_items;

        if auto_complete && progress >= 100.0 && entry.record.status == TaskStatus::Running {
            entry.record.status = TaskStatus::Completed;
            entry.record.result = Some(serde_json::Value::Null);
            entry.record.completed_at = Some(Utc::now());
            entry.execution = None;
        }

        self.publish(&entry.record);
        ProgressUpdate::Applied(entry.record.clone())
    }

    /// Ids of every Pending or Running task, in submission order
    pub(crate) fn active_ids(&self) -> Vec<TaskId> {
        let inner = self.lock();
        let mut active: Vec<(u64, TaskId)> = inner
            .entries
            .values()
            .filter(|entry| !entry.record.is_terminal())
            .map(|entry| (entry.seq, entry.record.id))
            .collect();
        active.sort_unstable();
        active.into_iter().map(|(_, id)| id).collect()
    }

    /// Remove every Cancelled record
    pub(crate) fn clear_cancelled(&self) -> ClearCancelledReport {
        let mut inner = self.lock();
        let total_before = inner.entries.len();

        let mut removed: Vec<TaskEntry> = Vec::new();
        let ids: Vec<TaskId> = inner
            .entries
            .values()
            .filter(|entry| entry.record.status == TaskStatus::Cancelled)
            .map(|entry| entry.record.id)
            .collect();
        for id in ids {
            if let Some(entry) = inner.entries.remove(&id) {
                removed.push(entry);
            }
        }
        removed.sort_by_key(|entry| entry.seq);

        ClearCancelledReport {
            cleared_count: removed.len(),
            total_before,
            total_after: inner.entries.len(),
            cleared_tasks: removed
                .into_iter()
                .map(|entry| ClearedTask {
                    id: entry.record.id,
                    kind: entry.record.kind,
                    created_at: entry.record.created_at,
                    cancelled_at: entry.record.completed_at,
                })
                .collect(),
        }
    }

    /// Remove terminal records that finished before `cutoff`
    pub(crate) fn remove_finished_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut inner = self.lock();
        let before = inner.entries.len();
        inner.entries.retain(|_, entry| {
            !(entry.record.is_terminal()
                && entry
                    .record
                    .completed_at
                    .is_some_and(|completed| completed < cutoff))
        });
        before - inner.entries.len()
    }

    pub(crate) fn stats(&self) -> TaskStats {
        let inner = self.lock();
        let mut stats = TaskStats::default();
        for entry in inner.entries.values() {
            match entry.record.status {
                TaskStatus::Pending => stats.pending += 1,
                TaskStatus::Running => stats.running += 1,
                TaskStatus::Completed => stats.completed += 1,
                TaskStatus::Failed => stats.failed += 1,
                TaskStatus::Cancelled => stats.cancelled += 1,
            }
        }
        stats
    }
}
