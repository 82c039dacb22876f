//! Task control: cancellation, progress reporting and registry cleanup.

use crate::types::{CANCELLED_BY_CALLER, ClearCancelledReport, Event, TaskId, TaskStatus};

use super::TaskManager;
use super::registry::ProgressUpdate;

impl TaskManager {
    /// Cancel a task
    ///
    /// A Pending task is pulled from the queue and never runs. A Running
    /// task has its cancellation token signalled and its execution
    /// interrupted; `cancel` returns as soon as the signal is issued and
    /// does not wait for the work to unwind.
    ///
    /// Returns false if the task is unknown or already terminal.
    pub fn cancel(&self, id: &TaskId) -> bool {
        let Some((record, previous)) = self.registry.cancel(id, CANCELLED_BY_CALLER) else {
            tracing::debug!(task_id = %id, "Cancel ignored - task unknown or already finished");
            return false;
        };

        if previous == TaskStatus::Pending {
            let removed = self.queue.remove_if(|queued| queued.id == *id);
            // A miss means a worker already popped it; it will see Cancelled and skip
            tracing::debug!(
                task_id = %id,
                removed_from_queue = !removed.is_empty(),
                "Cancelled pending task"
            );
        }

        tracing::info!(task_id = %id, kind = %record.kind, was = %previous, "Task cancelled");
        self.notifier.notify(id);
        true
    }

    /// Cancel every Pending or Running task
    ///
    /// Returns how many tasks were cancelled.
    pub fn cancel_all(&self) -> usize {
        let cancelled = self
            .registry
            .active_ids()
            .into_iter()
            .filter(|id| self.cancel(id))
            .count();

        tracing::info!(cancelled, "Cancelled all active tasks");
        cancelled
    }

    /// Record progress for a task
    ///
    /// `progress` is clamped to [0, 100]. Updates to terminal tasks are
    /// ignored. A Running task reporting 100 or more is marked Completed
    /// unless `auto_complete_on_full_progress` is disabled.
    ///
    /// Returns true if the update was applied.
    pub fn update_progress(
        &self,
        id: &TaskId,
        progress: f64,
        processed_items: u64,
        total_items: u64,
    ) -> bool {
        let update = self.registry.update_progress(
            id,
            progress,
            processed_items,
            total_items,
            self.config.auto_complete_on_full_progress,
        );

        match update {
            ProgressUpdate::Applied(record) => {
                if record.status == TaskStatus::Completed {
                    tracing::info!(
                        task_id = %id,
                        kind = %record.kind,
                        "Task completed by reaching full progress"
                    );
                }
                self.notifier.notify(id);
                true
            }
            ProgressUpdate::Ignored(status) => {
                tracing::debug!(task_id = %id, status = %status, "Progress update ignored");
                false
            }
            ProgressUpdate::NotFound => {
                tracing::debug!(task_id = %id, "Progress update for unknown task");
                false
            }
        }
    }

    /// Delete every Cancelled record, returning how many were removed
    pub fn remove_cancelled(&self) -> usize {
        self.clear_cancelled().cleared_count
    }

    /// Delete every Cancelled record and describe what was removed
    pub fn clear_cancelled(&self) -> ClearCancelledReport {
        let report = self.registry.clear_cancelled();

        if report.cleared_count > 0 {
            tracing::info!(
                cleared = report.cleared_count,
                remaining = report.total_after,
                "Cleared cancelled tasks"
            );
            self.notifier.emit(Event::TasksCleared {
                count: report.cleared_count,
            });
        }

        report
    }

    /// Delete terminal records that finished more than `max_age` ago
    ///
    /// Returns how many records were removed.
    pub fn cleanup_finished(&self, max_age: std::time::Duration) -> usize {
        let Ok(age) = chrono::Duration::from_std(max_age) else {
            return 0;
        };
        let Some(cutoff) = chrono::Utc::now().checked_sub_signed(age) else {
            return 0;
        };

        let removed = self.registry.remove_finished_before(cutoff);
        if removed > 0 {
            tracing::info!(removed, "Removed finished tasks");
        }
        removed
    }
}
