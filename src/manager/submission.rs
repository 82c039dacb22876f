//! Creating and enqueueing tasks.

use std::sync::atomic::Ordering;

use crate::error::{Error, Result};
use crate::types::{Metadata, Params, TASK_ID_KEY, TaskId};
use crate::work::WorkFn;

use super::TaskManager;
use super::queue::QueuedTask;

impl TaskManager {
    /// Submit a unit of work
    ///
    /// Creates a Pending record and appends the task to the queue. The work
    /// function runs once a worker frees up; `params` is handed to it with the
    /// task id injected under `"task_id"`. `metadata` is display-only and
    /// ends up on the record.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidSubmission`] if `kind` is blank or `params` already
    ///   uses the reserved `"task_id"` key
    /// - [`Error::ShuttingDown`] if the pool has been stopped
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use music_dl_tasks::*;
    /// # async fn example(manager: TaskManager) -> Result<()> {
    /// let mut params = Params::new();
    /// params.insert("playlist_id".into(), serde_json::json!("PL42"));
    ///
    /// let id = manager.submit(
    ///     "playlist_download",
    ///     WorkFn::from_async(|ctx| async move {
    ///         for i in 1..=10u64 {
    ///             if ctx.is_cancelled() {
    ///                 break;
    ///             }
    ///             ctx.report_progress(i as f64 * 10.0, i, 10);
    ///         }
    ///         Ok(serde_json::json!({ "songs": 10 }))
    ///     }),
    ///     params,
    ///     Metadata::new(),
    /// )?;
    /// println!("queued {id}");
    /// # Ok(())
    /// # }
    /// ```
    pub fn submit(
        &self,
        kind: impl Into<String>,
        work: WorkFn,
        params: Params,
        metadata: Metadata,
    ) -> Result<TaskId> {
        let kind = kind.into();

        if kind.trim().is_empty() {
            return Err(Error::invalid_submission("kind must not be empty"));
        }
        if params.contains_key(TASK_ID_KEY) {
            return Err(Error::invalid_submission(format!(
                "parameter '{TASK_ID_KEY}' is reserved"
            )));
        }
        if !self.accepting_new.load(Ordering::SeqCst) {
            tracing::warn!(kind = %kind, "Rejecting submission - manager is stopped");
            return Err(Error::ShuttingDown);
        }

        let record = self.registry.create(kind, metadata);
        let id = record.id;

        // Announce Pending before a worker can see the task
        self.notifier.notify(&id);
        self.queue.push(QueuedTask { id, work, params });

        tracing::info!(
            task_id = %id,
            kind = %record.kind,
            queued = self.queue.len(),
            "Task submitted"
        );

        Ok(id)
    }
}
