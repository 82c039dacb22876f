//! Task execution: drives one dequeued task from Pending to a terminal status.

use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;

use crate::types::{CANCELLED_BY_SHUTDOWN, TASK_ID_KEY, TaskId};
use crate::work::{TaskContext, WorkFn, WorkResult};

use super::TaskManager;
use super::notifier::panic_message;
use super::queue::QueuedTask;

/// How a work function's execution ended
#[derive(Debug)]
pub(crate) enum Outcome {
    /// Returned a value
    Returned(serde_json::Value),
    /// Returned an error or panicked
    Failed(String),
    /// Execution token was cancelled before the work finished
    Interrupted,
}

impl Outcome {
    fn from_join(joined: std::result::Result<WorkResult, JoinError>) -> Self {
        match joined {
            Ok(Ok(value)) => Outcome::Returned(value),
            Ok(Err(e)) => Outcome::Failed(e.to_string()),
            Err(e) if e.is_panic() => Outcome::Failed(format!(
                "work function panicked: {}",
                panic_message(e.into_panic().as_ref())
            )),
            Err(_) => Outcome::Interrupted,
        }
    }
}

impl TaskManager {
    /// Run one task popped by worker `worker`
    ///
    /// The task is skipped if it is no longer Pending (cancelled while
    /// queued). Its execution token is a child of `shutdown`, so stopping
    /// the pool interrupts it.
    pub(crate) async fn execute(&self, item: QueuedTask, worker: usize, shutdown: &CancellationToken) {
        if shutdown.is_cancelled() {
            // Popped while the pool was stopping; keep it for the next start
            self.queue.requeue(item);
            return;
        }

        let QueuedTask {
            id,
            work,
            mut params,
        } = item;

        let token = shutdown.child_token();
        let Some(record) = self.registry.begin_running(&id, token.clone()) else {
            tracing::debug!(task_id = %id, worker, "Skipping task that is no longer pending");
            return;
        };

        tracing::info!(task_id = %id, kind = %record.kind, worker, "Task started");
        self.notifier.notify(&id);

        params.insert(
            TASK_ID_KEY.to_string(),
            serde_json::Value::String(id.to_string()),
        );
        let ctx = TaskContext::new(id, params, token.clone(), self.clone());

        let outcome = match work {
            WorkFn::Async(work) => {
                // Calling the closure inside the spawned task captures its panics too
                let mut handle = tokio::spawn(async move { work(ctx).await });
                tokio::select! {
                    biased;
                    joined = &mut handle => Outcome::from_join(joined),
                    _ = token.cancelled() => {
                        handle.abort();
                        Outcome::Interrupted
                    }
                }
            }
            WorkFn::Blocking(work) => {
                let mut handle = tokio::task::spawn_blocking(move || work(ctx));
                tokio::select! {
                    biased;
                    joined = &mut handle => Outcome::from_join(joined),
                    _ = token.cancelled() => {
                        // Threads can't be interrupted; the work sees the token and
                        // its late progress reports are ignored
                        tracing::warn!(
                            task_id = %id,
                            worker,
                            "Blocking work still running after cancellation, detaching"
                        );
                        Outcome::Interrupted
                    }
                }
            }
        };

        self.finish(&id, worker, outcome);
    }

    /// Apply an execution outcome to a task that is still Running
    ///
    /// A task already moved to a terminal status (cancelled by a caller,
    /// or auto-completed by a progress report) keeps that status and the
    /// outcome is discarded.
    pub(crate) fn finish(&self, id: &TaskId, worker: usize, outcome: Outcome) {
        let record = match outcome {
            Outcome::Returned(value) => self.registry.complete(id, value).inspect(|record| {
                tracing::info!(task_id = %id, kind = %record.kind, worker, "Task completed");
            }),
            Outcome::Failed(message) => {
                self.registry
                    .fail(id, message.clone())
                    .inspect(|record| {
                        tracing::error!(
                            task_id = %id,
                            kind = %record.kind,
                            worker,
                            error = %message,
                            "Task failed"
                        );
                    })
            }
            // A caller cancel marks the record Cancelled before signalling the
            // token, so only a shutdown finds the task still Running here
            Outcome::Interrupted => self
                .registry
                .cancel(id, CANCELLED_BY_SHUTDOWN)
                .map(|(record, _)| record)
                .inspect(|record| {
                    tracing::info!(
                        task_id = %id,
                        kind = %record.kind,
                        worker,
                        "Task cancelled by shutdown"
                    );
                }),
        };

        match record {
            Some(_) => self.notifier.notify(id),
            None => {
                tracing::debug!(task_id = %id, worker, "Task already finished, outcome discarded");
            }
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn outcome_maps_join_results() {
        let ok = tokio::spawn(async { Ok::<_, crate::BoxError>(serde_json::json!(1)) }).await;
        assert!(matches!(Outcome::from_join(ok), Outcome::Returned(v) if v == 1));

        let err = tokio::spawn(async { Err::<serde_json::Value, crate::BoxError>("boom".into()) })
            .await;
        assert!(matches!(Outcome::from_join(err), Outcome::Failed(m) if m == "boom"));

        let panicked = tokio::spawn(async {
            if true {
                panic!("kaput");
            }
            Ok::<serde_json::Value, crate::BoxError>(serde_json::Value::Null)
        })
        .await;
        match Outcome::from_join(panicked) {
            Outcome::Failed(message) => assert_eq!(message, "work function panicked: kaput"),
            other => panic!("unexpected outcome {other:?}"),
        }

        let handle = tokio::spawn(async {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            Ok::<serde_json::Value, crate::BoxError>(serde_json::Value::Null)
        });
        handle.abort();
        assert!(matches!(
            Outcome::from_join(handle.await),
            Outcome::Interrupted
        ));
    }
}
