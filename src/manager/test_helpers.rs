//! Shared test helpers for creating TaskManager instances and work functions.

use crate::config::Config;
use crate::error::BoxError;
use crate::manager::TaskManager;
use crate::types::{Metadata, Params, TaskId, TaskRecord, TaskStatus};
use crate::work::WorkFn;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;

/// How long a test waits for an expected state before failing
pub(crate) const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Helper to create a TaskManager with `workers` workers (pool not started)
pub(crate) fn create_test_manager(workers: usize) -> TaskManager {
    let config = Config {
        worker_count: workers,
        ..Config::default()
    };
    TaskManager::new(config).unwrap()
}

/// Helper to create and start a TaskManager with `workers` workers
pub(crate) async fn start_test_manager(workers: usize) -> TaskManager {
    let manager = create_test_manager(workers);
    manager.start().await.unwrap();
    manager
}

/// Submit with no params or metadata
pub(crate) fn submit(manager: &TaskManager, kind: &str, work: WorkFn) -> TaskId {
    manager
        .submit(kind, work, Params::new(), Metadata::new())
        .unwrap()
}

/// Async work that sleeps then returns `value`
pub(crate) fn sleep_then(ms: u64, value: serde_json::Value) -> WorkFn {
    WorkFn::from_async(move |_ctx| async move {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(value)
    })
}

/// Async work that fails with `message`
pub(crate) fn failing(message: &'static str) -> WorkFn {
    WorkFn::from_async(move |_ctx| async move { Err::<serde_json::Value, BoxError>(message.into()) })
}

/// Gate that holds work functions until the test releases them
#[derive(Clone)]
pub(crate) struct Gate {
    permits: Arc<Semaphore>,
    entered: Arc<AtomicUsize>,
}

impl Gate {
    pub(crate) fn new() -> Self {
        Self {
            permits: Arc::new(Semaphore::new(0)),
            entered: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Async work that blocks on the gate, then returns `value`
    pub(crate) fn work(&self, value: serde_json::Value) -> WorkFn {
        let gate = self.clone();
        WorkFn::from_async(move |_ctx| async move {
            gate.entered.fetch_add(1, Ordering::SeqCst);
            if let Ok(permit) = gate.permits.acquire().await {
                permit.forget();
            }
            Ok(value)
        })
    }

    /// Number of work functions that have started
    pub(crate) fn entered(&self) -> usize {
        self.entered.load(Ordering::SeqCst)
    }

    /// Let `n` gated work functions finish
    pub(crate) fn release(&self, n: usize) {
        self.permits.add_permits(n);
    }
}

/// Async work that bumps `counter` at a checkpoint every 10ms for ~100s
///
/// Never looks at its cancellation token, so only interruption stops it.
pub(crate) fn checkpoint_work(counter: Arc<AtomicUsize>) -> WorkFn {
    WorkFn::from_async(move |_ctx| async move {
        for _ in 0..10_000 {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        Ok(serde_json::Value::Null)
    })
}

/// Poll until `condition` holds, panicking after [`WAIT_TIMEOUT`]
pub(crate) async fn wait_until<F>(what: &str, mut condition: F)
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + WAIT_TIMEOUT;
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {what}"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Wait until the task reaches `status` and return its record
pub(crate) async fn wait_for_status(
    manager: &TaskManager,
    id: &TaskId,
    status: TaskStatus,
) -> TaskRecord {
    wait_until(&format!("task {id} to be {status}"), || {
        manager.get(id).is_some_and(|r| r.status == status)
    })
    .await;
    manager.get(id).unwrap()
}
