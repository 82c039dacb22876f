//! Worker pool startup and shutdown.

use std::sync::atomic::Ordering;

use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::types::Event;

use super::TaskManager;

impl TaskManager {
    /// Start the worker pool with `config.worker_count` workers
    ///
    /// See [`start_with_workers`](Self::start_with_workers).
    pub async fn start(&self) -> Result<()> {
        self.start_with_workers(self.config.worker_count).await
    }

    /// Start the worker pool with `workers` workers
    ///
    /// Each worker loops: wait for the next queued task, run it to a
    /// terminal status, repeat. Calling this while the pool is already
    /// running is a no-op. Starting again after [`stop`](Self::stop)
    /// re-enables submission and resumes the tasks left in the queue.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `workers` is zero.
    pub async fn start_with_workers(&self, workers: usize) -> Result<()> {
        if workers == 0 {
            return Err(Error::config(
                "worker count must be at least 1",
                "worker_count",
            ));
        }

        let mut pool = self.pool.lock().await;
        if !pool.workers.is_empty() {
            tracing::debug!(
                workers = pool.workers.len(),
                "Worker pool already running"
            );
            return Ok(());
        }

        pool.shutdown = CancellationToken::new();
        self.accepting_new.store(true, Ordering::SeqCst);

        for worker in 0..workers {
            let manager = self.clone();
            let shutdown = pool.shutdown.clone();
            pool.workers
                .push(tokio::spawn(async move { manager.run_worker(worker, shutdown).await }));
        }

        tracing::info!(workers, queued = self.queue.len(), "Worker pool started");
        Ok(())
    }

    /// Stop the worker pool
    ///
    /// This method performs the shutdown sequence:
    /// 1. Stops accepting new submissions
    /// 2. Cancels the pool's shutdown token, which wakes idle workers and
    ///    cancels every Running task ("cancelled by shutdown")
    /// 3. Waits for every worker to exit
    /// 4. Emits [`Event::Shutdown`]
    ///
    /// Pending tasks stay queued and run if the pool is started again.
    pub async fn stop(&self) {
        tracing::info!("Stopping worker pool");

        let mut pool = self.pool.lock().await;
        self.accepting_new.store(false, Ordering::SeqCst);
        pool.shutdown.cancel();

        let workers = std::mem::take(&mut pool.workers);
        let count = workers.len();
        for result in futures::future::join_all(workers).await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Worker exited abnormally");
            }
        }
        drop(pool);

        self.notifier.emit(Event::Shutdown);
        tracing::info!(
            workers = count,
            pending = self.queue.len(),
            "Worker pool stopped"
        );
    }

    /// Whether the worker pool has been started and not stopped
    pub async fn is_running(&self) -> bool {
        !self.pool.lock().await.workers.is_empty()
    }

    async fn run_worker(self, worker: usize, shutdown: CancellationToken) {
        tracing::debug!(worker, "Worker started");

        loop {
            let item = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                item = self.queue.pop() => item,
            };

            tracing::debug!(task_id = %item.id, worker, "Dequeued task");
            self.execute(item, worker, &shutdown).await;
        }

        tracing::debug!(worker, "Worker stopped");
    }
}
