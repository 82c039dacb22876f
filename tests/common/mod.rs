//! Common test utilities for music-dl-tasks integration tests

use music_dl_tasks::{Config, Event, TaskId, TaskManager, TaskRecord, TaskStatus};
use std::time::Duration;
use tokio::sync::broadcast;

/// How long to wait for an expected state before failing
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Started manager with `workers` workers
pub async fn started_manager(workers: usize) -> TaskManager {
    let config = Config {
        worker_count: workers,
        ..Default::default()
    };
    let manager = TaskManager::new(config).expect("valid config");
    manager.start().await.expect("pool starts");
    manager
}

/// Poll until the task reaches `status`
pub async fn wait_for_status(manager: &TaskManager, id: &TaskId, status: TaskStatus) -> TaskRecord {
    let deadline = tokio::time::Instant::now() + WAIT_TIMEOUT;
    loop {
        if let Some(record) = manager.get(id).filter(|r| r.status == status) {
            return record;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "task {id} never became {status}, last seen {:?}",
            manager.get(id).map(|r| r.status)
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Collect task snapshots from `events` until `id` reaches a terminal status
pub async fn collect_updates_until_terminal(
    events: &mut broadcast::Receiver<Event>,
    id: TaskId,
) -> Vec<TaskRecord> {
    let mut updates = Vec::new();
    loop {
        let event = tokio::time::timeout(WAIT_TIMEOUT, events.recv())
            .await
            .expect("event before timeout")
            .expect("channel open");
        if let Event::TaskUpdated { task } = event {
            if task.id != id {
                continue;
            }
            let terminal = task.is_terminal();
            updates.push(task);
            if terminal {
                return updates;
            }
        }
    }
}
