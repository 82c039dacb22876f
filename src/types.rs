//! Core types for music-dl-tasks

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;
use uuid::Uuid;

/// Reserved parameter key under which a task's own id is injected before its
/// work function runs.
pub const TASK_ID_KEY: &str = "task_id";

/// Error message recorded on tasks cancelled through [`TaskManager::cancel`](crate::TaskManager::cancel)
pub const CANCELLED_BY_CALLER: &str = "cancelled by caller";

/// Error message recorded on tasks cancelled because the pool was stopped
pub const CANCELLED_BY_SHUTDOWN: &str = "cancelled by shutdown";

/// Parameter bag handed to a work function
pub type Params = HashMap<String, serde_json::Value>;

/// Display-only metadata attached to a task at submission
pub type Metadata = HashMap<String, serde_json::Value>;

/// Unique identifier for a task
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct TaskId(pub Uuid);

impl TaskId {
    /// Generate a fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for TaskId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Task lifecycle status
///
/// ```text
/// Pending --> Running --> Completed | Failed | Cancelled
///    \-----------------------------------------^
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Waiting in the queue
    Pending,
    /// Picked up by a worker
    Running,
    /// Work function returned a value
    Completed,
    /// Work function failed
    Failed,
    /// Cancelled while pending or running
    Cancelled,
}

impl TaskStatus {
    /// Completed, Failed and Cancelled are absorbing
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    /// Lowercase name, matching the serialized form
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one task and its lifecycle state
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TaskRecord {
    /// Task ID
    pub id: TaskId,
    /// Category of work (e.g. "playlist_download")
    pub kind: String,
    /// Current status
    pub status: TaskStatus,
    /// When the task was submitted
    pub created_at: DateTime<Utc>,
    /// When a worker picked the task up
    pub started_at: Option<DateTime<Utc>>,
    /// When the task reached a terminal status
    pub completed_at: Option<DateTime<Utc>>,
    /// Progress percentage (0.0 to 100.0)
    pub progress: f64,
    /// Number of sub-items (e.g. songs in a playlist)
    pub total_items: u64,
    /// Number of sub-items processed so far
    pub processed_items: u64,
    /// Value returned by the work function (Completed only)
    #[schema(value_type = Option<Object>)]
    pub result: Option<serde_json::Value>,
    /// Failure or cancellation message (Failed and Cancelled only)
    pub error_message: Option<String>,
    /// Display metadata supplied at submission
    #[schema(value_type = Object)]
    pub metadata: Metadata,
}

impl TaskRecord {
    pub(crate) fn new(id: TaskId, kind: String, metadata: Metadata) -> Self {
        Self {
            id,
            kind,
            status: TaskStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            progress: 0.0,
            total_items: 0,
            processed_items: 0,
            result: None,
            error_message: None,
            metadata,
        }
    }

    /// Whether the task has reached an absorbing status
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Clamp a reported progress value into [0, 100]; NaN counts as 0
pub(crate) fn clamp_progress(progress: f64) -> f64 {
    if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 100.0)
    }
}

/// Summary of one task removed by [`TaskManager::clear_cancelled`](crate::TaskManager::clear_cancelled)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ClearedTask {
    /// Task ID
    pub id: TaskId,
    /// Category of work
    pub kind: String,
    /// When the task was submitted
    pub created_at: DateTime<Utc>,
    /// When the task was cancelled
    pub cancelled_at: Option<DateTime<Utc>>,
}

/// Outcome of clearing cancelled tasks from the registry
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ClearCancelledReport {
    /// Number of records removed
    pub cleared_count: usize,
    /// Registry size before clearing
    pub total_before: usize,
    /// Registry size after clearing
    pub total_after: usize,
    /// The removed tasks
    pub cleared_tasks: Vec<ClearedTask>,
}

/// Task counts per status
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TaskStats {
    /// Tasks waiting in the queue
    pub pending: usize,
    /// Tasks currently executing
    pub running: usize,
    /// Tasks that completed
    pub completed: usize,
    /// Tasks that failed
    pub failed: usize,
    /// Tasks that were cancelled
    pub cancelled: usize,
    /// Entries currently sitting in the queue
    pub queued: usize,
}

impl TaskStats {
    /// Total number of records
    pub fn total(&self) -> usize {
        self.pending + self.running + self.completed + self.failed + self.cancelled
    }
}

/// Event broadcast to subscribers of [`TaskManager::subscribe`](crate::TaskManager::subscribe)
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A task changed state or reported progress
    TaskUpdated {
        /// Snapshot taken right after the change
        task: TaskRecord,
    },

    /// Cancelled tasks were removed from the registry
    TasksCleared {
        /// Number of records removed
        count: usize,
    },

    /// The worker pool was stopped
    Shutdown,
}
