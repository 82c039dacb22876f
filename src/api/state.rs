//! Application state for the API server

use crate::{Config, TaskManager};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request; both fields are cheap handles.
#[derive(Clone)]
pub struct AppState {
    /// The task manager serving the requests
    pub manager: TaskManager,

    /// Configuration (read-only)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(manager: TaskManager, config: Arc<Config>) -> Self {
        Self { manager, config }
    }
}
