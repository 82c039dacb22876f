//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`tasks`]: Task listing, inspection, cancellation and cleanup
//! - [`system`]: Health, events, OpenAPI

use serde::{Deserialize, Serialize};

mod system;
mod tasks;

// Re-export all handlers so `routes::function_name` works
pub use system::*;
pub use tasks::*;

/// Response for POST /tasks/:id/cancel
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CancelTaskResponse {
    /// Always true; failures are reported as 409
    pub cancelled: bool,
}
