//! # music-dl-tasks
//!
//! Background task orchestration for a music download service.
//!
//! Long-running jobs (single songs, albums, playlists, file writes) are
//! submitted as tasks. A bounded pool of workers runs them in submission
//! order while callers track their status and progress, cancel them, or
//! clear finished records.
//!
//! ## Design
//!
//! - **Explicit handle** - a cloneable [`TaskManager`] is passed to call sites
//! - **Async and blocking work** - [`WorkFn`] runs either on the runtime or on
//!   the blocking thread pool
//! - **Event-driven** - a [`ProgressSink`] and [`TaskManager::subscribe`]
//!   push every task change, no polling required
//!
//! ## Quick Start
//!
//! ```no_run
//! use music_dl_tasks::{Config, Metadata, Params, TaskManager, WorkFn};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = TaskManager::new(Config::default())?;
//!     manager.start().await?;
//!
//!     let mut events = manager.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let id = manager.submit(
//!         "song_download",
//!         WorkFn::from_async(|ctx| async move {
//!             ctx.report_progress(50.0, 0, 1);
//!             Ok(serde_json::json!({ "path": "/music/song.flac" }))
//!         }),
//!         Params::new(),
//!         Metadata::new(),
//!     )?;
//!     println!("submitted {id}");
//!
//!     music_dl_tasks::run_with_shutdown(manager).await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Task manager implementation (decomposed into focused submodules)
pub mod manager;
/// Core types and events
pub mod types;
/// Work functions and their execution context
pub mod work;

// Re-export commonly used types
pub use config::{ApiConfig, Config};
pub use error::{ApiError, BoxError, Error, ErrorDetail, Result, ToHttpStatus};
pub use manager::{ProgressSink, TaskManager};
pub use types::{
    CANCELLED_BY_CALLER, CANCELLED_BY_SHUTDOWN, ClearCancelledReport, ClearedTask, Event,
    Metadata, Params, TASK_ID_KEY, TaskId, TaskRecord, TaskStats, TaskStatus,
};
pub use work::{TaskContext, WorkFn, WorkResult};

/// Helper function to run the manager with graceful signal handling.
///
/// Waits for a termination signal and then calls the manager's `stop()` method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use music_dl_tasks::{Config, TaskManager, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let manager = TaskManager::new(Config::default())?;
///     manager.start().await?;
///
///     // Run with automatic signal handling
///     run_with_shutdown(manager).await;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(manager: TaskManager) {
    wait_for_signal().await;
    manager.stop().await;
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            sigint.recv().await;
            tracing::info!("Received SIGINT signal (Ctrl+C)");
        }
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            sigterm.recv().await;
            tracing::info!("Received SIGTERM signal");
        }
        (Err(e), Err(_)) => {
            tracing::error!(error = %e, "Could not register any signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
