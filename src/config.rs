//! Configuration types for music-dl-tasks

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use utoipa::ToSchema;

/// Main configuration for [`TaskManager`](crate::TaskManager)
///
/// Every field has a default, so an empty JSON/TOML document deserializes to
/// a working configuration.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Number of concurrent workers in the pool (default: 5)
    ///
    /// Reflects how many downloads may run at the same time.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Capacity of the task event broadcast channel (default: 1000)
    ///
    /// Subscribers that fall further behind than this receive a `Lagged` error.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Mark a running task Completed when it reports progress >= 100 (default: true)
    ///
    /// Work functions that never return a terminal signal still reach
    /// Completed through progress reporting alone. Disable to make the
    /// work function's return value the only way to complete a task.
    #[serde(default = "default_true")]
    pub auto_complete_on_full_progress: bool,

    /// REST API settings
    #[serde(default)]
    pub api: ApiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            event_channel_capacity: default_event_channel_capacity(),
            auto_complete_on_full_progress: true,
            api: ApiConfig::default(),
        }
    }
}

impl Config {
    /// Check that the configuration can be used to build a manager
    pub fn validate(&self) -> Result<()> {
        if self.worker_count == 0 {
            return Err(Error::config(
                "worker_count must be at least 1",
                "worker_count",
            ));
        }
        if self.event_channel_capacity == 0 {
            return Err(Error::config(
                "event_channel_capacity must be at least 1",
                "event_channel_capacity",
            ));
        }
        Ok(())
    }
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:6790)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
        }
    }
}

fn default_worker_count() -> usize {
    5
}

fn default_event_channel_capacity() -> usize {
    1000
}

fn default_true() -> bool {
    true
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 6790))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}
