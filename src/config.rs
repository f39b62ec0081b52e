//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::executor::ExecutorConfig;

/// How protocol requests reach the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerMode {
    /// Every request runs as a task on the elastic worker pool
    Pooled,
    /// Requests run directly on the connection task
    Inline,
}

impl FromStr for WorkerMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pooled" => Ok(WorkerMode::Pooled),
            "inline" => Ok(WorkerMode::Inline),
            other => Err(ConfigError::UnknownWorkerMode(other.to_string())),
        }
    }
}

impl fmt::Display for WorkerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerMode::Pooled => f.write_str("pooled"),
            WorkerMode::Inline => f.write_str("inline"),
        }
    }
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Byte budget for keys plus values
    pub max_bytes: usize,
    /// Text protocol TCP port
    pub server_port: u16,
    /// Admin HTTP port
    pub admin_port: u16,
    pub worker_mode: WorkerMode,
    pub executor_max_queue: usize,
    pub executor_high_watermark: usize,
    pub executor_low_watermark: usize,
    /// Idle worker timeout in milliseconds
    pub executor_idle_timeout_ms: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_BYTES` - Cache byte budget (default: 64 MiB)
    /// - `SERVER_PORT` - Text protocol port (default: 11211)
    /// - `ADMIN_PORT` - Admin HTTP port (default: 3000)
    /// - `WORKER_MODE` - `pooled` or `inline` (default: pooled)
    /// - `EXECUTOR_MAX_QUEUE` - Pending task limit (default: 64)
    /// - `EXECUTOR_HIGH_WATERMARK` - Maximum workers (default: 8)
    /// - `EXECUTOR_LOW_WATERMARK` - Workers kept alive when idle (default: 2)
    /// - `EXECUTOR_IDLE_TIMEOUT_MS` - Idle timeout in milliseconds (default: 100)
    ///
    /// Unparseable numbers fall back to their default; an unknown worker mode
    /// is an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let worker_mode = match env::var("WORKER_MODE") {
            Ok(mode) => mode.parse()?,
            Err(_) => defaults.worker_mode,
        };

        Ok(Self {
            max_bytes: env_or("MAX_BYTES", defaults.max_bytes),
            server_port: env_or("SERVER_PORT", defaults.server_port),
            admin_port: env_or("ADMIN_PORT", defaults.admin_port),
            worker_mode,
            executor_max_queue: env_or("EXECUTOR_MAX_QUEUE", defaults.executor_max_queue),
            executor_high_watermark: env_or(
                "EXECUTOR_HIGH_WATERMARK",
                defaults.executor_high_watermark,
            ),
            executor_low_watermark: env_or(
                "EXECUTOR_LOW_WATERMARK",
                defaults.executor_low_watermark,
            ),
            executor_idle_timeout_ms: env_or(
                "EXECUTOR_IDLE_TIMEOUT_MS",
                defaults.executor_idle_timeout_ms,
            ),
        })
    }

    /// Checks the values the cache and the pool cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        self.executor_config().validate()
    }

    /// Pool settings for the request executor.
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            name: "cache-worker".to_string(),
            max_queue_size: self.executor_max_queue,
            high_watermark: self.executor_high_watermark,
            low_watermark: self.executor_low_watermark,
            idle_timeout: Duration::from_millis(self.executor_idle_timeout_ms),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_bytes: 64 * 1024 * 1024,
            server_port: 11211,
            admin_port: 3000,
            worker_mode: WorkerMode::Pooled,
            executor_max_queue: 64,
            executor_high_watermark: 8,
            executor_low_watermark: 2,
            executor_idle_timeout_ms: 100,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
