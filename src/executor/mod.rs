//! Executor Module
//!
//! Elastic pool of OS worker threads running fire-and-forget tasks.
//!
//! The pool keeps `low_watermark` workers warm, grows up to `high_watermark`
//! under load, and lets surplus workers exit after `idle_timeout` without
//! work. Admission is bounded by `max_queue_size`; a full queue or a pool
//! that is not running rejects the task instead of blocking the producer.

mod pool;
mod state;
mod worker;

use std::time::Duration;

use crate::error::ConfigError;

pub use pool::{Task, TaskExecutor};
pub use state::{ExecutorState, ExecutorStats};

// == Executor Config ==
/// Construction parameters of a [`TaskExecutor`].
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Prefix for worker thread names
    pub name: String,
    /// Pending tasks allowed beyond those a free worker can take at once
    pub max_queue_size: usize,
    /// Maximum number of worker threads
    pub high_watermark: usize,
    /// Workers kept alive while running, even when idle
    pub low_watermark: usize,
    /// How long a surplus worker waits for work before exiting
    pub idle_timeout: Duration,
}

impl ExecutorConfig {
    /// Rejects watermarks the pool cannot honour: it needs at least one
    /// worker, and never starts more than `high_watermark`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.high_watermark == 0 {
            return Err(ConfigError::ZeroHighWatermark);
        }
        if self.low_watermark > self.high_watermark {
            return Err(ConfigError::WatermarkOrder {
                low: self.low_watermark,
                high: self.high_watermark,
            });
        }
        Ok(())
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            name: "executor".to_string(),
            max_queue_size: 64,
            high_watermark: 8,
            low_watermark: 2,
            idle_timeout: Duration::from_millis(100),
        }
    }
}
