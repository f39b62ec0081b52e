//! Executor lifecycle state and observable counters.

use serde::Serialize;

/// Lifecycle of a [`super::TaskExecutor`].
///
/// `New → Running → Stopping → Stopped`. Only `Running` admits tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorState {
    /// Constructed, `start` not called yet
    New,
    /// Accepting and executing tasks
    Running,
    /// Draining queued tasks, admitting nothing new
    Stopping,
    /// Every worker has exited
    Stopped,
}

/// Snapshot of the pool, taken under the executor lock.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutorStats {
    pub state: ExecutorState,
    /// Live worker threads
    pub workers: usize,
    /// Workers blocked waiting for work
    pub idle: usize,
    /// Tasks waiting in the queue
    pub queued: usize,
    pub low_watermark: usize,
    pub high_watermark: usize,
    pub max_queue_size: usize,
}
