//! Task Executor
//!
//! Bounded, self-sizing thread pool with cooperative shutdown.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, warn};

use super::state::{ExecutorState, ExecutorStats};
use super::worker;
use super::ExecutorConfig;
use crate::error::{ExecutorError, RejectReason};

/// Unit of work run by the pool. Results travel through the task's own captures.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

pub(crate) type WorkerId = usize;

// == Shared State ==
/// Everything guarded by the executor lock.
pub(crate) struct Inner {
    pub(crate) state: ExecutorState,
    pub(crate) queue: VecDeque<Task>,
    /// Live workers, counted from spawn until the worker leaves its loop
    pub(crate) workers: usize,
    /// Workers blocked in the wait for work
    pub(crate) idle: usize,
    /// Spawned workers that have not entered their loop yet
    pub(crate) starting: usize,
    /// Exited workers whose handles are still registered
    pub(crate) finished: Vec<WorkerId>,
    handles: HashMap<WorkerId, JoinHandle<()>>,
    next_id: WorkerId,
}

impl Inner {
    /// Workers that will pick up work without a new spawn, minus the tasks
    /// already queued for them.
    fn free_workers(&self) -> usize {
        (self.idle + self.starting).saturating_sub(self.queue.len())
    }

    /// Queued tasks no free worker can claim, if one more were enqueued.
    fn backlog_with_one_more(&self, extra_workers: usize) -> usize {
        (self.queue.len() + 1).saturating_sub(self.idle + self.starting + extra_workers)
    }

    /// Takes the handles of workers that already left their loop.
    fn reap(&mut self) -> Vec<JoinHandle<()>> {
        let finished = std::mem::take(&mut self.finished);
        finished
            .into_iter()
            .filter_map(|id| self.handles.remove(&id))
            .collect()
    }
}

pub(crate) struct Shared {
    pub(crate) config: ExecutorConfig,
    pub(crate) inner: Mutex<Inner>,
    /// Signalled when a task is queued or the state leaves `Running`
    pub(crate) work_available: Condvar,
    /// Signalled once the last worker exits during shutdown
    pub(crate) all_stopped: Condvar,
}

// == Task Executor ==
/// Elastic worker pool.
///
/// Tasks are fire-and-forget: acceptance is the only thing the caller learns.
/// A task that panics aborts the process.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use mini_memcached::executor::{ExecutorConfig, TaskExecutor};
///
/// let executor = TaskExecutor::new(ExecutorConfig {
///     name: "doc".to_string(),
///     max_queue_size: 8,
///     high_watermark: 2,
///     low_watermark: 1,
///     idle_timeout: Duration::from_millis(50),
/// });
/// executor.start().unwrap();
/// assert!(executor.submit(|| println!("hello from a worker")));
/// executor.stop(true);
/// assert!(!executor.submit(|| ()));
/// ```
pub struct TaskExecutor {
    shared: Arc<Shared>,
}

impl TaskExecutor {
    // == Constructor ==
    /// Creates a pool in the `New` state. No threads exist until [`Self::start`].
    pub fn new(config: ExecutorConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                inner: Mutex::new(Inner {
                    state: ExecutorState::New,
                    queue: VecDeque::new(),
                    workers: 0,
                    idle: 0,
                    starting: 0,
                    finished: Vec::new(),
                    handles: HashMap::new(),
                    next_id: 0,
                }),
                work_available: Condvar::new(),
                all_stopped: Condvar::new(),
            }),
        }
    }

    // == Start ==
    /// Moves to `Running` and spawns `low_watermark` workers.
    ///
    /// Calling it on a running pool does nothing. A pool that has been stopped
    /// cannot be restarted, and invalid watermarks leave the pool in `New`.
    pub fn start(&self) -> Result<(), ExecutorError> {
        self.shared.config.validate()?;
        let mut inner = self.shared.inner.lock();
        match inner.state {
            ExecutorState::Running => return Ok(()),
            ExecutorState::Stopping | ExecutorState::Stopped => {
                return Err(ExecutorError::Terminated)
            }
            ExecutorState::New => {}
        }

        inner.state = ExecutorState::Running;
        for _ in 0..self.shared.config.low_watermark {
            spawn_worker(&self.shared, &mut inner)?;
        }
        info!(
            name = %self.shared.config.name,
            workers = inner.workers,
            high_watermark = self.shared.config.high_watermark,
            "executor started"
        );
        Ok(())
    }

    // == Submit ==
    /// Schedules a task. Returns false if it was rejected.
    pub fn submit<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.try_submit(task).is_ok()
    }

    /// Schedules a task, reporting why it was rejected.
    ///
    /// Never blocks on a full queue. When no worker is free and the pool is
    /// below `high_watermark`, one more worker is spawned first.
    pub fn try_submit<F>(&self, task: F) -> Result<(), RejectReason>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut reaped = Vec::new();
        let result = self.admit(Box::new(task), &mut reaped);
        join_all(reaped);
        if let Err(reason) = result {
            debug!(%reason, "task rejected");
        }
        result
    }

    fn admit(&self, task: Task, reaped: &mut Vec<JoinHandle<()>>) -> Result<(), RejectReason> {
        let config = &self.shared.config;
        let mut inner = self.shared.inner.lock();
        if inner.state != ExecutorState::Running {
            return Err(RejectReason::NotRunning);
        }

        let grow = inner.free_workers() == 0 && inner.workers < config.high_watermark;
        if inner.backlog_with_one_more(usize::from(grow)) > config.max_queue_size {
            return Err(RejectReason::QueueFull);
        }
        if grow {
            reaped.extend(inner.reap());
            if let Err(err) = spawn_worker(&self.shared, &mut inner) {
                warn!(error = %err, "could not grow executor");
                // Nothing would ever run a task queued on an empty pool
                if inner.workers == 0
                    || inner.backlog_with_one_more(0) > config.max_queue_size
                {
                    return Err(RejectReason::QueueFull);
                }
            }
        }

        inner.queue.push_back(task);
        self.shared.work_available.notify_one();
        Ok(())
    }

    // == Stop ==
    /// Stops admitting tasks; queued tasks still run.
    ///
    /// With `wait` the call returns once every worker has exited and been
    /// joined. Stopping a stopped pool does nothing. Waiting is skipped when
    /// called from one of the pool's own workers.
    pub fn stop(&self, wait: bool) {
        let wait = if wait && worker::on_worker_thread(&self.shared) {
            warn!("stop(wait) called from a worker thread, not waiting");
            false
        } else {
            wait
        };

        let handles = {
            let mut inner = self.shared.inner.lock();
            match inner.state {
                ExecutorState::New => {
                    inner.state = ExecutorState::Stopped;
                }
                ExecutorState::Running => {
                    inner.state = ExecutorState::Stopping;
                    info!(
                        name = %self.shared.config.name,
                        queued = inner.queue.len(),
                        workers = inner.workers,
                        "executor stopping"
                    );
                    if inner.workers == 0 {
                        if !inner.queue.is_empty() {
                            warn!(dropped = inner.queue.len(), "no workers left to drain queue");
                            inner.queue.clear();
                        }
                        inner.state = ExecutorState::Stopped;
                    }
                    self.shared.work_available.notify_all();
                }
                ExecutorState::Stopping | ExecutorState::Stopped => {}
            }

            if !wait {
                return;
            }
            while inner.state != ExecutorState::Stopped {
                self.shared.all_stopped.wait(&mut inner);
            }
            inner.finished.clear();
            let handles: Vec<_> = inner.handles.drain().map(|(_, handle)| handle).collect();
            handles
        };

        join_all(handles);
    }

    // == Stats ==
    /// Current state and counters.
    pub fn stats(&self) -> ExecutorStats {
        let inner = self.shared.inner.lock();
        let config = &self.shared.config;
        ExecutorStats {
            state: inner.state,
            workers: inner.workers,
            idle: inner.idle,
            queued: inner.queue.len(),
            low_watermark: config.low_watermark,
            high_watermark: config.high_watermark,
            max_queue_size: config.max_queue_size,
        }
    }

    pub fn state(&self) -> ExecutorState {
        self.shared.inner.lock().state
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.shared.config
    }
}

impl Drop for TaskExecutor {
    fn drop(&mut self) {
        self.stop(true);
    }
}

/// Spawns one worker and registers its handle. Must run under the lock.
fn spawn_worker(shared: &Arc<Shared>, inner: &mut Inner) -> Result<(), ExecutorError> {
    let id = inner.next_id;
    let worker_shared = Arc::clone(shared);
    let handle = thread::Builder::new()
        .name(format!("{}-worker-{}", shared.config.name, id))
        .spawn(move || worker::run(worker_shared, id))?;

    inner.next_id += 1;
    inner.workers += 1;
    inner.starting += 1;
    inner.handles.insert(id, handle);
    debug!(worker = id, workers = inner.workers, "worker spawned");
    Ok(())
}

fn join_all(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        // Task panics abort the process, so a worker never unwinds into join.
        let _ = handle.join();
    }
}
