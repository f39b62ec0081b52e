//! Worker loop.
//!
//! Each worker is a small state machine driven by [`next_step`]: it either
//! gets a task, waits once for work, or exits. Every iteration performs at
//! most one blocking wait, and the worker count is decremented in exactly one
//! place, when the loop ends.

use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::process;
use std::sync::Arc;

use parking_lot::MutexGuard;
use tracing::{debug, error, info};

use super::pool::{Inner, Shared, Task, WorkerId};
use super::state::ExecutorState;

thread_local! {
    /// Address of the pool this thread works for, zero elsewhere.
    static CURRENT_POOL: Cell<usize> = const { Cell::new(0) };
}

/// What the worker does next.
enum Step {
    /// Run a dequeued task outside the lock
    Run(Task),
    /// Woken up or timed out without reason to leave; look again
    Wait,
    /// Leave the loop
    Exit(ExitReason),
}

#[derive(Debug, Clone, Copy)]
enum ExitReason {
    /// Surplus worker found no work within the idle timeout
    Idle,
    /// Pool is shutting down and the queue is empty
    Drained,
}

/// True on a worker thread belonging to `shared`.
pub(crate) fn on_worker_thread(shared: &Arc<Shared>) -> bool {
    let pool = Arc::as_ptr(shared) as usize;
    CURRENT_POOL.with(|current| current.get() == pool)
}

/// Body of every worker thread.
pub(crate) fn run(shared: Arc<Shared>, id: WorkerId) {
    CURRENT_POOL.with(|current| current.set(Arc::as_ptr(&shared) as usize));

    let mut inner = shared.inner.lock();
    inner.starting -= 1;

    let reason = loop {
        match next_step(&shared, &mut inner) {
            Step::Run(task) => MutexGuard::unlocked(&mut inner, || execute(task)),
            Step::Wait => {}
            Step::Exit(reason) => break reason,
        }
    };

    inner.workers -= 1;
    inner.finished.push(id);
    debug!(worker = id, ?reason, workers = inner.workers, "worker exited");

    if inner.workers == 0 && inner.state == ExecutorState::Stopping {
        inner.state = ExecutorState::Stopped;
        shared.all_stopped.notify_all();
        info!(name = %shared.config.name, "executor stopped");
    }
}

fn next_step(shared: &Shared, inner: &mut MutexGuard<'_, Inner>) -> Step {
    if let Some(task) = inner.queue.pop_front() {
        return Step::Run(task);
    }
    if inner.state != ExecutorState::Running {
        return Step::Exit(ExitReason::Drained);
    }

    inner.idle += 1;
    let timed_out = shared
        .work_available
        .wait_for(inner, shared.config.idle_timeout)
        .timed_out();
    inner.idle -= 1;

    // Workers at or below the low watermark keep waiting.
    if timed_out
        && inner.queue.is_empty()
        && inner.state == ExecutorState::Running
        && inner.workers > shared.config.low_watermark
    {
        return Step::Exit(ExitReason::Idle);
    }
    Step::Wait
}

/// Runs a task; a panic escaping it aborts the process.
fn execute(task: Task) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
        error!(
            panic = panic_message(payload.as_ref()),
            "task panicked, aborting"
        );
        process::abort();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
