// Deferred task queue
//
// Thumbnail work is pushed here by the explorer and drained by a single
// worker thread, one task per tick. The worker exits once the queue is empty
// and no reconciliation pass is in flight; the next push or pass starts a new
// one.

mod worker;

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

use crate::constants::TASK_POLL_INTERVAL_MS;

pub type Task = Box<dyn FnOnce() -> anyhow::Result<()> + Send + 'static>;

#[derive(Default)]
struct QueueState {
    tasks: VecDeque<Task>,
    passes_active: usize,
    running: bool,
    worker_alive: bool,
}

struct Shared {
    state: Mutex<QueueState>,
    changed: Condvar,
    interval: Duration,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Clone)]
pub struct TaskExecutor {
    shared: Arc<Shared>,
}

impl Default for TaskExecutor {
    fn default() -> Self {
        Self::new(Duration::from_millis(TASK_POLL_INTERVAL_MS))
    }
}

impl TaskExecutor {
    pub fn new(interval: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState::default()),
                changed: Condvar::new(),
                interval,
            }),
        }
    }

    /// Queue a task behind everything already pending.
    pub fn push(&self, task: Task) {
        let mut state = self.shared.lock();
        state.tasks.push_back(task);
        self.ensure_worker(&mut state);
    }

    pub fn pending(&self) -> usize {
        self.shared.lock().tasks.len()
    }

    /// Keep the worker alive until the returned guard drops.
    pub fn begin_pass(&self) -> PassGuard {
        let mut state = self.shared.lock();
        state.passes_active += 1;
        self.ensure_worker(&mut state);
        PassGuard {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Block until no task is queued or running. Returns false on timeout.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let state = self.shared.lock();
        let (_state, result) = self
            .shared
            .changed
            .wait_timeout_while(state, timeout, |s| !s.tasks.is_empty() || s.running)
            .unwrap_or_else(|e| e.into_inner());
        !result.timed_out()
    }

    fn ensure_worker(&self, state: &mut QueueState) {
        if state.worker_alive {
            return;
        }
        match worker::spawn(Arc::clone(&self.shared)) {
            Ok(()) => state.worker_alive = true,
            // Tasks stay queued; the next push retries
            Err(e) => log::error!("Failed to spawn task worker: {}", e),
        }
    }
}

/// Marks a reconciliation pass as in flight.
pub struct PassGuard {
    shared: Arc<Shared>,
}

impl Drop for PassGuard {
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        state.passes_active = state.passes_active.saturating_sub(1);
        self.shared.changed.notify_all();
    }
}
