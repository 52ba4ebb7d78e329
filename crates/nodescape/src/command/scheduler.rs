//! Deferred execution of step-through continuations

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;
use tracing::trace;

pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs a task after a delay
pub trait Scheduler: Send + Sync {
    fn schedule(&self, delay: Duration, task: Task);
}

/// Sleeps on a short-lived thread per task
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadScheduler;

impl Scheduler for ThreadScheduler {
    fn schedule(&self, delay: Duration, task: Task) {
        thread::spawn(move || {
            if !delay.is_zero() {
                thread::sleep(delay);
            }
            task();
        });
    }
}

/// Queues tasks until the caller runs them; used by tests and hosts that
/// drive their own event loop
#[derive(Clone, Default)]
pub struct ManualScheduler {
    queue: Arc<Mutex<VecDeque<(Duration, Task)>>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Run the oldest queued task; returns false if none was queued
    pub fn run_next(&self) -> bool {
        // Pop before running: the task may schedule more work
        let next = self.lock().pop_front();
        match next {
            Some((delay, task)) => {
                trace!(?delay, "Running scheduled task");
                task();
                true
            }
            None => false,
        }
    }

    /// Run tasks until the queue stays empty
    pub fn run_all(&self) -> usize {
        let mut count = 0;
        while self.run_next() {
            count += 1;
        }
        count
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<(Duration, Task)>> {
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("pending", &self.pending())
            .finish()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: Task) {
        self.lock().push_back((delay, task));
    }
}
