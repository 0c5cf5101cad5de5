use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::queue::ReadyQueue;
use crate::task::Task;

/// The mutex + condition-variable pair guarding the ready queue.
///
/// `push` always signals the condition variable while still holding the
/// mutex, which gives the "no lost wake" property: a `park` call that
/// arrives after `push` releases the mutex always observes the queue as
/// non-empty, and one that arrives before is guaranteed the signal.
pub(crate) struct Gate {
    queue: Mutex<ReadyQueue>,
    condvar: Condvar,
}

impl Gate {
    pub(crate) fn new(segment_capacity: usize) -> Self {
        Self {
            queue: Mutex::new(ReadyQueue::new(segment_capacity)),
            condvar: Condvar::new(),
        }
    }

    pub(crate) fn push(&self, task: Box<dyn Task>) {
        let mut queue = self.queue.lock();
        queue.push(task);
        self.condvar.notify_one();
    }

    pub(crate) fn pop(&self) -> Option<Box<dyn Task>> {
        self.queue.lock().pop()
    }

    pub(crate) fn queued_len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Number of live ready-queue segments. Exposed only so tests can
    /// confirm a configured segment capacity actually reaches the queue.
    #[cfg(test)]
    pub(crate) fn segment_count(&self) -> usize {
        self.queue.lock().segment_count()
    }

    /// Blocks the caller until either `timeout` elapses or a concurrent
    /// `push` signals the condition variable, whichever comes first.
    ///
    /// Spurious wakeups are possible (the condition variable may return
    /// before `timeout` with the queue still empty); the caller is
    /// responsible for re-checking the queue. `parking_lot`'s `wait_for`
    /// cannot itself fail, so unlike the reference implementation this can't
    /// surface an OS primitive error (see DESIGN.md, Open Question 3).
    pub(crate) fn park(&self, timeout: Duration) -> bool {
        let mut queue = self.queue.lock();
        let result = self.condvar.wait_for(&mut queue, timeout);
        result.timed_out()
    }
}
