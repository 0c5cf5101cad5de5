use std::sync::Arc;
use std::time::Duration;

use log::{debug, trace};

use crate::error::LoopError;
use crate::gate::Gate;
use crate::task::{Await, Task};

/// A builder for an [`EventLoop`].
///
/// The only tunable here is the ready queue's segment capacity; the
/// reference implementation's choice of 1024 slots per segment is kept as
/// the default. Everything else about the loop's behaviour is fixed.
#[derive(Debug, Clone, Copy)]
pub struct Builder {
    segment_capacity: usize,
}

impl Builder {
    /// Number of task slots per ready-queue segment, matching the reference
    /// implementation.
    pub const DEFAULT_SEGMENT_CAPACITY: usize = 1024;

    /// Creates a new builder with the default settings.
    #[inline]
    pub fn new() -> Self {
        Self {
            segment_capacity: Self::DEFAULT_SEGMENT_CAPACITY,
        }
    }

    /// Changes the number of task slots allocated per ready-queue segment.
    #[inline]
    pub fn segment_capacity(mut self, capacity: usize) -> Self {
        self.segment_capacity = capacity;
        self
    }

    /// Builds the event loop with the provided settings.
    ///
    /// # Errors
    ///
    /// Returns [`LoopError::InvalidConfig`] if `segment_capacity` was set to
    /// zero.
    #[inline]
    pub fn build(self) -> Result<EventLoop, LoopError> {
        if self.segment_capacity == 0 {
            return Err(LoopError::InvalidConfig("segment_capacity must be non-zero"));
        }

        debug!(
            "constructing event loop, segment_capacity={}",
            self.segment_capacity
        );
        Ok(EventLoop {
            inner: Arc::new(Inner {
                gate: Gate::new(self.segment_capacity),
            }),
        })
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

struct Inner {
    gate: Gate,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let remaining = self.gate.queued_len();
        if remaining > 0 {
            debug!(
                "dropping event loop with {remaining} task(s) still queued; their Drop impls run now"
            );
        } else {
            debug!("dropping event loop, ready queue was empty");
        }
    }
}

/// The event loop: owns the ready queue and the park/notify gate, and
/// drives tasks through `resume`.
///
/// Cloning an `EventLoop` is cheap (it is reference-counted) and is how a
/// worker thread spawned by an [`AsyncTask`](crate::AsyncTask) keeps the
/// loop alive long enough to submit its continuation: the loop's queue and
/// synchronisation primitives are only actually torn down once every clone
/// (including ones held by in-flight workers) has been dropped. This is a
/// deliberate improvement over the reference implementation's raw-pointer
/// handoff, which can submit into a loop that has already been freed if the
/// host tears it down while workers are in flight.
#[derive(Clone)]
pub struct EventLoop {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoop")
            .field("queued_len", &self.queued_len())
            .finish()
    }
}

impl EventLoop {
    /// Creates a new event loop with the default [`Builder`] settings.
    #[inline]
    pub fn new() -> Result<Self, LoopError> {
        Builder::new().build()
    }

    /// Returns a [`Builder`] for configuring a new event loop.
    #[inline]
    pub fn builder() -> Builder {
        Builder::new()
    }

    /// Submits `task` into the ready queue.
    ///
    /// Any thread holding a clone of this `EventLoop` may call `submit`; the
    /// queue's mutex serialises concurrent submissions. Tasks submitted from
    /// a single thread are dequeued in submission order.
    #[inline]
    pub fn submit(&self, task: Box<dyn Task>) -> Result<(), LoopError> {
        self.inner.gate.push(task);
        Ok(())
    }

    /// Runs the loop while `predicate()` is true, stopping early if the
    /// ready queue becomes empty.
    ///
    /// Pops and resumes **at most one task per predicate check** — this
    /// crate never batches multiple pops into a single iteration, since
    /// hosts may rely on the one-task-per-check cadence to interleave
    /// external state changes between resumptions.
    ///
    /// Does not block when the queue is empty: call [`park`](Self::park)
    /// explicitly between calls to `run_until` if blocking behaviour is
    /// wanted.
    pub fn run_until<P: FnMut() -> bool>(&self, mut predicate: P) -> Result<(), LoopError> {
        while predicate() {
            let mut task = match self.inner.gate.pop() {
                Some(task) => task,
                None => return Ok(()),
            };

            match task.resume(self) {
                Await::Start {
                    async_task,
                    continuation,
                } => {
                    trace!("task yielded an async operation, handing off to worker");
                    async_task.start_and_then(self, continuation)?;
                }
                Await::Done => {
                    trace!("task completed");
                }
            }
        }
        Ok(())
    }

    /// Blocks the caller until either `timeout` elapses or a concurrent
    /// [`submit`](Self::submit) wakes it, whichever comes first.
    ///
    /// Returns `true` if the timeout elapsed first. Spurious wakeups are
    /// possible: a `false` return does not guarantee the queue is
    /// non-empty, only that a `submit` signalled the gate.
    #[inline]
    pub fn park(&self, timeout: Duration) -> bool {
        self.inner.gate.park(timeout)
    }

    /// Number of tasks currently sitting in the ready queue.
    ///
    /// Primarily a testing/diagnostic hook; ordinary hosts drive the loop
    /// through `run_until`/`park` rather than polling this.
    #[inline]
    pub fn queued_len(&self) -> usize {
        self.inner.gate.queued_len()
    }

    #[cfg(test)]
    fn segment_count(&self) -> usize {
        self.inner.gate.segment_count()
    }
}
