use crate::async_task::AsyncTask;
use crate::EventLoop;

/// A user-defined state machine driven by the event loop.
///
/// Each call to `resume` advances the task by exactly one state; the task
/// chooses its next state itself (by mutating its own fields) before
/// returning, so the loop never needs to know anything about the task's
/// internals beyond this one method.
///
/// There is deliberately no `drop(loop)` method on this trait, unlike the
/// reference implementation's abstract task contract: a concrete task's own
/// `Drop` impl plays that role, and runs automatically when the event loop's
/// last handle is dropped while the task is still queued (see `EventLoop`'s
/// `Drop` impl). A task whose cleanup needs to see the loop can capture a
/// clone of it (or a `Weak` reference, to avoid keeping the loop alive) at
/// construction time.
///
/// `resume` must not submit `self` back into the loop; re-scheduling is
/// expressed purely through the returned [`Await`]. Submitting *other*
/// tasks from within `resume` is permitted, for fan-out.
pub trait Task: Send {
    /// Advances the task by one state, returning what the loop should do
    /// next.
    fn resume(&mut self, loop_: &EventLoop) -> Await;
}

/// What a task's `resume` tells the loop to do next.
pub enum Await {
    /// Start `async_task` on a worker; once it completes, resume
    /// `continuation`.
    Start {
        /// The blocking operation to perform off the loop.
        async_task: Box<dyn AsyncTask>,
        /// The task to resume once `async_task` finishes.
        continuation: Box<dyn Task>,
    },
    /// The task has completed; do not reschedule it.
    Done,
}

impl Await {
    /// Convenience constructor for [`Await::Start`].
    pub fn start(async_task: Box<dyn AsyncTask>, continuation: Box<dyn Task>) -> Self {
        Await::Start {
            async_task,
            continuation,
        }
    }
}

impl std::fmt::Debug for Await {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Await::Start { .. } => f.write_str("Await::Start"),
            Await::Done => f.write_str("Await::Done"),
        }
    }
}
