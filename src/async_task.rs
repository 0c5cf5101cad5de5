use crate::error::LoopError;
use crate::task::Task;
use crate::EventLoop;

/// A one-shot object representing a blocking operation to be performed off
/// the event loop.
///
/// Implementations spawn exactly one worker thread that performs the
/// blocking step, writes any outputs through caller-supplied cells, submits
/// `continuation` back into `loop_`, and then lets its own storage drop. The
/// worker is detached (its `JoinHandle` is simply not kept) so its OS
/// resources are reclaimed without anyone having to join it.
///
/// Consumed by value (`self: Box<Self>`) because an async task can only ever
/// be started once.
pub trait AsyncTask: Send {
    /// Spawns the worker for this operation.
    ///
    /// On success, ownership of `continuation` has passed to the worker,
    /// which will submit it into `loop_` once the blocking step finishes. On
    /// failure (worker spawn failed), `continuation` is dropped along with
    /// the error; the caller cannot recover it, matching the abstract
    /// contract's note that spawn failure is fatal for the calling
    /// `run_until`.
    fn start_and_then(
        self: Box<Self>,
        loop_: &EventLoop,
        continuation: Box<dyn Task>,
    ) -> Result<(), LoopError>;
}
