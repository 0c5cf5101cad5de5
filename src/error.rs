use thiserror::Error;

/// Errors surfaced by the core runtime (the event loop and the async-task
/// contract).
///
/// I/O failures inside a file operation are *not* represented here: they are
/// delivered to the continuation through the operation's own `out_ok`/
/// `out_len` cells, since only the task that issued the operation knows how
/// to recover from them (see the propagation policy in the crate docs).
#[derive(Debug, Error)]
pub enum LoopError {
    /// A queue segment or task allocation failed.
    ///
    /// Rust's allocator aborts the process on exhaustion rather than
    /// returning an error, so this variant is never constructed by this
    /// crate; it is kept so callers can match on this enum exhaustively
    /// without `#[non_exhaustive]` surprises later.
    #[error("allocation failed")]
    Alloc,

    /// Spawning a worker thread for an async task failed.
    #[error("OS primitive failed: {0}")]
    Os(#[from] std::io::Error),

    /// A task's `resume` returned a malformed `Await`.
    ///
    /// The `Await` enum in this crate cannot actually represent a
    /// "continuation without an async task" case (unlike the reference
    /// implementation's nullable-pointer pair), so this variant is reserved
    /// for scheduler-internal invariant violations rather than reachable
    /// from safe task code.
    #[error("protocol misuse: {0}")]
    ProtocolMisuse(&'static str),

    /// A [`Builder`](crate::Builder) setting was out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}
