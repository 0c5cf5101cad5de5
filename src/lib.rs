//! A small, embeddable cooperative task runtime.
//!
//! Two tightly-coupled pieces make up this crate:
//!
//! * an **event loop** ([`EventLoop`]) driving a multi-producer,
//!   single-consumer [ready queue](queue), with a blocking
//!   [`park`](EventLoop::park) facility so external producers can wake a
//!   sleeping consumer;
//! * an **async-task adapter** ([`AsyncTask`]) that wraps a blocking
//!   operation — file I/O (`file_ops`) is the reference case — so that,
//!   once started, it runs on a throwaway worker thread and re-enqueues its
//!   continuation on the loop when done.
//!
//! Together these implement a stackless coroutine model: a [`Task`]
//! expresses multi-step asynchronous work as a state machine whose states
//! are `resume` calls; between states it yields an [`Await`] descriptor
//! naming the async operation it is waiting on. The loop drives the state
//! machine; the async adapter performs blocking work off the loop and
//! signals completion by submitting the continuation.
//!
//! This crate does not implement a work-stealing scheduler, timers, I/O
//! multiplexing, or cancellation of in-flight async operations — see the
//! module-level docs on [`EventLoop`] and [`AsyncTask`] for the exact
//! guarantees it does make.
#![warn(missing_docs, rust_2018_idioms, missing_debug_implementations)]

mod async_task;
mod error;
mod event_loop;
mod file_ops;
mod gate;
mod queue;
mod task;

pub use async_task::AsyncTask;
pub use error::LoopError;
pub use event_loop::{Builder, EventLoop};
pub use file_ops::{file_close, file_open, file_read, file_seek, file_write, FileHandle};
pub use task::{Await, Task};
