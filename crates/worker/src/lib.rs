//! Worker runtime primitives for share-nothing state ownership.
//!
//! A [`WorkerPool`] lends threads to [`Worker`]s. Each worker is a serial
//! executor: it runs one job at a time, in the order received, and owns a
//! private set of context-local values that only its jobs can reach.
//!
//! * [`Worker`] accepts synchronous (`call`), awaitable (`call_async`) and
//!   fire-and-forget (`send`) jobs.
//! * [`LocalSlot`] is a named cell in the current context's local storage.
//!   Outside any worker the context is the calling OS thread.
//! * [`SynchronizedState`] owns one mutable value inside a worker and exposes
//!   it to other contexts only through jobs.

mod context;
mod error;
mod ids;
mod local;
mod mailbox;
mod panic;
mod pool;
mod state;
mod worker;

pub use context::current_worker;
pub use error::{Result, WorkerError};
pub use local::LocalSlot;
pub use pool::{WorkerPool, WorkerPoolBuilder};
pub use state::SynchronizedState;
pub use worker::Worker;
