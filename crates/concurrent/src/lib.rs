//! Concurrency-safe containers for share-nothing workers.
//!
//! Reads vastly outnumber writes in the intended workloads, so every shared
//! container publishes immutable snapshots that readers load without locking.
//! Mutation happens in one place only:
//!
//! * [`CowMap`] and [`CowList`] copy, mutate and republish inside an
//!   [`ExclusiveWriter`] section bound to a worker.
//! * [`AtomicMap`] and [`AtomicList`] republish with compare-and-swap when no
//!   worker is available.
//! * [`StreamingBuffer`] keeps one live byte buffer inside its worker and is
//!   reached through call-and-wait reads and fire-and-forget writes.
//! * [`LocalMap`] and [`LocalList`] never leave the current context.
//!
//! [`TypedMap`] and [`TypedList`] add runtime type and immutability checks
//! over the dynamic [`Value`] model for containers described by a
//! [`ContainerConfig`].

mod atomic;
mod buffer;
mod config;
mod error;
mod guard;
mod list;
mod local;
mod map;
mod published;
mod typed;
mod value;
mod writer;

pub use atomic::{AtomicList, AtomicMap};
pub use buffer::{BufferOptions, BufferReader, BufferWriter, DEFAULT_INITIAL_CAPACITY, DEFAULT_PUSHBACK_LIMIT, StreamingBuffer};
pub use config::{Container, ContainerConfig, ListConfig, MapConfig};
pub use error::{Error, Result, Side};
pub use guard::{Shareable, admit, expect_type, freeze, is_immutable};
pub use list::{CowList, ListOptions};
pub use local::{LocalList, LocalMap};
pub use map::{CowMap, Entries, MapKey, MapOptions, MapSnapshot};
pub use published::PublishedRef;
pub use typed::{TypedList, TypedMap};
pub use value::{Fields, Object, Value, ValueType};
pub use writer::ExclusiveWriter;
pub use xeno_worker::{LocalSlot, SynchronizedState, Worker, WorkerError, WorkerPool, WorkerPoolBuilder};
