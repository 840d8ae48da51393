//! Single-writer, multi-reader byte channel owned by one worker.
//!
//! # Mental model
//!
//! * The buffer's bytes and read cursor live inside one worker as a
//!   [`SynchronizedState`]. No other context touches them directly.
//! * Writes are fire-and-forget jobs; reads are synchronous jobs that return
//!   immediately with whatever is available. Nothing ever waits for data.
//! * Because writes and reads share the worker's FIFO mailbox, a read issued
//!   after a write from the same context sees that write.
//!
//! # Lifecycle
//!
//! 1. Bytes accumulate; `size` grows with every write.
//! 2. Reads advance the cursor; `avail` shrinks, `size` does not.
//! 3. When a read, `read_buf` or `skip` leaves nothing unread, the storage is
//!    cleared and its capacity returns to the configured initial capacity.

use bytes::Bytes;
use serde::Deserialize;
use xeno_worker::{SynchronizedState, WorkerPool};

use crate::error::{Error, Result};

mod io;
mod state;

pub use io::{BufferReader, BufferWriter};
use state::BufferState;

/// Default capacity the buffer starts with and returns to once drained.
pub const DEFAULT_INITIAL_CAPACITY: usize = 1024;
/// Default number of bytes `unread` may push in front of the stored bytes.
pub const DEFAULT_PUSHBACK_LIMIT: usize = 16;

/// Construction options for [`StreamingBuffer`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BufferOptions {
	pub name: String,
	pub initial_capacity: usize,
	pub pushback_limit: usize,
}

impl Default for BufferOptions {
	fn default() -> Self {
		Self {
			name: String::from("stream.buffer"),
			initial_capacity: DEFAULT_INITIAL_CAPACITY,
			pushback_limit: DEFAULT_PUSHBACK_LIMIT,
		}
	}
}

impl BufferOptions {
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn name(mut self, name: impl Into<String>) -> Self {
		self.name = name.into();
		self
	}

	#[must_use]
	pub fn initial_capacity(mut self, initial_capacity: usize) -> Self {
		self.initial_capacity = initial_capacity;
		self
	}

	#[must_use]
	pub fn pushback_limit(mut self, pushback_limit: usize) -> Self {
		self.pushback_limit = pushback_limit;
		self
	}
}

/// Byte channel whose storage lives in one worker.
///
/// Cloning is cheap; clones address the same storage.
#[derive(Debug, Clone)]
pub struct StreamingBuffer {
	state: SynchronizedState<BufferState>,
}

impl StreamingBuffer {
	pub fn new(pool: &WorkerPool) -> Self {
		Self::with_options(pool, BufferOptions::default())
	}

	pub fn with_options(pool: &WorkerPool, options: BufferOptions) -> Self {
		let BufferOptions {
			name,
			initial_capacity,
			pushback_limit,
		} = options;
		tracing::debug!(buffer = %name, initial_capacity, pushback_limit, "stream.buffer.create");
		Self {
			state: SynchronizedState::new(pool, &name, move || BufferState::new(initial_capacity, pushback_limit)),
		}
	}

	/// Appends one byte without waiting.
	pub fn write(&self, byte: u8) -> Result<()> {
		Ok(self.state.send(move |state| state.write(&[byte]))?)
	}

	/// Appends `bytes` without waiting.
	pub fn write_buf(&self, bytes: impl Into<Bytes>) -> Result<()> {
		let bytes = bytes.into();
		if bytes.is_empty() {
			return Ok(());
		}
		Ok(self.state.send(move |state| state.write(&bytes))?)
	}

	/// Number of unread bytes.
	pub fn avail(&self) -> Result<usize> {
		Ok(self.state.call(|state| state.avail())?)
	}

	/// Bytes appended since the last reset.
	pub fn size(&self) -> Result<usize> {
		Ok(self.state.call(|state| state.size())?)
	}

	/// Consumes the next byte, if any.
	pub fn read(&self) -> Result<Option<u8>> {
		Ok(self.state.call(BufferState::read)?)
	}

	/// Consumes up to `max` bytes. Returns fewer, possibly none, when fewer
	/// are available.
	pub fn read_buf(&self, max: usize) -> Result<Bytes> {
		Ok(self.state.call(move |state| state.read_buf(max))?)
	}

	/// Next byte, without consuming it.
	pub fn peek(&self) -> Result<Option<u8>> {
		Ok(self.state.call(|state| state.peek())?)
	}

	/// Pushes `byte` back in front of the unread bytes.
	///
	/// Fails with [`Error::NotFound`] once the pushback limit is exhausted.
	pub fn unread(&self, byte: u8) -> Result<()> {
		if self.state.call(move |state| state.unread(byte))? {
			return Ok(());
		}
		Err(Error::NotFound(String::from("no pushback position left in buffer")))
	}

	/// Discards up to `max` unread bytes, returning how many were dropped.
	pub fn skip(&self, max: usize) -> Result<usize> {
		Ok(self.state.call(move |state| state.skip(max))?)
	}

	/// Awaitable [`Self::avail`].
	pub async fn avail_async(&self) -> Result<usize> {
		Ok(self.state.call_async(|state| state.avail()).await?)
	}

	/// Awaitable [`Self::read_buf`].
	pub async fn read_buf_async(&self, max: usize) -> Result<Bytes> {
		Ok(self.state.call_async(move |state| state.read_buf(max)).await?)
	}

	/// Stream adapter that batches writes until flushed.
	pub fn writer(&self) -> BufferWriter {
		BufferWriter::new(self.clone())
	}

	/// Stream adapter over the synchronous read operations.
	pub fn reader(&self) -> BufferReader {
		BufferReader::new(self.clone())
	}
}
