use std::io;

use bytes::{Bytes, BytesMut};

use super::StreamingBuffer;
use crate::error::Result;

/// `io::Write` adapter that accumulates bytes locally.
///
/// Nothing reaches the buffer until [`io::Write::flush`] or [`Self::close`].
/// Dropping the writer flushes what is pending.
#[derive(Debug)]
pub struct BufferWriter {
	buffer: StreamingBuffer,
	pending: BytesMut,
}

impl BufferWriter {
	pub(super) fn new(buffer: StreamingBuffer) -> Self {
		Self {
			buffer,
			pending: BytesMut::new(),
		}
	}

	/// Bytes written but not yet flushed.
	pub fn pending(&self) -> usize {
		self.pending.len()
	}

	pub fn write_byte(&mut self, byte: u8) {
		self.pending.extend_from_slice(&[byte]);
	}

	/// Flushes pending bytes. The buffer itself stays open.
	pub fn close(&mut self) -> Result<()> {
		self.hand_off()
	}

	fn hand_off(&mut self) -> Result<()> {
		if self.pending.is_empty() {
			return Ok(());
		}
		// Pending bytes survive a failed hand-off.
		self.buffer.write_buf(Bytes::copy_from_slice(&self.pending))?;
		self.pending.clear();
		Ok(())
	}
}

impl io::Write for BufferWriter {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		self.pending.extend_from_slice(buf);
		Ok(buf.len())
	}

	fn flush(&mut self) -> io::Result<()> {
		Ok(self.hand_off()?)
	}
}

impl Drop for BufferWriter {
	fn drop(&mut self) {
		if let Err(err) = self.hand_off() {
			tracing::warn!(error = %err, "stream.writer.drop_flush_failed");
		}
	}
}

/// `io::Read` adapter over the synchronous read operations.
///
/// A read returning `0` means nothing is available right now, not that the
/// stream has ended.
#[derive(Debug, Clone)]
pub struct BufferReader {
	buffer: StreamingBuffer,
}

impl BufferReader {
	pub(super) fn new(buffer: StreamingBuffer) -> Self {
		Self { buffer }
	}

	pub fn avail(&self) -> Result<usize> {
		self.buffer.avail()
	}

	pub fn read_byte(&self) -> Result<Option<u8>> {
		self.buffer.read()
	}

	pub fn peek(&self) -> Result<Option<u8>> {
		self.buffer.peek()
	}

	pub fn unread(&self, byte: u8) -> Result<()> {
		self.buffer.unread(byte)
	}

	pub fn skip(&self, max: usize) -> Result<usize> {
		self.buffer.skip(max)
	}

	/// No-op; the buffer stays open.
	pub fn close(&self) -> Result<()> {
		Ok(())
	}
}

impl io::Read for BufferReader {
	fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
		let bytes = self.buffer.read_buf(buf.len())?;
		buf[..bytes.len()].copy_from_slice(&bytes);
		Ok(bytes.len())
	}
}
