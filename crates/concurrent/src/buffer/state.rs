use bytes::{Bytes, BytesMut};

/// Bytes appended by writers plus the read cursor.
///
/// `data.len()` is the size; `data.len() - pos` is what is left to read.
#[derive(Debug)]
pub(crate) struct BufferState {
	data: BytesMut,
	pos: usize,
	initial_capacity: usize,
	pushback_limit: usize,
	/// Bytes pushed in front of `data` since the last reset.
	pushed_front: usize,
}

impl BufferState {
	pub(crate) fn new(initial_capacity: usize, pushback_limit: usize) -> Self {
		Self {
			data: BytesMut::with_capacity(initial_capacity),
			pos: 0,
			initial_capacity,
			pushback_limit,
			pushed_front: 0,
		}
	}

	pub(crate) fn avail(&self) -> usize {
		self.data.len() - self.pos
	}

	pub(crate) fn size(&self) -> usize {
		self.data.len()
	}

	#[cfg(test)]
	pub(crate) fn capacity(&self) -> usize {
		self.data.capacity()
	}

	pub(crate) fn write(&mut self, bytes: &[u8]) {
		self.data.extend_from_slice(bytes);
	}

	pub(crate) fn read(&mut self) -> Option<u8> {
		let byte = self.peek();
		if byte.is_some() {
			self.pos += 1;
		}
		self.reset_if_drained();
		byte
	}

	pub(crate) fn peek(&self) -> Option<u8> {
		self.data.get(self.pos).copied()
	}

	pub(crate) fn read_buf(&mut self, max: usize) -> Bytes {
		let n = max.min(self.avail());
		let out = Bytes::copy_from_slice(&self.data[self.pos..self.pos + n]);
		self.pos += n;
		self.reset_if_drained();
		out
	}

	pub(crate) fn skip(&mut self, max: usize) -> usize {
		let n = max.min(self.avail());
		self.pos += n;
		self.reset_if_drained();
		n
	}

	/// Puts `byte` back in front of the unread bytes.
	///
	/// Rewinds over consumed bytes while there are any; otherwise prepends,
	/// at most `pushback_limit` times between resets. Returns `false` once
	/// that bound is reached.
	pub(crate) fn unread(&mut self, byte: u8) -> bool {
		if self.pos > 0 {
			self.pos -= 1;
			self.data[self.pos] = byte;
			return true;
		}
		if self.pushed_front >= self.pushback_limit {
			return false;
		}
		let mut data = BytesMut::with_capacity(self.data.len() + 1);
		data.extend_from_slice(&[byte]);
		data.extend_from_slice(&self.data);
		self.data = data;
		self.pushed_front += 1;
		true
	}

	fn reset_if_drained(&mut self) {
		if self.avail() > 0 {
			return;
		}
		self.data.clear();
		self.pos = 0;
		self.pushed_front = 0;
		if self.data.capacity() > self.initial_capacity {
			self.data = BytesMut::with_capacity(self.initial_capacity);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn drained_state_resets_size_and_capacity() {
		let mut state = BufferState::new(8, 2);
		state.write(&[7; 100]);
		assert!(state.capacity() >= 100);
		assert_eq!(state.skip(60), 60);
		assert_eq!(state.size(), 100);
		assert_eq!(state.read_buf(100).len(), 40);
		assert_eq!(state.size(), 0);
		assert!(state.capacity() < 100, "capacity returns to the initial size");
	}

	#[test]
	fn unread_rewinds_then_prepends_up_to_limit() {
		let mut state = BufferState::new(8, 1);
		state.write(b"ab");
		assert_eq!(state.read(), Some(b'a'));
		assert!(state.unread(b'z'));
		assert_eq!(state.peek(), Some(b'z'));
		assert_eq!(state.avail(), 2);

		assert!(state.unread(b'y'));
		assert!(!state.unread(b'x'));
		assert_eq!(state.read_buf(8).as_ref(), b"yzb");
	}
}
