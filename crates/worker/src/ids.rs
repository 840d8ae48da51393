use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic id clock for process-unique worker and slot identities.
#[derive(Debug)]
pub(crate) struct IdClock {
	next: AtomicU64,
}

impl IdClock {
	/// Creates a clock whose first id is 1.
	pub const fn new() -> Self {
		Self { next: AtomicU64::new(0) }
	}

	/// Returns the next id.
	pub fn next(&self) -> u64 {
		self.next.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
	}
}

pub(crate) static WORKER_IDS: IdClock = IdClock::new();
pub(crate) static SLOT_IDS: IdClock = IdClock::new();

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn ids_are_monotonic_from_one() {
		let clock = IdClock::new();
		assert_eq!(clock.next(), 1);
		assert_eq!(clock.next(), 2);
		assert_eq!(clock.next(), 3);
	}
}
