use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;

/// Atomically swappable holder of the current immutable snapshot.
///
/// Readers load without locking and always see a fully built snapshot. The
/// holder starts empty until the first publish.
pub struct PublishedRef<T> {
	slot: ArcSwapOption<T>,
}

impl<T> Default for PublishedRef<T> {
	fn default() -> Self {
		Self::empty()
	}
}

impl<T: fmt::Debug> fmt::Debug for PublishedRef<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("PublishedRef").field(&self.slot.load_full()).finish()
	}
}

impl<T> PublishedRef<T> {
	/// Creates a holder with nothing published.
	pub fn empty() -> Self {
		Self {
			slot: ArcSwapOption::const_empty(),
		}
	}

	/// Creates a holder with `value` already published.
	pub fn new(value: T) -> Self {
		Self {
			slot: ArcSwapOption::from_pointee(value),
		}
	}

	/// Current snapshot, if any.
	pub fn load(&self) -> Option<Arc<T>> {
		self.slot.load_full()
	}

	pub fn is_published(&self) -> bool {
		self.slot.load().is_some()
	}

	/// Replaces the snapshot, returning the previous one.
	pub fn publish(&self, value: Arc<T>) -> Option<Arc<T>> {
		self.slot.swap(Some(value))
	}

	/// Drops the snapshot, returning to the unpublished state.
	pub fn clear(&self) -> Option<Arc<T>> {
		self.slot.swap(None)
	}

	/// Publishes `init()` unless another snapshot is already visible, and
	/// returns whichever snapshot won.
	pub fn get_or_publish_with(&self, init: impl FnOnce() -> T) -> Arc<T> {
		if let Some(current) = self.load() {
			return current;
		}
		let fresh = Arc::new(init());
		let prev = self.slot.compare_and_swap(&None::<Arc<T>>, Some(Arc::clone(&fresh)));
		match &*prev {
			Some(winner) => Arc::clone(winner),
			None => fresh,
		}
	}

	/// Publishes `f(current)` with a compare-and-swap loop.
	///
	/// `f` may run several times under contention and must be free of side
	/// effects. Returns the previous and the installed snapshot.
	pub fn update(&self, mut f: impl FnMut(Option<&T>) -> T) -> (Option<Arc<T>>, Arc<T>) {
		loop {
			let cur = self.slot.load_full();
			let next = Arc::new(f(cur.as_deref()));
			let prev = self.slot.compare_and_swap(&cur, Some(Arc::clone(&next)));
			if same(&*prev, &cur) {
				return (cur, next);
			}
		}
	}
}

fn same<T>(a: &Option<Arc<T>>, b: &Option<Arc<T>>) -> bool {
	match (a, b) {
		(Some(a), Some(b)) => Arc::ptr_eq(a, b),
		(None, None) => true,
		_ => false,
	}
}
