//! Lock-free copy-on-write containers.
//!
//! These publish with a compare-and-swap retry loop instead of a write
//! section, so they need no worker. A writer that loses the race rebuilds its
//! copy from the winner's snapshot; under heavy write contention copies are
//! repeated, which is the cost of not binding a worker.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::guard::Shareable;
use crate::map::{Entries, MapKey, MapOptions, MapSnapshot};
use crate::published::PublishedRef;

/// Map published by compare-and-swap.
pub struct AtomicMap<K, V> {
	published: PublishedRef<MapSnapshot<K, V>>,
	empty: Arc<MapSnapshot<K, V>>,
	default: Option<V>,
}

impl<K: MapKey, V: Shareable + Clone> Default for AtomicMap<K, V> {
	fn default() -> Self {
		Self::build(MapOptions::default())
	}
}

impl<K: MapKey, V: Shareable + Clone> AtomicMap<K, V> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Fails with [`Error::Misconfiguration`] when case folding is requested
	/// for non-textual keys.
	pub fn with_options(options: MapOptions<V>) -> Result<Self> {
		options.validate::<K>()?;
		Ok(Self::build(options))
	}

	fn build(mut options: MapOptions<V>) -> Self {
		Self {
			published: PublishedRef::empty(),
			empty: Arc::new(options.empty_snapshot()),
			default: options.take_default(),
		}
	}

	pub fn snapshot(&self) -> Arc<MapSnapshot<K, V>> {
		self.published.load().unwrap_or_else(|| Arc::clone(&self.empty))
	}

	pub fn get(&self, key: &K) -> Option<V> {
		self.snapshot().get(key).cloned().or_else(|| self.default.clone())
	}

	pub fn get_or(&self, key: &K, default: V) -> V {
		self.snapshot().get(key).cloned().unwrap_or(default)
	}

	pub fn contains_key(&self, key: &K) -> bool {
		self.snapshot().contains_key(key)
	}

	pub fn len(&self) -> usize {
		self.snapshot().len()
	}

	pub fn is_empty(&self) -> bool {
		self.snapshot().is_empty()
	}

	pub fn keys(&self) -> Vec<K> {
		self.snapshot().keys().cloned().collect()
	}

	pub fn values(&self) -> Vec<V> {
		self.snapshot().values().cloned().collect()
	}

	pub fn rw(&self) -> Entries<K, V> {
		self.snapshot().to_entries()
	}

	pub fn set(&self, key: K, value: V) -> Option<V> {
		let (prev, _) = self.update(|next| {
			next.insert(key.clone(), value.clone());
		});
		prev.and_then(|prev| prev.get(&key).cloned())
	}

	pub fn remove(&self, key: &K) -> Option<V> {
		let (prev, _) = self.update(|next| {
			next.remove(key);
		});
		prev.and_then(|prev| prev.get(key).cloned())
	}

	pub fn clear(&self) {
		self.update(MapSnapshot::clear);
	}

	/// Returns the value for `key`, storing `producer(key)` first when absent.
	///
	/// Each racing caller may run its own producer; only one result is stored
	/// and every caller returns the stored value.
	pub fn get_or_add(&self, key: K, producer: impl FnOnce(&K) -> V) -> V {
		if let Some(value) = self.snapshot().get(&key) {
			return value.clone();
		}
		let produced = producer(&key);
		let (_, installed) = self.update(|next| {
			if !next.contains_key(&key) {
				next.insert(key.clone(), produced.clone());
			}
		});
		installed.get(&key).cloned().unwrap_or(produced)
	}

	fn update(&self, mut f: impl FnMut(&mut MapSnapshot<K, V>)) -> (Option<Arc<MapSnapshot<K, V>>>, Arc<MapSnapshot<K, V>>) {
		self.published.update(|cur| {
			let mut next = cur.unwrap_or(&*self.empty).clone();
			f(&mut next);
			next
		})
	}
}

/// List published by compare-and-swap.
pub struct AtomicList<T> {
	published: PublishedRef<Vec<T>>,
}

impl<T> Default for AtomicList<T> {
	fn default() -> Self {
		Self {
			published: PublishedRef::empty(),
		}
	}
}

impl<T: Shareable + Clone> AtomicList<T> {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn snapshot(&self) -> Arc<Vec<T>> {
		self.published.load().unwrap_or_default()
	}

	pub fn get(&self, index: usize) -> Option<T> {
		self.published.load()?.get(index).cloned()
	}

	pub fn len(&self) -> usize {
		self.published.load().map_or(0, |items| items.len())
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn rw(&self) -> Vec<T> {
		self.snapshot().as_ref().clone()
	}

	pub fn add(&self, item: T) {
		self.published.update(|cur| {
			let mut next = cur.cloned().unwrap_or_default();
			next.push(item.clone());
			next
		});
	}

	/// Replaces the element at `index`, returning the old one.
	pub fn set(&self, index: usize, item: T) -> Result<T> {
		let mut missing = false;
		let (prev, _) = self.published.update(|cur| {
			let mut next = cur.cloned().unwrap_or_default();
			match next.get_mut(index) {
				Some(slot) => {
					*slot = item.clone();
					missing = false;
				}
				None => missing = true,
			}
			next
		});
		let prev = prev.unwrap_or_default();
		match prev.get(index) {
			Some(old) if !missing => Ok(old.clone()),
			_ => Err(Error::index(index, prev.len())),
		}
	}

	pub fn pop(&self) -> Option<T> {
		let (prev, _) = self.published.update(|cur| {
			let mut next = cur.cloned().unwrap_or_default();
			next.pop();
			next
		});
		prev?.last().cloned()
	}

	pub fn clear(&self) {
		self.published.update(|_| Vec::new());
	}
}

impl<T: Shareable + Clone + PartialEq> AtomicList<T> {
	pub fn contains(&self, item: &T) -> bool {
		self.snapshot().contains(item)
	}

	/// Removes the first element equal to `item`.
	pub fn remove(&self, item: &T) -> bool {
		let (prev, _) = self.published.update(|cur| {
			let mut next = cur.cloned().unwrap_or_default();
			if let Some(index) = next.iter().position(|candidate| candidate == item) {
				next.remove(index);
			}
			next
		});
		prev.is_some_and(|prev| prev.contains(item))
	}
}
