//! Copy-on-write map with worker-serialized writers.
//!
//! # Mental model
//!
//! * Readers load the published [`MapSnapshot`] and look up against that
//!   immutable view. No lock, no job, no allocation.
//! * Writers enter the map's [`ExclusiveWriter`] section, copy the current
//!   snapshot, mutate the copy and publish it whole.
//! * Because the section is exclusive, no writer ever publishes a copy of a
//!   stale snapshot and no update is lost.
//!
//! # Invariants
//!
//! * A published snapshot is never mutated.
//! * The map stays unpublished until its first write; reads of an unpublished
//!   map behave as reads of an empty one.
//! * `get_or_add` runs its producer at most once per key, inside the write
//!   section, after re-checking that the key is still absent.
//! * Options (ordering, case folding, default value) are fixed at construction.
//!
//! # Concurrency & ordering
//!
//! * Reads are wait-free (`ArcSwapOption` load).
//! * Writes are totally ordered by the writer worker's FIFO mailbox.
//! * A write issued from inside another write section of the same map runs
//!   inline instead of deadlocking.

use std::sync::Arc;

use xeno_worker::WorkerPool;

use crate::error::{Error, Result};
use crate::guard::Shareable;
use crate::published::PublishedRef;
use crate::writer::ExclusiveWriter;

mod snapshot;

pub use snapshot::{Entries, MapKey, MapSnapshot};

/// Construction options for shared maps.
#[derive(Debug, Clone)]
pub struct MapOptions<V> {
	name: String,
	ordered: bool,
	case_insensitive: bool,
	default: Option<V>,
}

impl<V> Default for MapOptions<V> {
	fn default() -> Self {
		Self {
			name: String::from("cow.map"),
			ordered: false,
			case_insensitive: false,
			default: None,
		}
	}
}

impl<V> MapOptions<V> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Name of the writer worker.
	#[must_use]
	pub fn name(mut self, name: impl Into<String>) -> Self {
		self.name = name.into();
		self
	}

	/// Iterate in insertion order, also across removals.
	#[must_use]
	pub fn ordered(mut self, ordered: bool) -> Self {
		self.ordered = ordered;
		self
	}

	/// Compare textual keys without regard to case.
	#[must_use]
	pub fn case_insensitive(mut self, case_insensitive: bool) -> Self {
		self.case_insensitive = case_insensitive;
		self
	}

	/// Value returned by `get` for absent keys.
	#[must_use]
	pub fn default_value(mut self, default: V) -> Self {
		self.default = Some(default);
		self
	}

	pub(crate) fn validate<K: MapKey>(&self) -> Result<()> {
		if self.case_insensitive && !K::TEXTUAL {
			return Err(Error::Misconfiguration(format!(
				"case-insensitive map {} needs textual keys, not {}",
				self.name,
				std::any::type_name::<K>()
			)));
		}
		Ok(())
	}

	pub(crate) fn empty_snapshot<K: MapKey>(&self) -> MapSnapshot<K, V> {
		MapSnapshot::new(self.ordered, self.case_insensitive)
	}

	pub(crate) fn take_default(&mut self) -> Option<V> {
		self.default.take()
	}
}

struct Shared<K, V> {
	published: PublishedRef<MapSnapshot<K, V>>,
	empty: Arc<MapSnapshot<K, V>>,
	default: Option<V>,
}

impl<K: MapKey, V: Shareable + Clone> Shared<K, V> {
	fn current(&self) -> Arc<MapSnapshot<K, V>> {
		self.published.load().unwrap_or_else(|| Arc::clone(&self.empty))
	}

	fn publish(&self, next: MapSnapshot<K, V>) {
		tracing::trace!(len = next.len(), "cow.map.publish");
		self.published.publish(Arc::new(next));
	}
}

/// Map for read-mostly data shared across workers.
///
/// Cloning is cheap; clones share the map.
pub struct CowMap<K, V> {
	shared: Arc<Shared<K, V>>,
	writer: ExclusiveWriter,
}

impl<K, V> Clone for CowMap<K, V> {
	fn clone(&self) -> Self {
		Self {
			shared: Arc::clone(&self.shared),
			writer: self.writer.clone(),
		}
	}
}

impl<K: MapKey + std::fmt::Debug, V: Shareable + Clone + std::fmt::Debug> std::fmt::Debug for CowMap<K, V> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_map().entries(self.shared.current().iter()).finish()
	}
}

impl<K: MapKey, V: Shareable + Clone> CowMap<K, V> {
	/// Creates an unordered, case-sensitive map without a default value.
	pub fn new(pool: &WorkerPool) -> Self {
		Self::build(pool, MapOptions::default())
	}

	/// Creates a map with explicit options.
	///
	/// Fails with [`Error::Misconfiguration`] when case folding is requested
	/// for non-textual keys.
	pub fn with_options(pool: &WorkerPool, options: MapOptions<V>) -> Result<Self> {
		options.validate::<K>()?;
		Ok(Self::build(pool, options))
	}

	/// Creates a map with options adjusted by `configure`.
	pub fn configured(pool: &WorkerPool, configure: impl FnOnce(MapOptions<V>) -> MapOptions<V>) -> Result<Self> {
		Self::with_options(pool, configure(MapOptions::default()))
	}

	fn build(pool: &WorkerPool, mut options: MapOptions<V>) -> Self {
		let writer = ExclusiveWriter::new(pool, &options.name);
		Self {
			shared: Arc::new(Shared {
				published: PublishedRef::empty(),
				empty: Arc::new(options.empty_snapshot()),
				default: options.take_default(),
			}),
			writer,
		}
	}

	/// Current snapshot. Holding it pins that version of the map.
	pub fn snapshot(&self) -> Arc<MapSnapshot<K, V>> {
		self.shared.current()
	}

	/// Returns `true` once the map has been written.
	pub fn is_published(&self) -> bool {
		self.shared.published.is_published()
	}

	/// Value for `key`, falling back to the configured default.
	pub fn get(&self, key: &K) -> Option<V> {
		self.snapshot().get(key).cloned().or_else(|| self.shared.default.clone())
	}

	/// Value for `key`, or `default` when absent.
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

	/// Visits every entry of one snapshot.
	pub fn each(&self, mut f: impl FnMut(&K, &V)) {
		for (key, value) in self.snapshot().iter() {
			f(key, value);
		}
	}

	/// Private read-write copy of the current entries.
	pub fn rw(&self) -> Entries<K, V> {
		self.snapshot().to_entries()
	}

	/// Stores `value` under `key` and returns the previous value.
	pub fn set(&self, key: K, value: V) -> Result<Option<V>> {
		self.write(move |next| next.insert(key, value))
	}

	/// Stores all `entries` in one publication.
	pub fn set_all(&self, entries: impl IntoIterator<Item = (K, V)>) -> Result<()> {
		let entries: Vec<_> = entries.into_iter().collect();
		self.write(move |next| next.extend(entries))
	}

	/// Publishes a map holding exactly `entries`.
	pub fn replace(&self, entries: impl IntoIterator<Item = (K, V)>) -> Result<()> {
		let entries: Vec<_> = entries.into_iter().collect();
		self.write(move |next| {
			*next = next.emptied();
			next.extend(entries);
		})
	}

	/// Removes `key`, returning its value.
	pub fn remove(&self, key: &K) -> Result<Option<V>> {
		let key = key.clone();
		self.write(move |next| next.remove(&key))
	}

	pub fn clear(&self) -> Result<()> {
		self.write(MapSnapshot::clear)
	}

	/// Returns the value for `key`, storing `producer(key)` first when absent.
	///
	/// Under concurrent calls for the same key the producer runs once; every
	/// caller observes the stored value.
	pub fn get_or_add(&self, key: K, producer: impl FnOnce(&K) -> V + Send + 'static) -> Result<V> {
		self.try_get_or_add(key, move |key| Ok(producer(key)))
	}

	/// Like [`Self::get_or_add`] with a fallible producer. A failed producer
	/// leaves the map untouched.
	pub fn try_get_or_add(&self, key: K, producer: impl FnOnce(&K) -> Result<V> + Send + 'static) -> Result<V> {
		if let Some(value) = self.snapshot().get(&key) {
			return Ok(value.clone());
		}
		self.writer.lock(Self::get_or_add_section(Arc::clone(&self.shared), key, producer))?
	}

	/// Awaitable [`Self::set`].
	pub async fn set_async(&self, key: K, value: V) -> Result<Option<V>> {
		self.write_async(move |next| next.insert(key, value)).await
	}

	/// Awaitable [`Self::remove`].
	pub async fn remove_async(&self, key: &K) -> Result<Option<V>> {
		let key = key.clone();
		self.write_async(move |next| next.remove(&key)).await
	}

	/// Awaitable [`Self::clear`].
	pub async fn clear_async(&self) -> Result<()> {
		self.write_async(MapSnapshot::clear).await
	}

	/// Awaitable [`Self::get_or_add`].
	pub async fn get_or_add_async(&self, key: K, producer: impl FnOnce(&K) -> V + Send + 'static) -> Result<V> {
		self.try_get_or_add_async(key, move |key| Ok(producer(key))).await
	}

	/// Awaitable [`Self::try_get_or_add`].
	pub async fn try_get_or_add_async(&self, key: K, producer: impl FnOnce(&K) -> Result<V> + Send + 'static) -> Result<V> {
		if let Some(value) = self.snapshot().get(&key) {
			return Ok(value.clone());
		}
		self.writer
			.lock_async(Self::get_or_add_section(Arc::clone(&self.shared), key, producer))
			.await?
	}

	/// Writer serializing this map's mutations.
	pub fn writer(&self) -> &ExclusiveWriter {
		&self.writer
	}

	fn write<R, F>(&self, f: F) -> Result<R>
	where
		F: FnOnce(&mut MapSnapshot<K, V>) -> R + Send + 'static,
		R: Send + 'static,
	{
		self.writer.lock(Self::write_section(Arc::clone(&self.shared), f))
	}

	async fn write_async<R, F>(&self, f: F) -> Result<R>
	where
		F: FnOnce(&mut MapSnapshot<K, V>) -> R + Send + 'static,
		R: Send + 'static,
	{
		self.writer.lock_async(Self::write_section(Arc::clone(&self.shared), f)).await
	}

	/// Copy, mutate, publish. Runs inside the writer section.
	fn write_section<R, F>(shared: Arc<Shared<K, V>>, f: F) -> impl FnOnce() -> R + Send + 'static
	where
		F: FnOnce(&mut MapSnapshot<K, V>) -> R + Send + 'static,
		R: Send + 'static,
	{
		move || {
			let mut next = MapSnapshot::clone(&shared.current());
			let out = f(&mut next);
			shared.publish(next);
			out
		}
	}

	fn get_or_add_section(
		shared: Arc<Shared<K, V>>,
		key: K,
		producer: impl FnOnce(&K) -> Result<V> + Send + 'static,
	) -> impl FnOnce() -> Result<V> + Send + 'static {
		move || {
			let current = shared.current();
			if let Some(value) = current.get(&key) {
				return Ok(value.clone());
			}
			drop(current);
			let value = producer(&key)?;
			// The producer may itself have written through this map.
			let mut next = MapSnapshot::clone(&shared.current());
			next.insert(key, value.clone());
			shared.publish(next);
			Ok(value)
		}
	}
}

#[cfg(test)]
mod tests;
