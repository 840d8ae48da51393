//! Context-local collections.
//!
//! Each context (the running worker, or the OS thread outside any worker)
//! sees its own collection. Reads of a collection this context never wrote
//! see it empty and leave it unmapped; the first write creates it.

use std::hash::Hash;

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use xeno_worker::LocalSlot;

type Map<K, V> = IndexMap<K, V, FxBuildHasher>;

/// Map stored in context-local storage.
pub struct LocalMap<K, V> {
	slot: LocalSlot<Map<K, V>>,
}

impl<K, V> Clone for LocalMap<K, V> {
	fn clone(&self) -> Self {
		Self { slot: self.slot.clone() }
	}
}

impl<K: Eq + Hash + Send + 'static, V: Send + 'static> LocalMap<K, V> {
	pub fn new(name: &str) -> Self {
		Self { slot: LocalSlot::new(name) }
	}

	/// Returns `true` once this context has written the map.
	pub fn is_mapped(&self) -> bool {
		self.slot.is_mapped()
	}

	pub fn get(&self, key: &K) -> Option<V>
	where
		V: Clone,
	{
		self.slot.with(|map| map.and_then(|map| map.get(key).cloned()))
	}

	pub fn contains_key(&self, key: &K) -> bool {
		self.slot.with(|map| map.is_some_and(|map| map.contains_key(key)))
	}

	pub fn len(&self) -> usize {
		self.slot.with(|map| map.map_or(0, Map::len))
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn keys(&self) -> Vec<K>
	where
		K: Clone,
	{
		self.slot.with(|map| map.map(|map| map.keys().cloned().collect()).unwrap_or_default())
	}

	pub fn insert(&self, key: K, value: V) -> Option<V> {
		self.slot.with_mut_or_insert_with(Map::default, |map| map.insert(key, value))
	}

	/// Returns the value for `key`, inserting `init()` first when absent.
	pub fn get_or_insert_with(&self, key: K, init: impl FnOnce() -> V) -> V
	where
		V: Clone,
	{
		self.slot.with_mut_or_insert_with(Map::default, |map| map.entry(key).or_insert_with(init).clone())
	}

	/// Removes `key`. Never maps the collection.
	pub fn remove(&self, key: &K) -> Option<V> {
		self.slot.with_mut(|map| map.shift_remove(key)).flatten()
	}

	/// Drops this context's map and unmaps it.
	pub fn clear(&self) {
		self.slot.clean_up();
	}
}

/// List stored in context-local storage.
pub struct LocalList<T> {
	slot: LocalSlot<Vec<T>>,
}

impl<T> Clone for LocalList<T> {
	fn clone(&self) -> Self {
		Self { slot: self.slot.clone() }
	}
}

impl<T: Send + 'static> LocalList<T> {
	pub fn new(name: &str) -> Self {
		Self { slot: LocalSlot::new(name) }
	}

	pub fn is_mapped(&self) -> bool {
		self.slot.is_mapped()
	}

	pub fn get(&self, index: usize) -> Option<T>
	where
		T: Clone,
	{
		self.slot.with(|items| items.and_then(|items| items.get(index).cloned()))
	}

	pub fn len(&self) -> usize {
		self.slot.with(|items| items.map_or(0, Vec::len))
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn push(&self, item: T) {
		self.slot.with_mut_or_insert_with(Vec::new, |items| items.push(item));
	}

	pub fn pop(&self) -> Option<T> {
		self.slot.with_mut(Vec::pop).flatten()
	}

	pub fn remove_at(&self, index: usize) -> Option<T> {
		self.slot
			.with_mut(|items| (index < items.len()).then(|| items.remove(index)))
			.flatten()
	}

	pub fn to_vec(&self) -> Vec<T>
	where
		T: Clone,
	{
		self.slot.with(|items| items.cloned().unwrap_or_default())
	}

	pub fn clear(&self) {
		self.slot.clean_up();
	}
}
