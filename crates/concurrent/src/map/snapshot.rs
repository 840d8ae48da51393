use std::hash::Hash;
use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashMap};

use crate::guard::Shareable;
use crate::value::Value;

/// Storage backing a map snapshot.
pub type Entries<K, V> = IndexMap<K, V, FxBuildHasher>;

/// Key types accepted by the shared maps.
///
/// `&'static str` keys are not [`Self::TEXTUAL`]: folding one would need a
/// new owned key. Case-insensitive maps take `String`, `Arc<str>` or
/// [`Value`] keys.
pub trait MapKey: Shareable + Clone + Eq + Hash {
	/// Whether keys of this type carry letter case.
	const TEXTUAL: bool = false;

	/// Case-folded form of the key. Only consulted when [`Self::TEXTUAL`].
	fn fold_case(&self) -> Self {
		self.clone()
	}
}

impl MapKey for String {
	const TEXTUAL: bool = true;

	fn fold_case(&self) -> Self {
		self.to_lowercase()
	}
}

impl MapKey for Arc<str> {
	const TEXTUAL: bool = true;

	fn fold_case(&self) -> Self {
		Arc::from(self.to_lowercase())
	}
}

impl MapKey for Value {
	const TEXTUAL: bool = true;

	fn fold_case(&self) -> Self {
		match self {
			Value::Str(s) => Value::Str(Arc::from(s.to_lowercase())),
			other => other.clone(),
		}
	}
}

macro_rules! plain_keys {
	($($ty:ty),* $(,)?) => {
		$(impl MapKey for $ty {})*
	};
}

plain_keys!(bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, &'static str);

/// Immutable view of a map at one point in time.
#[derive(Debug, Clone)]
pub struct MapSnapshot<K, V> {
	entries: Entries<K, V>,
	/// Folded key to stored key; present only for case-insensitive maps.
	folded: Option<FxHashMap<K, K>>,
	ordered: bool,
}

impl<K: MapKey, V> MapSnapshot<K, V> {
	pub(crate) fn new(ordered: bool, case_insensitive: bool) -> Self {
		Self {
			entries: Entries::default(),
			folded: case_insensitive.then(FxHashMap::default),
			ordered,
		}
	}

	pub fn get(&self, key: &K) -> Option<&V> {
		match &self.folded {
			Some(folded) => folded.get(&key.fold_case()).and_then(|stored| self.entries.get(stored)),
			None => self.entries.get(key),
		}
	}

	pub fn contains_key(&self, key: &K) -> bool {
		self.get(key).is_some()
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Entries in iteration order. Ordered maps iterate in insertion order.
	pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
		self.entries.iter()
	}

	pub fn keys(&self) -> impl Iterator<Item = &K> {
		self.entries.keys()
	}

	pub fn values(&self) -> impl Iterator<Item = &V> {
		self.entries.values()
	}

	pub fn is_ordered(&self) -> bool {
		self.ordered
	}

	pub fn is_case_insensitive(&self) -> bool {
		self.folded.is_some()
	}

	/// Inserts or overwrites. A case-insensitive map keeps the casing of the
	/// first key stored.
	pub(crate) fn insert(&mut self, key: K, value: V) -> Option<V> {
		if let Some(folded) = &mut self.folded {
			let fold = key.fold_case();
			if let Some(stored) = folded.get(&fold) {
				return self.entries.insert(stored.clone(), value);
			}
			folded.insert(fold, key.clone());
		}
		self.entries.insert(key, value)
	}

	pub(crate) fn remove(&mut self, key: &K) -> Option<V> {
		match &mut self.folded {
			Some(folded) => {
				let stored = folded.remove(&key.fold_case())?;
				self.remove_stored(&stored)
			}
			None => self.remove_stored(key),
		}
	}

	pub(crate) fn clear(&mut self) {
		self.entries.clear();
		if let Some(folded) = &mut self.folded {
			folded.clear();
		}
	}

	/// Empty map with the same options.
	pub(crate) fn emptied(&self) -> Self {
		Self::new(self.ordered, self.folded.is_some())
	}

	fn remove_stored(&mut self, stored: &K) -> Option<V> {
		if self.ordered {
			self.entries.shift_remove(stored)
		} else {
			self.entries.swap_remove(stored)
		}
	}
}

impl<K: MapKey, V: Clone> MapSnapshot<K, V> {
	/// Private, mutable copy of the entries.
	pub fn to_entries(&self) -> Entries<K, V> {
		self.entries.clone()
	}
}

impl<K: MapKey, V> Extend<(K, V)> for MapSnapshot<K, V> {
	fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
		for (key, value) in iter {
			self.insert(key, value);
		}
	}
}
