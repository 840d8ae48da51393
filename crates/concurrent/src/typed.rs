//! Runtime-checked containers over [`Value`].
//!
//! Used where key, value and element types come from configuration instead
//! of generics. Every entry is type-checked and frozen before the write
//! section is entered, so a rejected entry never costs a lock.

use std::sync::Arc;

use xeno_worker::WorkerPool;

use crate::config::{ListConfig, MapConfig};
use crate::error::{Error, Result, Side};
use crate::guard::{admit, expect_type, freeze};
use crate::list::{CowList, ListOptions};
use crate::map::{CowMap, MapOptions, MapSnapshot};
use crate::value::{Value, ValueType};

/// Map with declared key and value types.
#[derive(Debug, Clone)]
pub struct TypedMap {
	map: CowMap<Value, Value>,
	key_type: ValueType,
	value_type: ValueType,
}

impl TypedMap {
	/// Creates a map from `config`.
	///
	/// Case-insensitive maps need textual keys: an unset key type becomes
	/// `str`, any key type other than `str` is a [`Error::Misconfiguration`].
	pub fn new(pool: &WorkerPool, config: &MapConfig) -> Result<Self> {
		let key_type = match (config.case_insensitive, config.key_type) {
			(true, None | Some(ValueType::Any)) => ValueType::Str,
			(true, Some(ValueType::Str)) => ValueType::Str,
			(true, Some(other)) => {
				return Err(Error::Misconfiguration(format!("case-insensitive map needs str keys, not {other}")));
			}
			(false, declared) => declared.unwrap_or_default(),
		};
		let value_type = config.value_type.unwrap_or_default();

		let mut options = MapOptions::new()
			.name(config.name.clone())
			.ordered(config.ordered)
			.case_insensitive(config.case_insensitive);
		if let Some(default) = config.default.clone() {
			let default = admit(Side::Value, value_type, Value::from_toml(default))?;
			options = options.default_value(default);
		}

		tracing::debug!(map = %config.name, %key_type, %value_type, "typed.map.create");
		Ok(Self {
			map: CowMap::with_options(pool, options)?,
			key_type,
			value_type,
		})
	}

	/// Creates a map from a default config adjusted by `configure`.
	pub fn configured(pool: &WorkerPool, configure: impl FnOnce(&mut MapConfig)) -> Result<Self> {
		let mut config = MapConfig::default();
		configure(&mut config);
		Self::new(pool, &config)
	}

	pub fn key_type(&self) -> ValueType {
		self.key_type
	}

	pub fn value_type(&self) -> ValueType {
		self.value_type
	}

	pub fn get(&self, key: &Value) -> Option<Value> {
		self.map.get(key)
	}

	pub fn get_or(&self, key: &Value, default: Value) -> Value {
		self.map.get_or(key, default)
	}

	pub fn contains_key(&self, key: &Value) -> bool {
		self.map.contains_key(key)
	}

	pub fn len(&self) -> usize {
		self.map.len()
	}

	pub fn is_empty(&self) -> bool {
		self.map.is_empty()
	}

	pub fn keys(&self) -> Vec<Value> {
		self.map.keys()
	}

	pub fn values(&self) -> Vec<Value> {
		self.map.values()
	}

	pub fn snapshot(&self) -> Arc<MapSnapshot<Value, Value>> {
		self.map.snapshot()
	}

	pub fn set(&self, key: impl Into<Value>, value: impl Into<Value>) -> Result<Option<Value>> {
		let (key, value) = self.admit_entry(key.into(), value.into())?;
		self.map.set(key, value)
	}

	/// Checks every entry first; stores none unless all pass.
	pub fn set_all(&self, entries: impl IntoIterator<Item = (Value, Value)>) -> Result<()> {
		let entries = entries
			.into_iter()
			.map(|(key, value)| self.admit_entry(key, value))
			.collect::<Result<Vec<_>>>()?;
		self.map.set_all(entries)
	}

	pub fn remove(&self, key: &Value) -> Result<Option<Value>> {
		self.map.remove(key)
	}

	pub fn clear(&self) -> Result<()> {
		self.map.clear()
	}

	/// Returns the value for `key`, storing `producer(key)` first when absent.
	///
	/// The producer's result is type-checked and frozen inside the write
	/// section; a rejected result stores nothing.
	pub fn get_or_add(&self, key: impl Into<Value>, producer: impl FnOnce(&Value) -> Value + Send + 'static) -> Result<Value> {
		let key = admit(Side::Key, self.key_type, key.into())?;
		let value_type = self.value_type;
		self.map.try_get_or_add(key, move |key| admit(Side::Value, value_type, producer(key)))
	}

	/// Awaitable [`Self::set`].
	pub async fn set_async(&self, key: impl Into<Value>, value: impl Into<Value>) -> Result<Option<Value>> {
		let (key, value) = self.admit_entry(key.into(), value.into())?;
		self.map.set_async(key, value).await
	}

	pub async fn remove_async(&self, key: &Value) -> Result<Option<Value>> {
		self.map.remove_async(key).await
	}

	/// Awaitable [`Self::get_or_add`].
	pub async fn get_or_add_async(
		&self,
		key: impl Into<Value>,
		producer: impl FnOnce(&Value) -> Value + Send + 'static,
	) -> Result<Value> {
		let key = admit(Side::Key, self.key_type, key.into())?;
		let value_type = self.value_type;
		self.map
			.try_get_or_add_async(key, move |key| admit(Side::Value, value_type, producer(key)))
			.await
	}

	/// Underlying statically typed map.
	pub fn as_map(&self) -> &CowMap<Value, Value> {
		&self.map
	}

	fn admit_entry(&self, key: Value, value: Value) -> Result<(Value, Value)> {
		expect_type(Side::Key, self.key_type, &key)?;
		expect_type(Side::Value, self.value_type, &value)?;
		Ok((freeze(key)?, freeze(value)?))
	}
}

/// List with a declared element type.
#[derive(Debug, Clone)]
pub struct TypedList {
	list: CowList<Value>,
	element_type: ValueType,
}

impl TypedList {
	pub fn new(pool: &WorkerPool, config: &ListConfig) -> Result<Self> {
		let element_type = config.element_type.unwrap_or_default();
		let list = CowList::with_options(pool, ListOptions::new().name(config.name.clone()));
		let initial = config
			.items
			.iter()
			.cloned()
			.map(|item| admit(Side::Element, element_type, Value::from_toml(item)))
			.collect::<Result<Vec<_>>>()?;
		if !initial.is_empty() {
			list.replace(initial)?;
		}
		tracing::debug!(list = %config.name, %element_type, "typed.list.create");
		Ok(Self { list, element_type })
	}

	pub fn element_type(&self) -> ValueType {
		self.element_type
	}

	pub fn get(&self, index: usize) -> Option<Value> {
		self.list.get(index)
	}

	pub fn len(&self) -> usize {
		self.list.len()
	}

	pub fn is_empty(&self) -> bool {
		self.list.is_empty()
	}

	pub fn contains(&self, item: &Value) -> bool {
		self.list.contains(item)
	}

	pub fn index_of(&self, item: &Value) -> Option<usize> {
		self.list.index_of(item)
	}

	pub fn to_vec(&self) -> Vec<Value> {
		self.list.rw()
	}

	pub fn add(&self, item: impl Into<Value>) -> Result<()> {
		self.list.add(self.admit(item.into())?)
	}

	pub fn insert(&self, index: usize, item: impl Into<Value>) -> Result<()> {
		self.list.insert(index, self.admit(item.into())?)
	}

	pub fn set(&self, index: usize, item: impl Into<Value>) -> Result<Value> {
		self.list.set(index, self.admit(item.into())?)
	}

	pub fn remove(&self, item: &Value) -> Result<bool> {
		self.list.remove(item)
	}

	pub fn remove_at(&self, index: usize) -> Result<Value> {
		self.list.remove_at(index)
	}

	pub fn clear(&self) -> Result<()> {
		self.list.clear()
	}

	/// Awaitable [`Self::add`].
	pub async fn add_async(&self, item: impl Into<Value>) -> Result<()> {
		let item = self.admit(item.into())?;
		self.list.add_async(item).await
	}

	pub async fn remove_async(&self, item: &Value) -> Result<bool> {
		self.list.remove_async(item).await
	}

	pub fn as_list(&self) -> &CowList<Value> {
		&self.list
	}

	fn admit(&self, item: Value) -> Result<Value> {
		admit(Side::Element, self.element_type, item)
	}
}

#[cfg(test)]
mod tests {
	use bytes::{Bytes, BytesMut};

	use super::*;
	use crate::value::Object;

	fn pool(name: &str) -> WorkerPool {
		WorkerPool::builder(name).max_threads(4).build().unwrap()
	}

	fn int_to_str(pool: &WorkerPool) -> TypedMap {
		TypedMap::configured(pool, |c| {
			c.key_type = Some(ValueType::Int);
			c.value_type = Some(ValueType::Str);
		})
		.unwrap()
	}

	#[test]
	fn rejects_wrong_key_type() {
		let pool = pool("typed.key");
		let map = int_to_str(&pool);
		let err = map.set("str", "str").unwrap_err();
		assert!(matches!(
			err,
			Error::TypeMismatch {
				side: Side::Key,
				expected: ValueType::Int,
				actual: ValueType::Str
			}
		));
		assert!(!map.as_map().is_published(), "rejected entries never reach the writer");
	}

	#[test]
	fn rejects_wrong_value_type() {
		let pool = pool("typed.value");
		let map = int_to_str(&pool);
		let err = map.set(13, 13).unwrap_err();
		assert!(matches!(
			err,
			Error::TypeMismatch {
				side: Side::Value,
				expected: ValueType::Str,
				actual: ValueType::Int
			}
		));
		assert_eq!(map.set(13, "thirteen").unwrap(), None);
		assert_eq!(map.get(&Value::from(13)), Some(Value::from("thirteen")));
	}

	#[test]
	fn buffers_are_frozen_on_the_way_in() {
		let pool = pool("typed.freeze");
		let map = TypedMap::configured(&pool, |c| c.value_type = Some(ValueType::Bytes)).unwrap();
		map.set("k", BytesMut::from(&b"raw"[..])).unwrap();
		assert_eq!(map.get(&Value::from("k")), Some(Value::Bytes(Bytes::from_static(b"raw"))));
	}

	#[test]
	fn mutable_objects_are_rejected() {
		let pool = pool("typed.mutable");
		let map = TypedMap::configured(&pool, |_| {}).unwrap();
		let err = map.set("session", Object::new("session")).unwrap_err();
		assert!(matches!(err, Error::NotImmutable(_)));
		map.set("session", Object::new("session").into_immutable()).unwrap();
	}

	#[test]
	fn get_or_add_checks_producer_result() {
		let pool = pool("typed.get_or_add");
		let map = int_to_str(&pool);
		let err = map.get_or_add(1, |_| Value::from(1)).unwrap_err();
		assert!(matches!(err, Error::TypeMismatch { side: Side::Value, .. }));
		assert!(!map.contains_key(&Value::from(1)));

		let err = map.get_or_add(2, |_| Value::from(Object::new("live"))).unwrap_err();
		assert!(matches!(err, Error::TypeMismatch { .. }));

		assert_eq!(map.get_or_add(3, |k| Value::from(format!("{k:?}"))).unwrap(), Value::from("Int(3)"));
	}

	#[test]
	fn get_or_add_rejects_mutable_producer_result() {
		let pool = pool("typed.get_or_add.mutable");
		let map = TypedMap::configured(&pool, |_| {}).unwrap();
		assert_eq!(map.value_type(), ValueType::Any);

		let err = map.get_or_add("session", |_| Value::from(Object::new("live"))).unwrap_err();
		assert!(matches!(err, Error::NotImmutable(_)));
		assert!(!map.contains_key(&Value::from("session")));
		assert!(!map.as_map().is_published());

		let stored = map.get_or_add("session", |_| Value::from(Object::new("live").into_immutable())).unwrap();
		assert!(matches!(stored, Value::Object(ref object) if object.is_immutable()));
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
	async fn async_writes_check_types() {
		let pool = WorkerPool::from_handle("typed.async", tokio::runtime::Handle::current());
		let map = int_to_str(&pool);
		assert!(matches!(map.set_async(1, 1).await, Err(Error::TypeMismatch { side: Side::Value, .. })));
		assert_eq!(map.set_async(1, "one").await.unwrap(), None);
		assert_eq!(map.get_or_add_async(2, |_| Value::from("two")).await.unwrap(), Value::from("two"));
		assert_eq!(map.remove_async(&Value::from(1)).await.unwrap(), Some(Value::from("one")));

		let list = TypedList::new(
			&pool,
			&ListConfig {
				element_type: Some(ValueType::Int),
				..ListConfig::default()
			},
		)
		.unwrap();
		list.add_async(5).await.unwrap();
		assert!(list.add_async("five").await.is_err());
		assert!(list.remove_async(&Value::from(5)).await.unwrap());
		assert!(list.is_empty());
	}

	#[test]
	fn case_insensitive_forces_str_keys() {
		let pool = pool("typed.case");
		let map = TypedMap::configured(&pool, |c| c.case_insensitive = true).unwrap();
		assert_eq!(map.key_type(), ValueType::Str);
		map.set("Name", 1).unwrap();
		assert_eq!(map.get(&Value::from("NAME")), Some(Value::from(1)));
		assert!(matches!(map.set(1, 1), Err(Error::TypeMismatch { side: Side::Key, .. })));

		let err = TypedMap::configured(&pool, |c| {
			c.case_insensitive = true;
			c.key_type = Some(ValueType::Int);
		})
		.unwrap_err();
		assert!(matches!(err, Error::Misconfiguration(_)));
	}

	#[test]
	fn set_all_is_all_or_nothing() {
		let pool = pool("typed.set_all");
		let map = int_to_str(&pool);
		let err = map.set_all([(Value::from(1), Value::from("a")), (Value::from(2), Value::from(2))]);
		assert!(err.is_err());
		assert!(map.is_empty());
	}

	#[test]
	fn list_checks_elements() {
		let pool = pool("typed.list");
		let list = TypedList::new(
			&pool,
			&ListConfig {
				element_type: Some(ValueType::Int),
				..ListConfig::default()
			},
		)
		.unwrap();
		list.add(1).unwrap();
		let err = list.add("two").unwrap_err();
		assert!(matches!(
			err,
			Error::TypeMismatch {
				side: Side::Element,
				expected: ValueType::Int,
				actual: ValueType::Str
			}
		));
		assert!(matches!(list.set(4, 4), Err(Error::NotFound(_))));
		assert_eq!(list.to_vec(), vec![Value::from(1)]);
	}
}
