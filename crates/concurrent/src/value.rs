//! Dynamic value model for configuration-driven containers.
//!
//! Statically typed containers rely on [`Shareable`](crate::Shareable) bounds.
//! [`Value`] is the escape hatch for containers whose key and value types are
//! only known at runtime; it carries enough shape to check types and to tell
//! mutable payloads ([`Value::Buf`], non-immutable [`Object`]s) from frozen ones.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use serde::Deserialize;

/// Named fields of an [`Object`], in insertion order.
pub type Fields = IndexMap<Arc<str>, Value, FxBuildHasher>;

/// Declared type of a key, value or element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
	#[default]
	Any,
	Null,
	Bool,
	Int,
	Float,
	Str,
	Bytes,
	Buf,
	List,
	Object,
}

impl ValueType {
	/// Runtime type of `value`.
	pub fn of(value: &Value) -> Self {
		match value {
			Value::Null => Self::Null,
			Value::Bool(_) => Self::Bool,
			Value::Int(_) => Self::Int,
			Value::Float(_) => Self::Float,
			Value::Str(_) => Self::Str,
			Value::Bytes(_) => Self::Bytes,
			Value::Buf(_) => Self::Buf,
			Value::List(_) => Self::List,
			Value::Object(_) => Self::Object,
		}
	}

	/// Returns `true` if `value` may be stored where `self` is declared.
	///
	/// A `Buf` is accepted for `Bytes` since it freezes into one.
	pub fn accepts(self, value: &Value) -> bool {
		match self {
			Self::Any => true,
			Self::Bytes => matches!(value, Value::Bytes(_) | Value::Buf(_)),
			declared => Self::of(value) == declared,
		}
	}

	pub fn name(self) -> &'static str {
		match self {
			Self::Any => "any",
			Self::Null => "null",
			Self::Bool => "bool",
			Self::Int => "int",
			Self::Float => "float",
			Self::Str => "str",
			Self::Bytes => "bytes",
			Self::Buf => "buf",
			Self::List => "list",
			Self::Object => "object",
		}
	}
}

impl fmt::Display for ValueType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// Record-like value with a class name and an immutability flag.
///
/// Only objects flagged immutable may be stored in shared containers.
#[derive(Debug, Clone)]
pub struct Object {
	class: Arc<str>,
	fields: Fields,
	immutable: bool,
}

impl Object {
	/// Creates an empty, mutable object.
	pub fn new(class: impl Into<Arc<str>>) -> Self {
		Self {
			class: class.into(),
			fields: Fields::default(),
			immutable: false,
		}
	}

	#[must_use]
	pub fn with_field(mut self, name: impl Into<Arc<str>>, value: impl Into<Value>) -> Self {
		self.fields.insert(name.into(), value.into());
		self
	}

	/// Flags the object as immutable.
	#[must_use]
	pub fn into_immutable(mut self) -> Self {
		self.immutable = true;
		self
	}

	pub fn set_field(&mut self, name: impl Into<Arc<str>>, value: impl Into<Value>) -> Option<Value> {
		self.fields.insert(name.into(), value.into())
	}

	pub fn field(&self, name: &str) -> Option<&Value> {
		self.fields.get(name)
	}

	pub fn fields(&self) -> &Fields {
		&self.fields
	}

	pub fn class(&self) -> &str {
		&self.class
	}

	pub fn is_immutable(&self) -> bool {
		self.immutable
	}

	pub(crate) fn try_map_fields(self, mut f: impl FnMut(Value) -> crate::Result<Value>) -> crate::Result<Self> {
		let mut fields = Fields::with_capacity_and_hasher(self.fields.len(), FxBuildHasher);
		for (name, value) in self.fields {
			fields.insert(name, f(value)?);
		}
		Ok(Self {
			class: self.class,
			fields,
			immutable: self.immutable,
		})
	}
}

impl PartialEq for Object {
	fn eq(&self, other: &Self) -> bool {
		self.class == other.class && self.immutable == other.immutable && self.fields == other.fields
	}
}

impl Eq for Object {}

impl Hash for Object {
	fn hash<H: Hasher>(&self, state: &mut H) {
		// Field equality ignores order, so only order-free parts are hashed.
		self.class.hash(state);
		self.immutable.hash(state);
		self.fields.len().hash(state);
	}
}

/// Dynamically typed value.
///
/// Floats compare and hash by bit pattern so values can serve as map keys.
#[derive(Debug, Clone, Default)]
pub enum Value {
	#[default]
	Null,
	Bool(bool),
	Int(i64),
	Float(f64),
	Str(Arc<str>),
	/// Frozen bytes.
	Bytes(Bytes),
	/// Growable bytes; freezes into [`Value::Bytes`].
	Buf(BytesMut),
	List(Vec<Value>),
	Object(Object),
}

impl Value {
	pub fn value_type(&self) -> ValueType {
		ValueType::of(self)
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Self::Bool(b) => Some(*b),
			_ => None,
		}
	}

	pub fn as_int(&self) -> Option<i64> {
		match self {
			Self::Int(n) => Some(*n),
			_ => None,
		}
	}

	pub fn as_float(&self) -> Option<f64> {
		match self {
			Self::Float(n) => Some(*n),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::Str(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_bytes(&self) -> Option<&[u8]> {
		match self {
			Self::Bytes(b) => Some(b),
			Self::Buf(b) => Some(b),
			_ => None,
		}
	}

	/// Converts a parsed TOML value. Datetimes become strings and tables
	/// become immutable objects of class `"table"`.
	pub fn from_toml(value: toml::Value) -> Self {
		match value {
			toml::Value::String(s) => Self::Str(s.into()),
			toml::Value::Integer(n) => Self::Int(n),
			toml::Value::Float(n) => Self::Float(n),
			toml::Value::Boolean(b) => Self::Bool(b),
			toml::Value::Datetime(dt) => Self::Str(dt.to_string().into()),
			toml::Value::Array(items) => Self::List(items.into_iter().map(Self::from_toml).collect()),
			toml::Value::Table(table) => {
				let object = table
					.into_iter()
					.fold(Object::new("table"), |object, (name, value)| object.with_field(name, Self::from_toml(value)));
				Self::Object(object.into_immutable())
			}
		}
	}
}

impl PartialEq for Value {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Null, Self::Null) => true,
			(Self::Bool(a), Self::Bool(b)) => a == b,
			(Self::Int(a), Self::Int(b)) => a == b,
			(Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
			(Self::Str(a), Self::Str(b)) => a == b,
			(Self::Bytes(a), Self::Bytes(b)) => a == b,
			(Self::Buf(a), Self::Buf(b)) => a == b,
			(Self::List(a), Self::List(b)) => a == b,
			(Self::Object(a), Self::Object(b)) => a == b,
			_ => false,
		}
	}
}

impl Eq for Value {}

impl Hash for Value {
	fn hash<H: Hasher>(&self, state: &mut H) {
		std::mem::discriminant(self).hash(state);
		match self {
			Self::Null => {}
			Self::Bool(b) => b.hash(state),
			Self::Int(n) => n.hash(state),
			Self::Float(n) => n.to_bits().hash(state),
			Self::Str(s) => s.hash(state),
			Self::Bytes(b) => b.hash(state),
			Self::Buf(b) => b.hash(state),
			Self::List(items) => items.hash(state),
			Self::Object(object) => object.hash(state),
		}
	}
}

impl From<bool> for Value {
	fn from(b: bool) -> Self {
		Self::Bool(b)
	}
}

impl From<i64> for Value {
	fn from(n: i64) -> Self {
		Self::Int(n)
	}
}

impl From<i32> for Value {
	fn from(n: i32) -> Self {
		Self::Int(n.into())
	}
}

impl From<f64> for Value {
	fn from(n: f64) -> Self {
		Self::Float(n)
	}
}

impl From<&str> for Value {
	fn from(s: &str) -> Self {
		Self::Str(s.into())
	}
}

impl From<String> for Value {
	fn from(s: String) -> Self {
		Self::Str(s.into())
	}
}

impl From<Arc<str>> for Value {
	fn from(s: Arc<str>) -> Self {
		Self::Str(s)
	}
}

impl From<Bytes> for Value {
	fn from(b: Bytes) -> Self {
		Self::Bytes(b)
	}
}

impl From<BytesMut> for Value {
	fn from(b: BytesMut) -> Self {
		Self::Buf(b)
	}
}

impl From<Vec<Value>> for Value {
	fn from(items: Vec<Value>) -> Self {
		Self::List(items)
	}
}

impl From<Object> for Value {
	fn from(object: Object) -> Self {
		Self::Object(object)
	}
}
