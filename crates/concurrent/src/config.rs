//! Configuration-driven container construction.
//!
//! A [`ContainerConfig`] names the kind of container and its options, and is
//! usually parsed from TOML:
//!
//! ```toml
//! kind = "map"
//! name = "headers"
//! key_type = "str"
//! value_type = "str"
//! case_insensitive = true
//! ```

use serde::Deserialize;
use xeno_worker::WorkerPool;

use crate::buffer::{BufferOptions, StreamingBuffer};
use crate::error::Result;
use crate::typed::{TypedList, TypedMap};
use crate::value::ValueType;

/// Options for a [`TypedMap`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MapConfig {
	pub name: String,
	pub key_type: Option<ValueType>,
	pub value_type: Option<ValueType>,
	pub ordered: bool,
	pub case_insensitive: bool,
	/// Returned by `get` for absent keys.
	pub default: Option<toml::Value>,
}

impl Default for MapConfig {
	fn default() -> Self {
		Self {
			name: String::from("typed.map"),
			key_type: None,
			value_type: None,
			ordered: false,
			case_insensitive: false,
			default: None,
		}
	}
}

/// Options for a [`TypedList`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ListConfig {
	pub name: String,
	pub element_type: Option<ValueType>,
	/// Initial contents.
	pub items: Vec<toml::Value>,
}

impl Default for ListConfig {
	fn default() -> Self {
		Self {
			name: String::from("typed.list"),
			element_type: None,
			items: Vec::new(),
		}
	}
}

/// Declarative description of one container.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContainerConfig {
	Map(MapConfig),
	List(ListConfig),
	Buffer(BufferOptions),
}

impl ContainerConfig {
	/// Parses a configuration document.
	pub fn from_toml(source: &str) -> Result<Self> {
		Ok(toml::from_str(source)?)
	}

	/// Builds the described container on `pool`.
	pub fn build(&self, pool: &WorkerPool) -> Result<Container> {
		Ok(match self {
			Self::Map(config) => Container::Map(TypedMap::new(pool, config)?),
			Self::List(config) => Container::List(TypedList::new(pool, config)?),
			Self::Buffer(options) => Container::Buffer(StreamingBuffer::with_options(pool, options.clone())),
		})
	}
}

/// Container built from a [`ContainerConfig`].
#[derive(Debug, Clone)]
pub enum Container {
	Map(TypedMap),
	List(TypedList),
	Buffer(StreamingBuffer),
}

impl Container {
	pub fn as_map(&self) -> Option<&TypedMap> {
		match self {
			Self::Map(map) => Some(map),
			_ => None,
		}
	}

	pub fn as_list(&self) -> Option<&TypedList> {
		match self {
			Self::List(list) => Some(list),
			_ => None,
		}
	}

	pub fn as_buffer(&self) -> Option<&StreamingBuffer> {
		match self {
			Self::Buffer(buffer) => Some(buffer),
			_ => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::error::Error;
	use crate::value::Value;

	fn pool(name: &str) -> WorkerPool {
		WorkerPool::builder(name).max_threads(4).build().unwrap()
	}

	#[test]
	fn parses_map_config() {
		let config = ContainerConfig::from_toml(
			r#"
kind = "map"
name = "headers"
key_type = "str"
value_type = "int"
ordered = true
default = 0
"#,
		)
		.unwrap();
		let ContainerConfig::Map(map) = &config else {
			panic!("expected map config");
		};
		assert_eq!(map.name, "headers");
		assert_eq!(map.key_type, Some(ValueType::Str));
		assert_eq!(map.value_type, Some(ValueType::Int));
		assert!(map.ordered);
		assert!(!map.case_insensitive);

		let pool = pool("config.map");
		let built = config.build(&pool).unwrap();
		let map = built.as_map().unwrap();
		assert_eq!(map.get(&Value::from("missing")), Some(Value::Int(0)));
	}

	#[test]
	fn list_items_are_checked() {
		let pool = pool("config.list");
		let config = ContainerConfig::from_toml("kind = \"list\"\nelement_type = \"int\"\nitems = [1, 2, 3]\n").unwrap();
		let built = config.build(&pool).unwrap();
		assert_eq!(built.as_list().unwrap().len(), 3);

		let bad = ContainerConfig::from_toml("kind = \"list\"\nelement_type = \"int\"\nitems = [1, \"x\"]\n").unwrap();
		assert!(matches!(bad.build(&pool), Err(Error::TypeMismatch { .. })));
	}

	#[test]
	fn mistyped_default_is_rejected() {
		let pool = pool("config.default");
		let config = ContainerConfig::from_toml("kind = \"map\"\nvalue_type = \"str\"\ndefault = 5\n").unwrap();
		assert!(matches!(config.build(&pool), Err(Error::TypeMismatch { .. })));
	}

	#[test]
	fn buffer_config_uses_defaults() {
		let config = ContainerConfig::from_toml("kind = \"buffer\"\npushback_limit = 4\n").unwrap();
		assert_eq!(config, ContainerConfig::Buffer(BufferOptions::new().pushback_limit(4)));
	}

	#[test]
	fn unknown_kind_is_a_config_error() {
		let err = ContainerConfig::from_toml("kind = \"tree\"").unwrap_err();
		assert!(matches!(err, Error::Config(_)));
	}
}
