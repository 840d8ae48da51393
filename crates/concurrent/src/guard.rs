//! Admission checks for values crossing a context boundary.

use crate::error::{Error, Result, Side};
use crate::value::{Value, ValueType};

/// Types whose values can be published to other contexts.
///
/// Statically typed containers bound their contents by this trait; the
/// compiler then rules out shared mutable state. Interior mutability behind
/// `Sync` types stays the owner's responsibility.
pub trait Shareable: Send + Sync + 'static {}

impl<T: Send + Sync + 'static + ?Sized> Shareable for T {}

/// Returns `true` if `value` holds no mutable payload at any depth.
pub fn is_immutable(value: &Value) -> bool {
	match value {
		Value::Buf(_) => false,
		Value::List(items) => items.iter().all(is_immutable),
		Value::Object(object) => object.is_immutable() && object.fields().values().all(is_immutable),
		_ => true,
	}
}

/// Converts `value` into its deeply immutable form.
///
/// Buffers freeze into bytes and lists freeze element-wise. Objects must
/// already be flagged immutable; their fields are frozen in turn.
pub fn freeze(value: Value) -> Result<Value> {
	match value {
		Value::Buf(buf) => Ok(Value::Bytes(buf.freeze())),
		Value::List(items) => items.into_iter().map(freeze).collect::<Result<Vec<_>>>().map(Value::List),
		Value::Object(object) if !object.is_immutable() => Err(Error::NotImmutable(format!("object of class {}", object.class()))),
		Value::Object(object) => object.try_map_fields(freeze).map(Value::Object),
		other => Ok(other),
	}
}

/// Fails with [`Error::TypeMismatch`] unless `expected` accepts `value`.
pub fn expect_type(side: Side, expected: ValueType, value: &Value) -> Result<()> {
	if expected.accepts(value) {
		return Ok(());
	}
	Err(Error::TypeMismatch {
		side,
		expected,
		actual: value.value_type(),
	})
}

/// Type-checks then freezes `value`.
pub fn admit(side: Side, expected: ValueType, value: Value) -> Result<Value> {
	expect_type(side, expected, &value)?;
	freeze(value)
}
