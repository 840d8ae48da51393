//! Error types for container operations.

use std::fmt;
use std::io;

use thiserror::Error;
use xeno_worker::WorkerError;

use crate::value::ValueType;

/// Which part of an entry failed a type check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
	/// Map key.
	Key,
	/// Map value, including a configured default.
	Value,
	/// List element.
	Element,
}

impl fmt::Display for Side {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Key => "key",
			Self::Value => "value",
			Self::Element => "element",
		})
	}
}

/// Errors raised by containers.
///
/// Validation failures are reported before any lock is taken or any state
/// changes.
#[derive(Debug, Clone, Error)]
pub enum Error {
	/// A key, value or element does not have the declared type.
	#[error("{side} type mismatch: expected {expected}, got {actual}")]
	TypeMismatch {
		/// Part of the entry that was checked.
		side: Side,
		/// Declared type.
		expected: ValueType,
		/// Type of the rejected value.
		actual: ValueType,
	},

	/// A value cannot cross a context boundary because it is mutable and
	/// cannot be frozen.
	#[error("{0} is not immutable and cannot be frozen")]
	NotImmutable(String),

	/// An index, key or pushback position does not exist.
	#[error("not found: {0}")]
	NotFound(String),

	/// Construction options contradict each other.
	#[error("misconfigured container: {0}")]
	Misconfiguration(String),

	/// A container configuration could not be parsed.
	#[error("invalid container configuration: {0}")]
	Config(String),

	/// The owning worker stopped accepting jobs.
	#[error(transparent)]
	Worker(#[from] WorkerError),
}

impl Error {
	pub(crate) fn index(index: usize, len: usize) -> Self {
		Self::NotFound(format!("index {index} out of bounds for length {len}"))
	}
}

impl From<toml::de::Error> for Error {
	fn from(err: toml::de::Error) -> Self {
		Self::Config(err.to_string())
	}
}

impl From<Error> for io::Error {
	fn from(err: Error) -> Self {
		let kind = match &err {
			Error::Worker(_) => io::ErrorKind::BrokenPipe,
			_ => io::ErrorKind::Other,
		};
		io::Error::new(kind, err)
	}
}

/// Result type for container operations.
pub type Result<T> = std::result::Result<T, Error>;
