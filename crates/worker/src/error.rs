//! Error types for worker scheduling.

use std::sync::Arc;

use thiserror::Error;

/// Errors raised when handing work to a worker.
#[derive(Debug, Clone, Error)]
pub enum WorkerError {
	/// The worker's pool has shut down, or the job was dropped before it ran.
	#[error("worker {worker} on pool {pool} is no longer accepting jobs")]
	Disconnected {
		/// Name of the worker the job was addressed to.
		worker: Arc<str>,
		/// Name of the pool hosting the worker.
		pool: Arc<str>,
	},

	/// The pool's runtime could not be started.
	#[error("failed to start worker pool {pool}: {message}")]
	PoolStart {
		/// Requested pool name.
		pool: String,
		/// Underlying runtime builder error.
		message: String,
	},
}

/// Result type for worker operations.
pub type Result<T> = std::result::Result<T, WorkerError>;
