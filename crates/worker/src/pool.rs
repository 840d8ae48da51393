use std::fmt;
use std::sync::{Arc, OnceLock};

use tokio::runtime::{Handle, Runtime};
use tokio_util::sync::CancellationToken;

use crate::error::{Result, WorkerError};
use crate::worker::Worker;

/// Default number of threads a pool lends to draining workers.
const DEFAULT_MAX_THREADS: usize = 64;

struct PoolInner {
	name: Arc<str>,
	handle: Handle,
	/// Owned runtime, absent when the pool borrows an external handle.
	runtime: Option<Runtime>,
	shutdown: CancellationToken,
}

impl Drop for PoolInner {
	fn drop(&mut self) {
		// The last handle may be released on one of the pool's own threads.
		if let Some(runtime) = self.runtime.take() {
			runtime.shutdown_background();
		}
	}
}

/// Named pool of threads that workers borrow while draining their mailboxes.
///
/// Cloning is cheap; all clones refer to the same pool.
#[derive(Clone)]
pub struct WorkerPool {
	inner: Arc<PoolInner>,
}

impl fmt::Debug for WorkerPool {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WorkerPool")
			.field("name", &self.inner.name)
			.field("owns_runtime", &self.inner.runtime.is_some())
			.field("shut_down", &self.is_shut_down())
			.finish()
	}
}

impl WorkerPool {
	/// Creates a pool with its own runtime and default sizing.
	pub fn new(name: impl Into<String>) -> Result<Self> {
		Self::builder(name).build()
	}

	/// Starts building a pool with its own runtime.
	pub fn builder(name: impl Into<String>) -> WorkerPoolBuilder {
		WorkerPoolBuilder {
			name: name.into(),
			max_threads: DEFAULT_MAX_THREADS,
		}
	}

	/// Creates a pool that lends threads from an existing runtime.
	pub fn from_handle(name: impl Into<String>, handle: Handle) -> Self {
		let name: Arc<str> = Arc::from(name.into());
		tracing::debug!(pool = %name, "worker.pool.attach");
		Self {
			inner: Arc::new(PoolInner {
				name,
				handle,
				runtime: None,
				shutdown: CancellationToken::new(),
			}),
		}
	}

	/// Returns the process-wide default pool.
	pub fn global() -> Self {
		static GLOBAL: OnceLock<WorkerPool> = OnceLock::new();
		GLOBAL
			.get_or_init(|| WorkerPool::new("xeno-global").expect("failed to build xeno-worker global pool"))
			.clone()
	}

	/// Pool name.
	pub fn name(&self) -> &str {
		&self.inner.name
	}

	/// Creates a new worker hosted by this pool.
	pub fn worker(&self, name: impl Into<String>) -> Worker {
		Worker::new(self, name)
	}

	/// Stops accepting jobs. Queued jobs are dropped and their callers see
	/// [`WorkerError::Disconnected`].
	pub fn shutdown(&self) {
		if !self.inner.shutdown.is_cancelled() {
			tracing::debug!(pool = %self.inner.name, "worker.pool.shutdown");
			self.inner.shutdown.cancel();
		}
	}

	/// Returns `true` once [`Self::shutdown`] has been requested.
	pub fn is_shut_down(&self) -> bool {
		self.inner.shutdown.is_cancelled()
	}

	pub(crate) fn name_arc(&self) -> Arc<str> {
		Arc::clone(&self.inner.name)
	}

	/// Runs `f` on one of the pool's threads.
	pub(crate) fn lend_thread(&self, f: impl FnOnce() + Send + 'static) {
		drop(self.inner.handle.spawn_blocking(f));
	}
}

/// Builder for [`WorkerPool`]s that own their runtime.
#[derive(Debug, Clone)]
pub struct WorkerPoolBuilder {
	name: String,
	max_threads: usize,
}

impl WorkerPoolBuilder {
	/// Sets how many workers can drain concurrently.
	///
	/// A worker blocked in a synchronous call to another worker keeps its
	/// thread, so chains of nested calls need at least that many threads.
	///
	/// # Panics
	///
	/// Panics if `max_threads` is zero.
	#[must_use]
	pub fn max_threads(mut self, max_threads: usize) -> Self {
		assert!(max_threads > 0, "worker pool needs at least one thread");
		self.max_threads = max_threads;
		self
	}

	/// Builds the pool and starts its runtime.
	pub fn build(self) -> Result<WorkerPool> {
		let runtime = tokio::runtime::Builder::new_multi_thread()
			.worker_threads(1)
			.max_blocking_threads(self.max_threads)
			.thread_name(format!("{}-worker", self.name))
			.enable_all()
			.build()
			.map_err(|err| WorkerError::PoolStart {
				pool: self.name.clone(),
				message: err.to_string(),
			})?;

		tracing::debug!(pool = %self.name, max_threads = self.max_threads, "worker.pool.start");
		Ok(WorkerPool {
			inner: Arc::new(PoolInner {
				name: Arc::from(self.name),
				handle: runtime.handle().clone(),
				runtime: Some(runtime),
				shutdown: CancellationToken::new(),
			}),
		})
	}
}
