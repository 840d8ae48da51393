use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use tokio::sync::oneshot;

use crate::context;
use crate::error::{Result, WorkerError};
use crate::ids::WORKER_IDS;
use crate::mailbox::{Job, Mailbox};
use crate::panic::panic_message;
use crate::pool::WorkerPool;

struct WorkerInner {
	id: u64,
	name: Arc<str>,
	pool: WorkerPool,
	mailbox: Mailbox,
}

impl WorkerInner {
	fn drain(&self) {
		let mut locals = self.mailbox.take_locals();
		tracing::trace!(worker = %self.name, pending = self.mailbox.len(), "worker.drain");
		while let Some(job) = self.mailbox.pop_or_park(&mut locals) {
			if self.pool.is_shut_down() {
				// Dropping the job drops its reply channel.
				drop(job);
				continue;
			}
			context::enter(self.id, &mut locals, job);
		}
	}
}

/// Serial execution context hosted by a [`WorkerPool`].
///
/// Jobs run one at a time in the order they were received, each with the
/// worker's context-local storage installed. Cloning is cheap; all clones
/// address the same worker.
///
/// Synchronous calls block the calling thread, so they must not be issued
/// from inside an async task; use [`Worker::call_async`] there.
#[derive(Clone)]
pub struct Worker {
	inner: Arc<WorkerInner>,
}

impl fmt::Debug for Worker {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Worker")
			.field("id", &self.inner.id)
			.field("name", &self.inner.name)
			.field("pool", &self.inner.pool.name())
			.finish()
	}
}

impl Worker {
	/// Creates a worker on `pool`.
	pub fn new(pool: &WorkerPool, name: impl Into<String>) -> Self {
		let id = WORKER_IDS.next();
		let name: Arc<str> = Arc::from(name.into());
		tracing::trace!(worker = %name, id, pool = pool.name(), "worker.spawn");
		Self {
			inner: Arc::new(WorkerInner {
				id,
				name,
				pool: pool.clone(),
				mailbox: Mailbox::new(),
			}),
		}
	}

	/// Process-unique worker id.
	pub fn id(&self) -> u64 {
		self.inner.id
	}

	/// Worker name.
	pub fn name(&self) -> &str {
		&self.inner.name
	}

	/// Hosting pool.
	pub fn pool(&self) -> &WorkerPool {
		&self.inner.pool
	}

	/// Number of jobs waiting to run.
	pub fn pending(&self) -> usize {
		self.inner.mailbox.len()
	}

	/// Returns `true` when called from one of this worker's own jobs.
	pub fn is_current(&self) -> bool {
		context::current_worker() == Some(self.inner.id)
	}

	/// Runs `f` on the worker and waits for its result.
	///
	/// Called from one of this worker's own jobs, `f` runs inline. A panic in
	/// `f` is resumed in the caller.
	pub fn call<R, F>(&self, f: F) -> Result<R>
	where
		F: FnOnce() -> R + Send + 'static,
		R: Send + 'static,
	{
		if self.is_current() {
			return Ok(f());
		}
		let reply = self.submit(f)?;
		self.settle(reply.blocking_recv())
	}

	/// Runs `f` on the worker and awaits its result.
	pub async fn call_async<R, F>(&self, f: F) -> Result<R>
	where
		F: FnOnce() -> R + Send + 'static,
		R: Send + 'static,
	{
		if self.is_current() {
			return Ok(f());
		}
		let reply = self.submit(f)?;
		self.settle(reply.await)
	}

	/// Queues `f` without waiting. A panic in `f` is logged and the worker
	/// keeps serving.
	pub fn send<F>(&self, f: F) -> Result<()>
	where
		F: FnOnce() + Send + 'static,
	{
		let name = Arc::clone(&self.inner.name);
		self.enqueue(Box::new(move || {
			if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
				tracing::error!(
					worker = %name,
					panic = panic_message(&*payload).unwrap_or("<opaque>"),
					"worker.send.panicked"
				);
			}
		}))
	}

	fn submit<R, F>(&self, f: F) -> Result<oneshot::Receiver<thread::Result<R>>>
	where
		F: FnOnce() -> R + Send + 'static,
		R: Send + 'static,
	{
		let (tx, rx) = oneshot::channel();
		self.enqueue(Box::new(move || {
			let _ = tx.send(panic::catch_unwind(AssertUnwindSafe(f)));
		}))?;
		Ok(rx)
	}

	fn settle<R>(&self, reply: std::result::Result<thread::Result<R>, oneshot::error::RecvError>) -> Result<R> {
		match reply {
			Ok(Ok(value)) => Ok(value),
			Ok(Err(payload)) => panic::resume_unwind(payload),
			Err(_) => Err(self.disconnected()),
		}
	}

	fn enqueue(&self, job: Job) -> Result<()> {
		if self.inner.pool.is_shut_down() {
			return Err(self.disconnected());
		}
		if self.inner.mailbox.push(job) {
			let inner = Arc::clone(&self.inner);
			self.inner.pool.lend_thread(move || inner.drain());
		}
		Ok(())
	}

	fn disconnected(&self) -> WorkerError {
		WorkerError::Disconnected {
			worker: Arc::clone(&self.inner.name),
			pool: self.inner.pool.name_arc(),
		}
	}
}
