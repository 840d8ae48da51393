use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::local::LocalSlot;
use crate::pool::WorkerPool;
use crate::worker::Worker;

type Factory<S> = dyn Fn() -> S + Send + Sync;

/// Mutable value owned by a single worker.
///
/// The value lives in its worker's context-local storage and is created by
/// `factory` on first use. Other contexts reach it only by submitting jobs,
/// so every access is serialized in the worker's FIFO order.
pub struct SynchronizedState<S> {
	worker: Worker,
	slot: LocalSlot<S>,
	factory: Arc<Factory<S>>,
}

impl<S> Clone for SynchronizedState<S> {
	fn clone(&self) -> Self {
		Self {
			worker: self.worker.clone(),
			slot: self.slot.clone(),
			factory: Arc::clone(&self.factory),
		}
	}
}

impl<S> fmt::Debug for SynchronizedState<S> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SynchronizedState")
			.field("worker", &self.worker)
			.field("slot", &self.slot.name())
			.finish()
	}
}

impl<S: Send + 'static> SynchronizedState<S> {
	/// Binds a new worker on `pool` that owns the state.
	pub fn new(pool: &WorkerPool, name: &str, factory: impl Fn() -> S + Send + Sync + 'static) -> Self {
		Self::on(pool.worker(name), factory)
	}

	/// Places the state on an existing worker.
	pub fn on(worker: Worker, factory: impl Fn() -> S + Send + Sync + 'static) -> Self {
		let slot = LocalSlot::new(&format!("{}.state", worker.name()));
		Self {
			worker,
			slot,
			factory: Arc::new(factory),
		}
	}

	/// Owning worker.
	pub fn worker(&self) -> &Worker {
		&self.worker
	}

	/// Runs `f` against the state and waits for the result.
	pub fn call<R, F>(&self, f: F) -> Result<R>
	where
		F: FnOnce(&mut S) -> R + Send + 'static,
		R: Send + 'static,
	{
		let state = self.clone();
		self.worker.call(move || state.with_state(f))
	}

	/// Runs `f` against the state and awaits the result.
	pub async fn call_async<R, F>(&self, f: F) -> Result<R>
	where
		F: FnOnce(&mut S) -> R + Send + 'static,
		R: Send + 'static,
	{
		let state = self.clone();
		self.worker.call_async(move || state.with_state(f)).await
	}

	/// Queues `f` against the state without waiting.
	pub fn send<F>(&self, f: F) -> Result<()>
	where
		F: FnOnce(&mut S) + Send + 'static,
	{
		let state = self.clone();
		self.worker.send(move || state.with_state(f))
	}

	/// Accesses the state directly from one of the owning worker's jobs.
	///
	/// # Panics
	///
	/// Panics when called outside the owning worker, or when `f` re-enters
	/// this same state.
	pub fn with_state<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
		assert!(
			self.worker.is_current(),
			"state of worker {} accessed outside its worker",
			self.worker.name()
		);
		self.slot.with_mut_or_insert_with(|| (self.factory)(), f)
	}
}
