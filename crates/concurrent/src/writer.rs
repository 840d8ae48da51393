use xeno_worker::{SynchronizedState, Worker, WorkerPool};

use crate::error::Result;

/// Write section bound to one worker.
///
/// Every section runs as a job on the writer's worker, so sections never
/// overlap and run in the order they were submitted. A section entered from
/// inside another section of the same writer runs inline.
#[derive(Debug, Clone)]
pub struct ExclusiveWriter {
	sections: SynchronizedState<u64>,
}

impl ExclusiveWriter {
	/// Binds a new writer worker on `pool`.
	pub fn new(pool: &WorkerPool, name: &str) -> Self {
		Self {
			sections: SynchronizedState::new(pool, name, || 0),
		}
	}

	/// Runs `f` exclusively and waits for its result.
	pub fn lock<R, F>(&self, f: F) -> Result<R>
	where
		F: FnOnce() -> R + Send + 'static,
		R: Send + 'static,
	{
		let sections = self.sections.clone();
		Ok(self.sections.worker().call(move || {
			sections.with_state(|seq| *seq += 1);
			f()
		})?)
	}

	/// Runs `f` exclusively and awaits its result.
	pub async fn lock_async<R, F>(&self, f: F) -> Result<R>
	where
		F: FnOnce() -> R + Send + 'static,
		R: Send + 'static,
	{
		let sections = self.sections.clone();
		Ok(self
			.sections
			.worker()
			.call_async(move || {
				sections.with_state(|seq| *seq += 1);
				f()
			})
			.await?)
	}

	/// Number of sections entered so far.
	pub fn sequence(&self) -> Result<u64> {
		Ok(self.sections.call(|seq| *seq)?)
	}

	/// Returns `true` inside one of this writer's sections.
	pub fn is_held(&self) -> bool {
		self.sections.worker().is_current()
	}

	pub fn worker(&self) -> &Worker {
		self.sections.worker()
	}
}
