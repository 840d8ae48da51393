use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::context::Locals;

/// One unit of work for a worker.
pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

struct MailboxState {
	queue: VecDeque<Job>,
	/// A drain pass is scheduled or running.
	scheduled: bool,
	/// Parked context locals; taken by the running drain pass.
	locals: Locals,
}

/// Unbounded FIFO job queue for one serial worker.
///
/// At most one drain pass exists at a time. The pass that finds the queue
/// empty parks the worker's locals and clears `scheduled` in the same critical
/// section, so the next pass always starts from the complete locals map.
pub(crate) struct Mailbox {
	state: Mutex<MailboxState>,
}

impl Mailbox {
	pub fn new() -> Self {
		Self {
			state: Mutex::new(MailboxState {
				queue: VecDeque::new(),
				scheduled: false,
				locals: Locals::default(),
			}),
		}
	}

	/// Enqueues one job. Returns `true` when the caller must start a drain pass.
	pub fn push(&self, job: Job) -> bool {
		let mut state = self.state.lock();
		state.queue.push_back(job);
		!std::mem::replace(&mut state.scheduled, true)
	}

	/// Takes the parked locals at the start of a drain pass.
	pub fn take_locals(&self) -> Locals {
		std::mem::take(&mut self.state.lock().locals)
	}

	/// Pops the next job, or parks `locals` and ends the drain pass.
	pub fn pop_or_park(&self, locals: &mut Locals) -> Option<Job> {
		let mut state = self.state.lock();
		if let Some(job) = state.queue.pop_front() {
			return Some(job);
		}
		state.locals = std::mem::take(locals);
		state.scheduled = false;
		None
	}

	/// Number of queued jobs.
	pub fn len(&self) -> usize {
		self.state.lock().queue.len()
	}
}
