//! Context-local storage.
//!
//! Every OS thread has a private [`Locals`] map. While a worker runs a job, the
//! worker's own map is swapped into the running thread, so slot lookups made by
//! the job resolve against the worker rather than the borrowed thread.
//!
//! Values are checked out of the map while user code holds them. A checked-out
//! entry stays visible to [`is_mapped`] but cannot be checked out twice.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::sync::Arc;

use rustc_hash::FxHashMap;

pub(crate) type Boxed = Box<dyn Any + Send>;

enum Entry {
	Present(Boxed),
	/// Value is held by a caller and will be checked back in.
	Borrowed,
	/// Slot was empty when checked out; a value may be checked in.
	Reserved,
}

/// One context's named values.
#[derive(Default)]
pub(crate) struct Locals {
	entries: FxHashMap<Arc<str>, Entry>,
}

impl Locals {
	#[cfg(test)]
	pub fn len(&self) -> usize {
		self.entries.len()
	}
}

thread_local! {
	static LOCALS: RefCell<Locals> = RefCell::new(Locals::default());
	static CURRENT: Cell<Option<u64>> = const { Cell::new(None) };
}

/// Returns the id of the worker running on this thread, if any.
pub fn current_worker() -> Option<u64> {
	CURRENT.with(Cell::get)
}

/// Runs `f` with `locals` installed as this thread's context.
pub(crate) fn enter<R>(worker: u64, locals: &mut Locals, f: impl FnOnce() -> R) -> R {
	struct Restore<'a> {
		locals: &'a mut Locals,
		prev: Option<u64>,
	}

	impl Drop for Restore<'_> {
		fn drop(&mut self) {
			LOCALS.with(|cell| std::mem::swap(&mut *cell.borrow_mut(), self.locals));
			CURRENT.with(|current| current.set(self.prev));
		}
	}

	LOCALS.with(|cell| std::mem::swap(&mut *cell.borrow_mut(), locals));
	let prev = CURRENT.with(|current| current.replace(Some(worker)));
	let _restore = Restore { locals, prev };
	f()
}

pub(crate) fn is_mapped(name: &str) -> bool {
	LOCALS.with(|cell| matches!(cell.borrow().entries.get(name), Some(Entry::Present(_) | Entry::Borrowed)))
}

/// Checks a value out, leaving a marker behind until [`check_in`].
///
/// # Panics
///
/// Panics if the slot is already checked out in this context.
pub(crate) fn check_out(name: &Arc<str>) -> Option<Boxed> {
	LOCALS.with(|cell| {
		let mut locals = cell.borrow_mut();
		match locals.entries.get_mut(&**name) {
			Some(entry) => match std::mem::replace(entry, Entry::Borrowed) {
				Entry::Present(value) => Some(value),
				Entry::Borrowed | Entry::Reserved => panic!("local slot {name} is already in use by this context"),
			},
			None => {
				locals.entries.insert(Arc::clone(name), Entry::Reserved);
				None
			}
		}
	})
}

/// Returns a checked-out value.
///
/// A value written or removed while the slot was checked out wins over the
/// returned one.
pub(crate) fn check_in(name: &Arc<str>, value: Option<Boxed>) {
	let discarded = LOCALS.with(|cell| {
		let mut locals = cell.borrow_mut();
		let entries = &mut locals.entries;
		if !matches!(entries.get(&**name), Some(Entry::Borrowed | Entry::Reserved)) {
			return value;
		}
		match value {
			Some(value) => {
				entries.insert(Arc::clone(name), Entry::Present(value));
			}
			None => {
				entries.remove(&**name);
			}
		}
		None
	});
	drop(discarded);
}

/// Stores a value, returning the previous one if it was not checked out.
pub(crate) fn insert(name: &Arc<str>, value: Boxed) -> Option<Boxed> {
	let prev = LOCALS.with(|cell| cell.borrow_mut().entries.insert(Arc::clone(name), Entry::Present(value)));
	match prev {
		Some(Entry::Present(prev)) => Some(prev),
		_ => None,
	}
}

/// Removes a value. A checked-out value is forfeited by its holder.
pub(crate) fn remove(name: &str) -> Option<Boxed> {
	let prev = LOCALS.with(|cell| cell.borrow_mut().entries.remove(name));
	match prev {
		Some(Entry::Present(value)) => Some(value),
		_ => None,
	}
}
