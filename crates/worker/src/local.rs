use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::context::{self, Boxed};
use crate::ids::SLOT_IDS;

type Init<T> = dyn Fn() -> T + Send + Sync;

/// Named cell in the current context's local storage.
///
/// The context is the running worker, or the calling OS thread outside any
/// worker. A slot is unmapped until something writes it. Reading an unmapped
/// slot runs the initializer when one is configured (and maps the slot);
/// without an initializer the read returns `None` and leaves the slot unmapped.
///
/// Each slot gets a process-unique name (`"{id}.{name}"`), so two slots
/// created with the same declared name never share storage. Clones share the
/// name and therefore the storage.
pub struct LocalSlot<T> {
	name: Arc<str>,
	init: Option<Arc<Init<T>>>,
	_marker: PhantomData<fn() -> T>,
}

impl<T> Clone for LocalSlot<T> {
	fn clone(&self) -> Self {
		Self {
			name: Arc::clone(&self.name),
			init: self.init.clone(),
			_marker: PhantomData,
		}
	}
}

impl<T> fmt::Debug for LocalSlot<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("LocalSlot")
			.field("name", &self.name)
			.field("has_init", &self.init.is_some())
			.finish()
	}
}

/// Checked-out value, returned to the context on drop.
struct Checkout<'a, T: Send + 'static> {
	name: &'a Arc<str>,
	value: Option<Box<T>>,
}

impl<T: Send + 'static> Drop for Checkout<'_, T> {
	fn drop(&mut self) {
		context::check_in(self.name, self.value.take().map(|value| value as Boxed));
	}
}

impl<T> LocalSlot<T> {
	/// Qualified storage name.
	pub fn name(&self) -> &str {
		&self.name
	}
}

impl<T: Send + 'static> LocalSlot<T> {
	/// Creates a slot without an initializer.
	pub fn new(name: &str) -> Self {
		Self {
			name: qualify(name),
			init: None,
			_marker: PhantomData,
		}
	}

	/// Creates a slot whose first read in each context runs `init`.
	pub fn with_init(name: &str, init: impl Fn() -> T + Send + Sync + 'static) -> Self {
		Self {
			name: qualify(name),
			init: Some(Arc::new(init)),
			_marker: PhantomData,
		}
	}

	/// Returns `true` if this context holds a value. Never runs the initializer.
	pub fn is_mapped(&self) -> bool {
		context::is_mapped(&self.name)
	}

	/// Returns a clone of the value, initializing it if configured.
	pub fn get(&self) -> Option<T>
	where
		T: Clone,
	{
		self.with(|value| value.cloned())
	}

	/// Borrows the value, initializing it if configured.
	///
	/// # Panics
	///
	/// Panics if `f` reads this same slot again.
	pub fn with<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
		let checkout = self.check_out(true);
		f(checkout.value.as_deref())
	}

	/// Mutably borrows the value, initializing it if configured.
	///
	/// Returns `None` without calling `f` when the slot is unmapped and has no
	/// initializer.
	pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
		let mut checkout = self.check_out(true);
		checkout.value.as_deref_mut().map(f)
	}

	/// Mutably borrows the value, creating it with `init` when unmapped.
	pub fn with_mut_or_insert_with<R>(&self, init: impl FnOnce() -> T, f: impl FnOnce(&mut T) -> R) -> R {
		let mut checkout = self.check_out(false);
		f(checkout.value.get_or_insert_with(|| Box::new(init())))
	}

	/// Stores `value`, mapping the slot.
	pub fn set(&self, value: T) {
		drop(self.replace(value));
	}

	/// Stores `value` and returns the previous one.
	pub fn replace(&self, value: T) -> Option<T> {
		context::insert(&self.name, Box::new(value)).and_then(downcast)
	}

	/// Removes and returns the value without running the initializer.
	pub fn take(&self) -> Option<T> {
		context::remove(&self.name).and_then(downcast)
	}

	/// Unmaps the slot, dropping any held value. Idempotent.
	pub fn clean_up(&self) {
		drop(self.take());
	}

	fn check_out(&self, run_init: bool) -> Checkout<'_, T> {
		let mut checkout = Checkout {
			name: &self.name,
			value: context::check_out(&self.name).and_then(downcast_box),
		};
		// A panicking `init` must still release the reservation.
		if checkout.value.is_none() && run_init {
			if let Some(init) = &self.init {
				checkout.value = Some(Box::new(init()));
			}
		}
		checkout
	}
}

fn qualify(name: &str) -> Arc<str> {
	Arc::from(format!("{}.{name}", SLOT_IDS.next()))
}

fn downcast_box<T: Send + 'static>(boxed: Boxed) -> Option<Box<T>> {
	match boxed.downcast::<T>() {
		Ok(value) => Some(value),
		Err(_) => {
			tracing::warn!(expected = std::any::type_name::<T>(), "local.slot.type_mismatch");
			None
		}
	}
}

fn downcast<T: Send + 'static>(boxed: Boxed) -> Option<T> {
	downcast_box(boxed).map(|value| *value)
}
