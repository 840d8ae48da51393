//! Copy-on-write list.
//!
//! Same publication scheme as [`CowMap`](crate::CowMap): lock-free reads of
//! the published `Vec`, writes copy and republish inside the list's
//! [`ExclusiveWriter`] section. Index-based writes validate the index against
//! the snapshot they copy, so a stale index fails with [`Error::NotFound`]
//! rather than touching the wrong element.

use std::sync::Arc;

use xeno_worker::WorkerPool;

use crate::error::{Error, Result};
use crate::guard::Shareable;
use crate::published::PublishedRef;
use crate::writer::ExclusiveWriter;

/// Construction options for shared lists.
#[derive(Debug, Clone)]
pub struct ListOptions {
	name: String,
}

impl Default for ListOptions {
	fn default() -> Self {
		Self {
			name: String::from("cow.list"),
		}
	}
}

impl ListOptions {
	pub fn new() -> Self {
		Self::default()
	}

	/// Name of the writer worker.
	#[must_use]
	pub fn name(mut self, name: impl Into<String>) -> Self {
		self.name = name.into();
		self
	}
}

struct Shared<T> {
	published: PublishedRef<Vec<T>>,
	empty: Arc<Vec<T>>,
}

impl<T: Shareable + Clone> Shared<T> {
	fn current(&self) -> Arc<Vec<T>> {
		self.published.load().unwrap_or_else(|| Arc::clone(&self.empty))
	}
}

/// List for read-mostly data shared across workers.
pub struct CowList<T> {
	shared: Arc<Shared<T>>,
	writer: ExclusiveWriter,
}

impl<T> Clone for CowList<T> {
	fn clone(&self) -> Self {
		Self {
			shared: Arc::clone(&self.shared),
			writer: self.writer.clone(),
		}
	}
}

impl<T: Shareable + Clone + std::fmt::Debug> std::fmt::Debug for CowList<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_list().entries(self.shared.current().iter()).finish()
	}
}

impl<T: Shareable + Clone> CowList<T> {
	pub fn new(pool: &WorkerPool) -> Self {
		Self::with_options(pool, ListOptions::default())
	}

	pub fn with_options(pool: &WorkerPool, options: ListOptions) -> Self {
		Self {
			shared: Arc::new(Shared {
				published: PublishedRef::empty(),
				empty: Arc::new(Vec::new()),
			}),
			writer: ExclusiveWriter::new(pool, &options.name),
		}
	}

	/// Current snapshot.
	pub fn snapshot(&self) -> Arc<Vec<T>> {
		self.shared.current()
	}

	pub fn is_published(&self) -> bool {
		self.shared.published.is_published()
	}

	pub fn get(&self, index: usize) -> Option<T> {
		self.snapshot().get(index).cloned()
	}

	pub fn first(&self) -> Option<T> {
		self.snapshot().first().cloned()
	}

	pub fn last(&self) -> Option<T> {
		self.snapshot().last().cloned()
	}

	pub fn len(&self) -> usize {
		self.snapshot().len()
	}

	pub fn is_empty(&self) -> bool {
		self.snapshot().is_empty()
	}

	pub fn each(&self, mut f: impl FnMut(&T)) {
		for item in self.snapshot().iter() {
			f(item);
		}
	}

	/// Private read-write copy.
	pub fn rw(&self) -> Vec<T> {
		self.snapshot().as_ref().clone()
	}

	pub fn add(&self, item: T) -> Result<()> {
		self.write(move |next| {
			next.push(item);
			Ok(())
		})
	}

	pub fn add_all(&self, items: impl IntoIterator<Item = T>) -> Result<()> {
		let items: Vec<_> = items.into_iter().collect();
		self.write(move |next| {
			next.extend(items);
			Ok(())
		})
	}

	/// Inserts at `index`, shifting later elements. `index == len` appends.
	pub fn insert(&self, index: usize, item: T) -> Result<()> {
		self.write(move |next| {
			if index > next.len() {
				return Err(Error::index(index, next.len()));
			}
			next.insert(index, item);
			Ok(())
		})
	}

	/// Replaces the element at `index`, returning the old one.
	pub fn set(&self, index: usize, item: T) -> Result<T> {
		self.write(move |next| {
			let len = next.len();
			let slot = next.get_mut(index).ok_or_else(|| Error::index(index, len))?;
			Ok(std::mem::replace(slot, item))
		})
	}

	pub fn remove_at(&self, index: usize) -> Result<T> {
		self.write(move |next| {
			if index >= next.len() {
				return Err(Error::index(index, next.len()));
			}
			Ok(next.remove(index))
		})
	}

	pub fn pop(&self) -> Result<Option<T>> {
		self.write(|next| Ok(next.pop()))
	}

	pub fn clear(&self) -> Result<()> {
		self.write(|next| {
			next.clear();
			Ok(())
		})
	}

	/// Publishes a list holding exactly `items`.
	pub fn replace(&self, items: impl IntoIterator<Item = T>) -> Result<()> {
		let items: Vec<_> = items.into_iter().collect();
		self.write(move |next| {
			*next = items;
			Ok(())
		})
	}

	pub fn writer(&self) -> &ExclusiveWriter {
		&self.writer
	}

	/// Awaitable [`Self::add`].
	pub async fn add_async(&self, item: T) -> Result<()> {
		self.write_async(move |next| {
			next.push(item);
			Ok(())
		})
		.await
	}

	/// Awaitable [`Self::remove_at`].
	pub async fn remove_at_async(&self, index: usize) -> Result<T> {
		self.write_async(move |next| {
			if index >= next.len() {
				return Err(Error::index(index, next.len()));
			}
			Ok(next.remove(index))
		})
		.await
	}

	/// Awaitable [`Self::clear`].
	pub async fn clear_async(&self) -> Result<()> {
		self.write_async(|next| {
			next.clear();
			Ok(())
		})
		.await
	}

	fn write<R, F>(&self, f: F) -> Result<R>
	where
		F: FnOnce(&mut Vec<T>) -> Result<R> + Send + 'static,
		R: Send + 'static,
	{
		self.writer.lock(Self::write_section(Arc::clone(&self.shared), f))?
	}

	async fn write_async<R, F>(&self, f: F) -> Result<R>
	where
		F: FnOnce(&mut Vec<T>) -> Result<R> + Send + 'static,
		R: Send + 'static,
	{
		self.writer.lock_async(Self::write_section(Arc::clone(&self.shared), f)).await?
	}

	/// Copies, mutates and publishes; nothing is published when `f` fails.
	fn write_section<R, F>(shared: Arc<Shared<T>>, f: F) -> impl FnOnce() -> Result<R> + Send + 'static
	where
		F: FnOnce(&mut Vec<T>) -> Result<R> + Send + 'static,
		R: Send + 'static,
	{
		move || {
			let mut next = shared.current().as_ref().clone();
			let out = f(&mut next)?;
			tracing::trace!(len = next.len(), "cow.list.publish");
			shared.published.publish(Arc::new(next));
			Ok(out)
		}
	}
}

impl<T: Shareable + Clone + PartialEq> CowList<T> {
	pub fn contains(&self, item: &T) -> bool {
		self.snapshot().contains(item)
	}

	pub fn index_of(&self, item: &T) -> Option<usize> {
		self.snapshot().iter().position(|candidate| candidate == item)
	}

	/// Removes the first element equal to `item`.
	pub fn remove(&self, item: &T) -> Result<bool> {
		let item = item.clone();
		self.write(move |next| {
			let Some(index) = next.iter().position(|candidate| *candidate == item) else {
				return Ok(false);
			};
			next.remove(index);
			Ok(true)
		})
	}

	/// Awaitable [`Self::remove`].
	pub async fn remove_async(&self, item: &T) -> Result<bool> {
		let item = item.clone();
		self.write_async(move |next| {
			let Some(index) = next.iter().position(|candidate| *candidate == item) else {
				return Ok(false);
			};
			next.remove(index);
			Ok(true)
		})
		.await
	}
}

#[cfg(test)]
mod tests;
