use std::sync::atomic::{AtomicUsize, Ordering};

use pretty_assertions::assert_eq;
use proptest::prelude::*;

use super::*;

fn pool(name: &str) -> WorkerPool {
	WorkerPool::builder(name).max_threads(16).build().unwrap()
}

#[test]
fn positional_reads() {
	let pool = pool("list.reads");
	let list = CowList::new(&pool);
	assert_eq!(list.first(), None::<char>);
	list.add_all(['a', 'b', 'c']).unwrap();
	assert_eq!(list.get(1), Some('b'));
	assert_eq!(list.get(3), None);
	assert_eq!(list.first(), Some('a'));
	assert_eq!(list.last(), Some('c'));
	assert_eq!(list.index_of(&'c'), Some(2));
	assert!(list.contains(&'a'));
	assert!(!list.contains(&'z'));
}

#[test]
fn index_writes_check_bounds() {
	let pool = pool("list.bounds");
	let list = CowList::new(&pool);
	list.add_all([10, 20]).unwrap();

	list.insert(2, 30).unwrap();
	assert!(matches!(list.insert(9, 0), Err(Error::NotFound(_))));
	assert_eq!(list.set(0, 11).unwrap(), 10);
	assert!(matches!(list.set(3, 0), Err(Error::NotFound(_))));
	assert_eq!(list.remove_at(1).unwrap(), 20);
	assert!(matches!(list.remove_at(2), Err(Error::NotFound(_))));
	assert_eq!(list.rw(), vec![11, 30]);
}

#[test]
fn failed_write_keeps_snapshot() {
	let pool = pool("list.failed");
	let list = CowList::new(&pool);
	list.add(1u8).unwrap();
	let before = list.snapshot();
	let _ = list.remove_at(5);
	assert!(Arc::ptr_eq(&before, &list.snapshot()));
}

#[test]
fn remove_pop_clear_replace() {
	let pool = pool("list.remove");
	let list = CowList::new(&pool);
	list.add_all(["x", "y", "x"]).unwrap();
	assert!(list.remove(&"x").unwrap());
	assert_eq!(list.rw(), vec!["y", "x"]);
	assert!(!list.remove(&"q").unwrap());
	assert_eq!(list.pop().unwrap(), Some("x"));
	list.replace(["m", "n"]).unwrap();
	assert_eq!(list.len(), 2);
	list.clear().unwrap();
	assert!(list.is_empty());
	assert_eq!(list.pop().unwrap(), None);
}

#[test]
fn concurrent_add_remove_matches_counter() {
	let pool = pool("list.contended");
	let list: CowList<usize> = CowList::new(&pool);
	let added = Arc::new(AtomicUsize::new(0));
	let removed = Arc::new(AtomicUsize::new(0));

	let handles: Vec<_> = (0..8)
		.map(|t| {
			let list = list.clone();
			let added = Arc::clone(&added);
			let removed = Arc::clone(&removed);
			std::thread::spawn(move || {
				for i in 0..100 {
					let item = t * 1000 + i;
					list.add(item).unwrap();
					added.fetch_add(1, Ordering::SeqCst);
					if i % 3 == 0 && list.remove(&item).unwrap() {
						removed.fetch_add(1, Ordering::SeqCst);
					}
				}
			})
		})
		.collect();
	for handle in handles {
		handle.join().unwrap();
	}

	let expected = added.load(Ordering::SeqCst) - removed.load(Ordering::SeqCst);
	assert_eq!(list.len(), expected);
	assert_eq!(removed.load(Ordering::SeqCst), 8 * 34);
}

#[derive(Debug, Clone)]
enum Op {
	Add(u8),
	Insert(usize, u8),
	Set(usize, u8),
	RemoveAt(usize),
	Remove(u8),
	Pop,
	Clear,
}

fn arb_op() -> impl Strategy<Value = Op> {
	prop_oneof![
		4 => any::<u8>().prop_map(Op::Add),
		2 => (0usize..12, any::<u8>()).prop_map(|(i, v)| Op::Insert(i, v)),
		2 => (0usize..12, any::<u8>()).prop_map(|(i, v)| Op::Set(i, v)),
		2 => (0usize..12).prop_map(Op::RemoveAt),
		1 => any::<u8>().prop_map(Op::Remove),
		1 => Just(Op::Pop),
		1 => Just(Op::Clear),
	]
}

proptest! {
	#![proptest_config(ProptestConfig::with_cases(64))]

	/// The list behaves like a plain `Vec`, with out-of-range indexes rejected.
	#[test]
	fn prop_matches_vec_model(ops in proptest::collection::vec(arb_op(), 0..40)) {
		let list = CowList::new(&WorkerPool::global());
		let mut model: Vec<u8> = Vec::new();

		for op in ops {
			match op {
				Op::Add(v) => {
					list.add(v).unwrap();
					model.push(v);
				}
				Op::Insert(i, v) => {
					let ok = list.insert(i, v).is_ok();
					prop_assert_eq!(ok, i <= model.len());
					if ok {
						model.insert(i, v);
					}
				}
				Op::Set(i, v) => {
					let got = list.set(i, v).ok();
					let expected = model.get_mut(i).map(|slot| std::mem::replace(slot, v));
					prop_assert_eq!(got, expected);
				}
				Op::RemoveAt(i) => {
					let got = list.remove_at(i).ok();
					let expected = (i < model.len()).then(|| model.remove(i));
					prop_assert_eq!(got, expected);
				}
				Op::Remove(v) => {
					let got = list.remove(&v).unwrap();
					let position = model.iter().position(|x| *x == v);
					if let Some(index) = position {
						model.remove(index);
					}
					prop_assert_eq!(got, position.is_some());
				}
				Op::Pop => {
					prop_assert_eq!(list.pop().unwrap(), model.pop());
				}
				Op::Clear => {
					list.clear().unwrap();
					model.clear();
				}
			}
			prop_assert_eq!(list.rw(), model.clone());
		}
	}
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn writes_from_async_tasks() {
	let pool = WorkerPool::from_handle("list.async", tokio::runtime::Handle::current());
	let list: CowList<u32> = CowList::new(&pool);

	let tasks: Vec<_> = (0..4u32)
		.map(|t| {
			let list = list.clone();
			tokio::spawn(async move {
				for i in 0..25 {
					list.add_async(t * 100 + i).await.unwrap();
				}
			})
		})
		.collect();
	for task in tasks {
		task.await.unwrap();
	}

	assert_eq!(list.len(), 100);
	assert!(list.remove_async(&301).await.unwrap());
	assert!(!list.remove_async(&301).await.unwrap());
	assert!(matches!(list.remove_at_async(99).await, Err(Error::NotFound(_))));
	list.clear_async().await.unwrap();
	assert!(list.is_empty());
}
