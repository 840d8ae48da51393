use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

use pretty_assertions::assert_eq;

use super::*;

fn pool(name: &str) -> WorkerPool {
	WorkerPool::builder(name).max_threads(8).build().unwrap()
}

#[test]
fn reads_before_first_write_see_empty_map() {
	let pool = pool("map.lazy");
	let map: CowMap<String, u32> = CowMap::new(&pool);
	assert!(map.is_empty());
	assert_eq!(map.get(&"missing".into()), None);
	assert!(!map.is_published());

	map.set("a".into(), 1).unwrap();
	assert!(map.is_published());
	assert_eq!(map.len(), 1);
}

#[test]
fn set_returns_previous_value() {
	let pool = pool("map.set");
	let map = CowMap::new(&pool);
	assert_eq!(map.set(1u32, "one").unwrap(), None);
	assert_eq!(map.set(1, "uno").unwrap(), Some("one"));
	assert_eq!(map.get(&1), Some("uno"));
	assert_eq!(map.writer().sequence().unwrap(), 2);
}

#[test]
fn default_value_and_get_or() {
	let pool = pool("map.default");
	let map: CowMap<&'static str, i32> = CowMap::configured(&pool, |o| o.default_value(-1)).unwrap();
	assert_eq!(map.get(&"x"), Some(-1));
	assert_eq!(map.get_or(&"x", 7), 7);
	assert!(!map.contains_key(&"x"));
	map.set("x", 3).unwrap();
	assert_eq!(map.get(&"x"), Some(3));
	assert_eq!(map.get_or(&"x", 7), 3);
}

#[test]
fn remove_and_clear() {
	let pool = pool("map.remove");
	let map = CowMap::new(&pool);
	map.set_all([(1u8, 'a'), (2, 'b')]).unwrap();
	assert_eq!(map.remove(&1).unwrap(), Some('a'));
	assert_eq!(map.remove(&1).unwrap(), None);
	assert_eq!(map.keys(), vec![2]);
	map.clear().unwrap();
	assert!(map.is_empty());
}

#[test]
fn ordered_map_iterates_in_insertion_order() {
	let pool = pool("map.ordered");
	let map = CowMap::with_options(&pool, MapOptions::new().ordered(true)).unwrap();
	map.set_all([(3u32, 'c'), (1, 'a'), (2, 'b')]).unwrap();
	map.remove(&3).unwrap();
	map.set(5, 'e').unwrap();
	assert_eq!(map.keys(), vec![1, 2, 5]);
	assert_eq!(map.values(), vec!['a', 'b', 'e']);

	let mut seen = Vec::new();
	map.each(|k, v| seen.push((*k, *v)));
	assert_eq!(seen, vec![(1, 'a'), (2, 'b'), (5, 'e')]);
}

#[test]
fn case_insensitive_string_keys() {
	let pool = pool("map.case");
	let map: CowMap<String, u32> = CowMap::with_options(&pool, MapOptions::new().case_insensitive(true)).unwrap();
	map.set("Accept".into(), 1).unwrap();
	map.set("ACCEPT".into(), 2).unwrap();
	assert_eq!(map.len(), 1);
	assert_eq!(map.get(&"accept".into()), Some(2));
	assert_eq!(map.keys(), vec![String::from("Accept")]);
}

#[test]
fn case_insensitive_numeric_keys_are_misconfigured() {
	let pool = pool("map.case_bad");
	let err = CowMap::<u32, u32>::with_options(&pool, MapOptions::new().case_insensitive(true)).unwrap_err();
	assert!(matches!(err, Error::Misconfiguration(_)));
}

#[test]
fn case_insensitive_borrowed_str_keys_are_misconfigured() {
	let pool = pool("map.case.borrowed");
	let err = CowMap::<&'static str, u32>::with_options(&pool, MapOptions::new().case_insensitive(true)).unwrap_err();
	assert!(matches!(err, Error::Misconfiguration(_)));
	assert!(CowMap::<Arc<str>, u32>::with_options(&pool, MapOptions::new().case_insensitive(true)).is_ok());
}

#[test]
fn replace_swaps_whole_contents() {
	let pool = pool("map.replace");
	let map = CowMap::new(&pool);
	map.set_all([("a", 1), ("b", 2)]).unwrap();
	let before = map.snapshot();
	map.replace([("c", 3)]).unwrap();
	assert_eq!(map.keys(), vec!["c"]);
	assert_eq!(before.len(), 2, "held snapshots are never mutated");
}

#[test]
fn rw_copy_is_private() {
	let pool = pool("map.rw");
	let map = CowMap::new(&pool);
	map.set("k", 1).unwrap();
	let mut copy = map.rw();
	copy.insert("other", 2);
	assert_eq!(map.len(), 1);
	assert_eq!(copy.len(), 2);
}

#[test]
fn get_or_add_runs_producer_once_under_contention() {
	let pool = pool("map.get_or_add");
	let map: CowMap<String, Arc<str>> = CowMap::new(&pool);
	let calls = Arc::new(AtomicUsize::new(0));
	let barrier = Arc::new(Barrier::new(8));

	let handles: Vec<_> = (0..8)
		.map(|i| {
			let map = map.clone();
			let calls = Arc::clone(&calls);
			let barrier = Arc::clone(&barrier);
			std::thread::spawn(move || {
				barrier.wait();
				map.get_or_add("shared".into(), move |_| {
					calls.fetch_add(1, Ordering::SeqCst);
					Arc::from(format!("producer-{i}"))
				})
				.unwrap()
			})
		})
		.collect();
	let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

	assert_eq!(calls.load(Ordering::SeqCst), 1);
	assert!(results.iter().all(|v| *v == results[0]));
	assert_eq!(map.get(&"shared".into()), Some(Arc::clone(&results[0])));
}

#[test]
fn failed_producer_publishes_nothing() {
	let pool = pool("map.try_get_or_add");
	let map: CowMap<u32, u32> = CowMap::new(&pool);
	let err = map.try_get_or_add(1, |_| Err(Error::NotFound("upstream".into()))).unwrap_err();
	assert!(matches!(err, Error::NotFound(_)));
	assert!(!map.is_published());
}

#[test]
fn nested_write_from_producer_runs_inline() {
	let pool = pool("map.nested");
	let map: CowMap<u32, u32> = CowMap::new(&pool);
	let inner = map.clone();
	let value = map
		.get_or_add(1, move |_| {
			inner.set(2, 20).unwrap();
			10
		})
		.unwrap();
	assert_eq!(value, 10);
	assert_eq!(map.get(&2), Some(20));
	assert_eq!(map.get(&1), Some(10));
}

#[test]
fn concurrent_setters_lose_nothing() {
	let pool = pool("map.setters");
	let map: CowMap<usize, usize> = CowMap::new(&pool);
	let handles: Vec<_> = (0..8)
		.map(|t| {
			let map = map.clone();
			std::thread::spawn(move || {
				for i in 0..50 {
					map.set(t * 100 + i, i).unwrap();
				}
			})
		})
		.collect();
	for handle in handles {
		handle.join().unwrap();
	}
	assert_eq!(map.len(), 400);
}

#[test]
fn readers_never_see_torn_snapshots() {
	let pool = pool("map.torn");
	let map: CowMap<&'static str, u64> = CowMap::new(&pool);
	map.set_all([("left", 0), ("right", 0)]).unwrap();

	let writer = {
		let map = map.clone();
		std::thread::spawn(move || {
			for n in 1..=300 {
				map.set_all([("left", n), ("right", n)]).unwrap();
			}
		})
	};
	let readers: Vec<_> = (0..4)
		.map(|_| {
			let map = map.clone();
			std::thread::spawn(move || {
				for _ in 0..2000 {
					let snap = map.snapshot();
					assert_eq!(snap.get(&"left"), snap.get(&"right"));
				}
			})
		})
		.collect();

	writer.join().unwrap();
	for reader in readers {
		reader.join().unwrap();
	}
	assert_eq!(map.get(&"left"), Some(300));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn writes_from_async_tasks() {
	let pool = WorkerPool::from_handle("map.async", tokio::runtime::Handle::current());
	let map: CowMap<u32, u32> = CowMap::new(&pool);
	let calls = Arc::new(AtomicUsize::new(0));

	let tasks: Vec<_> = (0..8u32)
		.map(|i| {
			let map = map.clone();
			let calls = Arc::clone(&calls);
			tokio::spawn(async move {
				map.set_async(i, i * 10).await.unwrap();
				map.get_or_add_async(100, move |_| {
					calls.fetch_add(1, Ordering::SeqCst);
					7
				})
				.await
				.unwrap()
			})
		})
		.collect();
	for task in tasks {
		assert_eq!(task.await.unwrap(), 7);
	}

	assert_eq!(calls.load(Ordering::SeqCst), 1);
	assert_eq!(map.len(), 9);
	assert_eq!(map.remove_async(&3).await.unwrap(), Some(30));
	map.clear_async().await.unwrap();
	assert!(map.is_empty());
}
