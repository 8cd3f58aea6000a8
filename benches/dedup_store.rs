use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::thread;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use numeri::dedup::DedupStore;
use numeri::protocol::RecordKey;

const NUM_THREADS: usize = 5;
const KEYS_PER_THREAD: usize = 20_000;

/// Every thread submits the same keys, so most inserts are duplicates.
fn keys() -> Arc<Vec<RecordKey>> {
    Arc::new(
        (0..KEYS_PER_THREAD)
            .map(|n| RecordKey::try_from(format!("{:09}", n).as_str()).unwrap())
            .collect(),
    )
}

fn bench_insert_if_absent(c: &mut Criterion) {
    let mut group = c.benchmark_group("dedup_insert");
    let keys = keys();

    group.bench_function(
        BenchmarkId::new(
            "DedupStore (RwLock)",
            format!("{}threads x {}keys", NUM_THREADS, KEYS_PER_THREAD),
        ),
        |b| {
            b.iter(|| {
                let store = Arc::new(DedupStore::new());
                let mut handles = vec![];

                for _ in 0..NUM_THREADS {
                    let store = Arc::clone(&store);
                    let keys = Arc::clone(&keys);
                    handles.push(thread::spawn(move || {
                        for key in keys.iter() {
                            if store.contains(key) {
                                continue;
                            }
                            store.insert(*key);
                        }
                    }));
                }

                for handle in handles {
                    handle.join().unwrap();
                }

                black_box(store.len())
            })
        },
    );

    group.bench_function(
        BenchmarkId::new(
            "Mutex<HashSet>",
            format!("{}threads x {}keys", NUM_THREADS, KEYS_PER_THREAD),
        ),
        |b| {
            b.iter(|| {
                let store = Arc::new(Mutex::new(HashSet::new()));
                let mut handles = vec![];

                for _ in 0..NUM_THREADS {
                    let store = Arc::clone(&store);
                    let keys = Arc::clone(&keys);
                    handles.push(thread::spawn(move || {
                        for key in keys.iter() {
                            store.lock().unwrap().insert(*key);
                        }
                    }));
                }

                for handle in handles {
                    handle.join().unwrap();
                }

                let len = store.lock().unwrap().len();
                black_box(len)
            })
        },
    );

    group.finish();
}

criterion_group!(benches, bench_insert_if_absent);
criterion_main!(benches);
