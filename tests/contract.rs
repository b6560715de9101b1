use std::sync::{Arc, Barrier};
use std::thread;

use intmap::workload::{self, encode_value, OpMix, WorkloadConfig};
use intmap::{IntMap, LockedMap, ShardedMap, SyncMap};

fn example_sequence(map: &dyn IntMap) {
    assert_eq!(map.load(5), (0, false));
    map.store(5, 42);
    assert_eq!(map.load(5), (42, true));
    map.delete(5);
    assert_eq!(map.load(5), (0, false));
}

fn absent_until_stored(map: &dyn IntMap) {
    for key in [i64::MIN, -1, 0, 1, i64::MAX] {
        assert_eq!(map.load(key), (0, false));
    }
    map.store(i64::MIN, i64::MAX);
    map.store(i64::MAX, i64::MIN);
    assert_eq!(map.load(i64::MIN), (i64::MAX, true));
    assert_eq!(map.load(i64::MAX), (i64::MIN, true));
    assert_eq!(map.load(0), (0, false));
}

fn stored_zero_is_found(map: &dyn IntMap) {
    map.store(9, 0);
    assert_eq!(map.load(9), (0, true));
    assert_eq!(map.get(9), Some(0));
}

fn delete_is_idempotent(map: &dyn IntMap) {
    map.delete(11);
    map.delete(11);
    map.store(11, 1);
    map.delete(11);
    map.delete(11);
    assert_eq!(map.load(11), (0, false));
    assert!(map.is_empty());
    map.store(11, 2);
    assert_eq!(map.load(11), (2, true));
    assert_eq!(map.len(), 1);
}

fn disjoint_stress(map: Arc<dyn IntMap>) {
    workload::fill_disjoint(Arc::clone(&map), 4, 10_000).unwrap();
    assert_eq!(map.len(), 40_000);
    for worker in 0..4 {
        for key in (worker * 10_000) as i64..((worker + 1) * 10_000) as i64 {
            assert_eq!(map.load(key), (encode_value(key, worker), true));
        }
    }
}

fn mixed_ops_leave_no_corruption(map: Arc<dyn IntMap>) {
    let config = WorkloadConfig {
        workers: 8,
        ops_per_worker: 20_000,
        key_space: 512,
        mix: OpMix {
            load: 4,
            store: 3,
            delete: 1,
        },
        seed: 1234,
    };
    let report = workload::run(Arc::clone(&map), &config).unwrap();
    assert_eq!(report.total_ops(), 160_000);
    let live = workload::verify(&*map, config.key_space, config.workers).unwrap();
    assert_eq!(live, map.len());
}

// Writers race on one key; afterwards every reader agrees on one winner.
fn same_key_race_settles(map: Arc<dyn IntMap>) {
    const WRITERS: usize = 8;
    let barrier = Arc::new(Barrier::new(WRITERS));
    let handles: Vec<_> = (0..WRITERS)
        .map(|w| {
            let map = Arc::clone(&map);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..1_000 {
                    if w % 4 == 0 && i % 10 == 0 {
                        map.delete(0);
                    } else {
                        map.store(0, encode_value(0, w));
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let settled = map.load(0);
    if settled.1 {
        assert!(workload::verify(&*map, 1, WRITERS).is_ok());
    } else {
        assert_eq!(settled, (0, false));
    }
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let map = Arc::clone(&map);
            thread::spawn(move || map.load(0))
        })
        .collect();
    for reader in readers {
        assert_eq!(reader.join().unwrap(), settled);
    }
}

// A store that returned is visible to a load started afterwards on another thread.
fn store_visible_across_threads(map: Arc<dyn IntMap>) {
    for round in 0..200 {
        let writer = {
            let map = Arc::clone(&map);
            thread::spawn(move || map.store(round, round * 3))
        };
        writer.join().unwrap();
        let reader = {
            let map = Arc::clone(&map);
            thread::spawn(move || map.load(round))
        };
        assert_eq!(reader.join().unwrap(), (round * 3, true));
    }
}

macro_rules! contract_tests {
    ($name:ident, $ctor:expr) => {
        mod $name {
            use super::*;

            #[test]
            fn example_sequence() {
                super::example_sequence(&$ctor);
            }

            #[test]
            fn absent_until_stored() {
                super::absent_until_stored(&$ctor);
            }

            #[test]
            fn stored_zero_is_found() {
                super::stored_zero_is_found(&$ctor);
            }

            #[test]
            fn delete_is_idempotent() {
                super::delete_is_idempotent(&$ctor);
            }

            #[test]
            fn disjoint_stress() {
                super::disjoint_stress(Arc::new($ctor));
            }

            #[test]
            fn mixed_ops_leave_no_corruption() {
                super::mixed_ops_leave_no_corruption(Arc::new($ctor));
            }

            #[test]
            fn same_key_race_settles() {
                super::same_key_race_settles(Arc::new($ctor));
            }

            #[test]
            fn store_visible_across_threads() {
                super::store_visible_across_threads(Arc::new($ctor));
            }
        }
    };
}

contract_tests!(locked, LockedMap::new());
contract_tests!(sharded, ShardedMap::new());
contract_tests!(sharded_narrow, ShardedMap::with_shards(2));
contract_tests!(sync, SyncMap::new());
