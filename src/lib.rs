//! Thread-safe `i64 -> i64` maps.
//!
//! Three interchangeable implementations of [`IntMap`]:
//!
//! - [`LockedMap`]: one reader/writer lock around a `HashMap`.
//! - [`ShardedMap`]: the same, split over power-of-two many shards.
//! - [`SyncMap`]: a lock-free table from `cht`.
//!
//! ```
//! use intmap::{IntMap, LockedMap};
//!
//! let map = LockedMap::new();
//! assert_eq!(map.load(5), (0, false));
//! map.store(5, 42);
//! assert_eq!(map.load(5), (42, true));
//! map.delete(5);
//! assert_eq!(map.load(5), (0, false));
//! ```

macro_rules! vec_no_clone {
    ( $val:expr; $n:expr ) => {{
        let result: Vec<_> = std::iter::repeat_with(|| $val).take($n).collect();
        result
    }};
}

mod store;
mod strategy;
mod sync_map;
pub mod workload;

pub use store::{LockedMap, ShardedMap, NUM_SHARDS};
pub use strategy::{ParseStrategyError, Strategy};
pub use sync_map::SyncMap;

pub type Key = i64;
pub type Value = i64;

/// A map safe to share between threads.
///
/// Operations on a single key are linearizable. When writers race on the
/// same key, one of them wins and every later reader sees that winner.
pub trait IntMap: Send + Sync {
    /// Returns the value for `key` and whether it was present.
    /// An absent key yields `(0, false)`.
    fn load(&self, key: Key) -> (Value, bool);

    /// Inserts or overwrites `key`.
    fn store(&self, key: Key, value: Value);

    /// Removes `key`. Deleting an absent key does nothing.
    fn delete(&self, key: Key);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, key: Key) -> Option<Value> {
        match self.load(key) {
            (value, true) => Some(value),
            _ => None,
        }
    }
}
