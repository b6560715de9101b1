use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::fmt;
use std::hash::BuildHasher;

use parking_lot::RwLock;

use crate::{IntMap, Key, Value};

pub const NUM_SHARDS: usize = 256;

/// A `HashMap` behind a single reader/writer lock.
///
/// Readers share the lock; a writer excludes everyone. Writers racing on
/// one key are ordered by lock acquisition.
#[derive(Default)]
pub struct LockedMap {
    data: RwLock<HashMap<Key, Value>>,
}

impl LockedMap {
    pub fn new() -> Self {
        Self {
            data: Default::default(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: RwLock::new(HashMap::with_capacity(capacity)),
        }
    }
}

impl IntMap for LockedMap {
    #[inline]
    fn load(&self, key: Key) -> (Value, bool) {
        match self.data.read().get(&key) {
            Some(&value) => (value, true),
            None => (0, false),
        }
    }

    #[inline]
    fn store(&self, key: Key, value: Value) {
        self.data.write().insert(key, value);
    }

    #[inline]
    fn delete(&self, key: Key) {
        self.data.write().remove(&key);
    }

    fn len(&self) -> usize {
        self.data.read().len()
    }
}

impl fmt::Debug for LockedMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockedMap").field("len", &self.len()).finish()
    }
}

/// Keys spread over independently locked shards.
///
/// A key always lands in the same shard, so per-key ordering is the
/// shard lock's acquisition order. Operations never hold more than one
/// shard lock.
pub struct ShardedMap {
    shards: Vec<LockedMap>,
    hasher: RandomState,
}

impl ShardedMap {
    pub fn new() -> Self {
        Self::with_shards(NUM_SHARDS)
    }

    /// `n` is rounded up to a power of two.
    pub fn with_shards(n: usize) -> Self {
        let n = n.max(1).next_power_of_two();
        Self {
            shards: vec_no_clone![LockedMap::new(); n],
            hasher: RandomState::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let per_shard = capacity.div_ceil(NUM_SHARDS);
        Self {
            shards: vec_no_clone![LockedMap::with_capacity(per_shard); NUM_SHARDS],
            hasher: RandomState::new(),
        }
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    #[inline]
    fn shard(&self, key: Key) -> &LockedMap {
        // shard count is a power of two
        let idx = self.hasher.hash_one(key) as usize & (self.shards.len() - 1);
        &self.shards[idx]
    }
}

impl Default for ShardedMap {
    fn default() -> Self {
        Self::new()
    }
}

impl IntMap for ShardedMap {
    #[inline]
    fn load(&self, key: Key) -> (Value, bool) {
        self.shard(key).load(key)
    }

    #[inline]
    fn store(&self, key: Key, value: Value) {
        self.shard(key).store(key, value)
    }

    #[inline]
    fn delete(&self, key: Key) {
        self.shard(key).delete(key)
    }

    fn len(&self) -> usize {
        self.shards.iter().map(LockedMap::len).sum()
    }
}

impl fmt::Debug for ShardedMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardedMap")
            .field("shards", &self.shard_count())
            .field("len", &self.len())
            .finish()
    }
}
