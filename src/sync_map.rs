use std::fmt;

use crate::{IntMap, Key, Value};

/// Lock-free map backed by `cht`.
///
/// Readers never block. Writers racing on one key are ordered by which
/// bucket compare-and-swap lands first.
pub struct SyncMap {
    inner: cht::HashMap<Key, Value>,
}

impl SyncMap {
    pub fn new() -> Self {
        Self {
            inner: cht::HashMap::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: cht::HashMap::with_capacity(capacity),
        }
    }
}

impl Default for SyncMap {
    fn default() -> Self {
        Self::new()
    }
}

impl IntMap for SyncMap {
    #[inline]
    fn load(&self, key: Key) -> (Value, bool) {
        match self.inner.get(&key) {
            Some(value) => (value, true),
            None => (0, false),
        }
    }

    #[inline]
    fn store(&self, key: Key, value: Value) {
        self.inner.insert(key, value);
    }

    #[inline]
    fn delete(&self, key: Key) {
        self.inner.remove(&key);
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl fmt::Debug for SyncMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncMap").field("len", &self.len()).finish()
    }
}
