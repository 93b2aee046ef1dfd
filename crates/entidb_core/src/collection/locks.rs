//! Per-entity lock cache.
//!
//! Every write path and read-modify-write flow acquires the lock for its
//! entity id before touching storage, serializing concurrent mutations on
//! the same id without a global lock. The cache is LRU-bounded so
//! long-lived collections with high id churn don't grow the lock table
//! without bound; eviction only drops entries nobody currently holds.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Bounded cache of per-id mutexes.
pub struct LockCache {
    locks: HashMap<String, Arc<Mutex<()>>>,
    order: VecDeque<String>,
    capacity: usize,
}

impl LockCache {
    /// Creates a cache holding at most `capacity` locks.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            locks: HashMap::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    /// Returns the lock for `id`, creating one if absent, and marks it
    /// most-recently-used.
    pub fn get(&mut self, id: &str) -> Arc<Mutex<()>> {
        if let Some(lock) = self.locks.get(id) {
            let lock = lock.clone();
            self.touch(id);
            return lock;
        }
        let lock = Arc::new(Mutex::new(()));
        self.locks.insert(id.to_string(), lock.clone());
        self.order.push_back(id.to_string());
        self.evict_if_needed();
        lock
    }

    fn touch(&mut self, id: &str) {
        if let Some(pos) = self.order.iter().position(|existing| existing == id) {
            self.order.remove(pos);
        }
        self.order.push_back(id.to_string());
    }

    fn evict_if_needed(&mut self) {
        while self.locks.len() > self.capacity {
            // Evict the least-recently-used entry that nobody currently holds.
            // strong_count == 1 means only this cache's own reference is alive.
            let Some(pos) = self.order.iter().position(|id| {
                self.locks.get(id).is_some_and(|lock| Arc::strong_count(lock) == 1)
            }) else {
                break;
            };
            let id = self.order.remove(pos).expect("position came from this deque");
            self.locks.remove(&id);
        }
    }

    /// Returns the number of cached locks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Returns true if the cache holds no locks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
