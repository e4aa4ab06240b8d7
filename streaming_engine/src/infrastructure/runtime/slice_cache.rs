// /////////////////////////////////////////////////////////////////////////////
// NebulaStream Streaming Execution Core
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Concrete, bounded-capacity implementations of
//! [`streaming_domain::repositories::SliceCache`]: a FIFO cache and a
//! second-chance (CLOCK) cache. Both are correctness-irrelevant lookaside
//! caches in front of the slice store — a miss just means the caller falls
//! back to `SliceStore` directly.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use streaming_domain::repositories::{EvictionPolicy, SliceCache};
use streaming_domain::value_objects::SliceBounds;

struct FifoInner<T> {
    entries: HashMap<SliceBounds, T>,
    order: VecDeque<SliceBounds>,
}

/// Evicts the oldest-inserted entry once `capacity` is exceeded, regardless
/// of how recently it was read.
pub struct FifoSliceCache<T> {
    capacity: usize,
    inner: Mutex<FifoInner<T>>,
}

impl<T: Clone> FifoSliceCache<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(FifoInner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }
}

impl<T: Clone + Send + Sync> SliceCache<T> for FifoSliceCache<T> {
    fn policy(&self) -> EvictionPolicy {
        EvictionPolicy::Fifo
    }

    fn get(&self, bounds: SliceBounds) -> Option<T> {
        self.inner.lock().entries.get(&bounds).cloned()
    }

    fn put(&self, bounds: SliceBounds, value: T) {
        let mut inner = self.inner.lock();
        if inner.entries.insert(bounds, value).is_none() {
            inner.order.push_back(bounds);
        }
        while inner.order.len() > self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.entries.remove(&oldest);
            }
        }
    }

    fn invalidate(&self, bounds: SliceBounds) {
        let mut inner = self.inner.lock();
        inner.entries.remove(&bounds);
        inner.order.retain(|b| *b != bounds);
    }

    fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }
}

struct SecondChanceEntry<T> {
    value: T,
    referenced: bool,
}

struct SecondChanceInner<T> {
    entries: HashMap<SliceBounds, SecondChanceEntry<T>>,
    ring: VecDeque<SliceBounds>,
    clock_hand: usize,
}

/// CLOCK / second-chance eviction: a reference bit is set on every `get`;
/// eviction sweeps the ring and skips (clearing the bit instead of evicting)
/// any entry that was referenced since the last sweep.
pub struct SecondChanceSliceCache<T> {
    capacity: usize,
    inner: Mutex<SecondChanceInner<T>>,
}

impl<T: Clone> SecondChanceSliceCache<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(SecondChanceInner {
                entries: HashMap::new(),
                ring: VecDeque::new(),
                clock_hand: 0,
            }),
        }
    }

    fn evict_one(inner: &mut SecondChanceInner<T>) {
        loop {
            if inner.ring.is_empty() {
                return;
            }
            if inner.clock_hand >= inner.ring.len() {
                inner.clock_hand = 0;
            }
            let candidate = inner.ring[inner.clock_hand];
            let Some(entry) = inner.entries.get_mut(&candidate) else {
                inner.ring.remove(inner.clock_hand);
                continue;
            };
            if entry.referenced {
                entry.referenced = false;
                inner.clock_hand += 1;
                continue;
            }
            inner.entries.remove(&candidate);
            inner.ring.remove(inner.clock_hand);
            return;
        }
    }
}

impl<T: Clone + Send + Sync> SliceCache<T> for SecondChanceSliceCache<T> {
    fn policy(&self) -> EvictionPolicy {
        EvictionPolicy::SecondChance
    }

    fn get(&self, bounds: SliceBounds) -> Option<T> {
        let mut inner = self.inner.lock();
        if let Some(entry) = inner.entries.get_mut(&bounds) {
            entry.referenced = true;
            return Some(entry.value.clone());
        }
        None
    }

    fn put(&self, bounds: SliceBounds, value: T) {
        let mut inner = self.inner.lock();
        if inner.entries.contains_key(&bounds) {
            if let Some(entry) = inner.entries.get_mut(&bounds) {
                entry.value = value;
                entry.referenced = true;
            }
            return;
        }
        if inner.ring.len() >= self.capacity {
            Self::evict_one(&mut inner);
        }
        inner.entries.insert(
            bounds,
            SecondChanceEntry {
                value,
                referenced: false,
            },
        );
        inner.ring.push_back(bounds);
    }

    fn invalidate(&self, bounds: SliceBounds) {
        let mut inner = self.inner.lock();
        inner.entries.remove(&bounds);
        inner.ring.retain(|b| *b != bounds);
    }

    fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_evicts_oldest_first_regardless_of_reads() {
        let cache: FifoSliceCache<u64> = FifoSliceCache::new(2);
        cache.put(SliceBounds::new(0, 1), 10);
        cache.put(SliceBounds::new(1, 2), 20);
        assert_eq!(cache.get(SliceBounds::new(0, 1)), Some(10));
        cache.put(SliceBounds::new(2, 3), 30);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(SliceBounds::new(0, 1)), None, "oldest insert evicted even though just read");
        assert_eq!(cache.get(SliceBounds::new(2, 3)), Some(30));
    }

    #[test]
    fn second_chance_spares_recently_referenced_entries() {
        let cache: SecondChanceSliceCache<u64> = SecondChanceSliceCache::new(2);
        cache.put(SliceBounds::new(0, 1), 10);
        cache.put(SliceBounds::new(1, 2), 20);
        // touch the first entry so its reference bit is set before eviction runs.
        assert_eq!(cache.get(SliceBounds::new(0, 1)), Some(10));
        cache.put(SliceBounds::new(2, 3), 30);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(SliceBounds::new(0, 1)), Some(10), "referenced entry survives one sweep");
        assert_eq!(cache.get(SliceBounds::new(1, 2)), None, "unreferenced entry is evicted instead");
    }

    #[test]
    fn invalidate_removes_regardless_of_policy() {
        let cache: FifoSliceCache<u64> = FifoSliceCache::new(4);
        cache.put(SliceBounds::new(0, 1), 1);
        cache.invalidate(SliceBounds::new(0, 1));
        assert!(cache.is_empty());
    }
}
