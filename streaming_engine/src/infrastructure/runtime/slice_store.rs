// /////////////////////////////////////////////////////////////////////////////
// NebulaStream Streaming Execution Core
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! The slice store: hash-sharded by slice-end timestamp,
//! each shard guarded by a mutex, with per-thread payload buckets so the hot
//! insert path only ever touches the inserting worker's own bucket.
//!
//! Slices are created lazily on first access and retired once no open
//! window references them.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use streaming_domain::entities::{Slice, SlicePayload};
use streaming_domain::value_objects::SliceBounds;

const DEFAULT_SHARD_COUNT: usize = 64;

fn shard_for(bounds: SliceBounds, shard_count: usize) -> usize {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    bounds.end.hash(&mut hasher);
    (hasher.finish() as usize) % shard_count
}

pub struct SliceStore<K, S> {
    shards: Vec<Mutex<HashMap<SliceBounds, Slice<K, S>>>>,
    num_workers: usize,
}

impl<K, S> SliceStore<K, S> {
    pub fn new(num_workers: usize) -> Self {
        Self::with_shard_count(num_workers, DEFAULT_SHARD_COUNT)
    }

    pub fn with_shard_count(num_workers: usize, shard_count: usize) -> Self {
        let mut shards = Vec::with_capacity(shard_count);
        shards.resize_with(shard_count, || Mutex::new(HashMap::new()));
        Self { shards, num_workers }
    }

    fn shard(&self, bounds: SliceBounds) -> &Mutex<HashMap<SliceBounds, Slice<K, S>>> {
        &self.shards[shard_for(bounds, self.shards.len())]
    }

    /// Looks up (creating lazily via `make_payload` if absent) the slice for
    /// `bounds`, and runs `f` against it while the shard lock is held. `f`
    /// should only touch its own worker's bucket within the payload to avoid
    /// contending with concurrent inserts from other workers.
    pub fn with_slice_mut<R>(
        &self,
        bounds: SliceBounds,
        make_payload: impl FnOnce(usize) -> SlicePayload<K, S>,
        f: impl FnOnce(&mut Slice<K, S>) -> R,
    ) -> R {
        let mut shard = self.shard(bounds).lock();
        let slice = shard
            .entry(bounds)
            .or_insert_with(|| Slice::new(bounds, make_payload(self.num_workers)));
        f(slice)
    }

    /// Removes and returns the slice for `bounds`, if present. Called once
    /// every window referencing it has triggered.
    pub fn retire(&self, bounds: SliceBounds) -> Option<Slice<K, S>> {
        self.shard(bounds).lock().remove(&bounds)
    }

    pub fn contains(&self, bounds: SliceBounds) -> bool {
        self.shard(bounds).lock().contains_key(&bounds)
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Total number of live slices across all shards; used by tests and
    /// diagnostics, not on any hot path.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.lock().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_is_created_lazily_on_first_access() {
        let store: SliceStore<u64, f64> = SliceStore::new(4);
        let bounds = SliceBounds::new(0, 5);
        assert!(!store.contains(bounds));
        store.with_slice_mut(bounds, |n| SlicePayload::KeyedHashMap(vec![HashMap::new(); n]), |_slice| {});
        assert!(store.contains(bounds));
    }

    #[test]
    fn retire_removes_the_slice() {
        let store: SliceStore<u64, f64> = SliceStore::new(2);
        let bounds = SliceBounds::new(0, 5);
        store.with_slice_mut(bounds, |n| SlicePayload::SingleCell(vec![0.0; n].into_iter().sum()), |_| {});
        assert_eq!(store.len(), 1);
        assert!(store.retire(bounds).is_some());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn per_thread_buckets_are_independently_addressable() {
        let store: SliceStore<u64, i64> = SliceStore::new(2);
        let bounds = SliceBounds::new(0, 10);
        store.with_slice_mut(
            bounds,
            |n| SlicePayload::KeyedHashMap(vec![HashMap::new(); n]),
            |slice| {
                if let SlicePayload::KeyedHashMap(buckets) = &mut slice.payload {
                    buckets[0].insert(1u64, 10i64);
                    buckets[1].insert(1u64, 20i64);
                }
            },
        );
        store.with_slice_mut(
            bounds,
            |n| SlicePayload::KeyedHashMap(vec![HashMap::new(); n]),
            |slice| {
                if let SlicePayload::KeyedHashMap(buckets) = &slice.payload {
                    assert_eq!(buckets[0][&1], 10);
                    assert_eq!(buckets[1][&1], 20);
                }
            },
        );
    }
}
