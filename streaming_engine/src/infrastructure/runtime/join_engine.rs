// /////////////////////////////////////////////////////////////////////////////
// NebulaStream Streaming Execution Core
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! The join engine: nested-loop and hash-join build/probe
//! over slices shared between a build pipeline and a probe pipeline.
//!
//! `V` is whatever row representation the compiled pipeline has already
//! extracted from a `TupleBuffer` by the time it reaches the join operator
//! (the join engine itself is schema-agnostic, same boundary the aggregation
//! engine draws against `AggregationFunction::Input`). Sharding mirrors
//! [`crate::infrastructure::runtime::slice_store::SliceStore`]'s
//! hash-by-slice-end-timestamp discipline rather than reusing it directly,
//! since a join slice's payload shape (two build sides) doesn't fit the
//! domain `Slice<K, S>` enum's single-payload variants.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use streaming_domain::value_objects::SliceBounds;

const SHARD_COUNT: usize = 64;

fn shard_for(bounds: SliceBounds) -> usize {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    bounds.end.hash(&mut hasher);
    (hasher.finish() as usize) % SHARD_COUNT
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    LeftOuter,
    RightOuter,
    FullOuter,
}

/// One matched (or unmatched, for outer joins) pair of rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedPair<V> {
    pub left: Option<V>,
    pub right: Option<V>,
}

// ---------------------------------------------------------------------
// Nested-loop join
// ---------------------------------------------------------------------

struct NestedLoopSlice<V> {
    left: Vec<Vec<V>>,
    right: Vec<Vec<V>>,
}

/// Build side stores tuples in per-worker paged vectors; probe iterates the
/// Cartesian product of all left pages against all right pages belonging to
/// the same slice.
pub struct NestedLoopJoinEngine<V> {
    shards: Vec<Mutex<HashMap<SliceBounds, NestedLoopSlice<V>>>>,
    num_workers: usize,
}

impl<V: Clone> NestedLoopJoinEngine<V> {
    pub fn new(num_workers: usize) -> Self {
        let mut shards = Vec::with_capacity(SHARD_COUNT);
        shards.resize_with(SHARD_COUNT, || Mutex::new(HashMap::new()));
        Self { shards, num_workers }
    }

    fn shard(&self, bounds: SliceBounds) -> &Mutex<HashMap<SliceBounds, NestedLoopSlice<V>>> {
        &self.shards[shard_for(bounds)]
    }

    fn entry(&self, bounds: SliceBounds, worker_id: usize, left: bool, row: V) {
        let mut shard = self.shard(bounds).lock();
        let slice = shard.entry(bounds).or_insert_with(|| NestedLoopSlice {
            left: vec![Vec::new(); self.num_workers],
            right: vec![Vec::new(); self.num_workers],
        });
        if left {
            slice.left[worker_id].push(row);
        } else {
            slice.right[worker_id].push(row);
        }
    }

    pub fn insert_left(&self, bounds: SliceBounds, worker_id: usize, row: V) {
        self.entry(bounds, worker_id, true, row);
    }

    pub fn insert_right(&self, bounds: SliceBounds, worker_id: usize, row: V) {
        self.entry(bounds, worker_id, false, row);
    }

    /// Retires the slice and produces every matching pair per `join_type`.
    /// Time semantics are enforced by the caller: both sides only ever
    /// contain rows whose timestamp fell within `bounds`, so every pairing
    /// here already satisfies `S_L ∩ S_R != empty` within the window.
    pub fn probe(&self, bounds: SliceBounds, join_type: JoinType) -> Vec<JoinedPair<V>> {
        let Some(slice) = self.shard(bounds).lock().remove(&bounds) else {
            return Vec::new();
        };
        let left: Vec<V> = slice.left.into_iter().flatten().collect();
        let right: Vec<V> = slice.right.into_iter().flatten().collect();

        let mut output = Vec::new();
        for l in &left {
            for r in &right {
                output.push(JoinedPair {
                    left: Some(l.clone()),
                    right: Some(r.clone()),
                });
            }
        }
        if matches!(join_type, JoinType::LeftOuter | JoinType::FullOuter) && right.is_empty() {
            for l in &left {
                output.push(JoinedPair {
                    left: Some(l.clone()),
                    right: None,
                });
            }
        }
        if matches!(join_type, JoinType::RightOuter | JoinType::FullOuter) && left.is_empty() {
            for r in &right {
                output.push(JoinedPair {
                    left: None,
                    right: Some(r.clone()),
                });
            }
        }
        output
    }
}

// ---------------------------------------------------------------------
// Hash join
// ---------------------------------------------------------------------

struct HashJoinSlice<K, V> {
    left: Vec<HashMap<K, Vec<V>>>,
    right: Vec<HashMap<K, Vec<V>>>,
}

/// Build side stores two hashmap arrays (left/right) indexed by worker
/// thread, keyed by the join key. Probe iterates each left bucket and looks
/// up matching right buckets across all worker partitions.
pub struct HashJoinEngine<K, V> {
    shards: Vec<Mutex<HashMap<SliceBounds, HashJoinSlice<K, V>>>>,
    num_workers: usize,
}

impl<K: Eq + Hash + Clone, V: Clone> HashJoinEngine<K, V> {
    pub fn new(num_workers: usize) -> Self {
        let mut shards = Vec::with_capacity(SHARD_COUNT);
        shards.resize_with(SHARD_COUNT, || Mutex::new(HashMap::new()));
        Self { shards, num_workers }
    }

    fn shard(&self, bounds: SliceBounds) -> &Mutex<HashMap<SliceBounds, HashJoinSlice<K, V>>> {
        &self.shards[shard_for(bounds)]
    }

    fn insert(&self, bounds: SliceBounds, worker_id: usize, left: bool, key: K, row: V) {
        let mut shard = self.shard(bounds).lock();
        let slice = shard.entry(bounds).or_insert_with(|| HashJoinSlice {
            left: vec![HashMap::new(); self.num_workers],
            right: vec![HashMap::new(); self.num_workers],
        });
        let bucket = if left { &mut slice.left[worker_id] } else { &mut slice.right[worker_id] };
        bucket.entry(key).or_default().push(row);
    }

    pub fn insert_left(&self, bounds: SliceBounds, worker_id: usize, key: K, row: V) {
        self.insert(bounds, worker_id, true, key, row);
    }

    pub fn insert_right(&self, bounds: SliceBounds, worker_id: usize, key: K, row: V) {
        self.insert(bounds, worker_id, false, key, row);
    }

    pub fn probe(&self, bounds: SliceBounds, join_type: JoinType) -> Vec<JoinedPair<V>> {
        let Some(slice) = self.shard(bounds).lock().remove(&bounds) else {
            return Vec::new();
        };

        let mut left_by_key: HashMap<K, Vec<V>> = HashMap::new();
        for bucket in slice.left {
            for (key, rows) in bucket {
                left_by_key.entry(key).or_default().extend(rows);
            }
        }
        let mut right_by_key: HashMap<K, Vec<V>> = HashMap::new();
        for bucket in slice.right {
            for (key, rows) in bucket {
                right_by_key.entry(key).or_default().extend(rows);
            }
        }

        let mut output = Vec::new();
        for (key, left_rows) in &left_by_key {
            match right_by_key.get(key) {
                Some(right_rows) => {
                    for l in left_rows {
                        for r in right_rows {
                            output.push(JoinedPair {
                                left: Some(l.clone()),
                                right: Some(r.clone()),
                            });
                        }
                    }
                }
                None if matches!(join_type, JoinType::LeftOuter | JoinType::FullOuter) => {
                    for l in left_rows {
                        output.push(JoinedPair {
                            left: Some(l.clone()),
                            right: None,
                        });
                    }
                }
                None => {}
            }
        }
        if matches!(join_type, JoinType::RightOuter | JoinType::FullOuter) {
            for (key, right_rows) in &right_by_key {
                if !left_by_key.contains_key(key) {
                    for r in right_rows {
                        output.push(JoinedPair {
                            left: None,
                            right: Some(r.clone()),
                        });
                    }
                }
            }
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_loop_inner_join_produces_full_cartesian_product() {
        let engine: NestedLoopJoinEngine<i64> = NestedLoopJoinEngine::new(2);
        let bounds = SliceBounds::new(0, 10);
        engine.insert_left(bounds, 0, 10);
        engine.insert_left(bounds, 1, 20);
        engine.insert_right(bounds, 0, 100);
        let pairs = engine.probe(bounds, JoinType::Inner);
        assert_eq!(pairs.len(), 2);
    }

    #[test]
    fn hash_join_inner_only_matches_shared_keys() {
        // build {(k=1,lv=10),(k=2,lv=20)}, probe {(k=1,rv=100),(k=1,rv=200)}:
        // k=2 has no probe-side counterpart, so only the two k=1 pairs survive.
        let engine: HashJoinEngine<u64, i64> = HashJoinEngine::new(1);
        let bounds = SliceBounds::new(0, 10);
        engine.insert_left(bounds, 0, 1, 10);
        engine.insert_left(bounds, 0, 2, 20);
        engine.insert_right(bounds, 0, 1, 100);
        engine.insert_right(bounds, 0, 1, 200);
        let pairs = engine.probe(bounds, JoinType::Inner);
        assert_eq!(pairs.len(), 2);
        assert!(pairs.iter().all(|p| p.left == Some(10)));
    }

    #[test]
    fn hash_join_left_outer_preserves_unmatched_left_rows() {
        let engine: HashJoinEngine<u64, i64> = HashJoinEngine::new(1);
        let bounds = SliceBounds::new(0, 10);
        engine.insert_left(bounds, 0, 1, 10);
        engine.insert_left(bounds, 0, 2, 20);
        engine.insert_right(bounds, 0, 1, 100);
        let pairs = engine.probe(bounds, JoinType::LeftOuter);
        assert_eq!(pairs.len(), 2);
        assert!(pairs.iter().any(|p| p.left == Some(20) && p.right.is_none()));
    }

    #[test]
    fn probing_an_unknown_slice_returns_empty() {
        let engine: HashJoinEngine<u64, i64> = HashJoinEngine::new(1);
        assert!(engine.probe(SliceBounds::new(0, 1), JoinType::Inner).is_empty());
    }
}
