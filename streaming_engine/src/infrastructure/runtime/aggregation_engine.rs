// /////////////////////////////////////////////////////////////////////////////
// NebulaStream Streaming Execution Core
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! The aggregation engine: drives a domain
//! [`AggregationFunction`] over a [`SliceStore`], supporting both keyed
//! (hashmap-per-worker-bucket) and non-keyed (single-cell) aggregation.

use crate::infrastructure::runtime::slice_store::SliceStore;
use rayon::prelude::*;
use std::collections::HashMap;
use std::hash::Hash;
use streaming_domain::entities::SlicePayload;
use streaming_domain::services::AggregationFunction;
use streaming_domain::value_objects::SliceBounds;

/// Wraps one `AggregationFunction` with the slice store it reads and writes
/// against. `K` is the grouping key type for keyed windows; non-keyed
/// windows use `insert_unkeyed`/`trigger_unkeyed` and ignore `K` entirely
/// (any key type works since it is never constructed on that path).
pub struct AggregationEngine<K, F>
where
    K: Eq + Hash + Clone + Send + Sync,
    F: AggregationFunction,
{
    function: F,
    store: SliceStore<K, F::State>,
}

impl<K, F> AggregationEngine<K, F>
where
    K: Eq + Hash + Clone + Send + Sync,
    F: AggregationFunction,
{
    pub fn new(function: F, num_workers: usize) -> Self {
        Self {
            function,
            store: SliceStore::new(num_workers),
        }
    }

    /// Incorporates one record into the keyed bucket for `worker_id`'s
    /// partition of the slice covering `bounds`.
    pub fn insert_keyed(&self, bounds: SliceBounds, worker_id: usize, key: K, record: F::Input) {
        self.store.with_slice_mut(
            bounds,
            |n| SlicePayload::KeyedHashMap((0..n).map(|_| HashMap::new()).collect()),
            |slice| {
                if let SlicePayload::KeyedHashMap(buckets) = &mut slice.payload {
                    let state = buckets[worker_id].entry(key).or_insert_with(|| self.function.initial());
                    *state = self.function.lift(state, &record);
                }
            },
        );
    }

    /// Incorporates one record into the single-cell, non-keyed state for
    /// the slice covering `bounds`.
    pub fn insert_unkeyed(&self, bounds: SliceBounds, record: F::Input) {
        self.store.with_slice_mut(
            bounds,
            |_n| SlicePayload::SingleCell(self.function.initial()),
            |slice| {
                if let SlicePayload::SingleCell(state) = &mut slice.payload {
                    *state = self.function.lift(state, &record);
                }
            },
        );
    }

    /// Retires the slice at `bounds` and folds every worker's keyed bucket
    /// into one result map via `combine`, then `lower`s each key's state.
    ///
    /// The per-worker buckets are merged with a parallel fold/reduce: each
    /// rayon task combines a subset of buckets into its own partial map,
    /// then the partials are combined pairwise. `combine` being associative
    /// and commutative is exactly what makes this order-independent.
    pub fn trigger_keyed(&self, bounds: SliceBounds) -> HashMap<K, F::Output> {
        let Some(slice) = self.store.retire(bounds) else {
            return HashMap::new();
        };
        let SlicePayload::KeyedHashMap(buckets) = slice.payload else {
            return HashMap::new();
        };
        let merge_bucket = |mut acc: HashMap<K, F::State>, bucket: HashMap<K, F::State>| {
            for (key, state) in bucket {
                acc.entry(key)
                    .and_modify(|existing| *existing = self.function.combine(existing, &state))
                    .or_insert(state);
            }
            acc
        };
        let merged: HashMap<K, F::State> = buckets
            .into_par_iter()
            .fold(HashMap::new, merge_bucket)
            .reduce(HashMap::new, merge_bucket);
        merged.into_iter().map(|(k, state)| (k, self.function.lower(&state))).collect()
    }

    /// Retires the slice at `bounds` and lowers its single-cell state, if
    /// present.
    pub fn trigger_unkeyed(&self, bounds: SliceBounds) -> Option<F::Output> {
        let slice = self.store.retire(bounds)?;
        match slice.payload {
            SlicePayload::SingleCell(state) => Some(self.function.lower(&state)),
            _ => None,
        }
    }

    pub fn live_slice_count(&self) -> usize {
        self.store.len()
    }
}
