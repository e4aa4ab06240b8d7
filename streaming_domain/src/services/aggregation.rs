// /////////////////////////////////////////////////////////////////////////////
// NebulaStream Streaming Execution Core
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! The lift/combine/lower aggregation contract and the
//! concrete kinds C8 supports at minimum: `Sum, Min, Max, Avg, Count,
//! Median-approx, CountMin-approx, ReservoirSample`.
//!
//! `combine` must be associative and commutative for every kind here so
//! that slice merging (parallel per-thread partial states folded into one)
//! is order-independent regardless of which thread finishes first.

use rand::Rng;

/// Four-function contract for one aggregation kind.
pub trait AggregationFunction: Send + Sync {
    type Input;
    type State: Clone + Send;
    type Output;

    fn initial(&self) -> Self::State;
    fn lift(&self, state: &Self::State, record: &Self::Input) -> Self::State;
    fn combine(&self, a: &Self::State, b: &Self::State) -> Self::State;
    fn lower(&self, state: &Self::State) -> Self::Output;
}

/// A named, closed set of supported kinds, useful where a handler has to
/// pick a concrete `AggregationFunction` by configuration rather than by
/// generic type parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Sum,
    Min,
    Max,
    Avg,
    Count,
    MedianApprox,
    CountMinApprox,
    ReservoirSample,
}

pub struct SumState;

impl AggregationFunction for SumState {
    type Input = f64;
    type State = f64;
    type Output = f64;

    fn initial(&self) -> f64 {
        0.0
    }
    fn lift(&self, state: &f64, record: &f64) -> f64 {
        state + record
    }
    fn combine(&self, a: &f64, b: &f64) -> f64 {
        a + b
    }
    fn lower(&self, state: &f64) -> f64 {
        *state
    }
}

pub struct MinState;

impl AggregationFunction for MinState {
    type Input = f64;
    type State = Option<f64>;
    type Output = Option<f64>;

    fn initial(&self) -> Option<f64> {
        None
    }
    fn lift(&self, state: &Option<f64>, record: &f64) -> Option<f64> {
        Some(state.map_or(*record, |s| s.min(*record)))
    }
    fn combine(&self, a: &Option<f64>, b: &Option<f64>) -> Option<f64> {
        match (a, b) {
            (Some(x), Some(y)) => Some(x.min(*y)),
            (Some(x), None) => Some(*x),
            (None, Some(y)) => Some(*y),
            (None, None) => None,
        }
    }
    fn lower(&self, state: &Option<f64>) -> Option<f64> {
        *state
    }
}

pub struct MaxState;

impl AggregationFunction for MaxState {
    type Input = f64;
    type State = Option<f64>;
    type Output = Option<f64>;

    fn initial(&self) -> Option<f64> {
        None
    }
    fn lift(&self, state: &Option<f64>, record: &f64) -> Option<f64> {
        Some(state.map_or(*record, |s| s.max(*record)))
    }
    fn combine(&self, a: &Option<f64>, b: &Option<f64>) -> Option<f64> {
        match (a, b) {
            (Some(x), Some(y)) => Some(x.max(*y)),
            (Some(x), None) => Some(*x),
            (None, Some(y)) => Some(*y),
            (None, None) => None,
        }
    }
    fn lower(&self, state: &Option<f64>) -> Option<f64> {
        *state
    }
}

/// Running `(sum, count)` pair; `lower` divides only at the end so partial
/// states remain exactly mergeable (dividing early would break
/// associativity).
#[derive(Debug, Clone, Copy, Default)]
pub struct AvgAccumulator {
    pub sum: f64,
    pub count: u64,
}

pub struct AvgState;

impl AggregationFunction for AvgState {
    type Input = f64;
    type State = AvgAccumulator;
    type Output = f64;

    fn initial(&self) -> AvgAccumulator {
        AvgAccumulator::default()
    }
    fn lift(&self, state: &AvgAccumulator, record: &f64) -> AvgAccumulator {
        AvgAccumulator {
            sum: state.sum + record,
            count: state.count + 1,
        }
    }
    fn combine(&self, a: &AvgAccumulator, b: &AvgAccumulator) -> AvgAccumulator {
        AvgAccumulator {
            sum: a.sum + b.sum,
            count: a.count + b.count,
        }
    }
    fn lower(&self, state: &AvgAccumulator) -> f64 {
        if state.count == 0 {
            0.0
        } else {
            state.sum / state.count as f64
        }
    }
}

pub struct CountState;

impl AggregationFunction for CountState {
    type Input = ();
    type State = u64;
    type Output = u64;

    fn initial(&self) -> u64 {
        0
    }
    fn lift(&self, state: &u64, _record: &()) -> u64 {
        state + 1
    }
    fn combine(&self, a: &u64, b: &u64) -> u64 {
        a + b
    }
    fn lower(&self, state: &u64) -> u64 {
        *state
    }
}

/// Reservoir sampling (algorithm R) of up to `capacity` records, used both
/// standalone and as the basis for `MedianApprox`. `combine` is
/// associative/commutative only up to sample-set identity, not up to which
/// particular records survive — acceptable for an approximate kind, where
/// the contract is a representative sample, not a deterministic one.
#[derive(Debug, Clone)]
pub struct ReservoirState {
    pub samples: Vec<f64>,
    pub seen: u64,
    capacity: usize,
}

pub struct ReservoirSample {
    pub capacity: usize,
}

impl AggregationFunction for ReservoirSample {
    type Input = f64;
    type State = ReservoirState;
    type Output = Vec<f64>;

    fn initial(&self) -> ReservoirState {
        ReservoirState {
            samples: Vec::with_capacity(self.capacity),
            seen: 0,
            capacity: self.capacity,
        }
    }

    fn lift(&self, state: &ReservoirState, record: &f64) -> ReservoirState {
        let mut next = state.clone();
        next.seen += 1;
        if next.samples.len() < next.capacity {
            next.samples.push(*record);
        } else {
            let j = rand::rng().random_range(0..next.seen);
            if (j as usize) < next.capacity {
                next.samples[j as usize] = *record;
            }
        }
        next
    }

    /// Merges two reservoirs by re-sampling their union down to capacity,
    /// weighted by how many records each side has seen.
    fn combine(&self, a: &ReservoirState, b: &ReservoirState) -> ReservoirState {
        let mut merged: Vec<f64> = a.samples.iter().chain(b.samples.iter()).copied().collect();
        let seen = a.seen + b.seen;
        if merged.len() > self.capacity {
            let mut rng = rand::rng();
            while merged.len() > self.capacity {
                let idx = rng.random_range(0..merged.len());
                merged.swap_remove(idx);
            }
        }
        ReservoirState {
            samples: merged,
            seen,
            capacity: self.capacity,
        }
    }

    fn lower(&self, state: &ReservoirState) -> Vec<f64> {
        state.samples.clone()
    }
}

pub struct MedianApprox {
    pub reservoir_capacity: usize,
}

impl AggregationFunction for MedianApprox {
    type Input = f64;
    type State = ReservoirState;
    type Output = f64;

    fn initial(&self) -> ReservoirState {
        ReservoirSample {
            capacity: self.reservoir_capacity,
        }
        .initial()
    }

    fn lift(&self, state: &ReservoirState, record: &f64) -> ReservoirState {
        ReservoirSample {
            capacity: self.reservoir_capacity,
        }
        .lift(state, record)
    }

    fn combine(&self, a: &ReservoirState, b: &ReservoirState) -> ReservoirState {
        ReservoirSample {
            capacity: self.reservoir_capacity,
        }
        .combine(a, b)
    }

    fn lower(&self, state: &ReservoirState) -> f64 {
        if state.samples.is_empty() {
            return 0.0;
        }
        let mut sorted = state.samples.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        }
    }
}

/// A fixed-size count-min sketch for approximate frequency counting, used
/// where exact per-key counts would be too large to keep resident.
#[derive(Debug, Clone)]
pub struct CountMinState {
    table: Vec<Vec<u64>>,
    width: usize,
}

pub struct CountMinApprox {
    pub width: usize,
    pub depth: usize,
}

impl CountMinApprox {
    fn hash(&self, row: usize, key: u64) -> usize {
        let mixed = key
            .wrapping_mul(0x9E3779B97F4A7C15)
            .wrapping_add(row as u64 * 0xBF58476D1CE4E5B9);
        (mixed % self.width as u64) as usize
    }
}

impl AggregationFunction for CountMinApprox {
    type Input = u64;
    type State = CountMinState;
    type Output = u64;

    fn initial(&self) -> CountMinState {
        CountMinState {
            table: vec![vec![0u64; self.width]; self.depth],
            width: self.width,
        }
    }

    fn lift(&self, state: &CountMinState, key: &u64) -> CountMinState {
        let mut next = state.clone();
        for row in 0..self.depth {
            let col = self.hash(row, *key);
            next.table[row][col] += 1;
        }
        next
    }

    fn combine(&self, a: &CountMinState, b: &CountMinState) -> CountMinState {
        let mut merged = a.clone();
        for row in 0..merged.table.len() {
            for col in 0..merged.table[row].len() {
                merged.table[row][col] += b.table[row][col];
            }
        }
        merged
    }

    /// Per-key estimate must be read via `estimate`, not `lower` (which
    /// reports the sketch's total insert count, unrelated to any one key).
    fn lower(&self, state: &CountMinState) -> u64 {
        state.table.first().map(|row| row.iter().sum()).unwrap_or(0) / self.depth.max(1) as u64
    }
}

impl CountMinState {
    pub fn estimate(&self, key: u64, this: &CountMinApprox) -> u64 {
        (0..this.depth)
            .map(|row| self.table[row][this.hash(row, key)])
            .min()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sum_combine_is_associative_and_commutative() {
        let sum = SumState;
        let a = sum.lift(&sum.initial(), &1.0);
        let b = sum.lift(&sum.initial(), &2.0);
        let c = sum.lift(&sum.initial(), &3.0);
        let left = sum.combine(&sum.combine(&a, &b), &c);
        let right = sum.combine(&a, &sum.combine(&b, &c));
        assert_eq!(left, right);
        assert_eq!(sum.combine(&a, &b), sum.combine(&b, &a));
        assert_eq!(sum.lower(&left), 6.0);
    }

    #[test]
    fn avg_divides_only_at_lower() {
        let avg = AvgState;
        let a = avg.lift(&avg.initial(), &10.0);
        let b = avg.lift(&avg.initial(), &20.0);
        let merged = avg.combine(&a, &b);
        assert_eq!(avg.lower(&merged), 15.0);
    }

    #[test]
    fn count_is_associative() {
        let count = CountState;
        let a = count.lift(&count.initial(), &());
        let b = count.lift(&count.lift(&count.initial(), &()), &());
        assert_eq!(count.lower(&count.combine(&a, &b)), 3);
    }

    #[test]
    fn min_max_handle_empty_state_combination() {
        let min = MinState;
        let a = min.initial();
        let b = min.lift(&min.initial(), &5.0);
        assert_eq!(min.lower(&min.combine(&a, &b)), Some(5.0));
    }

    #[test]
    fn count_min_never_underestimates() {
        let sketch = CountMinApprox { width: 16, depth: 4 };
        let mut state = sketch.initial();
        for _ in 0..10 {
            state = sketch.lift(&state, &42u64);
        }
        assert!(state.estimate(42, &sketch) >= 10);
    }

    #[test]
    fn reservoir_sample_never_exceeds_capacity() {
        let reservoir = ReservoirSample { capacity: 3 };
        let mut state = reservoir.initial();
        for i in 0..100 {
            state = reservoir.lift(&state, &(i as f64));
        }
        assert!(state.samples.len() <= 3);
    }
}
