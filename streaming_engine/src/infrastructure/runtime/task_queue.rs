// /////////////////////////////////////////////////////////////////////////////
// NebulaStream Streaming Execution Core
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! The two-tier task queue: a bounded admission queue (the back-pressure
//! boundary for external producers) plus an unbounded internal queue fed
//! only by workers producing downstream tasks, with a counting semaphore
//! tracking the combined item count so `next()` never busy-polls. Dequeue is
//! biased toward internal work before admission, to bound in-memory task
//! fan-out ahead of intake of new work. If the semaphore reports an item but
//! both queues come up empty, that is an invariant violation, not a retry
//! condition: the semaphore count and queue contents must never diverge.

use crate::infrastructure::runtime::stop_token::StopToken;
use crossbeam::queue::{ArrayQueue, SegQueue};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use streaming_domain::entities::Task;
use streaming_domain::error::EngineError;

/// A counting semaphore with a stop-aware, bounded-granularity wait. Permits
/// are released one-for-one with items pushed into either queue.
struct CountingSemaphore {
    count: AtomicUsize,
    waiters: (Mutex<()>, Condvar),
}

impl CountingSemaphore {
    fn new() -> Self {
        Self {
            count: AtomicUsize::new(0),
            waiters: (Mutex::new(()), Condvar::new()),
        }
    }

    fn release(&self) {
        self.count.fetch_add(1, Ordering::AcqRel);
        let (lock, cvar) = &self.waiters;
        let _guard = lock.lock();
        cvar.notify_one();
    }

    fn try_acquire(&self) -> bool {
        self.count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| c.checked_sub(1))
            .is_ok()
    }

    /// Blocks until a permit is available or `stop` fires, polling at the
    /// stop token's interval (this <= 100ms bound).
    fn acquire(&self, stop: &StopToken) -> bool {
        loop {
            if self.try_acquire() {
                return true;
            }
            if stop.is_stopped() {
                return false;
            }
            stop.wait_one_interval();
        }
    }
}

/// The two-tier admission + internal queue.
pub struct TaskQueue {
    admission: ArrayQueue<Task>,
    internal: SegQueue<Task>,
    semaphore: CountingSemaphore,
}

impl TaskQueue {
    pub fn new(admission_capacity: usize) -> Self {
        Self {
            admission: ArrayQueue::new(admission_capacity),
            internal: SegQueue::new(),
            semaphore: CountingSemaphore::new(),
        }
    }

    pub fn admission_len(&self) -> usize {
        self.admission.len()
    }

    pub fn internal_len(&self) -> usize {
        self.internal.len()
    }

    /// Blocks with periodic stop checks until the admission queue has space,
    /// then releases the semaphore. Returns `false` if `stop` fired before
    /// space became available — the caller (a source adapter) must treat the
    /// submission as rejected.
    pub fn submit_admission(&self, mut task: Task, stop: &StopToken) -> bool {
        loop {
            match self.admission.push(task) {
                Ok(()) => {
                    self.semaphore.release();
                    return true;
                }
                Err(rejected) => {
                    task = rejected;
                    if stop.is_stopped() {
                        return false;
                    }
                    stop.wait_one_interval();
                }
            }
        }
    }

    /// Always succeeds: the internal queue is unbounded.
    pub fn submit_internal(&self, task: Task) {
        self.internal.push(task);
        self.semaphore.release();
    }

    /// Acquires the semaphore (blocking, with stop polling), then dequeues
    /// preferentially from internal, else admission.
    pub fn next(&self, stop: &StopToken) -> Option<Task> {
        if !self.semaphore.acquire(stop) {
            return None;
        }
        Some(self.dequeue_after_acquire())
    }

    /// Non-blocking variant of `next`.
    pub fn try_next(&self) -> Option<Task> {
        if !self.semaphore.try_acquire() {
            return None;
        }
        Some(self.dequeue_after_acquire())
    }

    fn dequeue_after_acquire(&self) -> Task {
        if let Some(task) = self.internal.pop() {
            return task;
        }
        if let Some(task) = self.admission.pop() {
            return task;
        }
        // The semaphore guaranteed an item exists; finding neither queue
        // populated means the two have drifted out of sync with the permit
        // count, which can only happen if a caller bypassed this API.
        panic!(
            "{}",
            EngineError::invariant("semaphore signalled an item but both admission and internal queues were empty")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streaming_domain::value_objects::PipelineId;

    fn dummy_task() -> Task {
        Task::trigger_window(PipelineId::new(1), streaming_domain::value_objects::SliceBounds::new(0, 1), vec![])
    }

    #[test]
    fn internal_tasks_are_dequeued_before_admission() {
        let queue = TaskQueue::new(4);
        let stop = StopToken::new();
        queue.submit_admission(dummy_task(), &stop);
        queue.submit_internal(dummy_task());
        match queue.next(&stop).unwrap() {
            Task::TriggerWindow { .. } => {}
            _ => panic!("expected a trigger-window task"),
        }
        assert_eq!(queue.internal_len(), 0);
        assert_eq!(queue.admission_len(), 1);
    }

    #[test]
    fn try_next_returns_none_when_empty() {
        let queue = TaskQueue::new(4);
        assert!(queue.try_next().is_none());
    }

    #[test]
    fn submit_admission_rejects_when_stopped_and_full() {
        let queue = TaskQueue::new(1);
        let stop = StopToken::new();
        assert!(queue.submit_admission(dummy_task(), &stop));
        stop.stop();
        assert!(!queue.submit_admission(dummy_task(), &stop));
    }

    #[test]
    fn next_returns_none_when_stopped_and_empty() {
        let queue = TaskQueue::new(4);
        let stop = StopToken::new();
        stop.stop();
        assert!(queue.next(&stop).is_none());
    }

    #[test]
    fn task_queue_conservation_enqueued_equals_dequeued_plus_remaining() {
        let queue = TaskQueue::new(8);
        let stop = StopToken::new();
        for _ in 0..5 {
            queue.submit_internal(dummy_task());
        }
        let mut dequeued = 0;
        while queue.try_next().is_some() {
            dequeued += 1;
        }
        assert_eq!(dequeued, 5);
        assert_eq!(queue.internal_len() + queue.admission_len(), 0);
        let _ = stop;
    }
}
