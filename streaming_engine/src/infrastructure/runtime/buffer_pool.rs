// /////////////////////////////////////////////////////////////////////////////
// NebulaStream Streaming Execution Core
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! The fixed-size tuple-buffer pool: a lock-free free
//! list of pre-allocated control blocks, shared across all workers. Unpooled
//! allocations for variable-sized payloads bypass the free list entirely and
//! are simply handed back to the system allocator when dropped.
//!
//! Each slot's `BufferControlBlock` lives for the pool's entire lifetime;
//! recycling a buffer never destroys or reallocates its control block, it
//! only returns the slot's index to the free queue so `acquire` can hand out
//! a fresh `Arc` clone of the same block. This is what "ref-count
//! conservation" measures: the pool's free-count returns to its
//! initial value after stop, not that memory was freed and reallocated.

use crate::infrastructure::runtime::stop_token::StopToken;
use crossbeam::queue::ArrayQueue;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use streaming_domain::entities::{BufferControlBlock, TupleBuffer};
use streaming_domain::error::EngineError;
use streaming_domain::value_objects::BufferMetadata;

/// A pool of `operator_buffer_size`-byte regions (config key
/// `operatorBufferSize`). `acquire` blocks under back-pressure when the free
/// list is empty; it only fails once the pool has been closed.
pub struct BufferPool {
    capacity_bytes: usize,
    blocks: Vec<Arc<BufferControlBlock>>,
    free_slots: ArrayQueue<usize>,
    recycle_notify: (Mutex<()>, Condvar),
    closed: AtomicBool,
}

impl BufferPool {
    pub fn new(num_buffers: usize, capacity_bytes: usize) -> Arc<Self> {
        Arc::new_cyclic(|weak_self: &std::sync::Weak<Self>| {
            let free_slots = ArrayQueue::new(num_buffers);
            let mut blocks = Vec::with_capacity(num_buffers);
            for slot in 0..num_buffers {
                let weak_pool = weak_self.clone();
                let recycle: Arc<dyn Fn(usize) + Send + Sync> = Arc::new(move |returned_slot| {
                    if let Some(pool) = weak_pool.upgrade() {
                        pool.on_recycled(returned_slot);
                    }
                });
                blocks.push(BufferControlBlock::new(slot, capacity_bytes, recycle));
                let _ = free_slots.push(slot);
            }
            Self {
                capacity_bytes,
                blocks,
                free_slots,
                recycle_notify: (Mutex::new(()), Condvar::new()),
                closed: AtomicBool::new(false),
            }
        })
    }

    fn on_recycled(&self, slot: usize) {
        let _ = self.free_slots.push(slot);
        let (lock, cvar) = &self.recycle_notify;
        let _guard = lock.lock();
        cvar.notify_one();
    }

    pub fn capacity_bytes(&self) -> usize {
        self.capacity_bytes
    }

    pub fn total_slots(&self) -> usize {
        self.blocks.len()
    }

    pub fn free_count(&self) -> usize {
        self.free_slots.len()
    }

    /// Blocks until a buffer is free or the pool closes, polling `stop` at
    /// <= 100ms granularity. Returns `EngineError::BufferPoolExhausted` only
    /// if the pool was closed, or the stop token fired, while waiting.
    pub fn acquire(&self, metadata: BufferMetadata, stop: &StopToken) -> Result<TupleBuffer, EngineError> {
        loop {
            if let Some(slot) = self.free_slots.pop() {
                let bcb = Arc::clone(&self.blocks[slot]);
                return Ok(TupleBuffer::new(bcb, metadata));
            }
            if self.closed.load(Ordering::Acquire) || stop.is_stopped() {
                return Err(EngineError::BufferPoolExhausted);
            }
            stop.wait_one_interval();
        }
    }

    /// Allocates a buffer outside the fixed pool, for variable-sized child
    /// payloads. Never returns to `free_slots`; its control
    /// block releases straight to the system allocator on drop.
    pub fn acquire_unpooled(&self, size_bytes: usize, metadata: BufferMetadata) -> TupleBuffer {
        let bcb = BufferControlBlock::new(usize::MAX, size_bytes, Arc::new(|_| {}));
        TupleBuffer::new(bcb, metadata)
    }

    /// Rejects all pending and future acquisitions; already-acquired buffers
    /// continue to function until dropped normally.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        let (lock, cvar) = &self.recycle_notify;
        let _guard = lock.lock();
        cvar.notify_all();
    }
}
