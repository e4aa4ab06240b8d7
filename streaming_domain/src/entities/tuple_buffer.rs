// /////////////////////////////////////////////////////////////////////////////
// NebulaStream Streaming Execution Core
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! The pooled tuple buffer and its reference-counted control block. This
//! module only models the *handle discipline* — acquisition from a free
//! list and recycling back into one is the buffer pool's job
//! (`streaming_engine::infrastructure::runtime::buffer_pool`), which supplies
//! the `recycle` callback at construction time so this crate never depends on
//! the pool itself.

use crate::error::EngineError;
use crate::value_objects::{BufferMetadata, ChunkNumber, OriginId, SequenceNumber};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Reference-counted header for one pooled memory region.
///
/// Two independent counts, : `data_refs` (any handle holds a
/// reference) and `pinned_refs` (handle additionally requires the memory stay
/// resident for zero-copy access). Pinned is strictly stronger than retained:
/// every pinned handle also holds a data ref, but not every data ref pins.
pub struct BufferControlBlock {
    slot_index: usize,
    capacity_bytes: usize,
    memory: Mutex<Vec<u8>>,
    data_refs: AtomicUsize,
    pinned_refs: AtomicUsize,
    repin_done: (Mutex<bool>, Condvar),
    recycle: Arc<dyn Fn(usize) + Send + Sync>,
}

impl BufferControlBlock {
    pub fn new(slot_index: usize, capacity_bytes: usize, recycle: Arc<dyn Fn(usize) + Send + Sync>) -> Arc<Self> {
        Arc::new(Self {
            slot_index,
            capacity_bytes,
            memory: Mutex::new(vec![0u8; capacity_bytes]),
            data_refs: AtomicUsize::new(0),
            pinned_refs: AtomicUsize::new(0),
            repin_done: (Mutex::new(false), Condvar::new()),
            recycle,
        })
    }

    pub fn capacity_bytes(&self) -> usize {
        self.capacity_bytes
    }

    pub fn data_ref_count(&self) -> usize {
        self.data_refs.load(Ordering::Acquire)
    }

    pub fn pinned_ref_count(&self) -> usize {
        self.pinned_refs.load(Ordering::Acquire)
    }

    fn retain_data(&self) {
        self.data_refs.fetch_add(1, Ordering::AcqRel);
    }

    /// Releases one data ref. When the count reaches zero the memory is
    /// returned to the pool's free list via the `recycle` callback. Never
    /// call this more times than `retain_data` was called for a given
    /// handle's lifetime; doing so would release a count the handle never
    /// held.
    fn release_data(&self) {
        let previous = self.data_refs.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous >= 1, "release_data underflow: no data ref was held");
        if previous == 1 {
            (self.recycle)(self.slot_index);
        }
    }

    fn retain_pinned(&self) {
        self.pinned_refs.fetch_add(1, Ordering::AcqRel);
    }

    fn release_pinned(&self) {
        let previous = self.pinned_refs.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous >= 1, "release_pinned underflow: no pin was held");
        if previous == 1 {
            let (lock, cvar) = &self.repin_done;
            let mut done = lock.lock();
            *done = true;
            cvar.notify_all();
        }
    }

    fn read_bytes(&self, offset: usize, out: &mut [u8]) {
        let memory = self.memory.lock();
        out.copy_from_slice(&memory[offset..offset + out.len()]);
    }

    fn write_bytes(&self, offset: usize, data: &[u8]) {
        let mut memory = self.memory.lock();
        memory[offset..offset + data.len()].copy_from_slice(data);
    }
}

/// A scoped guard blocking reclamation of a control block's memory while
/// held. On drop it releases its pin and, if it was the last pin, signals
/// "repinning done" exactly once so a waiter (e.g. a compactor) can proceed.
pub struct RepinLock {
    bcb: Arc<BufferControlBlock>,
}

impl RepinLock {
    pub fn new(bcb: Arc<BufferControlBlock>) -> Self {
        bcb.retain_pinned();
        Self { bcb }
    }

    /// Blocks until the last outstanding pin (possibly this one, possibly
    /// another handle's) has been released.
    pub fn wait_for_repin(&self) {
        let (lock, cvar) = &self.bcb.repin_done;
        let mut done = lock.lock();
        while !*done {
            cvar.wait(&mut done);
        }
    }
}

impl Drop for RepinLock {
    fn drop(&mut self) {
        self.bcb.release_pinned();
    }
}

/// A smart handle over a [`BufferControlBlock`], parameterised by whether it
/// pins the memory (`PINNED = true`) or merely retains it (`PINNED = false`).
/// Clone and Drop keep both counters correctly balanced; neither duplicates a
/// retain without a matching release nor releases a count the handle never
/// held.
pub struct RefCountedBcb<const PINNED: bool> {
    bcb: Arc<BufferControlBlock>,
}

impl<const PINNED: bool> RefCountedBcb<PINNED> {
    pub fn new(bcb: Arc<BufferControlBlock>) -> Self {
        bcb.retain_data();
        if PINNED {
            bcb.retain_pinned();
        }
        Self { bcb }
    }

    pub fn control_block(&self) -> &BufferControlBlock {
        &self.bcb
    }
}

impl<const PINNED: bool> Clone for RefCountedBcb<PINNED> {
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.bcb))
    }
}

impl<const PINNED: bool> Drop for RefCountedBcb<PINNED> {
    fn drop(&mut self) {
        if PINNED {
            self.bcb.release_pinned();
        }
        self.bcb.release_data();
    }
}

/// An owning handle over a fixed-size, pooled byte region plus the metadata
/// that rides along with it. Uniquely owned by the
/// currently-executing worker; multiple workers may independently hold
/// pinned read-only views of the same underlying control block — a
/// shared-page / exclusive-handle split.
pub struct TupleBuffer {
    handle: RefCountedBcb<true>,
    tuple_count: usize,
    metadata: BufferMetadata,
    children: Vec<TupleBuffer>,
}

impl TupleBuffer {
    pub fn new(bcb: Arc<BufferControlBlock>, metadata: BufferMetadata) -> Self {
        Self {
            handle: RefCountedBcb::new(bcb),
            tuple_count: 0,
            metadata,
            children: Vec::new(),
        }
    }

    pub fn capacity_bytes(&self) -> usize {
        self.handle.control_block().capacity_bytes()
    }

    pub fn tuple_count(&self) -> usize {
        self.tuple_count
    }

    /// Sets the number of valid tuples in this buffer. `record_size` is the
    /// caller's fixed record width; violating `tuple_count * record_size <=
    /// capacity_bytes` is a precondition violation and is
    /// treated as fatal rather than recoverable.
    pub fn set_tuple_count(&mut self, count: usize, record_size: usize) -> Result<(), EngineError> {
        let required = count
            .checked_mul(record_size)
            .ok_or_else(|| EngineError::invariant("tuple_count * record_size overflowed"))?;
        if required > self.capacity_bytes() {
            return Err(EngineError::invariant(format!(
                "write past capacity: {required} bytes requested, {} available",
                self.capacity_bytes()
            )));
        }
        self.tuple_count = count;
        Ok(())
    }

    pub fn origin_id(&self) -> OriginId {
        self.metadata.origin_id
    }

    pub fn sequence_number(&self) -> SequenceNumber {
        self.metadata.sequence_number
    }

    pub fn chunk_number(&self) -> ChunkNumber {
        self.metadata.chunk_number
    }

    pub fn is_last_chunk(&self) -> bool {
        self.metadata.last_chunk
    }

    pub fn metadata(&self) -> &BufferMetadata {
        &self.metadata
    }

    pub fn set_metadata(&mut self, metadata: BufferMetadata) {
        self.metadata = metadata;
    }

    pub fn read<T: Copy>(&self, offset: usize) -> T {
        let mut bytes = vec![0u8; std::mem::size_of::<T>()];
        self.handle.control_block().read_bytes(offset, &mut bytes);
        // Safety: `bytes` holds exactly `size_of::<T>()` initialized bytes
        // copied from buffer memory owned by this handle.
        unsafe { std::ptr::read_unaligned(bytes.as_ptr() as *const T) }
    }

    pub fn write<T: Copy>(&self, offset: usize, value: T) {
        let size = std::mem::size_of::<T>();
        let mut bytes = vec![0u8; size];
        unsafe {
            std::ptr::write_unaligned(bytes.as_mut_ptr() as *mut T, value);
        }
        self.handle.control_block().write_bytes(offset, &bytes);
    }

    /// Links a variable-sized buffer to this one so both are retained
    /// together; the child is released (and possibly recycled) when this
    /// buffer is dropped.
    pub fn attach_child(&mut self, child: TupleBuffer) {
        self.children.push(child);
    }

    pub fn children(&self) -> &[TupleBuffer] {
        &self.children
    }
}
