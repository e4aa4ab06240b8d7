// /////////////////////////////////////////////////////////////////////////////
// NebulaStream Streaming Execution Core
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! The source port: the core's only contract with whatever supplies tuples
//! — network socket, file reader, generator. Async or callback-driven
//! sources present to the core as blocking `fill_buffer` wrappers; this is
//! intentionally a blocking call, so any async event loop on the producer
//! side is the adapter's problem, not the core's.

use crate::entities::tuple_buffer::TupleBuffer;

/// Outcome of one `fill_buffer` call.
pub enum FillResult {
    Data(usize),
    EndOfStream,
    Error(String),
}

/// A minimal cooperative-cancellation signal, checked by blocking calls at
/// the boundary: suspension is confined to `next()`, `acquire()`, and
/// admission submission, each polling at <= 100ms. The concrete stop
/// token lives in the engine crate; sources only need to observe it.
pub trait StopSignal: Send + Sync {
    fn is_stopped(&self) -> bool;
}

/// Supplies tuple buffers to the engine. The core, not the source, stamps
/// `(origin_id, next_seq, chunk_number=1, last_chunk=true)` onto the buffer
/// before admission; the source only fills the payload and
/// reports how many tuples it wrote.
pub trait Source: Send + Sync {
    /// `schema_id` identifies the wire format the source is expected to
    /// produce; a source that cannot honor it returns
    /// `FillResult::Error` and the core raises `SchemaMismatch`
    /// without failing other sources.
    fn fill_buffer(&self, buffer: &mut TupleBuffer, schema_id: u64, stop: &dyn StopSignal) -> FillResult;
}
