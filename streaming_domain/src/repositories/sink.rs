// /////////////////////////////////////////////////////////////////////////////
// NebulaStream Streaming Execution Core
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! The sink port: must tolerate concurrent `on_buffer` calls,
//! since the core guarantees per-origin per-sequence monotonicity only, not
//! cross-origin or cross-thread serialisation.

use crate::entities::tuple_buffer::TupleBuffer;
use crate::error::EngineError;

pub trait Sink: Send + Sync {
    fn on_buffer(&self, buffer: TupleBuffer) -> Result<(), EngineError>;
}
