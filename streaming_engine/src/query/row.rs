// /////////////////////////////////////////////////////////////////////////////
// NebulaStream Streaming Execution Core
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! The fixed-width row encoding compiled pipeline stages read and write
//! against a [`TupleBuffer`]'s raw bytes. Every field is an 8-byte `f64`;
//! a row is `schema.len()` consecutive fields, laid out tuple-major so a
//! `Filter`/`Map` stage only ever touches whole rows (this
//! "compiled code" boundary — this is the one concrete instantiation of it
//! this crate ships, the way a single generated record layout would be
//! the output of an actual query compiler).

use streaming_domain::entities::TupleBuffer;

pub type Row = Vec<f64>;

/// An ordered list of field names a pipeline's buffers carry. Resolved to
/// field indices once at query-registration time so the hot path never
/// does string comparisons (field resolution is a one-time, compile-phase cost).
pub type Schema = Vec<String>;

pub fn field_index(schema: &Schema, name: &str) -> Option<usize> {
    schema.iter().position(|f| f == name)
}

/// Number of complete rows a buffer of `schema.len()` `f64` fields can hold.
pub fn capacity_rows(buffer: &TupleBuffer, schema_len: usize) -> usize {
    if schema_len == 0 {
        return 0;
    }
    buffer.capacity_bytes() / (schema_len * std::mem::size_of::<f64>())
}

pub fn read_rows(buffer: &TupleBuffer, schema_len: usize) -> Vec<Row> {
    (0..buffer.tuple_count()).map(|i| read_row(buffer, i, schema_len)).collect()
}

pub fn read_row(buffer: &TupleBuffer, index: usize, schema_len: usize) -> Row {
    let row_bytes = schema_len * std::mem::size_of::<f64>();
    (0..schema_len).map(|f| buffer.read::<f64>(index * row_bytes + f * std::mem::size_of::<f64>())).collect()
}

/// Writes `rows` into `buffer` starting at offset 0 and sets its tuple
/// count; fails if `rows.len()` would overflow the buffer's capacity.
pub fn write_rows(buffer: &mut TupleBuffer, rows: &[Row], schema_len: usize) -> Result<(), streaming_domain::error::EngineError> {
    let row_bytes = schema_len * std::mem::size_of::<f64>();
    for (i, row) in rows.iter().enumerate() {
        for (f, value) in row.iter().enumerate() {
            buffer.write::<f64>(i * row_bytes + f * std::mem::size_of::<f64>(), *value);
        }
    }
    buffer.set_tuple_count(rows.len(), row_bytes)
}
