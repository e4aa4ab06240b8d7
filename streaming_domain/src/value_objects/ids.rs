// /////////////////////////////////////////////////////////////////////////////
// NebulaStream Streaming Execution Core
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Type-safe identifiers for origins, queries, pipelines, and stages.
//!
//! All four wrap a plain `u64` rather than a ULID: origins are small integers
//! handed out by sources at registration time, and query/pipeline/stage ids
//! are assigned monotonically by the control plane at plan-lowering time.
//! Distinct newtypes exist so a `QueryId` can never be passed where a
//! `PipelineId` is expected, even though both are backed by the same integer
//! type.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! numeric_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl $name {
            pub fn new(value: u64) -> Self {
                Self(value)
            }

            pub fn value(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

numeric_id!(OriginId, "Identifies a logically distinct input stream.");
numeric_id!(QueryId, "Identifies a registered query within the engine.");
numeric_id!(PipelineId, "Identifies a compiled pipeline within a query plan.");
numeric_id!(StageId, "Identifies an operator-handler slot within a pipeline.");
