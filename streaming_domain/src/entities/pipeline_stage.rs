// /////////////////////////////////////////////////////////////////////////////
// NebulaStream Streaming Execution Core
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Operator kinds as a closed set of tagged variants, collapsing what would
//! otherwise be a deep virtual-inheritance hierarchy around operators into
//! one enum for the closed set of operators this core supports.

use crate::value_objects::WindowDefinition;
use serde::{Deserialize, Serialize};

/// Which side(s) of a pipeline an input path feeds. Binary pipelines (joins)
/// receive left and right buffers through two independent paths sharing one
/// pipeline instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Arity {
    Unary,
    BinaryLeft,
    BinaryRight,
}

/// A scalar comparison a `Filter` operator evaluates against one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
    Equal,
}

impl Comparison {
    pub fn evaluate(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            Comparison::GreaterThan => lhs > rhs,
            Comparison::GreaterOrEqual => lhs >= rhs,
            Comparison::LessThan => lhs < rhs,
            Comparison::LessOrEqual => lhs <= rhs,
            Comparison::Equal => lhs == rhs,
        }
    }
}

/// The closed set of operator kinds a compiled pipeline stage can embed.
/// Each variant carries its own parameters rather than relying on a shared
/// virtual base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OperatorKind {
    Scan {
        origin_schema_id: u64,
    },
    Emit,
    Filter {
        predicate_field: String,
        comparison: Comparison,
        threshold: f64,
    },
    Map {
        input_field: String,
        output_field: String,
        scale: f64,
        offset: f64,
    },
    WindowBuild {
        window: WindowDefinition,
        time_field: String,
        aggregate_field: String,
        group_by_field: Option<String>,
    },
    WindowProbe {
        window: WindowDefinition,
    },
    HashJoinBuild {
        key_field: String,
        time_field: String,
        arity: Arity,
    },
    HashJoinProbe {
        key_field: String,
    },
    NljBuild {
        time_field: String,
        arity: Arity,
    },
    NljProbe,
}

impl OperatorKind {
    pub fn arity(&self) -> Arity {
        match self {
            OperatorKind::HashJoinBuild { arity, .. } | OperatorKind::NljBuild { arity } => *arity,
            _ => Arity::Unary,
        }
    }

    pub fn is_stateful(&self) -> bool {
        matches!(
            self,
            OperatorKind::WindowBuild { .. }
                | OperatorKind::HashJoinBuild { .. }
                | OperatorKind::NljBuild { .. }
        )
    }
}

/// Declares a handler slot within a pipeline: the operator kind plus the
/// index used by the pipeline's context to look up its state at `execute`
/// time. The handler index is assigned once, at query-plan lowering time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineStage {
    pub handler_index: usize,
    pub kind: OperatorKind,
}

impl PipelineStage {
    pub fn new(handler_index: usize, kind: OperatorKind) -> Self {
        Self { handler_index, kind }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_build_arity_is_binary() {
        let kind = OperatorKind::HashJoinBuild {
            key_field: "k".into(),
            time_field: "ts".into(),
            arity: Arity::BinaryLeft,
        };
        assert_eq!(kind.arity(), Arity::BinaryLeft);
        assert!(kind.is_stateful());
    }

    #[test]
    fn scan_is_unary_and_stateless() {
        let kind = OperatorKind::Scan { origin_schema_id: 1 };
        assert_eq!(kind.arity(), Arity::Unary);
        assert!(!kind.is_stateful());
    }
}
