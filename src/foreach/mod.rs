//! The for-each loop: classification into one of three lowering strategies,
//! loop-specific flow analysis, and lowering.
//!
//! Resolution fills in [`ForeachInfo`] on each [`ForeachStmt`]; flow
//! analysis records checkpoints and decides whether the continue target
//! survives; generation reads both back.

pub mod analyze;
pub mod classify;
pub mod generate;

use std::fmt;

use crate::ast::{ForeachStmt, Method};
use crate::flow::StateIndex;
use crate::span::Span;
use crate::typeck::scope::{LocalId, ScopeId};
use crate::typeck::types::{PrimitiveType, Type};
use crate::visit::{self, Visitor};

/// Names of the compiler-introduced locals. The leading space keeps them
/// out of reach of source names.
pub const INDEX_NAME: &str = " index";
pub const MAX_NAME: &str = " max";
pub const COLLECTION_NAME: &str = " collection";

/// Lowering strategy with the synthetic locals it needs.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopKind {
    Array { index: LocalId, bound: LocalId, source: LocalId },
    /// `receiver` is the type `iterator()` is dispatched on.
    RawIterable { iterator: LocalId, receiver: Type },
    GenericIterable { iterator: LocalId, receiver: Type },
}

impl LoopKind {
    pub fn name(&self) -> &'static str {
        match self {
            LoopKind::Array { .. } => "array",
            LoopKind::RawIterable { .. } => "raw-iterable",
            LoopKind::GenericIterable { .. } => "generic-iterable",
        }
    }

    /// Synthetic locals in allocation order.
    pub fn synthetics(&self) -> Vec<LocalId> {
        match self {
            LoopKind::Array { index, bound, source } => vec![*index, *bound, *source],
            LoopKind::RawIterable { iterator, .. } | LoopKind::GenericIterable { iterator, .. } => {
                vec![*iterator]
            }
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, LoopKind::Array { .. })
    }
}

/// Conversion applied to each produced element before it is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ElementConversion {
    #[default]
    None,
    Widening { from: PrimitiveType, to: PrimitiveType },
    /// Box a primitive into exactly its wrapper.
    Boxing(PrimitiveType),
    /// Box, then widen the wrapper reference to a supertype.
    BoxingThenWidening(PrimitiveType),
    /// Unbox to `from`, then widen to `to` when they differ.
    Unboxing { from: PrimitiveType, to: PrimitiveType },
}

impl fmt::Display for ElementConversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementConversion::None => write!(f, "none"),
            ElementConversion::Widening { from, to } => write!(f, "widening {from} to {to}"),
            ElementConversion::Boxing(p) => write!(f, "boxing {p}"),
            ElementConversion::BoxingThenWidening(p) => write!(f, "boxing {p} then widening"),
            ElementConversion::Unboxing { from, to } if from == to => write!(f, "unboxing to {to}"),
            ElementConversion::Unboxing { from, to } => {
                write!(f, "unboxing to {from} then widening to {to}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoopResolution {
    pub kind: LoopKind,
    /// Type of the produced elements before conversion.
    pub element_type: Type,
    pub conversion: ElementConversion,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Classification {
    /// Not yet resolved.
    #[default]
    Pending,
    /// The collection cannot be iterated; the loop is not lowered.
    Invalid,
    Resolved(LoopResolution),
}

impl Classification {
    pub fn resolution(&self) -> Option<&LoopResolution> {
        match self {
            Classification::Resolved(r) => Some(r),
            _ => None,
        }
    }

    pub fn kind(&self) -> Option<&LoopKind> {
        self.resolution().map(|r| &r.kind)
    }
}

/// Per-loop results shared by the phases.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForeachInfo {
    /// The loop's own block scope: element and synthetic locals.
    pub scope: Option<ScopeId>,
    pub classification: Classification,
    /// The loop itself was reached by flow analysis.
    pub reachable: bool,
    pub action_reachable: bool,
    /// Some path reaches the end of the body or a `continue`, so the loop
    /// tests at the bottom and branches back.
    pub continue_target: bool,
    /// After the collection is evaluated, with the element assigned.
    pub post_collection_state: Option<StateIndex>,
    /// After the loop.
    pub merged_state: Option<StateIndex>,
}

/// A loop found in a method body, by position.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopSummary {
    pub span: Span,
    pub element: String,
    pub depth: usize,
    pub info: ForeachInfo,
}

/// Every for-each loop in `method`, outermost first.
pub fn collect_loops(method: &Method) -> Vec<LoopSummary> {
    let mut collector = LoopCollector { loops: Vec::new(), depth: 0 };
    collector.visit_method(method);
    collector.loops
}

struct LoopCollector {
    loops: Vec<LoopSummary>,
    depth: usize,
}

impl Visitor for LoopCollector {
    fn visit_foreach(&mut self, node: &ForeachStmt, span: Span) {
        self.loops.push(LoopSummary {
            span,
            element: node.element.name.node.clone(),
            depth: self.depth,
            info: node.info.clone(),
        });
        self.depth += 1;
        visit::walk_foreach(self, node);
        self.depth -= 1;
    }
}
