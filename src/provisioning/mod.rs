//! Memory-node provisioning (spec §4.6): turns a [`PointsToGraph`] into the
//! concrete set of memory-state threads a memory operation at a given
//! program point must carry as explicit `state` operands.
//!
//! Two strategies are provided. [`agnostic::AgnosticProvider`] is always
//! sound: every memory op threads every memory node in the program. Its
//! `num_states` is large but trivially correct and requires nothing from
//! call-summary analysis. [`lifetime_aware::LifetimeAwareProvider`] narrows
//! that set using reachability and call-summary information, at the cost of
//! falling back to the agnostic answer whenever a lambda's callers cannot be
//! enumerated exhaustively.

mod agnostic;
mod lifetime_aware;

pub use agnostic::AgnosticProvider;
pub use lifetime_aware::LifetimeAwareProvider;

use crate::{ids::NodeId, ir::Graph, points_to::MemoryNode};

/// Decides which memory nodes must be threaded as explicit state operands
/// for a memory operation inside `lambda`'s body (`None` for the root
/// region, which always exists and is never pruned).
pub trait MemoryNodeProvider {
    fn live_memory_nodes(&self, graph: &Graph, lambda: Option<NodeId>) -> Vec<MemoryNode>;
}
