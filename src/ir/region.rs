//! Regions: ordered argument/result lists owning an unordered set of nodes
//! (spec §3, "Region").

use smallvec::SmallVec;

use crate::ids::{InputId, NodeId, OutputId};

/// A region's data. Every non-root region is owned by exactly one structural
/// node (its `parent`); the root region is owned by the [`crate::ir::Graph`]
/// itself and has no parent.
#[derive(Debug)]
pub struct RegionData {
    pub(crate) parent: Option<NodeId>,
    pub(crate) arguments: SmallVec<[OutputId; 4]>,
    pub(crate) results: SmallVec<[InputId; 4]>,
    /// Nodes owned by this region, in insertion order. Traversal iterators
    /// use this only as a tie-break; readiness drives the actual order.
    pub(crate) nodes: Vec<NodeId>,
}

impl RegionData {
    pub(crate) fn new(parent: Option<NodeId>) -> Self {
        Self {
            parent,
            arguments: SmallVec::new(),
            results: SmallVec::new(),
            nodes: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn arguments(&self) -> &[OutputId] {
        &self.arguments
    }

    pub fn results(&self) -> &[InputId] {
        &self.results
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }
}
