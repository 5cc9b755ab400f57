//! Nodes: a simple node wraps one operation with operation-determined
//! arity; a structural node owns a fixed number of subregions (spec §3,
//! "Node").

use smallvec::SmallVec;

use crate::{
    ids::{InputId, OutputId, RegionId},
    ops::Operation,
    structural::StructuralKind,
};

#[derive(Debug)]
pub enum NodeKind {
    Simple(Operation),
    Structural(StructuralKind),
    /// Transient placeholder used while a structural node's subregions are
    /// being built (a subregion's parent must name the node that owns it,
    /// but the node's [`StructuralKind`] in turn names its subregions — so
    /// the node id is reserved first with this placeholder kind, and
    /// [`crate::ir::Graph`] overwrites it once the subregions exist). Never
    /// observed outside construction.
    Pending,
}

#[derive(Debug)]
pub struct NodeData {
    pub(crate) region: RegionId,
    pub(crate) kind: NodeKind,
    pub(crate) inputs: SmallVec<[InputId; 4]>,
    pub(crate) outputs: SmallVec<[OutputId; 2]>,
    /// Set once the node has been detached from its region's node list by
    /// [`crate::ir::Graph::remove_node`]. Its arena slot is retained (no
    /// compaction, per the design note on arena ownership) so any `NodeId`
    /// still held by an in-flight iterator simply finds the node inert.
    pub(crate) removed: bool,
}

impl NodeData {
    pub fn region(&self) -> RegionId {
        self.region
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn inputs(&self) -> &[InputId] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[OutputId] {
        &self.outputs
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }

    pub fn operation(&self) -> Option<&Operation> {
        match &self.kind {
            NodeKind::Simple(op) => Some(op),
            _ => None,
        }
    }

    pub fn as_structural(&self) -> Option<&StructuralKind> {
        match &self.kind {
            NodeKind::Structural(s) => Some(s),
            _ => None,
        }
    }

    pub(crate) fn as_structural_mut(&mut self) -> Option<&mut StructuralKind> {
        match &mut self.kind {
            NodeKind::Structural(s) => Some(s),
            _ => None,
        }
    }
}
