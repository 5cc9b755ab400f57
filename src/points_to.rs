//! The points-to contract (spec §4.5): this crate does not perform alias
//! analysis itself — it is handed a [`PointsToGraph`] computed elsewhere and
//! uses it to provision memory-state edges (see [`crate::provisioning`]).
//!
//! [`PointsToGraphBuilder`] builds a fixed, in-memory implementation of the
//! trait for tests and for frontends too small to warrant a real analysis.

use smallvec::SmallVec;

use crate::{ids::NodeId, ids::OutputId, FxHashMap, FxHashSet};

/// A memory object an alloca, malloc call, delta, or lambda can name, or an
/// opaque object this module did not originate (imported, or reached only
/// through an external/unanalyzable pointer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryNode {
    /// A stack object created by an `alloca` node.
    Alloca(NodeId),
    /// A heap object created by a call recognized as an allocator.
    Malloc(NodeId),
    /// A function's own closure/activation record, named by its lambda node.
    Lambda(NodeId),
    /// A global datum, named by its delta node.
    Delta(NodeId),
    /// An object imported from outside the module, named by the import's
    /// root-region argument output.
    Imported(OutputId),
    /// The analysis could not resolve this pointer to any of the above (it
    /// escaped analysis, e.g. via a cast from an integer, or a foreign
    /// call's return value). Every provisioning strategy must be safe when a
    /// register points only here.
    External,
}

/// Read-only view of an alias analysis result: which [`MemoryNode`]s a
/// pointer-valued register may refer to, and which memory nodes have
/// observably escaped their defining scope (their address was stored into
/// another memory node, passed to an external call, or exported).
pub trait PointsToGraph {
    /// The set of memory nodes `register` may point to. Empty means the
    /// register's value is never dereferenced (dead from memory's
    /// perspective); conservative analyses should include `External` rather
    /// than return an empty set for an unanalyzed pointer.
    fn points_to(&self, register: OutputId) -> &[MemoryNode];

    /// Every memory node the analysis knows about, regardless of whether any
    /// register currently points to it. Used by the agnostic provider, which
    /// must account for every allocation site in the program.
    fn memory_nodes(&self) -> &[MemoryNode];

    /// Has `node`'s address been observed to escape its allocating region
    /// (stored into another memory node, passed to an external call,
    /// exported)? A lifetime-aware provider may still prune a non-escaping
    /// node once its defining lambda/region becomes unreachable.
    fn escapes(&self, node: MemoryNode) -> bool;
}

/// Builds a fixed [`PointsToGraph`] by explicit assertion, rather than by
/// running an analysis. Intended for unit tests exercising the provisioning
/// strategies against hand-constructed scenarios, and for small frontends
/// that can name their own aliasing facts directly.
#[derive(Debug, Default)]
pub struct PointsToGraphBuilder {
    points_to: FxHashMap<OutputId, SmallVec<[MemoryNode; 2]>>,
    all_nodes: Vec<MemoryNode>,
    escaped: FxHashSet<MemoryNode>,
}

impl PointsToGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a memory node's existence, independent of whether anything
    /// currently points to it.
    pub fn declare(&mut self, node: MemoryNode) -> &mut Self {
        if !self.all_nodes.contains(&node) {
            self.all_nodes.push(node);
        }
        self
    }

    /// Asserts that `register` may point to each of `targets`.
    pub fn points_to(&mut self, register: OutputId, targets: impl IntoIterator<Item = MemoryNode>) -> &mut Self {
        let entry = self.points_to.entry(register).or_default();
        for target in targets {
            self.declare(target);
            if !entry.contains(&target) {
                entry.push(target);
            }
        }
        self
    }

    pub fn mark_escaped(&mut self, node: MemoryNode) -> &mut Self {
        self.declare(node);
        self.escaped.insert(node);
        self
    }

    pub fn build(self) -> FixedPointsToGraph {
        FixedPointsToGraph {
            points_to: self.points_to,
            all_nodes: self.all_nodes,
            escaped: self.escaped,
        }
    }
}

/// A [`PointsToGraph`] fixed at construction time; see [`PointsToGraphBuilder`].
#[derive(Debug, Default)]
pub struct FixedPointsToGraph {
    points_to: FxHashMap<OutputId, SmallVec<[MemoryNode; 2]>>,
    all_nodes: Vec<MemoryNode>,
    escaped: FxHashSet<MemoryNode>,
}

impl PointsToGraph for FixedPointsToGraph {
    fn points_to(&self, register: OutputId) -> &[MemoryNode] {
        self.points_to.get(&register).map(|v| v.as_slice()).unwrap_or(&[])
    }

    fn memory_nodes(&self) -> &[MemoryNode] {
        &self.all_nodes
    }

    fn escapes(&self, node: MemoryNode) -> bool {
        self.escaped.contains(&node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ids::NodeId, ops::Operation, Graph};

    #[test]
    fn builder_tracks_points_to_and_escape() {
        let mut g = Graph::new();
        let root = g.root();
        let mem = g.add_import("mem", crate::types::PortType::State(crate::types::StateType::Memory));
        let alloca = g
            .create_node(
                root,
                Operation::Alloca { value_type: crate::types::widths::i32(), size: 1 },
                &[mem],
            )
            .unwrap();
        let fake: NodeId = alloca;

        let mut builder = PointsToGraphBuilder::new();
        let register = g.add_import("ptr", crate::types::PortType::Value(crate::types::Type::pointer(crate::types::widths::i32())));
        builder.points_to(register, [MemoryNode::Alloca(fake)]);
        builder.mark_escaped(MemoryNode::Alloca(fake));
        let graph = builder.build();

        assert_eq!(graph.points_to(register), &[MemoryNode::Alloca(fake)]);
        assert!(graph.escapes(MemoryNode::Alloca(fake)));
        assert_eq!(graph.memory_nodes().len(), 1);
    }
}
