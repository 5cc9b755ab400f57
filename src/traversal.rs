//! Topdown / bottomup traversal (spec §4.4): a worklist-driven topological
//! order over a region's nodes, recursing into structural nodes' subregions.
//! Ties (multiple nodes simultaneously ready) are broken by each node's
//! position in its region's insertion-ordered node list, so traversal order
//! is deterministic across runs of the same graph.

use core::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::{
    ids::{NodeId, RegionId},
    ir::{Graph, InputOwner, OutputOwner},
    FxHashMap,
};

/// A topological order of `region`'s direct nodes only (does not recurse into
/// subregions): producers before consumers, same-region edges only (a
/// region's arguments and the outer context-variable bindings that feed them
/// are not producer *nodes*, so they never constrain this order).
pub fn topdown_region(graph: &Graph, region: RegionId) -> Vec<NodeId> {
    let nodes = graph.region(region).nodes();
    let index_of: FxHashMap<NodeId, usize> =
        nodes.iter().enumerate().map(|(i, &n)| (n, i)).collect();

    let mut in_degree: FxHashMap<NodeId, usize> = nodes.iter().map(|&n| (n, 0usize)).collect();
    let mut consumers: FxHashMap<NodeId, Vec<NodeId>> = nodes.iter().map(|&n| (n, Vec::new())).collect();

    for &node in nodes {
        let mut producers_seen = crate::FxHashSet::default();
        for &input in graph.node(node).inputs() {
            if let OutputOwner::Node(producer, _) = graph.output(graph.input(input).origin()).owner {
                if graph.node(producer).region() == region && producers_seen.insert(producer) {
                    consumers.get_mut(&producer).unwrap().push(node);
                    *in_degree.get_mut(&node).unwrap() += 1;
                }
            }
        }
    }

    let mut ready: BinaryHeap<Reverse<(usize, NodeId)>> = nodes
        .iter()
        .filter(|&&n| in_degree[&n] == 0)
        .map(|&n| Reverse((index_of[&n], n)))
        .collect();

    let mut order = Vec::with_capacity(nodes.len());
    while let Some(Reverse((_, node))) = ready.pop() {
        order.push(node);
        for &consumer in &consumers[&node] {
            let deg = in_degree.get_mut(&consumer).unwrap();
            *deg -= 1;
            if *deg == 0 {
                ready.push(Reverse((index_of[&consumer], consumer)));
            }
        }
    }
    order
}

/// The reverse of [`topdown_region`]: consumers before producers.
pub fn bottomup_region(graph: &Graph, region: RegionId) -> Vec<NodeId> {
    let mut order = topdown_region(graph, region);
    order.reverse();
    order
}

/// Walks the whole subtree rooted at `region`, calling `visit` on every node
/// (simple or structural) in topdown order, recursing into a structural
/// node's subregions immediately after visiting it.
pub fn walk_topdown(graph: &Graph, region: RegionId, visit: &mut impl FnMut(NodeId)) {
    for node in topdown_region(graph, region) {
        visit(node);
        if let Some(structural) = graph.node(node).as_structural() {
            for &sub in structural.subregions() {
                walk_topdown(graph, sub, visit);
            }
        }
    }
}

/// As [`walk_topdown`], but recurses into subregions *before* visiting the
/// owning structural node, and visits each region's own nodes consumers
/// first.
pub fn walk_bottomup(graph: &Graph, region: RegionId, visit: &mut impl FnMut(NodeId)) {
    for node in bottomup_region(graph, region) {
        if let Some(structural) = graph.node(node).as_structural() {
            for &sub in structural.subregions() {
                walk_bottomup(graph, sub, visit);
            }
        }
        visit(node);
    }
}

/// True if `input`'s origin is a region argument rather than a node output
/// (used by passes that need to distinguish "reads a context/loop variable"
/// from "reads another node's result").
pub fn reads_region_argument(graph: &Graph, input: crate::ids::InputId) -> bool {
    matches!(
        graph.output(graph.input(input).origin()).owner,
        OutputOwner::RegionArgument(..)
    )
}

/// True if `input` is a region result rather than a node operand.
pub fn is_region_result(graph: &Graph, input: crate::ids::InputId) -> bool {
    matches!(graph.input(input).owner, InputOwner::RegionResult(..))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{BinOpKind, Operation};
    use crate::types::widths;

    #[test]
    fn topdown_respects_data_dependencies() {
        let mut g = Graph::new();
        let root = g.root();
        let a = g
            .create_node(root, Operation::BitConstant { value: 1, width: 32 }, &[])
            .unwrap();
        let b = g
            .create_node(root, Operation::BitConstant { value: 2, width: 32 }, &[])
            .unwrap();
        let a_out = g.node(a).outputs()[0];
        let b_out = g.node(b).outputs()[0];
        let sum = g
            .create_node(root, Operation::Binary(BinOpKind::Add), &[a_out, b_out])
            .unwrap();

        let order = topdown_region(&g, root);
        let pos = |n: crate::ids::NodeId| order.iter().position(|&x| x == n).unwrap();
        assert!(pos(a) < pos(sum));
        assert!(pos(b) < pos(sum));
        let _ = widths::i32();
    }

    #[test]
    fn bottomup_is_reverse_of_topdown() {
        let mut g = Graph::new();
        let root = g.root();
        let a = g
            .create_node(root, Operation::BitConstant { value: 1, width: 32 }, &[])
            .unwrap();
        let a_out = g.node(a).outputs()[0];
        let neg = g
            .create_node(root, Operation::Bitcast { target: widths::i32() }, &[a_out])
            .unwrap();

        let top = topdown_region(&g, root);
        let bottom = bottomup_region(&g, root);
        assert_eq!(top.first(), bottom.last());
        assert_eq!(top.last(), bottom.first());
        let _ = neg;
    }
}
