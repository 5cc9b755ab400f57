//! The agnostic memory-node provider (spec §4.6): every memory operation
//! threads every memory node known to the points-to graph, regardless of
//! reachability. Always sound; never prunes.

use crate::{ids::NodeId, ir::Graph, points_to::{MemoryNode, PointsToGraph}, provisioning::MemoryNodeProvider};

pub struct AgnosticProvider<'p, P> {
    points_to: &'p P,
}

impl<'p, P: PointsToGraph> AgnosticProvider<'p, P> {
    pub fn new(points_to: &'p P) -> Self {
        Self { points_to }
    }
}

impl<'p, P: PointsToGraph> MemoryNodeProvider for AgnosticProvider<'p, P> {
    fn live_memory_nodes(&self, _graph: &Graph, _lambda: Option<NodeId>) -> Vec<MemoryNode> {
        self.points_to.memory_nodes().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::points_to::PointsToGraphBuilder;

    #[test]
    fn ignores_lambda_context_entirely() {
        let mut builder = PointsToGraphBuilder::new();
        builder.declare(MemoryNode::External);
        let points_to = builder.build();
        let provider = AgnosticProvider::new(&points_to);
        let graph = Graph::new();

        let at_root = provider.live_memory_nodes(&graph, None);
        assert_eq!(at_root, vec![MemoryNode::External]);
    }
}
