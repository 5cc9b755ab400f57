//! Dead-node elimination (spec §4.7): bottomup, a node with no consumers on
//! any of its outputs is dead and removed; repeated to a fixpoint, since
//! removing a consumer can make its own producer dead in turn.

use crate::{ids::NodeId, ir::Graph, pass::{Pass, PassCounters}, traversal, Result};

pub struct DeadNodeElimination;

impl Pass for DeadNodeElimination {
    fn name(&self) -> &'static str {
        "dead-node-elimination"
    }

    fn run(&mut self, graph: &mut Graph) -> Result<PassCounters> {
        let removed = run(graph)?;
        let mut counters = PassCounters::new();
        counters.set("removed", removed);
        Ok(counters)
    }
}

/// Removes every node (simple or structural, anywhere in the module) whose
/// outputs have no consumers, to a fixpoint. Returns the number of nodes
/// removed. A root-region export or any other live consumer — including one
/// inside a nested subregion — counts as a use, so exported lambdas and
/// their transitive dependencies always survive.
pub fn run(graph: &mut Graph) -> Result<u64> {
    let mut total_removed = 0u64;
    loop {
        let mut to_remove: Vec<NodeId> = Vec::new();
        traversal::walk_bottomup(graph, graph.root(), &mut |node| {
            if !graph.node(node).is_removed()
                && graph.node(node).outputs().iter().all(|&o| !graph.output(o).has_users())
            {
                to_remove.push(node);
            }
        });
        if to_remove.is_empty() {
            break;
        }
        for node in &to_remove {
            graph.remove_node(*node)?;
        }
        total_removed += to_remove.len() as u64;
    }
    Ok(total_removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::Operation;

    #[test]
    fn removes_unused_alloca_and_store() {
        // Lambda body: x = alloca i32; store 5 to x; return 0 — no load
        // observes either, so both die (spec §8 scenario 2).
        let mut g = Graph::new();
        let root = g.root();
        let sig = crate::types::FunctionType {
            args: vec![],
            results: vec![crate::types::widths::i32()],
        };
        let mut lambda = g.create_lambda(root, sig, &[]).unwrap();
        let subregion = lambda.subregion();
        let mem_in = lambda
            .graph_mut()
            .push_region_argument(subregion, crate::types::PortType::State(crate::types::StateType::Memory));
        let alloca = lambda
            .graph_mut()
            .create_node(
                subregion,
                Operation::Alloca { value_type: crate::types::widths::i32(), size: 1 },
                &[mem_in],
            )
            .unwrap();
        let ptr = lambda.graph_mut().node(alloca).outputs()[0];
        let mem1 = lambda.graph_mut().node(alloca).outputs()[1];
        let five = lambda
            .graph_mut()
            .create_node(subregion, Operation::BitConstant { value: 5, width: 32 }, &[])
            .unwrap();
        let five_out = lambda.graph_mut().node(five).outputs()[0];
        let _store = lambda
            .graph_mut()
            .create_node(subregion, Operation::Store { num_states: 1 }, &[ptr, five_out, mem1])
            .unwrap();
        let zero = lambda
            .graph_mut()
            .create_node(subregion, Operation::BitConstant { value: 0, width: 32 }, &[])
            .unwrap();
        let zero_out = lambda.graph_mut().node(zero).outputs()[0];
        let fn_ptr = lambda.finalize(&[zero_out]).unwrap();
        g.add_export("f", fn_ptr).unwrap();

        let removed = run(&mut g).unwrap();
        assert_eq!(removed, 3); // alloca, constant 5, store
        assert!(g.node(alloca).is_removed());
    }

    #[test]
    fn idempotent() {
        let mut g = Graph::new();
        g.create_node(g.root(), Operation::BitConstant { value: 1, width: 32 }, &[]).unwrap();
        let first = run(&mut g).unwrap();
        let second = run(&mut g).unwrap();
        assert_eq!(first, 1);
        assert_eq!(second, 0);
    }

    #[test]
    fn dead_lambda_removed_once_unreferenced() {
        let mut g = Graph::new();
        let root = g.root();
        let sig = crate::types::FunctionType { args: vec![], results: vec![] };
        let lambda = g.create_lambda(root, sig, &[]).unwrap();
        let _fn_ptr = lambda.finalize(&[]).unwrap();
        let removed = run(&mut g).unwrap();
        assert_eq!(removed, 1);
    }
}
