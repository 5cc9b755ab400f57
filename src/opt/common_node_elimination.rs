//! Common-node elimination (spec §4.7): topdown per region, hashes
//! `(operation, input-origin tuple)` to an existing output and redirects
//! later consumers to it. State-carrying operations are skipped entirely —
//! without alias information on hand, assuming two syntactically identical
//! loads/stores are interchangeable would violate the state-edge discipline
//! the moment they turn out not to alias, so this pass only ever merges the
//! stateless fragment of the catalog.

use smallvec::SmallVec;

use crate::{
    ids::{OutputId, RegionId},
    ir::Graph,
    ops::Operation,
    pass::{Pass, PassCounters},
    traversal,
    Result, FxHashMap,
};

pub struct CommonNodeElimination;

impl Pass for CommonNodeElimination {
    fn name(&self) -> &'static str {
        "common-node-elimination"
    }

    fn run(&mut self, graph: &mut Graph) -> Result<PassCounters> {
        let removed = run(graph)?;
        let mut counters = PassCounters::new();
        counters.set("removed", removed);
        Ok(counters)
    }
}

pub fn run(graph: &mut Graph) -> Result<u64> {
    run_region(graph, graph.root())
}

type Key = (Operation, SmallVec<[OutputId; 4]>);

fn run_region(graph: &mut Graph, region: RegionId) -> Result<u64> {
    let mut removed = 0u64;
    let mut seen: FxHashMap<Key, SmallVec<[OutputId; 2]>> = FxHashMap::default();

    for node in traversal::topdown_region(graph, region) {
        if graph.node(node).is_removed() {
            continue;
        }
        if let Some(structural) = graph.node(node).as_structural() {
            for &sub in structural.subregions().to_vec().iter() {
                removed += run_region(graph, sub)?;
            }
            continue;
        }

        let op = match graph.node(node).operation() {
            Some(op) if !op.is_state_carrying() => op.clone(),
            _ => continue,
        };
        let origins: SmallVec<[OutputId; 4]> = graph
            .node(node)
            .inputs()
            .iter()
            .map(|&i| graph.input(i).origin())
            .collect();
        let key = (op, origins);

        if let Some(existing) = seen.get(&key).cloned() {
            let outs = graph.node(node).outputs().to_vec();
            for (&new_out, &surviving) in outs.iter().zip(existing.iter()) {
                let users: Vec<_> = graph.output(new_out).users().to_vec();
                for user in users {
                    graph.redirect_input(user, surviving)?;
                }
            }
            graph.remove_node(node)?;
            removed += 1;
        } else {
            seen.insert(key, graph.node(node).outputs().to_vec().into());
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::BinOpKind;

    #[test]
    fn merges_identical_adds_in_same_region() {
        let mut g = Graph::new();
        let root = g.root();
        let a = g.create_node(root, Operation::BitConstant { value: 1, width: 32 }, &[]).unwrap();
        let b = g.create_node(root, Operation::BitConstant { value: 2, width: 32 }, &[]).unwrap();
        let a_out = g.node(a).outputs()[0];
        let b_out = g.node(b).outputs()[0];
        let sum1 = g.create_node(root, Operation::Binary(BinOpKind::Add), &[a_out, b_out]).unwrap();
        let sum2 = g.create_node(root, Operation::Binary(BinOpKind::Add), &[a_out, b_out]).unwrap();
        let sum1_out = g.node(sum1).outputs()[0];
        let sum2_out = g.node(sum2).outputs()[0];
        g.add_export("s1", sum1_out).unwrap();
        g.add_export("s2", sum2_out).unwrap();

        let removed = run(&mut g).unwrap();
        assert_eq!(removed, 1);
        assert!(g.node(sum2).is_removed() || g.node(sum1).is_removed());
    }

    #[test]
    fn does_not_merge_different_operands() {
        let mut g = Graph::new();
        let root = g.root();
        let a = g.create_node(root, Operation::BitConstant { value: 1, width: 32 }, &[]).unwrap();
        let b = g.create_node(root, Operation::BitConstant { value: 2, width: 32 }, &[]).unwrap();
        let a_out = g.node(a).outputs()[0];
        let b_out = g.node(b).outputs()[0];
        let sum = g.create_node(root, Operation::Binary(BinOpKind::Add), &[a_out, b_out]).unwrap();
        let diff = g.create_node(root, Operation::Binary(BinOpKind::Sub), &[a_out, b_out]).unwrap();
        let sum_out = g.node(sum).outputs()[0];
        let diff_out = g.node(diff).outputs()[0];
        g.add_export("s", sum_out).unwrap();
        g.add_export("d", diff_out).unwrap();

        let removed = run(&mut g).unwrap();
        assert_eq!(removed, 0);
    }

    #[test]
    fn is_idempotent() {
        let mut g = Graph::new();
        let root = g.root();
        let a = g.create_node(root, Operation::BitConstant { value: 1, width: 32 }, &[]).unwrap();
        let b = g.create_node(root, Operation::BitConstant { value: 1, width: 32 }, &[]).unwrap();
        let a_out = g.node(a).outputs()[0];
        let b_out = g.node(b).outputs()[0];
        g.add_export("a", a_out).unwrap();
        g.add_export("b", b_out).unwrap();

        let first = run(&mut g).unwrap();
        let second = run(&mut g).unwrap();
        assert_eq!(first, 1);
        assert_eq!(second, 0);
    }
}
