//! Node push-out (spec §4.7): the dual of [`super::pull_in`] — a node
//! replicated identically (same operation, same operand origins) in every
//! alternative of a gamma is computed once in the gamma's own region
//! instead, and every alternative's copy is redirected to read that shared
//! result directly (sound by the same dominance argument pull-in relies on:
//! the gamma's region is an ancestor of each of its subregions). The
//! duplicate copies are left for dead-node elimination to remove.
//!
//! Unlike a context variable, this never touches the gamma node's own
//! arity — nothing needs to be threaded in as a new entry variable, since
//! the hoisted node's operands already live in (or above) the gamma's own
//! region.

use smallvec::SmallVec;

use crate::{
    ids::{NodeId, OutputId},
    ir::Graph,
    ops::Operation,
    pass::{Pass, PassCounters},
    traversal,
    Result, FxHashMap,
};

pub struct PushOut;

impl Pass for PushOut {
    fn name(&self) -> &'static str {
        "push-out"
    }

    fn run(&mut self, graph: &mut Graph) -> Result<PassCounters> {
        let hoisted = run(graph)?;
        let mut counters = PassCounters::new();
        counters.set("hoisted", hoisted);
        Ok(counters)
    }
}

pub fn run(graph: &mut Graph) -> Result<u64> {
    let mut gammas = Vec::new();
    traversal::walk_topdown(graph, graph.root(), &mut |n| {
        if graph.node(n).as_structural().and_then(|k| k.as_gamma()).is_some() {
            gammas.push(n);
        }
    });

    let mut total = 0u64;
    for gamma in gammas {
        if graph.node(gamma).is_removed() {
            continue;
        }
        total += push_out_gamma(graph, gamma)?;
    }
    Ok(total)
}

type Key = (Operation, SmallVec<[OutputId; 4]>);

fn push_out_gamma(graph: &mut Graph, gamma: NodeId) -> Result<u64> {
    let parent_region = graph.node(gamma).region();
    let subregions = graph
        .node(gamma)
        .as_structural()
        .and_then(|k| k.as_gamma())
        .expect("gamma node")
        .subregions
        .clone();
    if subregions.len() < 2 {
        return Ok(0);
    }

    let mut per_region: Vec<FxHashMap<Key, NodeId>> = Vec::with_capacity(subregions.len());
    for &sub in &subregions {
        let mut candidates: FxHashMap<Key, NodeId> = FxHashMap::default();
        for node in traversal::topdown_region(graph, sub) {
            if graph.node(node).is_removed() || graph.node(node).as_structural().is_some() {
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
            if !origins.iter().all(|&o| graph.region_dominates(owning_region(graph, o), parent_region)) {
                continue;
            }
            candidates.entry((op, origins)).or_insert(node);
        }
        per_region.push(candidates);
    }

    let mut common_keys: Vec<Key> = per_region[0].keys().cloned().collect();
    common_keys.retain(|key| per_region[1..].iter().all(|m| m.contains_key(key)));

    let mut hoisted = 0u64;
    for (op, origins) in common_keys {
        let shared = graph.create_node(parent_region, op.clone(), &origins)?;
        let shared_outputs = graph.node(shared).outputs().to_vec();
        for candidates in &per_region {
            let dup = candidates[&(op.clone(), origins.clone())];
            let dup_outputs = graph.node(dup).outputs().to_vec();
            for (&dup_out, &shared_out) in dup_outputs.iter().zip(shared_outputs.iter()) {
                let users: Vec<_> = graph.output(dup_out).users().to_vec();
                for user in users {
                    graph.redirect_input(user, shared_out)?;
                }
            }
        }
        hoisted += 1;
    }
    Ok(hoisted)
}

fn owning_region(graph: &Graph, origin: OutputId) -> crate::ids::RegionId {
    match graph.output(origin).owner {
        crate::ir::OutputOwner::Node(n, _) => graph.node(n).region(),
        crate::ir::OutputOwner::RegionArgument(r, _) => r,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{opt::dead_node_elimination, ops::BinOpKind};

    #[test]
    fn hoists_identical_computation_from_every_alternative() {
        let mut g = Graph::new();
        let root = g.root();
        let pred = g
            .create_node(root, Operation::ControlConstant { alt: 0, num_alternatives: 2 }, &[])
            .unwrap();
        let pred_out = g.node(pred).outputs()[0];
        let x = g.create_node(root, Operation::BitConstant { value: 4, width: 32 }, &[]).unwrap();
        let x_out = g.node(x).outputs()[0];

        // No entry var for `x`: both alternatives read it directly from the
        // root region (legal by dominance), so their nodes share the exact
        // same operand origin rather than two distinct per-subregion
        // entry-var arguments.
        let mut gamma = g.create_gamma(root, pred_out, 2, &[]).unwrap();
        let sub0 = gamma.subregion(0);
        let sub1 = gamma.subregion(1);
        let double0 = gamma
            .graph_mut()
            .create_node(sub0, Operation::Binary(BinOpKind::Add), &[x_out, x_out])
            .unwrap();
        let double0_out = gamma.graph_mut().node(double0).outputs()[0];
        let double1 = gamma
            .graph_mut()
            .create_node(sub1, Operation::Binary(BinOpKind::Add), &[x_out, x_out])
            .unwrap();
        let double1_out = gamma.graph_mut().node(double1).outputs()[0];
        let outputs = gamma.finalize(&[vec![double0_out], vec![double1_out]]).unwrap();
        g.add_export("r", outputs[0]).unwrap();

        let hoisted = run(&mut g).unwrap();
        assert_eq!(hoisted, 1);

        dead_node_elimination::run(&mut g).unwrap();
        assert!(g.node(double0).is_removed());
        assert!(g.node(double1).is_removed());
    }

    #[test]
    fn does_not_hoist_when_alternatives_compute_differently() {
        let mut g = Graph::new();
        let root = g.root();
        let pred = g
            .create_node(root, Operation::ControlConstant { alt: 0, num_alternatives: 2 }, &[])
            .unwrap();
        let pred_out = g.node(pred).outputs()[0];
        let x = g.create_node(root, Operation::BitConstant { value: 4, width: 32 }, &[]).unwrap();
        let x_out = g.node(x).outputs()[0];

        let mut gamma = g.create_gamma(root, pred_out, 2, &[x_out]).unwrap();
        let sub0 = gamma.subregion(0);
        let sub1 = gamma.subregion(1);
        let e0 = gamma.entry_var(0, 0);
        let e1 = gamma.entry_var(1, 0);
        let add = gamma.graph_mut().create_node(sub0, Operation::Binary(BinOpKind::Add), &[e0, e0]).unwrap();
        let add_out = gamma.graph_mut().node(add).outputs()[0];
        let sub = gamma.graph_mut().create_node(sub1, Operation::Binary(BinOpKind::Sub), &[e1, e1]).unwrap();
        let sub_out = gamma.graph_mut().node(sub).outputs()[0];
        let outputs = gamma.finalize(&[vec![add_out], vec![sub_out]]).unwrap();
        g.add_export("r", outputs[0]).unwrap();

        let hoisted = run(&mut g).unwrap();
        assert_eq!(hoisted, 0);
    }
}
